//! Single-value shared slots.
//!
//! Each slot holds an `Arc<T>` that is replaced wholesale, never mutated in
//! place. The lock only guards the pointer swap, so readers hold it for the
//! duration of an `Arc::clone` and can observe either the previous or the
//! current value.

use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug)]
pub struct SharedCell<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Default for SharedCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> SharedCell<T> {
    pub fn empty() -> Self {
        Self { slot: RwLock::new(None) }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.read().is_none()
    }

    /// Replace the value, returning the previous one.
    pub fn set(&self, value: T) -> Option<Arc<T>> {
        self.slot.write().replace(Arc::new(value))
    }

    pub fn set_arc(&self, value: Arc<T>) -> Option<Arc<T>> {
        self.slot.write().replace(value)
    }

    pub fn clear(&self) -> Option<Arc<T>> {
        self.slot.write().take()
    }

    /// Install `value` only if the slot is empty. Returns whether it was installed.
    pub fn set_if_empty(&self, value: T) -> bool {
        let mut slot = self.slot.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Arc::new(value));
        true
    }

    /// Compare-and-set: swap in `next` only while the current value satisfies
    /// `expected`. `None` clears the slot.
    pub fn replace_if<P>(&self, expected: P, next: Option<T>) -> bool
    where
        P: FnOnce(&T) -> bool,
    {
        let mut slot = self.slot.write();
        match slot.as_deref() {
            Some(current) if expected(current) => {
                *slot = next.map(Arc::new);
                true
            }
            _ => false,
        }
    }
}
