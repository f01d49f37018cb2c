use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

use super::error::{CschError, Result};

/// Which tier of the hierarchy a component belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LayerKind {
    Conscious,
    Subconscious,
    Cerebellum,
    Safety,
    System,
}

/// Common lifecycle contract of every layer.
///
/// `initialize` and `shutdown` are idempotent: calling either twice in a row
/// is a no-op the second time.
pub trait Lifecycle {
    fn name(&self) -> &str;
    fn layer(&self) -> LayerKind;
    fn initialize(&mut self) -> Result<()>;
    fn shutdown(&mut self) -> Result<()>;
    fn is_initialized(&self) -> bool;
    fn is_healthy(&self) -> bool;
}

/// Shared initialized/healthy bookkeeping. Layers embed one of these and
/// route their own setup/teardown through [`LifecycleState::initialize`] and
/// [`LifecycleState::shutdown`].
#[derive(Debug)]
pub struct LifecycleState {
    initialized: AtomicBool,
    healthy: AtomicBool,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleState {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
        }
    }

    /// not-initialized -> initialized. On failure the component stays
    /// not-initialized and is marked unhealthy for good.
    pub fn initialize<F>(&self, component: &str, setup: F) -> Result<()>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        match setup() {
            Ok(()) => {
                info!("{} initialized", component);
                Ok(())
            }
            Err(e) => {
                self.initialized.store(false, Ordering::Release);
                self.healthy.store(false, Ordering::Release);
                error!("{} failed to initialize: {:#}", component, e);
                Err(CschError::initialization(component, format!("{e:#}")))
            }
        }
    }

    /// initialized -> not-initialized.
    pub fn shutdown<F>(&self, component: &str, teardown: F) -> Result<()>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        if self
            .initialized
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        match teardown() {
            Ok(()) => {
                info!("{} shut down", component);
                Ok(())
            }
            Err(e) => {
                self.healthy.store(false, Ordering::Release);
                error!("{} failed to shut down: {:#}", component, e);
                Err(CschError::shutdown(component, format!("{e:#}")))
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Healthy means initialized and never failed a transition.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire) && self.is_initialized()
    }

    pub fn ensure_initialized(&self, component: &str) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(CschError::invalid_state(component, "component is not initialized"))
        }
    }
}
