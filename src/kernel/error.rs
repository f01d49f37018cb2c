//! Error taxonomy shared by every layer of the control core.
//!
//! Every variant carries the name of the component that raised it so the
//! orchestrator can report *where* a failure happened without downcasting.
//! Skill failures and safety violations are NOT errors: they travel as
//! `SkillResult` statuses and `SafetyViolation` records.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CschError {
    #[error("[{component}] initialization failed: {message}")]
    Initialization { component: String, message: String },

    #[error("[{component}] shutdown failed: {message}")]
    Shutdown { component: String, message: String },

    #[error("[{component}] invalid state: {message}")]
    InvalidState { component: String, message: String },

    #[error("[{component}] invalid input: {message}")]
    InvalidInput { component: String, message: String },

    #[error("[{component}] timed out: {message}")]
    Timeout { component: String, message: String },

    #[error("[{component}] resource unavailable: {message}")]
    ResourceUnavailable { component: String, message: String },

    #[error("[{component}] configuration error: {message}")]
    Configuration { component: String, message: String },
}

pub type Result<T> = std::result::Result<T, CschError>;

/// Coarse classification, mostly useful for tests and event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Initialization,
    Shutdown,
    InvalidState,
    InvalidInput,
    Timeout,
    ResourceUnavailable,
    Configuration,
}

impl CschError {
    pub fn initialization(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Initialization {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn shutdown(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Shutdown {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidState {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn timeout(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn resource_unavailable(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn component(&self) -> &str {
        match self {
            Self::Initialization { component, .. }
            | Self::Shutdown { component, .. }
            | Self::InvalidState { component, .. }
            | Self::InvalidInput { component, .. }
            | Self::Timeout { component, .. }
            | Self::ResourceUnavailable { component, .. }
            | Self::Configuration { component, .. } => component,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Initialization { .. } => ErrorKind::Initialization,
            Self::Shutdown { .. } => ErrorKind::Shutdown,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }
}
