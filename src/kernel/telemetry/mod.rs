//! Event telemetry for the control core.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (layers, shield, or loop).
//! It exists solely for observability and verification.

pub mod metrics;
pub mod recorder;

pub use metrics::EventStats;
pub use recorder::EventRecorder;
