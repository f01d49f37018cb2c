pub mod cells;
pub mod config;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod orchestrator;
pub mod telemetry;
pub mod time;
