//! Fileshelf Infrastructure Library
//!
//! Process-level plumbing shared by the API and worker binaries.

pub mod shutdown;
pub mod telemetry;

pub use shutdown::shutdown_signal;
pub use telemetry::init_tracing;
