//! Fileshelf Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by every Fileshelf component.

pub mod config;
pub mod constants;
pub mod error;
pub mod job_error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, StoreBackend};
pub use error::{AppError, ErrorMetadata, LogLevel, ParentError};
pub use job_error::{JobError, JobResultExt};
