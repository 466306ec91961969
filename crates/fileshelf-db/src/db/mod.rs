//! Repositories for the data access layer
//!
//! Each store is expressed as a trait so handlers and workers receive an
//! injected handle instead of reaching for a global connection.

pub mod files;
pub mod jobs;
pub mod sessions;
pub mod tree;
pub mod users;

pub use files::{FileRepository, MemoryFileRepository, PgFileRepository};
pub use jobs::{ClaimedJob, JobRecord, JobStore, MemoryJobStore, PgJobStore};
pub use sessions::{MemorySessionStore, PgSessionStore, SessionStore};
pub use tree::{MetadataTree, ValidParent};
pub use users::{MemoryUserRepository, PgUserRepository, UserRepository};
