//! Fileshelf Worker Library
//!
//! The job queue front used by request handlers to enqueue work, and the
//! worker pool that claims jobs and dispatches them to [`JobHandler`]s.

pub mod dispatcher;
pub mod handler;
pub mod handlers;
pub mod pool;
pub mod queue;

pub use dispatcher::Dispatcher;
pub use handler::JobHandler;
pub use handlers::{ThumbnailHandler, WelcomeHandler};
pub use pool::WorkerPool;
pub use queue::{Delivery, JobConsumer, JobQueue, JobQueueConfig};
