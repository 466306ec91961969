use async_trait::async_trait;
use fileshelf_core::models::{Job, JobKind};
use fileshelf_core::JobError;

/// Processes one kind of job.
///
/// Delivery is at-least-once, so `handle` may run more than once for the
/// same job and must converge to the same end state.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn kind(&self) -> JobKind;

    async fn handle(&self, job: &Job) -> Result<(), JobError>;
}
