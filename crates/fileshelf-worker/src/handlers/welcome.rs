//! Greets a newly registered user.

use std::sync::Arc;

use async_trait::async_trait;
use fileshelf_core::models::{Job, JobKind, WelcomePayload};
use fileshelf_core::{JobError, JobResultExt};
use fileshelf_db::UserRepository;

use crate::handler::JobHandler;

pub struct WelcomeHandler {
    users: Arc<dyn UserRepository>,
}

impl WelcomeHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl JobHandler for WelcomeHandler {
    fn kind(&self) -> JobKind {
        JobKind::Welcome
    }

    #[tracing::instrument(skip_all, fields(job.id = %job.id))]
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let payload: WelcomePayload = serde_json::from_value(job.payload.clone()).unrecoverable()?;
        let user_id = payload
            .user_id
            .ok_or_else(|| JobError::unrecoverable(anyhow::anyhow!("Missing userId")))?;

        let user = self
            .users
            .find_by_id(user_id)
            .await
            .recoverable()?
            .ok_or_else(|| JobError::unrecoverable(anyhow::anyhow!("User not found")))?;

        tracing::info!(user_id = %user.id, "Welcome {}!", user.email);
        Ok(())
    }
}
