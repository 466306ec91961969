//! Derives the fixed-width variants of an uploaded image.

use std::sync::Arc;

use async_trait::async_trait;
use fileshelf_core::models::{FileType, Job, JobKind, ThumbnailPayload};
use fileshelf_core::{AppError, JobError, JobResultExt};
use fileshelf_db::MetadataTree;
use fileshelf_processing::{derive_thumbnails, ThumbnailError};
use fileshelf_storage::{variant_key, Storage, StorageError};

use crate::handler::JobHandler;

pub struct ThumbnailHandler {
    tree: MetadataTree,
    storage: Arc<dyn Storage>,
}

impl ThumbnailHandler {
    pub fn new(tree: MetadataTree, storage: Arc<dyn Storage>) -> Self {
        Self { tree, storage }
    }
}

#[async_trait]
impl JobHandler for ThumbnailHandler {
    fn kind(&self) -> JobKind {
        JobKind::Thumbnail
    }

    #[tracing::instrument(skip_all, fields(job.id = %job.id))]
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let payload: ThumbnailPayload = serde_json::from_value(job.payload.clone()).unrecoverable()?;
        let file_id = payload
            .file_id
            .ok_or_else(|| JobError::unrecoverable(anyhow::anyhow!("Missing fileId")))?;
        let user_id = payload
            .user_id
            .ok_or_else(|| JobError::unrecoverable(anyhow::anyhow!("Missing userId")))?;

        let file = match self.tree.get(user_id, file_id).await {
            Ok(file) => file,
            Err(AppError::NotFound) => {
                return Err(JobError::unrecoverable(anyhow::anyhow!("File not found")))
            }
            Err(e) => return Err(JobError::recoverable(e)),
        };

        let storage_key = match (&file.file_type, &file.storage_key) {
            (FileType::Image, Some(key)) => key.clone(),
            _ => {
                return Err(JobError::unrecoverable(anyhow::anyhow!(
                    "File {} is not a stored image",
                    file.id
                )))
            }
        };

        let original = match self.storage.get(&storage_key, None).await {
            Ok(bytes) => bytes,
            Err(e @ StorageError::NotFound(_)) => return Err(JobError::unrecoverable(e)),
            Err(e) => return Err(JobError::recoverable(e)),
        };

        let variants = derive_thumbnails(original).await.map_err(|e| match e {
            ThumbnailError::Decode(_) | ThumbnailError::TooLarge { .. } => {
                JobError::unrecoverable(e)
            }
            other => JobError::recoverable(other),
        })?;

        for (width, bytes) in variants {
            let size_bytes = bytes.len();
            self.storage
                .put_with_key(&variant_key(&storage_key, Some(width.get())), bytes)
                .await
                .recoverable()?;
            tracing::debug!(file_id = %file.id, width = width.get(), size_bytes, "Thumbnail stored");
        }

        tracing::info!(file_id = %file.id, "Thumbnails generated");
        Ok(())
    }
}
