//! File operations on behalf of an authenticated owner.

use std::sync::Arc;

use fileshelf_core::models::{FileNode, FileType, ParentRef, ThumbnailWidth, UploadRequest};
use fileshelf_core::AppError;
use fileshelf_db::MetadataTree;
use fileshelf_storage::Storage;
use fileshelf_worker::JobQueue;
use uuid::Uuid;

/// Bytes of a node or one of its variants, with the type to serve them as.
#[derive(Debug)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct FileService {
    tree: MetadataTree,
    storage: Arc<dyn Storage>,
    queue: JobQueue,
}

impl FileService {
    pub fn new(tree: MetadataTree, storage: Arc<dyn Storage>, queue: JobQueue) -> Self {
        Self {
            tree,
            storage,
            queue,
        }
    }

    /// Validate, store the bytes, record the node, then enqueue thumbnails
    /// for images. Nothing is written when validation fails.
    ///
    /// If the thumbnail job cannot be enqueued the upload fails with an
    /// internal error even though the node is already recorded; the image
    /// would otherwise never get its variants.
    #[tracing::instrument(skip(self, request), fields(user_id = %owner))]
    pub async fn upload(&self, owner: Uuid, request: UploadRequest) -> Result<FileNode, AppError> {
        let upload = request.validate()?;
        let parent = self.tree.resolve_parent(owner, upload.parent).await?;

        let storage_key = match upload.content {
            Some(bytes) => Some(self.storage.put(bytes).await?),
            None => None,
        };

        let node = match self
            .tree
            .create(
                parent,
                upload.name,
                upload.file_type,
                upload.is_public,
                storage_key.clone(),
            )
            .await
        {
            Ok(node) => node,
            Err(e) => {
                if let Some(key) = storage_key {
                    if let Err(cleanup) = self.storage.delete(&key).await {
                        tracing::warn!(error = %cleanup, storage_key = %key, "Failed to remove orphaned upload");
                    }
                }
                return Err(e);
            }
        };

        if node.file_type == FileType::Image {
            self.queue
                .enqueue_thumbnail(node.id, owner)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, file_id = %node.id, "Failed to enqueue thumbnail job");
                    AppError::from(e)
                })?;
        }

        Ok(node)
    }

    pub async fn show(&self, owner: Uuid, id: Uuid) -> Result<FileNode, AppError> {
        self.tree.get(owner, id).await
    }

    /// `parent` of `None` lists every node of the owner.
    pub async fn index(
        &self,
        owner: Uuid,
        parent: Option<ParentRef>,
        page: u32,
    ) -> Result<Vec<FileNode>, AppError> {
        self.tree.list(owner, parent, page).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_visibility(
        &self,
        owner: Uuid,
        id: Uuid,
        is_public: bool,
    ) -> Result<FileNode, AppError> {
        self.tree.set_visibility(owner, id, is_public).await
    }

    /// Read a node's original bytes, or a derived variant when `size` is given.
    /// A variant that has not been derived yet is not found.
    pub async fn content(&self, node: &FileNode, size: Option<&str>) -> Result<FileContent, AppError> {
        let width = size.map(str::parse::<ThumbnailWidth>).transpose()?;
        let storage_key = node
            .storage_key
            .as_deref()
            .ok_or(AppError::FolderHasNoContent)?;

        let bytes = self
            .storage
            .get(storage_key, width.map(|w| w.get()))
            .await?;

        let content_type = mime_guess::from_path(&node.name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(FileContent {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fileshelf_core::models::JobKind;
    use fileshelf_core::ErrorMetadata;
    use fileshelf_db::{ClaimedJob, JobRecord, JobStore, MemoryFileRepository, MemoryJobStore};
    use fileshelf_storage::LocalStorage;
    use fileshelf_worker::JobQueueConfig;
    use std::time::Duration;

    /// A queue backend that is down.
    struct UnreachableQueue;

    #[async_trait]
    impl JobStore for UnreachableQueue {
        async fn enqueue(&self, _: JobKind, _: serde_json::Value) -> anyhow::Result<Uuid> {
            Err(anyhow::anyhow!("queue unreachable"))
        }

        async fn claim(&self, _: &[JobKind], _: Duration) -> anyhow::Result<Option<ClaimedJob>> {
            Ok(None)
        }

        async fn ack(&self, _: Uuid, _: Uuid) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn nack(&self, _: Uuid, _: Uuid, _: &str, _: Duration) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn fail(&self, _: Uuid, _: Uuid, _: &str) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn get(&self, _: Uuid) -> anyhow::Result<Option<JobRecord>> {
            Ok(None)
        }

        async fn is_alive(&self) -> bool {
            false
        }
    }

    async fn service(dir: &tempfile::TempDir, jobs: Arc<dyn JobStore>) -> (FileService, MetadataTree) {
        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let tree = MetadataTree::new(Arc::new(MemoryFileRepository::new()));
        let queue = JobQueue::new(jobs, JobQueueConfig::default());
        (FileService::new(tree.clone(), storage, queue), tree)
    }

    fn request(name: &str, file_type: &str) -> UploadRequest {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "type": file_type,
            "data": "aGVsbG8=",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_image_upload_enqueues_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = Arc::new(MemoryJobStore::new());
        let (files, _) = service(&dir, jobs.clone()).await;

        let node = files
            .upload(Uuid::new_v4(), request("a.png", "image"))
            .await
            .unwrap();

        let records = jobs.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job.kind, JobKind::Thumbnail);
        assert_eq!(records[0].job.payload["fileId"], serde_json::json!(node.id.to_string()));
    }

    #[tokio::test]
    async fn test_image_upload_fails_when_thumbnails_cannot_be_scheduled() {
        let dir = tempfile::tempdir().unwrap();
        let (files, tree) = service(&dir, Arc::new(UnreachableQueue)).await;
        let owner = Uuid::new_v4();

        let err = files.upload(owner, request("a.png", "image")).await.unwrap_err();
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "Internal server error");

        // The node itself was recorded before scheduling failed.
        assert_eq!(tree.list(owner, None, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_plain_file_upload_does_not_touch_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let (files, _) = service(&dir, Arc::new(UnreachableQueue)).await;

        let node = files
            .upload(Uuid::new_v4(), request("notes.txt", "file"))
            .await
            .unwrap();
        assert_eq!(node.file_type, FileType::File);
    }
}
