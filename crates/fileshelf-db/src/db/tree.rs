//! Metadata tree: ownership, parent and visibility rules over a [`FileRepository`].

use std::sync::Arc;

use chrono::Utc;
use fileshelf_core::constants::PAGE_SIZE;
use fileshelf_core::models::{FileNode, FileType, ParentRef};
use fileshelf_core::{AppError, ParentError};
use uuid::Uuid;

use crate::db::files::FileRepository;

/// A parent reference that was checked to be the root or a folder owned by
/// the creating user. Only [`MetadataTree::resolve_parent`] produces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidParent {
    owner: Uuid,
    parent: ParentRef,
}

impl ValidParent {
    pub fn parent(&self) -> ParentRef {
        self.parent
    }
}

#[derive(Clone)]
pub struct MetadataTree {
    files: Arc<dyn FileRepository>,
}

impl MetadataTree {
    pub fn new(files: Arc<dyn FileRepository>) -> Self {
        Self { files }
    }

    /// Check that `parent` is the root or an existing folder of `owner`.
    ///
    /// A folder of another user is reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_parent(
        &self,
        owner: Uuid,
        parent: ParentRef,
    ) -> Result<ValidParent, AppError> {
        if let ParentRef::Folder(parent_id) = parent {
            let node = self
                .files
                .find_owned(owner, parent_id)
                .await?
                .ok_or(ParentError::NotFound)?;
            if node.file_type != FileType::Folder {
                return Err(ParentError::NotFolder.into());
            }
        }
        Ok(ValidParent { owner, parent })
    }

    /// Insert a new node under a resolved parent.
    ///
    /// `storage_key` must be present exactly when `file_type` has content.
    #[tracing::instrument(skip(self, name, storage_key), fields(db.table = "files", db.operation = "insert"))]
    pub async fn create(
        &self,
        parent: ValidParent,
        name: String,
        file_type: FileType,
        is_public: bool,
        storage_key: Option<String>,
    ) -> Result<FileNode, AppError> {
        if file_type.has_content() != storage_key.is_some() {
            return Err(AppError::Internal(format!(
                "storage key presence does not match node type {}",
                file_type
            )));
        }

        let node = FileNode {
            id: Uuid::new_v4(),
            user_id: parent.owner,
            name,
            file_type,
            is_public,
            parent_id: parent.parent,
            storage_key,
            created_at: Utc::now(),
        };
        self.files.insert(&node).await?;

        tracing::info!(
            file_id = %node.id,
            user_id = %node.user_id,
            file_type = %node.file_type,
            "File node created"
        );

        Ok(node)
    }

    /// Owner-scoped lookup. Nodes of other users are `NotFound`.
    pub async fn get(&self, owner: Uuid, id: Uuid) -> Result<FileNode, AppError> {
        self.files
            .find_owned(owner, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Lookup by id alone, for the content path where visibility decides access.
    pub async fn get_any(&self, id: Uuid) -> Result<FileNode, AppError> {
        self.files.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// One zero-indexed page of at most [`PAGE_SIZE`] nodes, most recent first.
    pub async fn list(
        &self,
        owner: Uuid,
        parent: Option<ParentRef>,
        page: u32,
    ) -> Result<Vec<FileNode>, AppError> {
        let offset = i64::from(page) * PAGE_SIZE;
        self.files.list(owner, parent, offset, PAGE_SIZE).await
    }

    pub async fn set_visibility(
        &self,
        owner: Uuid,
        id: Uuid,
        is_public: bool,
    ) -> Result<FileNode, AppError> {
        self.files
            .set_visibility(owner, id, is_public)
            .await?
            .ok_or(AppError::NotFound)
    }
}
