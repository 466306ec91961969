use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fileshelf_core::models::{FileNode, FileType, ParentRef};
use fileshelf_core::AppError;
use sqlx::{FromRow, PgPool, Postgres};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Raw record access for the metadata tree. Callers go through
/// [`crate::MetadataTree`], which enforces the tree invariants.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn insert(&self, node: &FileNode) -> Result<(), AppError>;

    /// Lookup scoped to `owner`.
    async fn find_owned(&self, owner: Uuid, id: Uuid) -> Result<Option<FileNode>, AppError>;

    /// Lookup by id alone.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileNode>, AppError>;

    /// Most recent first. `parent == None` lists every node of `owner`.
    async fn list(
        &self,
        owner: Uuid,
        parent: Option<ParentRef>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FileNode>, AppError>;

    /// Set `is_public` on a node owned by `owner` and return the updated node.
    async fn set_visibility(
        &self,
        owner: Uuid,
        id: Uuid,
        is_public: bool,
    ) -> Result<Option<FileNode>, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    async fn is_alive(&self) -> bool;
}

#[derive(Debug, FromRow)]
struct FileRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    file_type: String,
    is_public: bool,
    parent_id: Option<Uuid>,
    storage_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FileRow> for FileNode {
    type Error = AppError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        let file_type: FileType = row.file_type.parse().map_err(|_| {
            AppError::Internal(format!("Unknown file type in store: {}", row.file_type))
        })?;

        Ok(FileNode {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            file_type,
            is_public: row.is_public,
            parent_id: ParentRef::from(row.parent_id),
            storage_key: row.storage_key,
            created_at: row.created_at,
        })
    }
}

const FILE_COLUMNS: &str =
    "id, user_id, name, file_type, is_public, parent_id, storage_key, created_at";

#[derive(Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    #[tracing::instrument(skip(self, node), fields(db.table = "files", db.operation = "insert", db.record_id = %node.id))]
    async fn insert(&self, node: &FileNode) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO files (id, user_id, name, file_type, is_public, parent_id, storage_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(node.id)
        .bind(node.user_id)
        .bind(&node.name)
        .bind(node.file_type.as_str())
        .bind(node.is_public)
        .bind(node.parent_id.folder_id())
        .bind(node.storage_key.as_deref())
        .bind(node.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn find_owned(&self, owner: Uuid, id: Uuid) -> Result<Option<FileNode>, AppError> {
        let row = sqlx::query_as::<Postgres, FileRow>(&format!(
            "SELECT {} FROM files WHERE id = $1 AND user_id = $2",
            FILE_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileNode::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileNode>, AppError> {
        let row = sqlx::query_as::<Postgres, FileRow>(&format!(
            "SELECT {} FROM files WHERE id = $1",
            FILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileNode::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list(
        &self,
        owner: Uuid,
        parent: Option<ParentRef>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FileNode>, AppError> {
        let rows = match parent {
            None => {
                sqlx::query_as::<Postgres, FileRow>(&format!(
                    "SELECT {} FROM files WHERE user_id = $1 ORDER BY seq DESC OFFSET $2 LIMIT $3",
                    FILE_COLUMNS
                ))
                .bind(owner)
                .bind(offset)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Some(ParentRef::Root) => {
                sqlx::query_as::<Postgres, FileRow>(&format!(
                    "SELECT {} FROM files WHERE user_id = $1 AND parent_id IS NULL ORDER BY seq DESC OFFSET $2 LIMIT $3",
                    FILE_COLUMNS
                ))
                .bind(owner)
                .bind(offset)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Some(ParentRef::Folder(parent_id)) => {
                sqlx::query_as::<Postgres, FileRow>(&format!(
                    "SELECT {} FROM files WHERE user_id = $1 AND parent_id = $2 ORDER BY seq DESC OFFSET $3 LIMIT $4",
                    FILE_COLUMNS
                ))
                .bind(owner)
                .bind(parent_id)
                .bind(offset)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(FileNode::try_from).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "update", db.record_id = %id))]
    async fn set_visibility(
        &self,
        owner: Uuid,
        id: Uuid,
        is_public: bool,
    ) -> Result<Option<FileNode>, AppError> {
        let row = sqlx::query_as::<Postgres, FileRow>(&format!(
            "UPDATE files SET is_public = $3 WHERE id = $1 AND user_id = $2 RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .bind(is_public)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileNode::try_from).transpose()
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn is_alive(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// In-memory metadata store. Nodes are kept in insertion order.
#[derive(Clone, Default)]
pub struct MemoryFileRepository {
    nodes: Arc<Mutex<Vec<FileNode>>>,
}

impl MemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRepository for MemoryFileRepository {
    async fn insert(&self, node: &FileNode) -> Result<(), AppError> {
        self.nodes.lock().await.push(node.clone());
        Ok(())
    }

    async fn find_owned(&self, owner: Uuid, id: Uuid) -> Result<Option<FileNode>, AppError> {
        let nodes = self.nodes.lock().await;
        Ok(nodes
            .iter()
            .find(|n| n.id == id && n.user_id == owner)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileNode>, AppError> {
        let nodes = self.nodes.lock().await;
        Ok(nodes.iter().find(|n| n.id == id).cloned())
    }

    async fn list(
        &self,
        owner: Uuid,
        parent: Option<ParentRef>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FileNode>, AppError> {
        let nodes = self.nodes.lock().await;
        Ok(nodes
            .iter()
            .rev()
            .filter(|n| n.user_id == owner)
            .filter(|n| parent.map_or(true, |p| n.parent_id == p))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn set_visibility(
        &self,
        owner: Uuid,
        id: Uuid,
        is_public: bool,
    ) -> Result<Option<FileNode>, AppError> {
        let mut nodes = self.nodes.lock().await;
        Ok(nodes
            .iter_mut()
            .find(|n| n.id == id && n.user_id == owner)
            .map(|n| {
                n.is_public = is_public;
                n.clone()
            }))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.nodes.lock().await.len() as i64)
    }

    async fn is_alive(&self) -> bool {
        true
    }
}
