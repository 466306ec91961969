//! Access control: who is calling, and may they read this node.

use std::sync::Arc;

use fileshelf_core::models::{FileNode, FileType};
use fileshelf_core::AppError;
use fileshelf_db::{MetadataTree, SessionStore};
use uuid::Uuid;

use super::models::UserContext;

#[derive(Clone)]
pub struct AccessController {
    sessions: Arc<dyn SessionStore>,
    tree: MetadataTree,
}

impl AccessController {
    pub fn new(sessions: Arc<dyn SessionStore>, tree: MetadataTree) -> Self {
        Self { sessions, tree }
    }

    /// Resolve a session token. A missing, unknown or expired token is `Unauthorized`.
    pub async fn identify(&self, token: Option<&str>) -> Result<UserContext, AppError> {
        self.identify_optional(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    pub async fn identify_optional(
        &self,
        token: Option<&str>,
    ) -> Result<Option<UserContext>, AppError> {
        let Some(token) = token else {
            return Ok(None);
        };
        let user_id = self.sessions.resolve(token).await?;
        Ok(user_id.map(|user_id| UserContext {
            user_id,
            token: token.to_string(),
        }))
    }

    /// The node whose content `viewer` may read.
    ///
    /// Public nodes are readable by anyone. A private node is reported as
    /// not found to everyone but its owner. Only the node itself is checked,
    /// not the folders above it.
    #[tracing::instrument(skip(self))]
    pub async fn readable_content(
        &self,
        viewer: Option<Uuid>,
        id: Uuid,
    ) -> Result<FileNode, AppError> {
        let node = self.tree.get_any(id).await?;

        if !node.is_public && viewer != Some(node.user_id) {
            return Err(AppError::NotFound);
        }
        if node.file_type == FileType::Folder {
            return Err(AppError::FolderHasNoContent);
        }

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshelf_core::models::ParentRef;
    use fileshelf_db::{MemoryFileRepository, MemorySessionStore};
    use std::time::Duration;

    fn controller() -> (AccessController, Arc<MemorySessionStore>, MetadataTree) {
        let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        let tree = MetadataTree::new(Arc::new(MemoryFileRepository::new()));
        (
            AccessController::new(sessions.clone(), tree.clone()),
            sessions,
            tree,
        )
    }

    async fn node(tree: &MetadataTree, owner: Uuid, file_type: FileType, public: bool) -> FileNode {
        let parent = tree.resolve_parent(owner, ParentRef::Root).await.unwrap();
        let key = file_type.has_content().then(|| "key".to_string());
        tree.create(parent, "n".into(), file_type, public, key)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_identify() {
        let (access, sessions, _) = controller();
        let user_id = Uuid::new_v4();
        let token = sessions.create_session(user_id).await.unwrap();

        let ctx = access.identify(Some(&token)).await.unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert!(matches!(access.identify(None).await, Err(AppError::Unauthorized)));
        assert!(matches!(
            access.identify(Some("bogus")).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_private_content_hidden_from_others() {
        let (access, _, tree) = controller();
        let owner = Uuid::new_v4();
        let file = node(&tree, owner, FileType::File, false).await;

        assert!(access.readable_content(Some(owner), file.id).await.is_ok());
        assert!(matches!(
            access.readable_content(None, file.id).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            access.readable_content(Some(Uuid::new_v4()), file.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_public_content_and_folders() {
        let (access, _, tree) = controller();
        let owner = Uuid::new_v4();
        let file = node(&tree, owner, FileType::Image, true).await;
        let folder = node(&tree, owner, FileType::Folder, true).await;

        assert!(access.readable_content(None, file.id).await.is_ok());
        assert!(matches!(
            access.readable_content(None, folder.id).await,
            Err(AppError::FolderHasNoContent)
        ));
    }
}
