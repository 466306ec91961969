use std::sync::Arc;

use fileshelf_core::Config;
use fileshelf_db::{MetadataTree, Stores};
use fileshelf_storage::Storage;
use fileshelf_worker::JobQueue;

use crate::auth::{AccessController, CredentialVerifier};
use crate::services::FileService;

/// Shared application state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub tree: MetadataTree,
    pub storage: Arc<dyn Storage>,
    pub queue: JobQueue,
    pub credentials: CredentialVerifier,
    pub access: AccessController,
    pub files: FileService,
    pub config: Config,
    pub is_production: bool,
}

impl AppState {
    pub fn new(config: Config, stores: Stores, storage: Arc<dyn Storage>, queue: JobQueue) -> Self {
        let tree = stores.tree();
        Self {
            credentials: CredentialVerifier::new(stores.users.clone(), queue.clone()),
            access: AccessController::new(stores.sessions.clone(), tree.clone()),
            files: FileService::new(tree.clone(), storage.clone(), queue.clone()),
            is_production: config.is_production(),
            tree,
            storage,
            queue,
            stores,
            config,
        }
    }
}
