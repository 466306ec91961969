use crate::{LocalStorage, Storage, StorageResult};
use fileshelf_core::Config;
use std::sync::Arc;

/// Create the storage backend rooted at `FOLDER_PATH`.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(&config.folder_path).await?;
    Ok(Arc::new(storage))
}
