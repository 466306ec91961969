//! Shared key generation for storage backends.

use uuid::Uuid;

/// Generate a fresh, unique key for an original upload.
pub fn generate_storage_key() -> String {
    Uuid::new_v4().to_string()
}

/// Key of a derived variant: `{key}_{variant}`. `None` is the original.
pub fn variant_key(storage_key: &str, variant: Option<u32>) -> String {
    match variant {
        Some(width) => format!("{}_{}", storage_key, width),
        None => storage_key.to_string(),
    }
}
