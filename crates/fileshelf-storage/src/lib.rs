//! Fileshelf Storage Library
//!
//! Raw byte persistence behind a narrow put/get-by-key contract.
//!
//! # Storage key format
//!
//! An original upload is stored under a freshly generated key (a v4 UUID).
//! Thumbnail variants live next to it as `{key}_{width}`. Keys must not
//! contain `..` or a leading `/`; key generation is centralized in the
//! `keys` module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::variant_key;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
