pub mod auth;
pub mod content;
pub mod files;
pub mod status;
pub mod users;

use fileshelf_core::AppError;
use uuid::Uuid;

/// Path ids that are not well-formed name no node.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}
