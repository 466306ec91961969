//! Constants shared across crates.

/// Thumbnail widths derived for every image, largest first.
pub const THUMBNAIL_WIDTHS: [u32; 3] = [500, 250, 100];

/// Number of file nodes returned per listing page.
pub const PAGE_SIZE: i64 = 20;

/// Lifetime of a session token (24 hours).
pub const SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;

pub const DEFAULT_FOLDER_PATH: &str = "/tmp/files_manager";

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-token";
