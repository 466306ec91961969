pub mod file;
pub mod job;
pub mod user;

pub use file::{FileNode, FileType, NewUpload, ParentRef, ThumbnailWidth, UploadRequest};
pub use job::{Job, JobKind, JobStatus, ThumbnailPayload, WelcomePayload};
pub use user::{RegisterRequest, User, UserResponse};
