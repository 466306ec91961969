pub mod files;

pub use files::{FileContent, FileService};
