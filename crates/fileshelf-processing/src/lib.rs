//! Fileshelf Processing Library
//!
//! Derivation of fixed-width thumbnail variants from uploaded images.

pub mod thumbnail;

pub use thumbnail::{
    derive_thumbnails, SourceImage, ThumbnailError, Thumbnailer, MAX_THUMBNAIL_PIXELS,
};
