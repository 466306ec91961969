//! Thumbnail derivation
//!
//! An image is decoded once and rendered at each requested width. Height
//! follows the original aspect ratio. Variants keep the source format when
//! it can be encoded, and fall back to PNG otherwise.

use fileshelf_core::models::ThumbnailWidth;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

/// Upper bound on the pixel count of a single rendered variant.
pub const MAX_THUMBNAIL_PIXELS: u64 = 500 * 4_000;

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    /// The original bytes are not a decodable image. Retrying cannot help.
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode {width}px thumbnail: {source}")]
    Encode {
        width: u32,
        #[source]
        source: image::ImageError,
    },

    /// The aspect ratio would produce a variant above [`MAX_THUMBNAIL_PIXELS`].
    #[error("Image {original_width}x{original_height} is too tall for a {width}px thumbnail")]
    TooLarge {
        original_width: u32,
        original_height: u32,
        width: u32,
    },

    #[error("Thumbnail task aborted: {0}")]
    Aborted(String),
}

/// A decoded original and the format it was stored in.
pub struct SourceImage {
    image: DynamicImage,
    format: ImageFormat,
}

impl SourceImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

pub struct Thumbnailer;

impl Thumbnailer {
    pub fn decode(data: &[u8]) -> Result<SourceImage, ThumbnailError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ThumbnailError::Decode(image::ImageError::IoError(e)))?;
        let format = reader.format().unwrap_or(ImageFormat::Png);
        let image = reader.decode().map_err(ThumbnailError::Decode)?;
        Ok(SourceImage { image, format })
    }

    /// Height for `width` preserving the aspect ratio, never below 1px.
    pub fn scaled_height(original: (u32, u32), width: u32) -> u32 {
        let (w, h) = original;
        if w == 0 {
            return 1;
        }
        let height = (f64::from(h) * f64::from(width) / f64::from(w)).round();
        let height = height.min(f64::from(u32::MAX)) as u32;
        height.max(1)
    }

    fn output_format(source: ImageFormat) -> ImageFormat {
        match source {
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP => source,
            _ => ImageFormat::Png,
        }
    }

    pub fn render(source: &SourceImage, width: u32) -> Result<Vec<u8>, ThumbnailError> {
        let (original_width, original_height) = source.dimensions();
        let height = Self::scaled_height((original_width, original_height), width);
        if u64::from(width) * u64::from(height) > MAX_THUMBNAIL_PIXELS {
            return Err(ThumbnailError::TooLarge {
                original_width,
                original_height,
                width,
            });
        }
        let resized = source.image.resize_exact(width, height, FilterType::Lanczos3);

        let format = Self::output_format(source.format);
        let resized = match format {
            // JPEG has no alpha channel
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
            ImageFormat::Gif | ImageFormat::WebP => DynamicImage::ImageRgba8(resized.to_rgba8()),
            _ => resized,
        };

        let mut buffer = Vec::with_capacity(width as usize * height as usize);
        resized
            .write_to(&mut Cursor::new(&mut buffer), format)
            .map_err(|source| ThumbnailError::Encode { width, source })?;

        Ok(buffer)
    }

    /// Render every thumbnail width from one decode.
    pub fn derive_all(data: &[u8]) -> Result<Vec<(ThumbnailWidth, Vec<u8>)>, ThumbnailError> {
        let source = Self::decode(data)?;
        tracing::debug!(
            dimensions = ?source.dimensions(),
            format = ?source.format(),
            "Deriving thumbnails"
        );
        ThumbnailWidth::all()
            .map(|width| Ok((width, Self::render(&source, width.get())?)))
            .collect()
    }
}

/// [`Thumbnailer::derive_all`] on the blocking thread pool.
pub async fn derive_thumbnails(
    data: Vec<u8>,
) -> Result<Vec<(ThumbnailWidth, Vec<u8>)>, ThumbnailError> {
    tokio::task::spawn_blocking(move || Thumbnailer::derive_all(&data))
        .await
        .map_err(|e| ThumbnailError::Aborted(e.to_string()))?
}
