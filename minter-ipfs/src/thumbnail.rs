//! Image thumbnailing.

use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use minter_core::UploadError;
use std::io::Cursor;

pub const THUMBNAIL_WIDTH: u32 = 200;
pub const THUMBNAIL_HEIGHT: u32 = 200;

/// Produces a thumbnail for an uploaded image.
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    async fn thumbnail(&self, image: Bytes) -> Result<Bytes, UploadError>;
}

/// Resizes to a fixed box, cropping to fill, and re-encodes in the source format.
#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailer {
    width: u32,
    height: u32,
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self {
            width: THUMBNAIL_WIDTH,
            height: THUMBNAIL_HEIGHT,
        }
    }
}

impl ImageThumbnailer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn resize(&self, data: &[u8]) -> Result<Vec<u8>, UploadError> {
        let format = image::guess_format(data).map_err(thumbnail_error)?;
        let source = image::load_from_memory_with_format(data, format).map_err(thumbnail_error)?;
        let mut resized = source.resize_to_fill(self.width, self.height, FilterType::Lanczos3);

        let format = output_format(format);
        if format == ImageFormat::Jpeg {
            // JPEG has no alpha channel
            resized = DynamicImage::ImageRgb8(resized.to_rgb8());
        }

        let mut out = Cursor::new(Vec::new());
        resized
            .write_to(&mut out, format)
            .map_err(thumbnail_error)?;
        Ok(out.into_inner())
    }
}

// Formats we can decode but not encode fall back to PNG.
fn output_format(format: ImageFormat) -> ImageFormat {
    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP => format,
        _ => ImageFormat::Png,
    }
}

fn thumbnail_error(err: image::ImageError) -> UploadError {
    UploadError::Thumbnail {
        reason: err.to_string(),
    }
}

#[async_trait]
impl Thumbnailer for ImageThumbnailer {
    async fn thumbnail(&self, image: Bytes) -> Result<Bytes, UploadError> {
        let this = *self;
        tokio::task::spawn_blocking(move || this.resize(&image))
            .await
            .map_err(|e| UploadError::Thumbnail {
                reason: format!("Resize task failed: {}", e),
            })?
            .map(Bytes::from)
    }
}
