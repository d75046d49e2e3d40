//! Preview thumbnails for selected image files

use crate::validation::SelectedFile;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{imageops, DynamicImage, ImageFormat, ImageReader, ImageResult, Limits, RgbaImage};
use std::io::Cursor;
use tracing::{debug, warn};

pub const THUMBNAIL_SIZE: u32 = 48;

/// Largest source width or height that will be decoded.
pub const MAX_SOURCE_DIMENSION: u32 = 8_192;

/// Upper bound on decoder allocations for one source image.
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Produces a preview URL for a selected file, if one can be made.
pub trait ThumbnailGenerator: Send + Sync {
    fn generate(&self, file: &SelectedFile) -> Option<String>;
}

/// Never produces a thumbnail.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoThumbnails;

impl ThumbnailGenerator for NoThumbnails {
    fn generate(&self, _file: &SelectedFile) -> Option<String> {
        None
    }
}

/// Square PNG preview encoded as a `data:` URL.
///
/// Decoding is CPU bound; callers on the runtime should run
/// [`ThumbnailGenerator::generate`] under `spawn_blocking`.
#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailer {
    size: u32,
    max_dimension: u32,
    max_alloc: u64,
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self {
            size: THUMBNAIL_SIZE,
            max_dimension: MAX_SOURCE_DIMENSION,
            max_alloc: MAX_DECODE_ALLOC,
        }
    }
}

impl ImageThumbnailer {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.max(1),
            ..Self::default()
        }
    }

    /// Refuse sources wider or taller than `pixels`.
    pub fn with_max_dimension(mut self, pixels: u32) -> Self {
        self.max_dimension = pixels;
        self
    }

    pub fn with_max_alloc(mut self, bytes: u64) -> Self {
        self.max_alloc = bytes;
        self
    }

    fn decode(&self, content: &[u8]) -> ImageResult<DynamicImage> {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        limits.max_alloc = Some(self.max_alloc);

        let mut reader = ImageReader::new(Cursor::new(content)).with_guessed_format()?;
        reader.limits(limits);
        reader.decode()
    }

    /// Fit `image` into a transparent square canvas, centred.
    fn fit(&self, image: &DynamicImage) -> RgbaImage {
        let scaled = image
            .resize(self.size, self.size, imageops::FilterType::Triangle)
            .to_rgba8();

        let mut canvas = RgbaImage::new(self.size, self.size);
        let x = (self.size - scaled.width().min(self.size)) / 2;
        let y = (self.size - scaled.height().min(self.size)) / 2;
        imageops::overlay(&mut canvas, &scaled, i64::from(x), i64::from(y));
        canvas
    }
}

impl ThumbnailGenerator for ImageThumbnailer {
    fn generate(&self, file: &SelectedFile) -> Option<String> {
        if !file.mime_type.starts_with("image/") || file.content.is_empty() {
            return None;
        }

        let image = match self.decode(&file.content) {
            Ok(image) => image,
            Err(e) => {
                warn!(name = %file.name, error = %e, "Could not decode image for thumbnail");
                return None;
            }
        };

        let canvas = self.fit(&image);
        let mut buffer = Cursor::new(Vec::new());
        if let Err(e) = canvas.write_to(&mut buffer, ImageFormat::Png) {
            warn!(name = %file.name, error = %e, "Could not encode thumbnail");
            return None;
        }

        let png = buffer.into_inner();
        debug!(name = %file.name, bytes = png.len(), "Thumbnail generated");
        Some(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
            width,
            height,
            Rgba([255, 0, 0, 255]),
        ));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn decode(url: &str) -> DynamicImage {
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_wide_image_is_letterboxed() {
        let file = SelectedFile::new("wide.png", "image/png", png_bytes(200, 100));
        let url = ImageThumbnailer::default().generate(&file).unwrap();

        let thumb = decode(&url).to_rgba8();
        assert_eq!(thumb.dimensions(), (48, 48));
        // Top row is padding, centre is the image
        assert_eq!(thumb.get_pixel(24, 0)[3], 0);
        assert_eq!(thumb.get_pixel(24, 24), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_non_image_is_skipped() {
        let file = SelectedFile::new("notes.txt", "text/plain", b"hello".to_vec());
        assert!(ImageThumbnailer::default().generate(&file).is_none());
    }

    #[test]
    fn test_undecodable_image_is_skipped() {
        let file = SelectedFile::new("broken.png", "image/png", b"not a png".to_vec());
        assert!(ImageThumbnailer::default().generate(&file).is_none());
    }

    #[test]
    fn test_source_over_limits_is_skipped() {
        let file = SelectedFile::new("wide.png", "image/png", png_bytes(200, 100));

        let small = ImageThumbnailer::default().with_max_dimension(64);
        assert!(small.generate(&file).is_none());

        let tight = ImageThumbnailer::default().with_max_alloc(1_024);
        assert!(tight.generate(&file).is_none());

        assert!(ImageThumbnailer::default().generate(&file).is_some());
    }

    #[test]
    fn test_no_thumbnails() {
        let file = SelectedFile::new("pic.png", "image/png", png_bytes(4, 4));
        assert!(NoThumbnails.generate(&file).is_none());
    }
}
