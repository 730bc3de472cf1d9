// source.rs — 全景原图：尺寸校验与解码提供者

use crate::error::{EngineError, MAX_IMAGE_HEIGHT, MAX_IMAGE_WIDTH, MIN_IMAGE_HEIGHT, MIN_IMAGE_WIDTH};
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::fs::File;
use std::io::BufReader;

/// Reject equirectangular images outside the supported size window.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), EngineError> {
    if width < MIN_IMAGE_WIDTH || height < MIN_IMAGE_HEIGHT {
        return Err(EngineError::ImageTooSmall { width, height });
    }
    if width > MAX_IMAGE_WIDTH || height > MAX_IMAGE_HEIGHT {
        return Err(EngineError::ImageTooLarge { width, height });
    }
    Ok(())
}

/// A decoded panorama that passed validation.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
}

impl SourceImage {
    pub fn new(image: DynamicImage) -> Result<Self, EngineError> {
        let (width, height) = image.dimensions();
        validate_dimensions(width, height)?;
        Ok(Self { image })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Full-resolution RGBA copy used for sampling.
    pub fn snapshot(&self) -> RgbaImage {
        self.image.to_rgba8()
    }
}

/// Turns a source identifier into decoded pixels. Transport lives outside the engine.
pub trait ImageProvider {
    fn fetch(&self, source: &str) -> Result<DynamicImage, String>;
}

/// Decodes image files from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageProvider;

impl ImageProvider for FileImageProvider {
    fn fetch(&self, source: &str) -> Result<DynamicImage, String> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return Err("remote sources are not supported by the file provider".to_string());
        }

        let file = File::open(source).map_err(|e| format!("cannot open file: {e}"))?;
        let reader = BufReader::new(file);

        // 大图全景：解除解码器的尺寸限制，尺寸由 validate_dimensions 把关
        ImageReader::new(reader)
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|mut r| {
                r.no_limits();
                r.decode()
            })
            .map_err(|e| format!("cannot decode image: {e}"))
    }
}
