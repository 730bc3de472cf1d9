// error.rs — 引擎错误分类

use thiserror::Error;

pub const MIN_IMAGE_WIDTH: u32 = 512;
pub const MIN_IMAGE_HEIGHT: u32 = 256;
pub const MAX_IMAGE_WIDTH: u32 = 8192;
pub const MAX_IMAGE_HEIGHT: u32 = 4096;
pub const MIN_CANVAS_SIZE: u32 = 100;

/// Broad class of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal, raised at construction.
    Configuration,
    /// Image dimensions out of bounds; the previous image stays active.
    ImageValidation,
    /// Transport or decode failure; the previous image stays active.
    ImageLoad,
    /// Render target below the minimum size; nothing was changed.
    Geometry,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("image too small: {width}x{height} (minimum {min_w}x{min_h})", min_w = MIN_IMAGE_WIDTH, min_h = MIN_IMAGE_HEIGHT)]
    ImageTooSmall { width: u32, height: u32 },

    #[error("image too large: {width}x{height} (maximum {max_w}x{max_h})", max_w = MAX_IMAGE_WIDTH, max_h = MAX_IMAGE_HEIGHT)]
    ImageTooLarge { width: u32, height: u32 },

    #[error("failed to load image {origin}: {message}")]
    ImageLoad { origin: String, message: String },

    #[error("canvas too small: {width}x{height} (minimum {min}x{min})", min = MIN_CANVAS_SIZE)]
    CanvasTooSmall { width: u32, height: u32 },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Configuration(_) => ErrorKind::Configuration,
            EngineError::ImageTooSmall { .. } | EngineError::ImageTooLarge { .. } => ErrorKind::ImageValidation,
            EngineError::ImageLoad { .. } => ErrorKind::ImageLoad,
            EngineError::CanvasTooSmall { .. } => ErrorKind::Geometry,
        }
    }

    /// Build a load error; remote origins get a cross-origin hint appended.
    pub fn load_failure(origin: &str, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if origin.starts_with("http://") || origin.starts_with("https://") {
            message.push_str(
                " (hint: if the image is served from another origin, the server must allow cross-origin requests)",
            );
        }
        EngineError::ImageLoad {
            origin: origin.to_string(),
            message,
        }
    }
}
