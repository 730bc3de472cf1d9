// target.rs — 渲染目标：绘图上下文、呈现与刷新调度

use image::RgbaImage;

/// Where finished frames go.
///
/// The engine keeps a single in-flight refresh request: it calls
/// [`RenderTarget::request_frame`] once per batch of changes and expects the host to
/// call `PanoramaEngine::frame` on the next display refresh.
pub trait RenderTarget {
    /// Acquire the 2D drawing context. Returns the drawable size in pixels,
    /// or `None` when no context is available.
    fn acquire(&mut self) -> Option<(u32, u32)>;

    /// Drawable size changed; called after the engine accepted the new size.
    fn resize(&mut self, _width: u32, _height: u32) {}

    fn present(&mut self, frame: &RgbaImage);

    /// Ask for one display refresh callback.
    fn request_frame(&mut self) {}

    /// Drop a refresh request that has not fired yet.
    fn cancel_frame(&mut self) {}
}

/// In-memory target: keeps the last presented frame and counts requests.
#[derive(Debug, Clone, Default)]
pub struct ImageTarget {
    size: Option<(u32, u32)>,
    last_frame: Option<RgbaImage>,
    presented: usize,
    requested: usize,
    cancelled: usize,
}

impl ImageTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Some((width, height)),
            ..Self::default()
        }
    }

    /// A target whose context cannot be acquired.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&RgbaImage> {
        self.last_frame.as_ref()
    }

    pub fn take_frame(&mut self) -> Option<RgbaImage> {
        self.last_frame.take()
    }

    pub fn presented(&self) -> usize {
        self.presented
    }

    pub fn frame_requests(&self) -> usize {
        self.requested
    }

    pub fn cancelled_requests(&self) -> usize {
        self.cancelled
    }
}

impl RenderTarget for ImageTarget {
    fn acquire(&mut self) -> Option<(u32, u32)> {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
    }

    fn present(&mut self, frame: &RgbaImage) {
        self.last_frame = Some(frame.clone());
        self.presented += 1;
    }

    fn request_frame(&mut self) {
        self.requested += 1;
    }

    fn cancel_frame(&mut self) {
        self.cancelled += 1;
    }
}
