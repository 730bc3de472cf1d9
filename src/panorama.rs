// panorama.rs — 全景引擎：持有相机、原图快照、标注与渲染目标，对外提供全部操作

use crate::camera::{CameraPatch, CameraState, ViewController};
use crate::config::RendererConfig;
use crate::error::{EngineError, MIN_CANVAS_SIZE};
use crate::font;
use crate::input::InputEvent;
use crate::labels::{self, Label, LabelDraw};
use crate::mapper::CoordinateMapper;
use crate::raster;
use crate::source::{ImageProvider, SourceImage};
use crate::target::RenderTarget;
use ab_glyph::FontArc;
use image::{DynamicImage, RgbaImage};

type LoadCallback = Box<dyn FnMut(u32, u32)>;
type ErrorCallback = Box<dyn FnMut(&EngineError)>;
type ViewCallback = Box<dyn FnMut(&CameraState)>;

/// One panorama view bound to one render target.
///
/// Mutations mark the frame dirty and request a single display refresh; the host
/// answers with [`PanoramaEngine::frame`], which re-rasterizes at most once.
pub struct PanoramaEngine<T: RenderTarget> {
    target: T,
    provider: Box<dyn ImageProvider>,
    config: RendererConfig,
    view: ViewController,

    frame: RgbaImage,
    source: Option<SourceImage>,
    // 首次渲染时从 source 生成的全分辨率 RGBA 快照
    snapshot: Option<RgbaImage>,
    labels: Vec<Label>,
    label_draws: Vec<LabelDraw>,
    // 有标题的标注进来时才解析字体；render 只读这个字段
    title_font: Option<&'static FontArc>,

    dirty: bool,
    frame_pending: bool,
    destroyed: bool,
    frames_rendered: u64,

    on_load: Option<LoadCallback>,
    on_error: Option<ErrorCallback>,
    on_view_change: Option<ViewCallback>,
}

impl<T: RenderTarget> PanoramaEngine<T> {
    /// Fails with [`EngineError::Configuration`] when the target has no drawing context,
    /// and with [`EngineError::CanvasTooSmall`] when its size is below the minimum.
    pub fn new(provider: Box<dyn ImageProvider>, mut target: T, config: RendererConfig) -> Result<Self, EngineError> {
        let (width, height) = target
            .acquire()
            .ok_or_else(|| EngineError::Configuration("render target has no 2D drawing context".to_string()))?;
        if width < MIN_CANVAS_SIZE || height < MIN_CANVAS_SIZE {
            return Err(EngineError::CanvasTooSmall { width, height });
        }

        let config = config.sanitized();
        let view = ViewController::new(&config);
        log::info!(
            "engine ready: {width}x{height}, {} projection, fov {:.1}°",
            config.projection_type,
            config.field_of_view
        );

        Ok(Self {
            target,
            provider,
            config,
            view,
            frame: RgbaImage::new(width, height),
            source: None,
            snapshot: None,
            labels: Vec::new(),
            label_draws: Vec::new(),
            title_font: None,
            dirty: true,
            frame_pending: false,
            destroyed: false,
            frames_rendered: 0,
            on_load: None,
            on_error: None,
            on_view_change: None,
        })
    }

    pub fn on_load(&mut self, callback: impl FnMut(u32, u32) + 'static) {
        self.on_load = Some(Box::new(callback));
    }

    pub fn on_error(&mut self, callback: impl FnMut(&EngineError) + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    /// Invoked after each completed render, not on every state change.
    pub fn on_view_change(&mut self, callback: impl FnMut(&CameraState) + 'static) {
        self.on_view_change = Some(Box::new(callback));
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// The last rasterized frame, labels included.
    pub fn frame_buffer(&self) -> &RgbaImage {
        &self.frame
    }

    /// Labels placed during the last render.
    pub fn label_draws(&self) -> &[LabelDraw] {
        &self.label_draws
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Font used for label titles; resolved once a titled label is set.
    pub fn title_font(&self) -> Option<&FontArc> {
        self.title_font
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frame_pending
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn source_dimensions(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(SourceImage::dimensions)
    }

    pub fn state(&self) -> CameraState {
        self.view.state()
    }

    /// Fetch `source` through the provider and make it the active image.
    pub fn load_image(&mut self, source: &str) -> Result<(u32, u32), EngineError> {
        log::info!("loading image {source}");
        let fetched = self.provider.fetch(source);
        self.complete_load(source, fetched)
    }

    /// Finish a load whose fetch happened elsewhere (e.g. on a worker thread).
    pub fn complete_load(&mut self, origin: &str, fetched: Result<DynamicImage, String>) -> Result<(u32, u32), EngineError> {
        match fetched {
            Ok(image) => self.set_image(image),
            Err(message) => {
                let err = EngineError::load_failure(origin, message);
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Validate and activate a decoded image. On failure the previous image stays.
    pub fn set_image(&mut self, image: DynamicImage) -> Result<(u32, u32), EngineError> {
        if self.destroyed {
            return Err(EngineError::Configuration("engine destroyed".to_string()));
        }
        let source = match SourceImage::new(image) {
            Ok(source) => source,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        let (width, height) = source.dimensions();
        self.source = Some(source);
        self.snapshot = None;
        self.mark_dirty();
        log::info!("image loaded: {width}x{height}");

        if let Some(cb) = self.on_load.as_mut() {
            cb(width, height);
        }
        Ok((width, height))
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        if self.destroyed {
            return;
        }
        if self.view.handle(&event) {
            log::trace!("{} moved the view", event.name());
            self.mark_dirty();
        }
    }

    pub fn set_state(&mut self, patch: CameraPatch) {
        if self.destroyed {
            return;
        }
        self.view.apply(patch);
        self.mark_dirty();
    }

    pub fn reset_view(&mut self) {
        if self.destroyed {
            return;
        }
        self.view.reset();
        self.mark_dirty();
    }

    /// Replace the whole label set.
    pub fn set_labels(&mut self, labels: Vec<Label>) {
        if self.destroyed {
            return;
        }
        self.labels = labels::dedup_labels(labels);
        if self.title_font.is_none() && self.labels.iter().any(|l| l.title.is_some()) {
            self.title_font = font::title_font();
        }
        self.mark_dirty();
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        if width < MIN_CANVAS_SIZE || height < MIN_CANVAS_SIZE {
            return Err(EngineError::CanvasTooSmall { width, height });
        }
        if self.destroyed {
            return Ok(());
        }
        if self.frame.dimensions() != (width, height) {
            self.frame = RgbaImage::new(width, height);
            self.target.resize(width, height);
            log::info!("resized to {width}x{height}");
        }
        self.mark_dirty();
        Ok(())
    }

    /// Display-refresh callback: consumes the pending request and renders if dirty.
    pub fn frame(&mut self) -> bool {
        self.frame_pending = false;
        self.render()
    }

    /// Re-rasterize when dirty. Returns whether a frame was produced.
    pub fn render(&mut self) -> bool {
        if self.destroyed || !self.dirty {
            return false;
        }
        let Some(source) = self.source.as_ref() else {
            return false;
        };

        let snapshot = self.snapshot.get_or_insert_with(|| {
            log::debug!("caching full-resolution snapshot");
            source.snapshot()
        });

        let state = self.view.state();
        let mapper = CoordinateMapper::new(
            self.frame.dimensions(),
            snapshot.dimensions(),
            state.yaw,
            state.pitch,
            state.zoom,
            self.config.field_of_view,
            self.config.projection_type,
        );

        raster::rasterize(&mapper, snapshot, &mut self.frame);

        self.label_draws = labels::project_labels(&mapper, &self.labels);
        if !self.label_draws.is_empty() {
            labels::paint_labels(&mut self.frame, &self.label_draws, self.title_font);
        }

        self.dirty = false;
        self.frames_rendered += 1;
        self.target.present(&self.frame);

        if let Some(cb) = self.on_view_change.as_mut() {
            cb(&state);
        }
        true
    }

    /// Release the image and cancel any pending refresh. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.frame_pending {
            self.target.cancel_frame();
            self.frame_pending = false;
        }
        if !self.destroyed {
            log::debug!("engine destroyed after {} frames", self.frames_rendered);
        }
        self.source = None;
        self.snapshot = None;
        self.labels.clear();
        self.label_draws.clear();
        self.dirty = false;
        self.destroyed = true;
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        if !self.frame_pending && !self.destroyed {
            self.frame_pending = true;
            self.target.request_frame();
        }
    }

    fn report(&mut self, err: &EngineError) {
        log::warn!("{err}");
        if let Some(cb) = self.on_error.as_mut() {
            cb(err);
        }
    }
}
