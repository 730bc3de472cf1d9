// engine.rs — 引擎端到端测试：加载校验、调度合并、输入状态机、标注剔除

use approx::assert_relative_eq;
use image::{DynamicImage, Rgba, RgbaImage};
use panorama_lens::{
    CameraPatch, EngineError, ErrorKind, ImageProvider, ImageTarget, InputEvent, Label, PanoramaEngine,
    ProjectionType, RendererConfig,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
struct MemoryProvider {
    images: HashMap<String, DynamicImage>,
}

impl MemoryProvider {
    fn with(mut self, name: &str, image: DynamicImage) -> Self {
        self.images.insert(name.to_string(), image);
        self
    }
}

impl ImageProvider for MemoryProvider {
    fn fetch(&self, source: &str) -> Result<DynamicImage, String> {
        self.images
            .get(source)
            .cloned()
            .ok_or_else(|| format!("{source} not found"))
    }
}

// 左半红、右半蓝的 2:1 全景
fn split_panorama(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, _| {
        if x < w / 2 {
            Rgba([255, 0, 0, 0])
        } else {
            Rgba([0, 0, 255, 0])
        }
    }))
}

fn engine_with(config: RendererConfig) -> PanoramaEngine<ImageTarget> {
    let provider = MemoryProvider::default().with("pano", split_panorama(1024, 512));
    PanoramaEngine::new(Box::new(provider), ImageTarget::new(160, 120), config).unwrap()
}

fn engine() -> PanoramaEngine<ImageTarget> {
    engine_with(RendererConfig::default())
}

#[test]
fn construction_fails_without_drawing_context() {
    let result = PanoramaEngine::new(
        Box::new(MemoryProvider::default()),
        ImageTarget::unavailable(),
        RendererConfig::default(),
    );
    let err = result.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn construction_rejects_undersized_targets() {
    for (w, h) in [(0, 0), (99, 500), (500, 99)] {
        let err = PanoramaEngine::new(
            Box::new(MemoryProvider::default()),
            ImageTarget::new(w, h),
            RendererConfig::default(),
        )
        .err()
        .unwrap();
        assert_eq!(err, EngineError::CanvasTooSmall { width: w, height: h });
    }
    assert!(PanoramaEngine::new(
        Box::new(MemoryProvider::default()),
        ImageTarget::new(100, 100),
        RendererConfig::default()
    )
    .is_ok());
}

#[test]
fn image_size_window() {
    let mut e = engine();
    let small = e.set_image(DynamicImage::new_luma8(511, 300)).unwrap_err();
    assert_eq!(small, EngineError::ImageTooSmall { width: 511, height: 300 });
    assert!(small.to_string().contains("too small"));

    assert_eq!(e.set_image(DynamicImage::new_luma8(512, 256)), Ok((512, 256)));
    assert_eq!(e.set_image(DynamicImage::new_luma8(8192, 4096)), Ok((8192, 4096)));

    let large = e.set_image(DynamicImage::new_luma8(8193, 4096)).unwrap_err();
    assert!(matches!(large, EngineError::ImageTooLarge { .. }));
    assert!(large.to_string().contains("too large"));
}

#[test]
fn rejected_image_keeps_previous_one_displayed() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let mut e = engine();
    let sink = errors.clone();
    e.on_error(move |err| sink.borrow_mut().push(err.kind()));

    e.load_image("pano").unwrap();
    assert!(e.frame());
    let before = e.frame_buffer().clone();

    assert!(e.set_image(DynamicImage::new_luma8(100, 100)).is_err());
    assert_eq!(e.source_dimensions(), Some((1024, 512)));
    assert!(!e.is_dirty());
    assert!(!e.render());
    assert_eq!(e.frame_buffer(), &before);
    assert_eq!(errors.borrow().as_slice(), &[ErrorKind::ImageValidation]);
}

#[test]
fn load_failures_surface_through_callback_and_result() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let mut e = engine();
    let sink = errors.clone();
    e.on_error(move |err| sink.borrow_mut().push(err.to_string()));

    let err = e.load_image("missing.jpg").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImageLoad);
    assert!(!err.to_string().contains("cross-origin"));

    let err = e.load_image("https://cdn.example.com/pano.jpg").unwrap_err();
    assert!(err.to_string().contains("cross-origin"));
    assert_eq!(errors.borrow().len(), 2);
    assert_eq!(e.source_dimensions(), None);
}

#[test]
fn on_load_reports_dimensions() {
    let loaded = Rc::new(RefCell::new(None));
    let mut e = engine();
    let sink = loaded.clone();
    e.on_load(move |w, h| *sink.borrow_mut() = Some((w, h)));
    e.load_image("pano").unwrap();
    assert_eq!(*loaded.borrow(), Some((1024, 512)));
}

#[test]
fn resize_bounds() {
    let mut e = engine();
    e.load_image("pano").unwrap();
    e.frame();
    let requests = e.target().frame_requests();

    let err = e.resize(99, 500).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Geometry);
    assert!(err.to_string().contains("canvas too small"));
    assert!(!e.is_dirty());
    assert_eq!(e.frame_buffer().dimensions(), (160, 120));

    e.resize(100, 100).unwrap();
    assert!(e.is_dirty());
    assert_eq!(e.target().frame_requests(), requests + 1);
    assert!(e.frame());
    assert_eq!(e.target().last_frame().unwrap().dimensions(), (100, 100));
}

#[test]
fn mutations_between_refreshes_coalesce_into_one_render() {
    let renders = Rc::new(RefCell::new(0));
    let mut e = engine();
    let sink = renders.clone();
    e.on_view_change(move |_| *sink.borrow_mut() += 1);

    e.load_image("pano").unwrap();
    e.handle_input(InputEvent::key_down("ArrowRight"));
    e.handle_input(InputEvent::Wheel { delta_y: -1.0 });
    e.set_state(CameraPatch {
        pitch: Some(10.0),
        ..CameraPatch::default()
    });
    assert_eq!(e.target().frame_requests(), 1);
    assert!(e.has_pending_frame());

    assert!(e.frame());
    assert!(!e.render());
    assert!(!e.frame());
    assert_eq!(e.target().presented(), 1);
    assert_eq!(*renders.borrow(), 1);

    // 下一批变化重新申请一次刷新
    e.handle_input(InputEvent::key_down("ArrowLeft"));
    assert_eq!(e.target().frame_requests(), 2);
}

#[test]
fn drag_start_alone_does_not_dirty_the_frame() {
    let mut e = engine();
    e.load_image("pano").unwrap();
    e.frame();
    e.handle_input(InputEvent::PointerDown { x: 10.0, y: 10.0 });
    assert!(e.state().is_dragging);
    assert!(!e.is_dirty());
    e.handle_input(InputEvent::PointerMove { x: 30.0, y: 10.0 });
    assert!(e.is_dirty());
    e.handle_input(InputEvent::PointerLeave);
    assert!(!e.state().is_dragging);
}

#[test]
fn five_right_arrows_turn_twenty_five_degrees() {
    let mut e = engine();
    for _ in 0..5 {
        e.handle_input(InputEvent::key_down("ArrowRight"));
    }
    assert_eq!(e.state().yaw, 25.0);
}

#[test]
fn wheel_out_and_back_restores_zoom() {
    let mut e = engine();
    e.handle_input(InputEvent::Wheel { delta_y: 100.0 });
    e.handle_input(InputEvent::Wheel { delta_y: -100.0 });
    assert_relative_eq!(e.state().zoom, 1.0, epsilon = 1e-12);
}

#[test]
fn camera_stays_in_bounds_under_any_input() {
    let mut e = engine();
    e.handle_input(InputEvent::PointerDown { x: 0.0, y: 0.0 });
    for i in 0..400 {
        let t = i as f64;
        e.handle_input(InputEvent::PointerMove {
            x: (t * 37.0) % 900.0 - 200.0,
            y: (t * 53.0) % 700.0 - 300.0,
        });
        e.handle_input(InputEvent::Wheel {
            delta_y: if i % 3 == 0 { 1.0 } else { -1.0 },
        });
        if i % 7 == 0 {
            e.handle_input(InputEvent::key_down("ArrowRight"));
            e.handle_input(InputEvent::key_down("ArrowUp"));
        }
        let s = e.state();
        assert!((-180.0..180.0).contains(&s.yaw), "yaw {}", s.yaw);
        assert!((-90.0..=90.0).contains(&s.pitch), "pitch {}", s.pitch);
        assert!((0.5..=3.0).contains(&s.zoom), "zoom {}", s.zoom);
    }
}

#[test]
fn rendered_center_follows_yaw_and_is_opaque() {
    let mut e = engine_with(RendererConfig {
        projection_type: ProjectionType::Rectilinear,
        ..RendererConfig::default()
    });
    e.load_image("pano").unwrap();

    e.set_state(CameraPatch {
        yaw: Some(90.0),
        ..CameraPatch::default()
    });
    e.frame();
    assert_eq!(e.frame_buffer().get_pixel(80, 60).0, [0, 0, 255, 255]);

    e.set_state(CameraPatch {
        yaw: Some(-90.0),
        ..CameraPatch::default()
    });
    e.frame();
    assert_eq!(e.frame_buffer().get_pixel(80, 60).0, [255, 0, 0, 255]);
}

#[test]
fn labels_fully_out_of_view_are_omitted() {
    let mut e = engine();
    e.load_image("pano").unwrap();
    // 视线朝向原图中心 (512, 256)；x = 0 处是正后方
    e.set_labels(vec![
        Label::new("behind", 0.0, 240.0, 10.0, 10.0),
        Label::new("ahead", 500.0, 246.0, 24.0, 20.0).with_title("Ahead"),
        Label::new("ahead", 0.0, 0.0, 1.0, 1.0),
    ]);
    assert_eq!(e.labels().len(), 2);

    e.frame();
    let ids: Vec<&str> = e.label_draws().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["ahead"]);

    let d = &e.label_draws()[0];
    let center = ((d.min + d.max) / 2.0).round();
    let px = e.frame_buffer().get_pixel(center.x as u32, center.y as u32).0;
    // 标注叠加在原图之上，颜色不再是纯红 / 纯蓝
    assert_ne!(px, [255, 0, 0, 255]);
    assert_ne!(px, [0, 0, 255, 255]);
}

#[test]
fn destroy_releases_and_is_idempotent() {
    let mut e = engine();
    e.load_image("pano").unwrap();
    assert!(e.has_pending_frame());

    e.destroy();
    assert!(!e.has_pending_frame());
    assert_eq!(e.target().cancelled_requests(), 1);
    assert_eq!(e.source_dimensions(), None);
    assert!(!e.frame());

    e.destroy();
    assert_eq!(e.target().cancelled_requests(), 1);
    e.handle_input(InputEvent::key_down("ArrowRight"));
    assert_eq!(e.state().yaw, 0.0);
}

#[test]
fn replacing_the_image_resamples_from_the_new_one() {
    let loaded = Rc::new(RefCell::new(Vec::new()));
    let mut e = engine();
    let sink = loaded.clone();
    e.on_load(move |w, h| sink.borrow_mut().push((w, h)));

    e.load_image("pano").unwrap();
    assert!(e.frame());
    assert_eq!(e.frame_buffer().get_pixel(80, 60).0, [0, 0, 255, 255]);

    let green = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2048, 1024, Rgba([0, 200, 0, 255])));
    assert_eq!(e.set_image(green), Ok((2048, 1024)));
    assert!(e.is_dirty());
    assert!(e.has_pending_frame());

    assert!(e.frame());
    assert_eq!(e.source_dimensions(), Some((2048, 1024)));
    assert!(e.frame_buffer().pixels().all(|p| p.0 == [0, 200, 0, 255]));
    assert_eq!(loaded.borrow().as_slice(), &[(1024, 512), (2048, 1024)]);
}

#[test]
fn title_font_is_resolved_when_titled_labels_arrive() {
    let mut e = engine();
    e.load_image("pano").unwrap();
    e.set_labels(vec![Label::new("plain", 500.0, 246.0, 24.0, 20.0)]);
    e.frame();
    // 没有标题时不做字体查找
    assert!(e.title_font().is_none());

    e.set_labels(vec![Label::new("door", 500.0, 246.0, 24.0, 20.0).with_title("Door")]);
    // 结果取决于机器上的字体，但必须是进程内缓存的同一份
    match (e.title_font(), panorama_lens::font::title_font()) {
        (Some(held), Some(cached)) => assert!(std::ptr::eq(held, cached)),
        (held, cached) => assert_eq!(held.is_some(), cached.is_some()),
    }
    assert!(e.frame());
}
