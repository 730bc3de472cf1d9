// main.rs — 桌面查看器：winit 窗口 + wgpu 呈现；平台事件在这里归一化后交给引擎

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod renderer;

use panorama_lens::{
    FileImageProvider, ImageProvider, ImageTarget, InputEvent, Key, Label, PanoramaEngine, ProjectionType,
    RendererConfig, TouchPoint,
};
use renderer::WindowTarget;

use clap::Parser;
use image::{DynamicImage, GenericImageView};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

/// Panorama lens viewer.
///
/// Opens an equirectangular image in a window, or renders one frame to a PNG with --snapshot.
#[derive(Parser, Debug)]
#[command(name = "panorama_lens", about = "Equirectangular panorama viewer with lens projections")]
struct Args {
    /// Equirectangular image to open.
    #[arg(value_name = "IMAGE")]
    image: Option<String>,

    /// Renderer settings as JSON (camelCase keys, all optional).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Label list as JSON.
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,

    /// rectilinear, stereographic, equidistant or equisolid. Overrides the config file.
    #[arg(long, value_name = "NAME", env = "PANORAMA_PROJECTION")]
    projection: Option<String>,

    /// Render a single frame without opening a window and write it here.
    #[arg(long, value_name = "OUT.png", requires = "image")]
    snapshot: Option<PathBuf>,

    /// Viewport size, e.g. 1280x720.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    size: Option<(u32, u32)>,
}

// 后台解码结果；generation 过期的结果直接丢弃
struct LoadDone {
    generation: u64,
    origin: String,
    result: Result<DynamicImage, String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let labels = match args.labels.as_deref().map(load_labels).transpose() {
        Ok(l) => l.unwrap_or_default(),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Some(out) = args.snapshot.clone() {
        if let Err(e) = run_snapshot(&args, config, labels, &out) {
            eprintln!("{e}");
            std::process::exit(1);
        }
        return;
    }

    run_window(args, config, labels);
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let (w, h) = text.split_once(|c| c == 'x' || c == 'X').ok_or_else(|| format!("bad size {text:?}, expected WxH"))?;
    let w = w.trim().parse().map_err(|_| format!("bad width in {text:?}"))?;
    let h = h.trim().parse().map_err(|_| format!("bad height in {text:?}"))?;
    Ok((w, h))
}

fn load_config(args: &Args) -> Result<RendererConfig, String> {
    let mut config = match &args.config {
        Some(path) => RendererConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => RendererConfig::default(),
    };

    // --projection / PANORAMA_PROJECTION 覆盖配置文件
    if let Some(name) = args.projection.as_deref().filter(|v| !v.trim().is_empty()) {
        config.projection_type = ProjectionType::from_name(name);
    }
    Ok(config)
}

fn load_labels(path: &std::path::Path) -> Result<Vec<Label>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid labels in {}: {e}", path.display()))
}

/// Render a single frame without a window and save it.
fn run_snapshot(
    args: &Args,
    config: RendererConfig,
    labels: Vec<Label>,
    out: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = args.image.as_deref().ok_or("--snapshot needs an IMAGE")?;
    let (width, height) = args.size.unwrap_or((1280, 720));

    let mut engine = PanoramaEngine::new(Box::new(FileImageProvider), ImageTarget::new(width, height), config)?;
    engine.set_labels(labels);
    engine.load_image(image)?;
    engine.frame();

    let frame = engine.target_mut().take_frame().ok_or("nothing was rendered")?;
    frame.save(out)?;
    log::info!("snapshot written to {}", out.display());
    engine.destroy();
    Ok(())
}

fn run_window(args: Args, config: RendererConfig, labels: Vec<Label>) -> ! {
    let event_loop = EventLoop::new();
    let (width, height) = args.size.unwrap_or((1280, 720));
    let window = match WindowBuilder::new()
        .with_title("Panorama Lens")
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
    {
        Ok(w) => Arc::new(w),
        Err(e) => {
            eprintln!("cannot open window: {e}");
            std::process::exit(1);
        }
    };

    let target = pollster::block_on(WindowTarget::new(window.clone()));
    let mut engine = match PanoramaEngine::new(Box::new(FileImageProvider), target, config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    engine.on_load(|w, h| log::info!("panorama ready ({w}x{h})"));
    engine.on_error(|e| log::error!("{e}"));
    let title_window = window.clone();
    engine.on_view_change(move |s| {
        title_window.set_title(&format!(
            "Panorama Lens | Yaw: {:.1}° | Pitch: {:.1}° | Zoom: {:.2}",
            s.yaw, s.pitch, s.zoom
        ));
    });
    engine.set_labels(labels);

    // 异步加载通道
    let (tx, rx): (Sender<LoadDone>, Receiver<LoadDone>) = channel();
    let mut generation: u64 = 0;
    let mut is_loading = false;
    if let Some(path) = args.image {
        generation += 1;
        is_loading = true;
        start_load_image(path, generation, tx.clone());
    }

    let mut cursor: Option<PhysicalPosition<f64>> = None;

    event_loop.run(move |event, _, control_flow| {
        // 加载中时定期醒来收取结果，否则只在有事件时运行
        *control_flow = if is_loading {
            ControlFlow::WaitUntil(Instant::now() + Duration::from_millis(16))
        } else {
            ControlFlow::Wait
        };

        match event {
            Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    engine.destroy();
                    *control_flow = ControlFlow::Exit;
                }

                WindowEvent::Resized(size) => {
                    engine.target_mut().configure(size);
                    if let Err(e) = engine.resize(size.width, size.height) {
                        log::warn!("{e}");
                        engine.target_mut().redraw();
                    }
                }

                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    engine.target_mut().configure(*new_inner_size);
                    if let Err(e) = engine.resize(new_inner_size.width, new_inner_size.height) {
                        log::warn!("{e}");
                    }
                }

                WindowEvent::KeyboardInput { input, .. } if input.state == ElementState::Pressed => {
                    match input.virtual_keycode {
                        Some(VirtualKeyCode::O) => {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "webp"])
                                .pick_file()
                            {
                                generation += 1;
                                is_loading = true;
                                start_load_image(path.to_string_lossy().into_owned(), generation, tx.clone());
                            }
                        }
                        Some(VirtualKeyCode::R) => engine.reset_view(),
                        Some(VirtualKeyCode::F11) => {
                            if window.fullscreen().is_some() {
                                window.set_fullscreen(None);
                            } else {
                                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                            }
                        }
                        Some(VirtualKeyCode::Escape) => {
                            engine.destroy();
                            *control_flow = ControlFlow::Exit;
                        }
                        Some(code) => {
                            if let Some(key) = arrow_key(code) {
                                engine.handle_input(InputEvent::KeyDown { key });
                            }
                        }
                        None => {}
                    }
                }

                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => match state {
                    ElementState::Pressed => {
                        if let Some(p) = cursor {
                            engine.handle_input(InputEvent::PointerDown { x: p.x, y: p.y });
                        }
                    }
                    ElementState::Released => engine.handle_input(InputEvent::PointerUp),
                },

                WindowEvent::CursorMoved { position, .. } => {
                    cursor = Some(position);
                    engine.handle_input(InputEvent::PointerMove {
                        x: position.x,
                        y: position.y,
                    });
                }

                WindowEvent::CursorLeft { .. } => {
                    cursor = None;
                    engine.handle_input(InputEvent::PointerLeave);
                }

                WindowEvent::MouseWheel { delta, .. } => {
                    // winit 向上滚为正；引擎按浏览器约定，向下滚为正
                    let delta_y = match delta {
                        MouseScrollDelta::LineDelta(_, y) => -(y as f64) * 100.0,
                        MouseScrollDelta::PixelDelta(pos) => -pos.y,
                    };
                    if delta_y != 0.0 {
                        engine.handle_input(InputEvent::Wheel { delta_y });
                    }
                }

                WindowEvent::Touch(touch) => {
                    let point = TouchPoint::new(touch.id, touch.location.x, touch.location.y);
                    let event = match touch.phase {
                        TouchPhase::Started => InputEvent::TouchStart { touches: vec![point] },
                        TouchPhase::Moved => InputEvent::TouchMove { touches: vec![point] },
                        TouchPhase::Ended | TouchPhase::Cancelled => InputEvent::TouchEnd,
                    };
                    engine.handle_input(event);
                }

                WindowEvent::DroppedFile(path) => {
                    generation += 1;
                    is_loading = true;
                    start_load_image(path.to_string_lossy().into_owned(), generation, tx.clone());
                }

                _ => {}
            },

            Event::RedrawRequested(window_id) if window_id == window.id() => {
                if !engine.frame() {
                    engine.target_mut().redraw();
                }
            }

            Event::MainEventsCleared => {
                while let Ok(done) = rx.try_recv() {
                    if done.generation != generation {
                        log::debug!("dropping superseded load of {}", done.origin);
                        continue;
                    }
                    is_loading = false;
                    // 失败时引擎保留上一张图，错误已经由 on_error 记录
                    let _ = engine.complete_load(&done.origin, done.result);
                }
            }

            _ => {}
        }
    });
}

fn arrow_key(code: VirtualKeyCode) -> Option<Key> {
    match code {
        VirtualKeyCode::Left => Some(Key::ArrowLeft),
        VirtualKeyCode::Right => Some(Key::ArrowRight),
        VirtualKeyCode::Up => Some(Key::ArrowUp),
        VirtualKeyCode::Down => Some(Key::ArrowDown),
        _ => None,
    }
}

fn start_load_image(origin: String, generation: u64, tx: Sender<LoadDone>) {
    thread::spawn(move || {
        log::info!("loading {origin} in background");
        let result = FileImageProvider.fetch(&origin);
        if let Ok(img) = &result {
            let (w, h) = img.dimensions();
            log::debug!("decoded {w}x{h}");
        }
        if tx.send(LoadDone { generation, origin, result }).is_err() {
            log::error!("viewer closed before the image finished loading");
        }
    });
}
