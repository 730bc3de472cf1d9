// lib.rs — 全景镜头渲染引擎
//
// 数据流：输入事件 -> camera 状态机 -> 标记脏帧 -> raster 经 mapper 重采样原图
//        -> labels 叠加标注 -> 呈现到 RenderTarget

pub mod camera;
pub mod config;
pub mod error;
pub mod font;
pub mod input;
pub mod labels;
pub mod mapper;
pub mod panorama;
pub mod projection;
pub mod raster;
pub mod source;
pub mod target;

pub use camera::{CameraPatch, CameraState};
pub use config::RendererConfig;
pub use error::{EngineError, ErrorKind};
pub use input::{InputEvent, Key, TouchPoint};
pub use labels::{Label, LabelDraw};
pub use mapper::CoordinateMapper;
pub use panorama::PanoramaEngine;
pub use projection::ProjectionType;
pub use source::{FileImageProvider, ImageProvider, SourceImage};
pub use target::{ImageTarget, RenderTarget};
