// camera.rs — 相机状态机：yaw / pitch / zoom 与拖拽状态

use crate::config::RendererConfig;
use crate::input::{InputEvent, Key, TouchPoint};
use crate::projection::ProjectionType;
use glam::DVec2;
use serde::{Deserialize, Serialize};

pub const PITCH_LIMIT: f64 = 90.0;
pub const KEY_STEP_DEG: f64 = 5.0;
pub const WHEEL_ZOOM_STEP: f64 = 0.1;

/// Read-only snapshot of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    /// Degrees in `[-180, 180)`.
    pub yaw: f64,
    /// Degrees in `[-90, 90]`.
    pub pitch: f64,
    pub zoom: f64,
    pub is_dragging: bool,
}

/// Partial programmatic update; `None` fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraPatch {
    pub yaw: Option<f64>,
    pub pitch: Option<f64>,
    pub zoom: Option<f64>,
}

/// Normalize a yaw angle in degrees into `[-180, 180)`.
pub fn normalize_yaw(yaw: f64) -> f64 {
    let wrapped = (yaw + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid 对极小负数可能返回 360.0
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

pub fn clamp_pitch(pitch: f64) -> f64 {
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}

/// Owns the camera and turns input events into state changes.
///
/// Every method that moves yaw, pitch or zoom reports it by returning `true`;
/// the caller turns that into a dirty frame.
#[derive(Debug, Clone)]
pub struct ViewController {
    state: CameraState,
    initial: CameraState,
    min_zoom: f64,
    max_zoom: f64,
    sensitivity: f64,
    enable_keyboard: bool,
    projection: ProjectionType,
    anchor: Option<DVec2>,
}

impl ViewController {
    /// Build from an already sanitized config.
    pub fn new(config: &RendererConfig) -> Self {
        let state = CameraState {
            yaw: normalize_yaw(config.initial_yaw),
            pitch: clamp_pitch(config.initial_pitch),
            zoom: config.initial_zoom.clamp(config.min_zoom, config.max_zoom),
            is_dragging: false,
        };
        Self {
            state,
            initial: state,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            sensitivity: config.sensitivity,
            enable_keyboard: config.enable_keyboard,
            projection: config.projection_type,
            anchor: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    /// Apply one input event. Returns whether yaw, pitch or zoom changed.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerDown { x, y } => {
                self.drag_start(DVec2::new(*x, *y));
                false
            }
            InputEvent::PointerMove { x, y } => self.drag_move(DVec2::new(*x, *y)),
            InputEvent::PointerUp | InputEvent::PointerLeave | InputEvent::TouchEnd => {
                self.drag_end();
                false
            }
            InputEvent::TouchStart { touches } => {
                if let Some(p) = first_touch(touches) {
                    self.drag_start(p);
                }
                false
            }
            InputEvent::TouchMove { touches } => match first_touch(touches) {
                Some(p) => self.drag_move(p),
                None => false,
            },
            InputEvent::Wheel { delta_y } => self.wheel(*delta_y),
            InputEvent::KeyDown { key } => self.key_down(key),
        }
    }

    /// Programmatic partial update. Non-finite fields are ignored.
    pub fn apply(&mut self, patch: CameraPatch) {
        if let Some(yaw) = patch.yaw.filter(|v| v.is_finite()) {
            self.state.yaw = normalize_yaw(yaw);
        }
        if let Some(pitch) = patch.pitch.filter(|v| v.is_finite()) {
            self.state.pitch = clamp_pitch(pitch);
        }
        if let Some(zoom) = patch.zoom.filter(|v| v.is_finite()) {
            self.state.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Back to the configured initial view; drag state is dropped.
    pub fn reset(&mut self) {
        self.state = self.initial;
        self.anchor = None;
    }

    fn drag_start(&mut self, at: DVec2) {
        self.anchor = Some(at);
        self.state.is_dragging = true;
    }

    fn drag_move(&mut self, at: DVec2) -> bool {
        if !self.state.is_dragging {
            return false;
        }
        let Some(anchor) = self.anchor.replace(at) else {
            return false;
        };
        let delta = at - anchor;
        if !delta.is_finite() || delta == DVec2::ZERO {
            return false;
        }

        // 灵敏度固定在视口中心 (0, 0) 处求值，不随光标位置变化
        let (vx, vy) = self.projection.drag_velocity(0.0, 0.0, self.sensitivity);
        self.state.yaw = normalize_yaw(self.state.yaw - delta.x * vx);
        self.state.pitch = clamp_pitch(self.state.pitch - delta.y * vy);
        true
    }

    fn drag_end(&mut self) {
        self.anchor = None;
        self.state.is_dragging = false;
    }

    fn wheel(&mut self, delta_y: f64) -> bool {
        if delta_y.is_nan() {
            return false;
        }
        let step = if delta_y > 0.0 { -WHEEL_ZOOM_STEP } else { WHEEL_ZOOM_STEP };
        let zoom = (self.state.zoom + step).clamp(self.min_zoom, self.max_zoom);
        let changed = zoom != self.state.zoom;
        self.state.zoom = zoom;
        changed
    }

    fn key_down(&mut self, key: &Key) -> bool {
        if !self.enable_keyboard {
            return false;
        }
        let before = self.state;
        match key {
            Key::ArrowLeft => self.state.yaw -= KEY_STEP_DEG,
            Key::ArrowRight => self.state.yaw += KEY_STEP_DEG,
            Key::ArrowUp => self.state.pitch = clamp_pitch(self.state.pitch + KEY_STEP_DEG),
            Key::ArrowDown => self.state.pitch = clamp_pitch(self.state.pitch - KEY_STEP_DEG),
            Key::Other(_) => return false,
        }
        self.state.yaw = normalize_yaw(self.state.yaw);
        self.state != before
    }
}

fn first_touch(touches: &[TouchPoint]) -> Option<DVec2> {
    touches.first().map(|t| DVec2::new(t.x, t.y))
}
