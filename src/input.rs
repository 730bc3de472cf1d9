// input.rs — 归一化输入事件；平台事件在边界处转换成这里的形状

/// Keys the view controller reacts to. Everything else is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Other(String),
}

impl Key {
    /// Parse a DOM-style key identifier (`"ArrowLeft"`, ...).
    pub fn from_name(name: &str) -> Self {
        match name {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            other => Key::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }
}

/// One input event in viewport pixel coordinates.
///
/// Each variant carries only the fields relevant to it.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    PointerLeave,
    /// Browser convention: positive `delta_y` scrolls down (zooms out).
    Wheel { delta_y: f64 },
    TouchStart { touches: Vec<TouchPoint> },
    TouchMove { touches: Vec<TouchPoint> },
    TouchEnd,
    KeyDown { key: Key },
}

impl InputEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InputEvent::PointerDown { .. } => "pointer-down",
            InputEvent::PointerMove { .. } => "pointer-move",
            InputEvent::PointerUp => "pointer-up",
            InputEvent::PointerLeave => "pointer-leave",
            InputEvent::Wheel { .. } => "wheel",
            InputEvent::TouchStart { .. } => "touch-start",
            InputEvent::TouchMove { .. } => "touch-move",
            InputEvent::TouchEnd => "touch-end",
            InputEvent::KeyDown { .. } => "key-down",
        }
    }

    pub fn key_down(name: &str) -> Self {
        InputEvent::KeyDown {
            key: Key::from_name(name),
        }
    }
}
