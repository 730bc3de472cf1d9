// config.rs — 渲染器配置：默认值、JSON 读取、构造时一次性校正

use crate::camera::{clamp_pitch, normalize_yaw};
use crate::error::EngineError;
use crate::projection::ProjectionType;
use serde::{Deserialize, Serialize};
use std::path::Path;

// tan(fov/2) 在 180° 处是奇点，与窗口版一样夹到 179.9°
pub const MIN_FOV_DEG: f64 = 1.0;
pub const MAX_FOV_DEG: f64 = 179.9;

const MIN_ZOOM_FLOOR: f64 = 0.01;

/// Renderer settings. Immutable once an engine has been built from it.
///
/// Every field has a default, so partial JSON objects deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererConfig {
    pub initial_yaw: f64,
    pub initial_pitch: f64,
    pub initial_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Horizontal field of view in degrees.
    pub field_of_view: f64,
    pub enable_keyboard: bool,
    /// Drag rotation in degrees per pixel before the projection falloff.
    pub sensitivity: f64,
    pub projection_type: ProjectionType,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            initial_yaw: 0.0,
            initial_pitch: 0.0,
            initial_zoom: 1.0,
            min_zoom: 0.5,
            max_zoom: 3.0,
            field_of_view: 90.0,
            enable_keyboard: true,
            sensitivity: 0.3,
            projection_type: ProjectionType::Stereographic,
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text).map_err(|e| EngineError::Configuration(format!("invalid config: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Configuration(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Bring every field into a usable range. Applied once at engine construction.
    pub fn sanitized(mut self) -> Self {
        let defaults = RendererConfig::default();

        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        let mut min_zoom = finite_or(self.min_zoom, defaults.min_zoom).max(MIN_ZOOM_FLOOR);
        let mut max_zoom = finite_or(self.max_zoom, defaults.max_zoom).max(MIN_ZOOM_FLOOR);
        if min_zoom > max_zoom {
            std::mem::swap(&mut min_zoom, &mut max_zoom);
        }
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;

        self.initial_zoom = finite_or(self.initial_zoom, defaults.initial_zoom).clamp(min_zoom, max_zoom);
        self.initial_yaw = normalize_yaw(finite_or(self.initial_yaw, 0.0));
        self.initial_pitch = clamp_pitch(finite_or(self.initial_pitch, 0.0));
        self.field_of_view = finite_or(self.field_of_view, defaults.field_of_view).clamp(MIN_FOV_DEG, MAX_FOV_DEG);
        self.sensitivity = finite_or(self.sensitivity, defaults.sensitivity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RendererConfig::from_json_str(r#"{ "fieldOfView": 120, "projectionType": "equisolid" }"#).unwrap();
        assert_eq!(config.field_of_view, 120.0);
        assert_eq!(config.projection_type, ProjectionType::Equisolid);
        assert_eq!(config.min_zoom, 0.5);
        assert!(config.enable_keyboard);
    }

    #[test]
    fn unknown_projection_name_is_stereographic() {
        let config = RendererConfig::from_json_str(r#"{ "projectionType": "cylindrical" }"#).unwrap();
        assert_eq!(config.projection_type, ProjectionType::Stereographic);
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = RendererConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn sanitize_orders_bounds_and_clamps_initial_view() {
        let config = RendererConfig {
            min_zoom: 4.0,
            max_zoom: 2.0,
            initial_zoom: 10.0,
            initial_yaw: 200.0,
            initial_pitch: -95.0,
            field_of_view: 180.0,
            ..RendererConfig::default()
        }
        .sanitized();
        assert_eq!((config.min_zoom, config.max_zoom), (2.0, 4.0));
        assert_eq!(config.initial_zoom, 4.0);
        assert_eq!(config.initial_yaw, -160.0);
        assert_eq!(config.initial_pitch, -90.0);
        assert_eq!(config.field_of_view, MAX_FOV_DEG);
    }
}
