// mapper.rs — 视口像素 <-> 等矩形原图像素 的双向映射

use crate::projection::ProjectionType;
use glam::DVec2;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Normalized coordinates beyond this magnitude are treated as not visible.
pub const ANGULAR_OVERSCAN: f64 = 1.2;

/// Projected pixels further than this outside the viewport are treated as not visible.
pub const PIXEL_OVERSCAN: f64 = 100.0;

/// Camera and surface parameters for one frame of mapping.
///
/// Angles are taken in degrees and converted once; all per-pixel math runs in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    viewport_w: f64,
    viewport_h: f64,
    image_w: f64,
    image_h: f64,
    yaw: f64,
    pitch: f64,
    zoom: f64,
    fov: f64,
    aspect_ratio: f64,
    projection: ProjectionType,
}

impl CoordinateMapper {
    pub fn new(
        viewport: (u32, u32),
        image: (u32, u32),
        yaw_deg: f64,
        pitch_deg: f64,
        zoom: f64,
        fov_deg: f64,
        projection: ProjectionType,
    ) -> Self {
        let viewport_w = viewport.0 as f64;
        let viewport_h = viewport.1 as f64;
        Self {
            viewport_w,
            viewport_h,
            image_w: image.0 as f64,
            image_h: image.1 as f64,
            yaw: yaw_deg.to_radians(),
            pitch: pitch_deg.to_radians(),
            zoom,
            fov: fov_deg.to_radians(),
            aspect_ratio: viewport_w / viewport_h,
            projection,
        }
    }

    /// Viewport pixel -> continuous source-image sample coordinate.
    pub fn project_to_source(&self, x: f64, y: f64) -> DVec2 {
        let nx = (2.0 * x / self.viewport_w - 1.0) / self.zoom;
        let ny = (2.0 * y / self.viewport_h - 1.0) / self.zoom;

        let (theta, phi) = self.projection.viewport_to_angles(nx, ny, self.fov, self.aspect_ratio);

        let lon = wrap_pi(theta + self.yaw);
        // 极点是硬边界，不做环绕
        let lat = (phi + self.pitch).clamp(-FRAC_PI_2, FRAC_PI_2);

        DVec2::new(
            (lon + PI) / TAU * self.image_w,
            (lat + FRAC_PI_2) / PI * self.image_h,
        )
    }

    /// Source-image pixel -> viewport pixel, or `None` when the point is not visible.
    ///
    /// Two gates apply: the normalized coordinate may overshoot the viewport by
    /// [`ANGULAR_OVERSCAN`], and the final pixel may lie at most [`PIXEL_OVERSCAN`]
    /// pixels outside the viewport rectangle.
    pub fn project_to_viewport(&self, src: DVec2) -> Option<DVec2> {
        let lon = src.x / self.image_w * TAU - PI;
        let lat = src.y / self.image_h * PI - FRAC_PI_2;

        let theta = wrap_pi(lon - self.yaw);
        let phi = lat - self.pitch;

        let (nx, ny) = self.projection.angles_to_viewport(theta, phi, self.fov, self.aspect_ratio);
        if !(nx.abs() <= ANGULAR_OVERSCAN && ny.abs() <= ANGULAR_OVERSCAN) {
            return None;
        }

        let px = (nx * self.zoom + 1.0) / 2.0 * self.viewport_w;
        let py = (ny * self.zoom + 1.0) / 2.0 * self.viewport_h;

        let outside = px < -PIXEL_OVERSCAN
            || py < -PIXEL_OVERSCAN
            || px > self.viewport_w + PIXEL_OVERSCAN
            || py > self.viewport_h + PIXEL_OVERSCAN;
        if outside {
            return None;
        }
        Some(DVec2::new(px, py))
    }
}

/// Bring an angle into `[-π, π]` by whole turns.
pub fn wrap_pi(mut angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    while angle > PI {
        angle -= TAU;
    }
    while angle < -PI {
        angle += TAU;
    }
    angle
}
