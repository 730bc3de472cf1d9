// projection.rs — 镜头投影模型：视口归一化坐标 <-> 相机相对角度 (theta, phi)

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Normalized viewport radius below which a point is treated as the optical center.
pub const DEGENERATE_RADIUS: f64 = 1e-4;

// 反向映射的中心判定：角度极小时直接回到 (0, 0)，避免 0/0
const DEGENERATE_ANGLE: f64 = 1e-12;

const OUT_OF_RANGE: (f64, f64) = (f64::INFINITY, f64::INFINITY);

/// Lens model used to warp camera-relative angles into the viewport.
///
/// The set is closed; every variant is a triple of pure functions
/// (forward angle, inverse radius, drag falloff) selected by `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ProjectionType {
    Rectilinear,   // 1. 标准透视 (直线保持直线)
    #[default]
    Stereographic, // 2. 立体投影 (小行星效果)
    Equidistant,   // 3. 等距鱼眼 (角度与半径线性)
    Equisolid,     // 4. 等立体角鱼眼 (保持面积)
}

impl ProjectionType {
    pub const ALL: [ProjectionType; 4] = [
        ProjectionType::Rectilinear,
        ProjectionType::Stereographic,
        ProjectionType::Equidistant,
        ProjectionType::Equisolid,
    ];

    /// Parse a projection identifier. Unknown identifiers fall back to Stereographic.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rectilinear" => ProjectionType::Rectilinear,
            "stereographic" => ProjectionType::Stereographic,
            "equidistant" => ProjectionType::Equidistant,
            "equisolid" => ProjectionType::Equisolid,
            other => {
                log::warn!("unknown projection {other:?}, using stereographic");
                ProjectionType::Stereographic
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProjectionType::Rectilinear => "rectilinear",
            ProjectionType::Stereographic => "stereographic",
            ProjectionType::Equidistant => "equidistant",
            ProjectionType::Equisolid => "equisolid",
        }
    }

    /// Map normalized viewport coordinates (`[-1, 1]`, before aspect correction) to
    /// camera-relative angles in radians. `fov` is the horizontal field of view in radians.
    pub fn viewport_to_angles(self, nx: f64, ny: f64, fov: f64, aspect_ratio: f64) -> (f64, f64) {
        if self == ProjectionType::Rectilinear {
            // 非径向：两轴分别计算
            let half = (fov / 2.0).tan();
            return ((nx * aspect_ratio * half).atan(), (ny * half).atan());
        }

        let ax = nx * aspect_ratio;
        let r = (ax * ax + ny * ny).sqrt();
        if r < DEGENERATE_RADIUS {
            return (0.0, 0.0);
        }

        let angle = self.radius_to_angle(r, fov, aspect_ratio);
        (angle * ax / r, angle * ny / r)
    }

    /// Inverse of [`ProjectionType::viewport_to_angles`].
    ///
    /// Angles the forward mapping can never produce (behind a rectilinear lens, at or
    /// past the antipode for stereographic / equisolid) come back as infinity.
    pub fn angles_to_viewport(self, theta: f64, phi: f64, fov: f64, aspect_ratio: f64) -> (f64, f64) {
        if self == ProjectionType::Rectilinear {
            if theta.abs() >= FRAC_PI_2 || phi.abs() >= FRAC_PI_2 {
                return OUT_OF_RANGE;
            }
            let half = (fov / 2.0).tan();
            return (theta.tan() / (aspect_ratio * half), phi.tan() / half);
        }

        let angle = (theta * theta + phi * phi).sqrt();
        if angle < DEGENERATE_ANGLE {
            return (0.0, 0.0);
        }
        let beyond = match self {
            ProjectionType::Stereographic => angle >= PI,
            ProjectionType::Equisolid => angle > PI,
            _ => false,
        };
        if beyond {
            return OUT_OF_RANGE;
        }

        let r = self.angle_to_radius(angle, fov, aspect_ratio);
        (r * theta / (angle * aspect_ratio), r * phi / angle)
    }

    /// Per-axis drag velocity (degrees per pixel) at normalized viewport position `(nx, ny)`.
    pub fn drag_velocity(self, nx: f64, ny: f64, base_sensitivity: f64) -> (f64, f64) {
        let falloff = self.drag_falloff((nx * nx + ny * ny).sqrt());
        (base_sensitivity * falloff, base_sensitivity * falloff)
    }

    /// Sensitivity multiplier at normalized radius `r`.
    pub fn drag_falloff(self, r: f64) -> f64 {
        match self {
            ProjectionType::Rectilinear => 1.0,
            ProjectionType::Stereographic => (r * PI / 4.0).cos(),
            ProjectionType::Equidistant => (1.0 - 0.15 * r).max(0.5),
            ProjectionType::Equisolid => (1.0 - 0.2 * r).max(0.6),
        }
    }

    fn radius_to_angle(self, r: f64, fov: f64, aspect_ratio: f64) -> f64 {
        match self {
            ProjectionType::Rectilinear => (r * (fov / 2.0).tan()).atan(),
            ProjectionType::Stereographic => 2.0 * (r / (2.0 * (fov / 4.0).tan())).atan(),
            ProjectionType::Equidistant => r * (fov / 2.0) / max_radius(aspect_ratio),
            ProjectionType::Equisolid => 2.0 * (r / 2.0).min(1.0).asin(),
        }
    }

    fn angle_to_radius(self, angle: f64, fov: f64, aspect_ratio: f64) -> f64 {
        match self {
            ProjectionType::Rectilinear => angle.tan() / (fov / 2.0).tan(),
            ProjectionType::Stereographic => (angle / 2.0).tan() * 2.0 * (fov / 4.0).tan(),
            ProjectionType::Equidistant => angle * max_radius(aspect_ratio) / (fov / 2.0),
            ProjectionType::Equisolid => 2.0 * (angle / 2.0).sin(),
        }
    }
}

impl From<String> for ProjectionType {
    fn from(name: String) -> Self {
        ProjectionType::from_name(&name)
    }
}

impl std::fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// 视口角点的归一化半径
fn max_radius(aspect_ratio: f64) -> f64 {
    (aspect_ratio * aspect_ratio + 1.0).sqrt()
}
