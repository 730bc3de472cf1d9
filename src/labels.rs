// labels.rs — 标注框：原图坐标四角反投影到视口，取可见角点包围盒后绘制

use crate::font;
use crate::mapper::CoordinateMapper;
use ab_glyph::FontArc;
use glam::DVec2;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const FILL_COLOR: [u8; 3] = [0, 120, 255];
pub const FILL_ALPHA: f32 = 0.25;
pub const BORDER_COLOR: [u8; 3] = [0, 120, 255];
pub const BORDER_ALPHA: f32 = 0.9;
pub const BORDER_WIDTH: f64 = 2.0;
pub const TITLE_COLOR: [u8; 3] = [255, 255, 255];
pub const TITLE_PX: f32 = 14.0;

// 包围盒小于此尺寸时只画框，不画标题
pub const TITLE_MIN_WIDTH: f64 = 50.0;
pub const TITLE_MIN_HEIGHT: f64 = 20.0;

/// Rectangular annotation in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Label {
    pub fn new(id: impl Into<String>, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            w,
            h,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn corners(&self) -> [DVec2; 4] {
        [
            DVec2::new(self.x, self.y),
            DVec2::new(self.x + self.w, self.y),
            DVec2::new(self.x, self.y + self.h),
            DVec2::new(self.x + self.w, self.y + self.h),
        ]
    }
}

/// Drop labels whose id repeats an earlier one.
pub fn dedup_labels(labels: Vec<Label>) -> Vec<Label> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .filter(|label| {
            let fresh = seen.insert(label.id.clone());
            if !fresh {
                log::warn!("duplicate label id {:?} ignored", label.id);
            }
            fresh
        })
        .collect()
}

/// One label placed in viewport space.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDraw {
    pub id: String,
    pub min: DVec2,
    pub max: DVec2,
    /// Present only when the box is large enough to carry text.
    pub title: Option<String>,
}

impl LabelDraw {
    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }
}

/// Place every label that has at least one visible corner. List order is kept.
pub fn project_labels(mapper: &CoordinateMapper, labels: &[Label]) -> Vec<LabelDraw> {
    labels
        .iter()
        .filter_map(|label| {
            let visible: Vec<DVec2> = label
                .corners()
                .into_iter()
                .filter_map(|corner| mapper.project_to_viewport(corner))
                .collect();
            if visible.is_empty() {
                return None;
            }

            let min = visible.iter().copied().fold(DVec2::splat(f64::INFINITY), DVec2::min);
            let max = visible.iter().copied().fold(DVec2::splat(f64::NEG_INFINITY), DVec2::max);
            let size = max - min;
            let title = label
                .title
                .clone()
                .filter(|_| size.x >= TITLE_MIN_WIDTH && size.y >= TITLE_MIN_HEIGHT);

            Some(LabelDraw {
                id: label.id.clone(),
                min,
                max,
                title,
            })
        })
        .collect()
}

/// Paint fills, borders and titles on top of a rasterized frame.
pub fn paint_labels(frame: &mut RgbaImage, draws: &[LabelDraw], font: Option<&FontArc>) {
    let (fw, fh) = frame.dimensions();
    let bounds = DVec2::new(fw as f64, fh as f64);

    for draw in draws {
        let min = draw.min.max(DVec2::ZERO);
        let max = draw.max.min(bounds);
        if min.x >= max.x || min.y >= max.y {
            continue;
        }

        let (x0, y0) = (min.x.floor() as u32, min.y.floor() as u32);
        let (x1, y1) = (max.x.ceil() as u32, max.y.ceil() as u32);
        for y in y0..y1.min(fh) {
            for x in x0..x1.min(fw) {
                let p = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);
                let on_border = p.x - draw.min.x < BORDER_WIDTH
                    || draw.max.x - p.x < BORDER_WIDTH
                    || p.y - draw.min.y < BORDER_WIDTH
                    || draw.max.y - p.y < BORDER_WIDTH;
                let pixel = frame.get_pixel_mut(x, y);
                if on_border {
                    font::blend(&mut pixel.0, BORDER_COLOR, BORDER_ALPHA);
                } else {
                    font::blend(&mut pixel.0, FILL_COLOR, FILL_ALPHA);
                }
            }
        }

        if let (Some(title), Some(font)) = (draw.title.as_deref(), font) {
            let center = (draw.min + draw.max) / 2.0;
            font::draw_text_centered(frame, font, title, TITLE_PX, center, TITLE_COLOR, draw.min, draw.max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionType;
    use image::Rgba;

    fn mapper() -> CoordinateMapper {
        // 4096x2048 原图，视线朝向原图中心 (2048, 1024)
        CoordinateMapper::new((800, 600), (4096, 2048), 0.0, 0.0, 1.0, 90.0, ProjectionType::Rectilinear)
    }

    #[test]
    fn label_in_front_of_camera_is_placed() {
        let labels = vec![Label::new("a", 1948.0, 974.0, 200.0, 100.0).with_title("Door")];
        let draws = project_labels(&mapper(), &labels);
        assert_eq!(draws.len(), 1);
        let d = &draws[0];
        assert!(d.min.x < 400.0 && d.max.x > 400.0);
        assert!(d.min.y < 300.0 && d.max.y > 300.0);
        assert_eq!(d.title.as_deref(), Some("Door"));
    }

    #[test]
    fn label_behind_camera_is_skipped() {
        let labels = vec![
            Label::new("behind", 10.0, 1000.0, 40.0, 40.0),
            Label::new("front", 2040.0, 1020.0, 8.0, 8.0),
        ];
        let draws = project_labels(&mapper(), &labels);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].id, "front");
    }

    #[test]
    fn small_boxes_drop_their_title() {
        let labels = vec![Label::new("tiny", 2040.0, 1020.0, 8.0, 8.0).with_title("Hidden")];
        let draws = project_labels(&mapper(), &labels);
        assert!(draws[0].size().x < TITLE_MIN_WIDTH);
        assert_eq!(draws[0].title, None);
    }

    #[test]
    fn partially_visible_label_uses_visible_corner_bbox() {
        let m = mapper();
        // 右侧两个角点在相机背后，只剩左侧两角
        let labels = vec![Label::new("wide", 2048.0, 900.0, 1500.0, 200.0)];
        let draws = project_labels(&m, &labels);
        assert_eq!(draws.len(), 1);
        let left_top = m.project_to_viewport(DVec2::new(2048.0, 900.0)).unwrap();
        let left_bottom = m.project_to_viewport(DVec2::new(2048.0, 1100.0)).unwrap();
        assert_eq!(draws[0].min.x, left_top.x.min(left_bottom.x));
        assert_eq!(draws[0].max.x, left_top.x.max(left_bottom.x));
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let labels = dedup_labels(vec![
            Label::new("a", 0.0, 0.0, 1.0, 1.0),
            Label::new("b", 0.0, 0.0, 1.0, 1.0),
            Label::new("a", 5.0, 5.0, 1.0, 1.0),
        ]);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].x, 0.0);
    }

    #[test]
    fn paint_blends_fill_and_border_inside_frame() {
        let mut frame = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let draws = vec![LabelDraw {
            id: "x".into(),
            min: DVec2::new(10.0, 10.0),
            max: DVec2::new(60.0, 40.0),
            title: None,
        }];
        paint_labels(&mut frame, &draws, None);

        let mut border = [0, 0, 0, 255];
        font::blend(&mut border, BORDER_COLOR, BORDER_ALPHA);
        let mut fill = [0, 0, 0, 255];
        font::blend(&mut fill, FILL_COLOR, FILL_ALPHA);

        assert_eq!(frame.get_pixel(10, 20).0, border);
        assert_eq!(frame.get_pixel(30, 25).0, fill);
        assert_eq!(frame.get_pixel(5, 5).0, [0, 0, 0, 255]);
        assert_eq!(frame.get_pixel(70, 25).0, [0, 0, 0, 255]);
    }

    #[test]
    fn paint_clips_boxes_hanging_off_the_frame() {
        let mut frame = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 255]));
        let draws = vec![LabelDraw {
            id: "edge".into(),
            min: DVec2::new(-80.0, 30.0),
            max: DVec2::new(20.0, 130.0),
            title: Some("Edge".into()),
        }];
        paint_labels(&mut frame, &draws, font::title_font());
        assert_ne!(frame.get_pixel(0, 49).0, [0, 0, 0, 255]);
        assert_eq!(frame.get_pixel(30, 10).0, [0, 0, 0, 255]);
    }

    #[test]
    fn labels_parse_from_json() {
        let labels: Vec<Label> =
            serde_json::from_str(r#"[{"id":"p1","x":10,"y":20,"w":30,"h":40,"title":"Painting"},{"id":"p2","x":0,"y":0,"w":1,"h":1}]"#)
                .unwrap();
        assert_eq!(labels[0].title.as_deref(), Some("Painting"));
        assert_eq!(labels[1].title, None);
    }
}
