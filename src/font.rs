// font.rs — 标签标题字体：运行时搜索系统字体，首次使用时加载并缓存
//
// 搜索顺序：系统字体目录 -> exe 同目录 assets/ -> 工作目录 assets/。
// ab_glyph 对 .ttc 支持不稳定，候选里优先 .ttf/.otf；解析失败的文件会被跳过。

use ab_glyph::{point, Font, FontArc, ScaleFont};
use glam::DVec2;
use image::RgbaImage;
use once_cell::sync::OnceCell;
use std::path::PathBuf;

static TITLE_FONT: OnceCell<Option<FontArc>> = OnceCell::new();

/// The shared title font, discovered on first call. `None` when nothing usable exists.
pub fn title_font() -> Option<&'static FontArc> {
    TITLE_FONT
        .get_or_init(|| {
            let found = candidates().into_iter().find_map(|path| {
                let bytes = std::fs::read(&path).ok()?;
                let font = FontArc::try_from_vec(bytes).ok()?;
                Some((path, font))
            });
            match found {
                Some((path, font)) => {
                    log::info!("label font: {}", path.display());
                    Some(font)
                }
                None => {
                    log::warn!("no usable font found, label titles will not be drawn");
                    None
                }
            }
        })
        .as_ref()
}

fn candidates() -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();

    if cfg!(windows) {
        let win_fonts = PathBuf::from(r"C:\Windows\Fonts");
        for f in ["segoeui.ttf", "arial.ttf", "msyh.ttf", "simhei.ttf", "malgun.ttf", "meiryo.ttc"] {
            out.push(win_fonts.join(f));
        }
    } else if cfg!(target_os = "macos") {
        for p in [
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "/System/Library/Fonts/Helvetica.ttc",
            "/System/Library/Fonts/PingFang.ttc",
            "/Library/Fonts/Arial Unicode.ttf",
        ] {
            out.push(PathBuf::from(p));
        }
    } else {
        for p in [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
            "/usr/share/fonts/noto/NotoSans-Regular.ttf",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        ] {
            out.push(PathBuf::from(p));
        }
        if let Ok(home) = std::env::var("HOME") {
            let home = PathBuf::from(home);
            for p in [".local/share/fonts/NotoSans-Regular.ttf", ".fonts/NotoSans-Regular.ttf"] {
                out.push(home.join(p));
            }
        }
    }

    let asset_files = ["NotoSans-Regular.ttf", "NotoSans-Regular.otf", "NotoSansCJK-Regular.ttc"];
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            for f in asset_files {
                out.push(dir.join("assets").join(f));
            }
        }
    }
    for f in asset_files {
        out.push(PathBuf::from("assets").join(f));
    }
    out
}

/// Width of `text` laid out on one line at `px` size.
pub fn text_width(font: &FontArc, text: &str, px: f32) -> f32 {
    let scaled = font.as_scaled(px);
    let mut width = 0.0;
    let mut last = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        last = Some(id);
    }
    width
}

/// Draw one line of text centered on `center`, alpha-blended, clipped to
/// `clip_min..clip_max` and the frame.
#[allow(clippy::too_many_arguments)]
pub fn draw_text_centered(
    frame: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    px: f32,
    center: DVec2,
    color: [u8; 3],
    clip_min: DVec2,
    clip_max: DVec2,
) {
    let scaled = font.as_scaled(px);
    let width = text_width(font, text, px);
    // 基线：让 ascent..descent 的中线落在 center.y
    let baseline = center.y as f32 + (scaled.ascent() + scaled.descent()) / 2.0;
    let mut cursor = center.x as f32 - width / 2.0;

    let (fw, fh) = frame.dimensions();
    let x0 = clip_min.x.max(0.0);
    let y0 = clip_min.y.max(0.0);
    let x1 = clip_max.x.min(fw as f64);
    let y1 = clip_max.y.min(fh as f64);

    let mut last = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(px, point(cursor, baseline));
        cursor += scaled.h_advance(id);
        last = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as f64 + gx as f64;
            let y = bounds.min.y as f64 + gy as f64;
            if x < x0 || y < y0 || x >= x1 || y >= y1 {
                return;
            }
            let pixel = frame.get_pixel_mut(x as u32, y as u32);
            blend(&mut pixel.0, color, coverage.clamp(0.0, 1.0));
        });
    }
}

/// Source-over blend of an RGB color at `alpha` into an opaque pixel.
pub fn blend(dst: &mut [u8; 4], color: [u8; 3], alpha: f32) {
    for c in 0..3 {
        let mixed = color[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha);
        dst[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = 255;
}
