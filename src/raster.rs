// raster.rs — CPU 重采样：逐像素反查原图，最近邻取样
//
// 水平方向环绕（全景接缝连续），垂直方向夹取（极点不环绕）。
// 每行只读相机参数和原图快照，行与行之间互不依赖，按行并行。

use crate::mapper::CoordinateMapper;
use image::RgbaImage;
use rayon::prelude::*;

/// Nearest-neighbor sample at a continuous source coordinate.
///
/// `x` wraps modulo the image width, `y` clamps to `[0, height - 1]`.
/// The returned pixel is always fully opaque.
pub fn sample_wrapped(src: &RgbaImage, x: f64, y: f64) -> [u8; 4] {
    let (w, h) = src.dimensions();
    let pixels: &[[u8; 4]] = bytemuck::cast_slice(src.as_raw());
    pixels[source_index(w, h, x, y)].with_opaque_alpha()
}

/// Resample the whole destination buffer from `src` through `mapper`.
pub fn rasterize(mapper: &CoordinateMapper, src: &RgbaImage, dst: &mut RgbaImage) {
    let (src_w, src_h) = src.dimensions();
    let (dst_w, dst_h) = dst.dimensions();
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return;
    }

    let dst_pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut **dst);

    dst_pixels
        .par_chunks_mut(dst_w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let sample = mapper.project_to_source(x as f64, y as f64);
                *out = sample_wrapped(src, sample.x, sample.y);
            }
        });

    log::debug!("rasterized {dst_w}x{dst_h} from {src_w}x{src_h}");
}

fn source_index(w: u32, h: u32, x: f64, y: f64) -> usize {
    // floor 后再环绕 / 夹取；NaN 经 `as` 转成 0
    let sx = (x.floor() as i64).rem_euclid(w as i64);
    let sy = (y.floor() as i64).clamp(0, h as i64 - 1);
    sy as usize * w as usize + sx as usize
}

trait OpaqueAlpha {
    fn with_opaque_alpha(self) -> Self;
}

impl OpaqueAlpha for [u8; 4] {
    fn with_opaque_alpha(self) -> Self {
        [self[0], self[1], self[2], 255]
    }
}
