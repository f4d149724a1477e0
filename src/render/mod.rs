//! Software compositor for the design scene.
//!
//! Each object is drawn by inverse-mapping every covered output pixel back
//! into the object's own raster, sampling bilinearly and blending
//! source-over onto the canvas.

pub mod preview;
pub mod text;

use image::{Rgba, RgbaImage};

use crate::scene::object::SceneObject;
use crate::scene::transform::transform_point;
use crate::scene::{RasterOptions, SceneGraph};
use text::FontBook;

/// Smallest multiplier accepted when rasterizing.
pub const MIN_SCALE_MULTIPLIER: f32 = 0.05;

pub fn composite(scene: &SceneGraph, options: RasterOptions) -> RgbaImage {
    let multiplier = options.scale_multiplier.max(MIN_SCALE_MULTIPLIER);
    let viewport = scene.viewport();
    let side = (viewport.size * multiplier).round().max(1.0) as u32;

    let background = match viewport.background {
        Some(color) => Rgba(color.to_srgba_unmultiplied()),
        None => Rgba([0, 0, 0, 0]),
    };
    let mut canvas = RgbaImage::from_pixel(side, side, background);

    for object in scene.objects() {
        draw_object(&mut canvas, object, scene.fonts(), multiplier);
    }
    canvas
}

fn draw_object(canvas: &mut RgbaImage, object: &SceneObject, fonts: &FontBook, multiplier: f32) {
    let size = object.kind().local_size(fonts);
    if size.x <= 0.0 || size.y <= 0.0 {
        return;
    }
    let Some(inverse) = object.transform().inverse_matrix() else {
        return;
    };
    let source = object.kind().rasterize(fonts, multiplier);
    let source = source.as_ref();

    // Device-space bounding box of the transformed object
    let corners = object.corners(fonts);
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for corner in corners {
        min_x = min_x.min(corner.x * multiplier);
        min_y = min_y.min(corner.y * multiplier);
        max_x = max_x.max(corner.x * multiplier);
        max_y = max_y.max(corner.y * multiplier);
    }
    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().max(0.0) as u32).min(canvas.width());
    let y1 = (max_y.ceil().max(0.0) as u32).min(canvas.height());

    let half = size / 2.0;
    let to_source_x = source.width() as f32 / size.x;
    let to_source_y = source.height() as f32 / size.y;

    for py in y0..y1 {
        for px in x0..x1 {
            let logical = egui::Pos2::new(
                (px as f32 + 0.5) / multiplier,
                (py as f32 + 0.5) / multiplier,
            );
            let local = transform_point(&inverse, logical);
            if local.x.abs() > half.x || local.y.abs() > half.y {
                continue;
            }
            let u = (local.x + half.x) * to_source_x - 0.5;
            let v = (local.y + half.y) * to_source_y - 0.5;
            let sample = sample_bilinear(source, u, v);
            if sample[3] <= 0.0 {
                continue;
            }
            blend_over(canvas.get_pixel_mut(px, py), sample);
        }
    }
}

/// Premultiplied RGBA fetch, transparent outside the raster.
fn fetch(source: &RgbaImage, x: i64, y: i64) -> [f32; 4] {
    if x < 0 || y < 0 || x >= i64::from(source.width()) || y >= i64::from(source.height()) {
        return [0.0; 4];
    }
    let Rgba([r, g, b, a]) = *source.get_pixel(x as u32, y as u32);
    let alpha = f32::from(a) / 255.0;
    [f32::from(r) * alpha, f32::from(g) * alpha, f32::from(b) * alpha, f32::from(a)]
}

/// Bilinear sample at continuous pixel coordinates, premultiplied.
fn sample_bilinear(source: &RgbaImage, u: f32, v: f32) -> [f32; 4] {
    let x = u.floor();
    let y = v.floor();
    let fx = u - x;
    let fy = v - y;
    let (x, y) = (x as i64, y as i64);

    let top_left = fetch(source, x, y);
    let top_right = fetch(source, x + 1, y);
    let bottom_left = fetch(source, x, y + 1);
    let bottom_right = fetch(source, x + 1, y + 1);

    let mut out = [0.0; 4];
    for channel in 0..4 {
        let top = top_left[channel] + (top_right[channel] - top_left[channel]) * fx;
        let bottom = bottom_left[channel] + (bottom_right[channel] - bottom_left[channel]) * fx;
        out[channel] = top + (bottom - top) * fy;
    }
    out
}

/// Source-over onto an unmultiplied destination pixel.
fn blend_over(dst: &mut Rgba<u8>, src: [f32; 4]) {
    let src_alpha = (src[3] / 255.0).clamp(0.0, 1.0);
    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }

    let mut out = [0u8; 4];
    for channel in 0..3 {
        let premultiplied = src[channel] + f32::from(dst[channel]) * dst_alpha * (1.0 - src_alpha);
        out[channel] = (premultiplied / out_alpha).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    *dst = Rgba(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_source_replaces_destination() {
        let mut dst = Rgba([255, 255, 255, 255]);
        blend_over(&mut dst, [128.0, 0.0, 0.0, 255.0]);
        assert_eq!(dst, Rgba([128, 0, 0, 255]));
    }

    #[test]
    fn half_transparent_source_mixes() {
        let mut dst = Rgba([0, 0, 0, 255]);
        // 50% white, premultiplied
        blend_over(&mut dst, [127.5, 127.5, 127.5, 127.5]);
        assert_eq!(dst, Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn bilinear_inside_uniform_raster_is_exact() {
        let source = RgbaImage::from_pixel(4, 4, Rgba([90, 60, 30, 255]));
        assert_eq!(sample_bilinear(&source, 1.3, 2.7), [90.0, 60.0, 30.0, 255.0]);
    }
}
