//! Luminance-preserving garment recoloring.
//!
//! The garment artwork is a neutral-toned raster with alpha. Recoloring
//! multiplies every opaque pixel by the target color, so shading survives and
//! one asset serves every fabric color.

use egui::Color32;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// A multiply blend against a single color. Alpha is never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecolorFilter {
    pub color: Color32,
}

impl RecolorFilter {
    pub fn new(color: Color32) -> Self {
        Self { color }
    }

    /// Produces a recolored copy of `base`. `base` itself is left untouched,
    /// so applying a filter always starts from the original artwork.
    pub fn apply(&self, base: &RgbaImage) -> RgbaImage {
        let [tr, tg, tb, _] = self.color.to_srgba_unmultiplied();
        let mut out = base.clone();
        for pixel in out.pixels_mut() {
            let Rgba([r, g, b, a]) = *pixel;
            if a == 0 {
                continue;
            }
            *pixel = Rgba([multiply(r, tr), multiply(g, tg), multiply(b, tb), a]);
        }
        out
    }
}

/// `base * target / 255`, rounded to nearest.
fn multiply(base: u8, target: u8) -> u8 {
    ((u16::from(base) * u16::from(target) + 127) / 255) as u8
}
