use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use ab_glyph::{Font, FontArc, GlyphId, InvalidFont, PxScale, ScaleFont, point};
use egui::Vec2;
use image::{Rgba, RgbaImage};

use crate::scene::object::{FontWeight, TextLayer};

/// Font faces available to text layers, keyed by family name.
///
/// Families that were never registered fall back to egui's default
/// proportional face so a design authored with an unavailable font still
/// renders.
#[derive(Clone, Default)]
pub struct FontBook {
    families: HashMap<String, FontArc>,
    fallback: Option<FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families.keys().collect::<Vec<_>>())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl FontBook {
    /// A book with no faces at all. Text measures and renders as empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A book whose fallback is the first proportional face bundled with egui.
    pub fn with_default_fonts() -> Self {
        let definitions = egui::FontDefinitions::default();
        let fallback = definitions
            .families
            .get(&egui::FontFamily::Proportional)
            .and_then(|names| names.first())
            .and_then(|name| definitions.font_data.get(name))
            .and_then(|data| match FontArc::try_from_vec(data.font.to_vec()) {
                Ok(font) => Some(font),
                Err(err) => {
                    log::error!("Bundled default font is unusable: {err}");
                    None
                }
            });

        Self {
            families: HashMap::new(),
            fallback,
        }
    }

    /// Process-wide default book, built once.
    pub fn shared() -> Arc<FontBook> {
        static SHARED: OnceLock<Arc<FontBook>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(Self::with_default_fonts()))
            .clone()
    }

    pub fn register(
        &mut self,
        family: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), InvalidFont> {
        let font = FontArc::try_from_vec(bytes)?;
        self.families.insert(family.into(), font);
        Ok(())
    }

    pub fn resolve(&self, family: &str) -> Option<&FontArc> {
        self.families.get(family).or(self.fallback.as_ref())
    }

    /// Size of the laid out text in logical units.
    pub fn measure(&self, layer: &TextLayer) -> Vec2 {
        match self.resolve(&layer.font_family) {
            Some(font) => layout(font, layer, 1.0).size,
            None => Vec2::ZERO,
        }
    }

    /// Renders the text at `pixel_ratio` device pixels per logical unit.
    ///
    /// The result covers [`FontBook::measure`] scaled by `pixel_ratio`.
    pub fn rasterize(&self, layer: &TextLayer, pixel_ratio: f32) -> RgbaImage {
        let Some(font) = self.resolve(&layer.font_family) else {
            log::warn!("No font available for family {:?}", layer.font_family);
            return RgbaImage::new(1, 1);
        };

        let laid_out = layout(font, layer, pixel_ratio);
        let width = laid_out.size.x.ceil().max(1.0) as u32;
        let height = laid_out.size.y.ceil().max(1.0) as u32;
        let mut coverage = vec![0.0f32; (width * height) as usize];

        let passes: &[f32] = match layer.weight {
            FontWeight::Normal => &[0.0],
            FontWeight::Bold => &[0.0, laid_out.embolden],
        };

        for glyph in &laid_out.glyphs {
            let Some(outlined) = font.outline_glyph(glyph.clone()) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            for offset in passes {
                outlined.draw(|x, y, c| {
                    let px = (bounds.min.x + offset) as i32 + x as i32;
                    let py = bounds.min.y as i32 + y as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        return;
                    }
                    let cell = &mut coverage[(py as u32 * width + px as u32) as usize];
                    *cell = (*cell + c).min(1.0);
                });
            }
        }

        let [r, g, b, a] = layer.fill.to_srgba_unmultiplied();
        RgbaImage::from_fn(width, height, |x, y| {
            let c = coverage[(y * width + x) as usize];
            Rgba([r, g, b, (c * f32::from(a)).round() as u8])
        })
    }
}

struct Layout {
    glyphs: Vec<ab_glyph::Glyph>,
    size: Vec2,
    /// Horizontal offset of the second pass for synthetic bold
    embolden: f32,
}

fn layout(font: &FontArc, layer: &TextLayer, pixel_ratio: f32) -> Layout {
    let px = (layer.font_size * pixel_ratio).max(1.0);
    let scale = PxScale::from(px);
    let scaled = font.as_scaled(scale);
    let line_height = scaled.height() + scaled.line_gap();
    let embolden = match layer.weight {
        FontWeight::Normal => 0.0,
        FontWeight::Bold => (px / 24.0).max(1.0),
    };

    let mut glyphs = Vec::new();
    let mut widest = 0.0f32;
    let mut lines = 0;
    for (line_index, line) in layer.content.split('\n').enumerate() {
        lines += 1;
        let baseline = scaled.ascent() + line_index as f32 * line_height;
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;
        for ch in line.chars().filter(|c| !c.is_control()) {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(caret, baseline)));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
        widest = widest.max(caret);
    }

    let height = scaled.height() + (lines.max(1) - 1) as f32 * line_height;
    let width = if widest > 0.0 { widest + embolden } else { 0.0 };
    Layout {
        glyphs,
        size: Vec2::new(width, height) / pixel_ratio,
        embolden,
    }
}
