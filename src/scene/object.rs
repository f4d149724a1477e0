use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use egui::{Color32, Pos2, Vec2};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transform::{Transform, transform_point};
use crate::recolor::RecolorFilter;
use crate::render::text::FontBook;

/// Stable identifier of a scene object, unique within a scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the shopper is allowed to do with an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub selectable: bool,
    pub movable: bool,
    pub deletable: bool,
}

impl Capabilities {
    pub const LOCKED: Self = Self {
        selectable: false,
        movable: false,
        deletable: false,
    };

    pub const INTERACTIVE: Self = Self {
        selectable: true,
        movable: true,
        deletable: true,
    };
}

/// The recolorable garment mockup. Always at the back of the scene.
#[derive(Clone)]
pub struct GarmentLayer {
    source: String,
    base: Arc<RgbaImage>,
    filter: RecolorFilter,
    filtered: Arc<RgbaImage>,
}

impl fmt::Debug for GarmentLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GarmentLayer")
            .field("source", &self.source)
            .field("size", &self.base.dimensions())
            .field("filter", &self.filter)
            .finish()
    }
}

impl GarmentLayer {
    pub fn new(source: impl Into<String>, base: Arc<RgbaImage>, color: Color32) -> Self {
        let filter = RecolorFilter::new(color);
        let filtered = Arc::new(filter.apply(&base));
        Self {
            source: source.into(),
            base,
            filter,
            filtered,
        }
    }

    /// Swaps the active filter. The new filter is applied to the untouched
    /// base artwork, never on top of the previous result.
    pub fn set_color(&mut self, color: Color32) {
        if self.filter.color == color {
            return;
        }
        self.filter = RecolorFilter::new(color);
        self.filtered = Arc::new(self.filter.apply(&self.base));
    }

    pub fn color(&self) -> Color32 {
        self.filter.color
    }

    /// Reference the base artwork was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    /// The base artwork with the active filter applied
    pub fn raster(&self) -> &RgbaImage {
        &self.filtered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    pub content: String,
    pub font_family: String,
    /// Font size in logical units
    pub font_size: f32,
    pub weight: FontWeight,
    pub fill: Color32,
}

/// A user supplied bitmap.
#[derive(Clone, Serialize, Deserialize)]
pub struct ImageLayer {
    #[serde(with = "super::snapshot::png_payload")]
    raster: Arc<RgbaImage>,
}

impl fmt::Debug for ImageLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLayer")
            .field("size", &self.raster.dimensions())
            .finish()
    }
}

impl PartialEq for ImageLayer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.raster, &other.raster) || self.raster == other.raster
    }
}

impl ImageLayer {
    pub fn new(raster: RgbaImage) -> Self {
        Self {
            raster: Arc::new(raster),
        }
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }
}

/// Variant-specific payload of a scene object.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Garment(GarmentLayer),
    Text(TextLayer),
    Image(ImageLayer),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Garment(_) => "garment",
            ObjectKind::Text(_) => "text",
            ObjectKind::Image(_) => "image",
        }
    }

    /// Size in logical units before the object's transform is applied.
    pub fn local_size(&self, fonts: &FontBook) -> Vec2 {
        match self {
            ObjectKind::Garment(garment) => image_size(garment.raster()),
            ObjectKind::Text(text) => fonts.measure(text),
            ObjectKind::Image(image) => image_size(image.raster()),
        }
    }

    /// Pixels covering [`ObjectKind::local_size`].
    ///
    /// Bitmaps are returned as they are; text is rendered at `pixel_ratio`
    /// device pixels per logical unit so it stays sharp when oversampled.
    pub fn rasterize(&self, fonts: &FontBook, pixel_ratio: f32) -> Cow<'_, RgbaImage> {
        match self {
            ObjectKind::Garment(garment) => Cow::Borrowed(garment.raster()),
            ObjectKind::Text(text) => Cow::Owned(fonts.rasterize(text, pixel_ratio)),
            ObjectKind::Image(image) => Cow::Borrowed(image.raster()),
        }
    }
}

fn image_size(raster: &RgbaImage) -> Vec2 {
    Vec2::new(raster.width() as f32, raster.height() as f32)
}

/// Anything placed on the design canvas.
#[derive(Debug, Clone)]
pub struct SceneObject {
    id: ObjectId,
    pub(crate) transform: Transform,
    pub(crate) z_order: u32,
    capabilities: Capabilities,
    pub(crate) kind: ObjectKind,
}

impl SceneObject {
    /// Garments are locked by construction.
    pub fn garment(layer: GarmentLayer, transform: Transform) -> Self {
        Self::with_parts(
            ObjectId::new(),
            transform,
            Capabilities::LOCKED,
            ObjectKind::Garment(layer),
        )
    }

    pub fn text(layer: TextLayer) -> Self {
        Self::with_parts(
            ObjectId::new(),
            Transform::identity(),
            Capabilities::INTERACTIVE,
            ObjectKind::Text(layer),
        )
    }

    pub fn image(layer: ImageLayer, transform: Transform) -> Self {
        Self::with_parts(
            ObjectId::new(),
            transform,
            Capabilities::INTERACTIVE,
            ObjectKind::Image(layer),
        )
    }

    pub(crate) fn with_parts(
        id: ObjectId,
        transform: Transform,
        capabilities: Capabilities,
        kind: ObjectKind,
    ) -> Self {
        Self {
            id,
            transform,
            z_order: 0,
            capabilities,
            kind,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn z_order(&self) -> u32 {
        self.z_order
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn is_garment(&self) -> bool {
        matches!(self.kind, ObjectKind::Garment(_))
    }

    pub fn as_text(&self) -> Option<&TextLayer> {
        match &self.kind {
            ObjectKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Corners of the object in viewport coordinates, clockwise from top-left.
    pub fn corners(&self, fonts: &FontBook) -> [Pos2; 4] {
        let half = self.kind.local_size(fonts) / 2.0;
        let m = self.transform.to_matrix();
        [
            Pos2::new(-half.x, -half.y),
            Pos2::new(half.x, -half.y),
            Pos2::new(half.x, half.y),
            Pos2::new(-half.x, half.y),
        ]
        .map(|corner| transform_point(&m, corner))
    }

    /// Whether a viewport point lies inside the transformed bounds.
    pub fn contains(&self, point: Pos2, fonts: &FontBook) -> bool {
        let Some(inverse) = self.transform.inverse_matrix() else {
            return false;
        };
        let half = self.kind.local_size(fonts) / 2.0;
        let local = transform_point(&inverse, point);
        local.x.abs() <= half.x && local.y.abs() <= half.y
    }
}
