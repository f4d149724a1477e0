use egui::Color32;
use serde::{Deserialize, Serialize};

use super::Viewport;
use super::object::{Capabilities, ImageLayer, ObjectId, TextLayer};
use super::transform::Transform;

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Structurally complete description of a scene graph, sufficient to
/// rebuild it for re-editing.
///
/// The garment's base artwork is stored by reference; user bitmaps are
/// embedded as PNG so they survive without the original upload. The garment
/// color lives only in the garment payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub version: u32,
    pub viewport: Viewport,
    /// Objects back to front
    pub objects: Vec<ObjectSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub transform: Transform,
    pub z_order: u32,
    pub capabilities: Capabilities,
    pub payload: PayloadSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadSnapshot {
    Garment { source: String, color: Color32 },
    Text(TextLayer),
    Image(ImageLayer),
}

impl SceneSnapshot {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Compact JSON text, as kept in app storage.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The garment color recorded in the payload, if the scene has a garment.
    pub fn garment_color(&self) -> Option<Color32> {
        self.objects.iter().find_map(|object| match object.payload {
            PayloadSnapshot::Garment { color, .. } => Some(color),
            _ => None,
        })
    }
}

/// Serde adapter storing a raster as PNG bytes.
///
/// The bytes are written as a plain `u8` sequence, the same shape
/// `Vec<u8>` reads back in every format.
pub(crate) mod png_payload {
    use std::io::Cursor;
    use std::sync::Arc;

    use image::{ImageFormat, RgbaImage};
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};

    pub fn serialize<S: Serializer>(
        raster: &Arc<RgbaImage>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut bytes = Cursor::new(Vec::new());
        raster
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(<S::Error as ser::Error>::custom)?;
        bytes.get_ref().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Arc<RgbaImage>, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .map_err(<D::Error as de::Error>::custom)?;
        Ok(Arc::new(decoded.to_rgba8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn image_payload_survives_json() {
        let mut raster = RgbaImage::new(3, 2);
        raster.put_pixel(1, 1, Rgba([10, 20, 30, 40]));
        let payload = PayloadSnapshot::Image(ImageLayer::new(raster));

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"type\":\"image\""));
        let back: PayloadSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
