//! User-facing design operations.
//!
//! `Studio` is the only mutation surface the presentation layer gets. Every
//! operation goes through the scene graph's public contract, so none of them
//! can break its invariants.

use std::sync::Arc;

use egui::{Color32, Pos2};
use image::DynamicImage;
use image::imageops::FilterType;

use crate::assets::GarmentAssets;
use crate::config::StudioConfig;
use crate::error::{AssetLoadError, DecodeError, SceneError, ToolError};
use crate::render::text::FontBook;
use crate::scene::object::{
    FontWeight, GarmentLayer, ImageLayer, ObjectId, SceneObject, TextLayer,
};
use crate::scene::snapshot::SceneSnapshot;
use crate::scene::transform::{Transform, TransformDelta};
use crate::scene::{AddOptions, SceneGraph};

/// Defaults the tools apply when creating objects.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub garment_asset: String,
    pub garment_scale: f32,
    pub default_color: Color32,
    pub text_label: String,
    pub text_font_family: String,
    pub text_weight: FontWeight,
    pub text_fill: Color32,
    pub text_size: f32,
    pub upload_bound: f32,
    pub upload_max_pixels: u32,
}

impl From<&StudioConfig> for ToolSettings {
    fn from(config: &StudioConfig) -> Self {
        Self {
            garment_asset: config.garment_asset.clone(),
            garment_scale: config.garment_scale,
            default_color: config.default_color,
            text_label: config.text_label.clone(),
            text_font_family: config.text_font_family.clone(),
            text_weight: config.text_weight,
            text_fill: config.text_fill,
            text_size: config.text_size,
            upload_bound: config.upload_bound,
            upload_max_pixels: config.upload_max_pixels,
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from(&StudioConfig::default())
    }
}

/// A design session: the scene plus the tool defaults used to grow it.
#[derive(Debug)]
pub struct Studio {
    scene: SceneGraph,
    settings: ToolSettings,
}

impl Studio {
    /// An empty studio. Call [`Studio::load_garment`] to put the mockup in.
    pub fn new(config: &StudioConfig) -> Self {
        Self::with_scene(SceneGraph::new(config.viewport()), ToolSettings::from(config))
    }

    pub fn with_scene(scene: SceneGraph, settings: ToolSettings) -> Self {
        Self { scene, settings }
    }

    /// Opens a studio with its garment in place.
    ///
    /// A garment that fails to load does not stop the session: the studio is
    /// returned without one and the failure is handed back alongside it.
    pub fn open(
        config: &StudioConfig,
        assets: &dyn GarmentAssets,
    ) -> (Self, Option<AssetLoadError>) {
        let mut studio = Self::new(config);
        match studio.load_garment(assets) {
            Ok(_) => (studio, None),
            Err(ToolError::Scene(SceneError::Asset(err))) => (studio, Some(err)),
            Err(err) => {
                log::error!("Unexpected failure while opening studio: {err}");
                (studio, None)
            }
        }
    }

    /// Rebuilds a studio from a saved snapshot. As with [`Studio::open`], a
    /// missing garment leaves the rest of the design usable and the load
    /// error is returned for display.
    pub fn reopen(
        config: &StudioConfig,
        snapshot: &SceneSnapshot,
        assets: &dyn GarmentAssets,
    ) -> Result<(Self, Option<AssetLoadError>), SceneError> {
        let (scene, asset_error) = SceneGraph::deserialize(snapshot, assets, FontBook::shared())?;
        Ok((Self::with_scene(scene, ToolSettings::from(config)), asset_error))
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Loads the garment artwork, recolors it to the default color and
    /// places it centered at the back of the scene.
    pub fn load_garment(&mut self, assets: &dyn GarmentAssets) -> Result<ObjectId, ToolError> {
        let base = assets.load(&self.settings.garment_asset).map_err(|err| {
            log::error!("Garment artwork unavailable: {err}");
            SceneError::Asset(err)
        })?;

        let viewport = self.scene.viewport();
        let width = base.width().max(1) as f32;
        let scale = viewport.size * self.settings.garment_scale / width;
        let layer = GarmentLayer::new(
            self.settings.garment_asset.clone(),
            Arc::new(base),
            self.settings.default_color,
        );
        let garment = SceneObject::garment(layer, Transform::identity().with_uniform_scale(scale));
        let id = self.scene.add_object(garment, AddOptions::CENTERED)?;
        log::info!("Garment {id} placed at scale {scale:.3}");
        Ok(id)
    }

    /// Recolor: last write wins.
    pub fn recolor(&mut self, color: Color32) -> bool {
        self.scene.recolor_garment(color)
    }

    /// Adds the default label, centered, and selects it.
    pub fn add_text(&mut self) -> Result<ObjectId, ToolError> {
        let text = TextLayer {
            content: self.settings.text_label.clone(),
            font_family: self.settings.text_font_family.clone(),
            font_size: self.scene.viewport().size * self.settings.text_size,
            weight: self.settings.text_weight,
            fill: self.settings.text_fill,
        };
        let id = self.scene.add_object(SceneObject::text(text), AddOptions::CENTERED)?;
        self.scene.set_selection(Some(id));
        Ok(id)
    }

    /// Decodes an uploaded image, fits it within the upload bound, adds it
    /// centered and selects it. Undecodable bytes leave the scene untouched.
    pub fn upload_image(&mut self, bytes: &[u8]) -> Result<ObjectId, ToolError> {
        let decoded = image::load_from_memory(bytes).map_err(DecodeError::from)?;
        let decoded = self.limit_resolution(decoded);
        let raster = decoded.to_rgba8();

        let longest = raster.width().max(raster.height()).max(1) as f32;
        let scale = self.scene.viewport().size * self.settings.upload_bound / longest;
        log::info!(
            "Uploading {}x{} image at scale {scale:.3}",
            raster.width(),
            raster.height()
        );

        let object = SceneObject::image(
            ImageLayer::new(raster),
            Transform::identity().with_uniform_scale(scale),
        );
        let id = self.scene.add_object(object, AddOptions::CENTERED)?;
        self.scene.set_selection(Some(id));
        Ok(id)
    }

    fn limit_resolution(&self, image: DynamicImage) -> DynamicImage {
        let max = self.settings.upload_max_pixels.max(1);
        if image.width() <= max && image.height() <= max {
            return image;
        }
        log::debug!("Downsampling {}x{} upload to fit {max}px", image.width(), image.height());
        image.resize(max, max, FilterType::Triangle)
    }

    /// Deletes the current selection. No-op when nothing is selected.
    pub fn delete_selected(&mut self) -> Option<ObjectId> {
        let id = self.scene.selection()?;
        self.scene.remove_object(id).map(|removed| removed.id())
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.scene.selection()
    }

    pub fn select(&mut self, id: Option<ObjectId>) -> bool {
        self.scene.set_selection(id)
    }

    /// Selects whatever is on top at `point`, or clears the selection.
    pub fn select_at(&mut self, point: Pos2) -> Option<ObjectId> {
        let hit = self.scene.hit_test(point);
        self.scene.set_selection(hit);
        hit
    }

    pub fn transform_selected(&mut self, delta: TransformDelta) -> bool {
        match self.scene.selection() {
            Some(id) => self.scene.transform(id, delta),
            None => false,
        }
    }

    pub fn bring_forward(&mut self) -> bool {
        self.shift_selected(1)
    }

    pub fn send_backward(&mut self) -> bool {
        self.shift_selected(-1)
    }

    fn shift_selected(&mut self, step: isize) -> bool {
        let Some(selected) = self.scene.selected() else {
            return false;
        };
        let id = selected.id();
        let rank = selected.z_order() as isize + step;
        rank >= 0 && self.scene.reorder(id, rank as usize)
    }
}
