//! The design scene: an owned, ordered collection of scene objects plus the
//! active selection and viewport.
//!
//! Invariants held after every mutation:
//! - at most one garment layer exists, and when present it sits at rank 0;
//! - the selection, if any, names a live selectable object;
//! - ranks are `0..len` with no gaps or duplicates, matching storage order.

pub mod object;
pub mod snapshot;
pub mod transform;

use std::collections::HashSet;
use std::sync::Arc;

use egui::{Color32, Pos2};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::assets::GarmentAssets;
use crate::error::{AssetLoadError, SceneError};
use crate::render::{self, text::FontBook};
use object::{GarmentLayer, ObjectId, ObjectKind, SceneObject};
use snapshot::{ObjectSnapshot, PayloadSnapshot, SNAPSHOT_VERSION, SceneSnapshot};
use transform::TransformDelta;

/// The logical canvas. Always square, since the mockup is shown at 1:1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Edge length in logical units
    pub size: f32,
    /// Fill behind every object, `None` for a transparent canvas
    pub background: Option<Color32>,
}

impl Viewport {
    pub fn square(size: f32) -> Self {
        Self {
            size,
            background: Some(Color32::WHITE),
        }
    }

    pub fn with_background(mut self, background: Option<Color32>) -> Self {
        self.background = background;
        self
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(self.size / 2.0, self.size / 2.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    pub center_in_viewport: bool,
}

impl AddOptions {
    pub const CENTERED: Self = Self {
        center_in_viewport: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Output pixels per logical unit
    pub scale_multiplier: f32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale_multiplier: 1.0,
        }
    }
}

pub struct SceneGraph {
    objects: Vec<SceneObject>,
    selection: Option<ObjectId>,
    viewport: Viewport,
    fonts: Arc<FontBook>,
    revision: u64,
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("objects", &self.objects)
            .field("selection", &self.selection)
            .field("viewport", &self.viewport)
            .field("revision", &self.revision)
            .finish()
    }
}

impl SceneGraph {
    pub fn new(viewport: Viewport) -> Self {
        Self::with_fonts(viewport, FontBook::shared())
    }

    pub fn with_fonts(viewport: Viewport, fonts: Arc<FontBook>) -> Self {
        Self {
            objects: Vec::new(),
            selection: None,
            viewport,
            fonts,
            revision: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Increments on every effective mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Objects back to front.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.id() == id)
    }

    fn position_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|object| object.id() == id)
    }

    pub fn garment(&self) -> Option<&SceneObject> {
        self.objects.first().filter(|object| object.is_garment())
    }

    /// The shopper's chosen garment color, if a garment is present.
    pub fn current_color(&self) -> Option<Color32> {
        match self.garment().map(SceneObject::kind) {
            Some(ObjectKind::Garment(garment)) => Some(garment.color()),
            _ => None,
        }
    }

    /// Inserts `object` on top of the stack and returns its id.
    ///
    /// A garment always goes to rank 0 instead. Adding a second garment, or an
    /// object whose id is already present, is an invariant violation.
    pub fn add_object(
        &mut self,
        mut object: SceneObject,
        options: AddOptions,
    ) -> Result<ObjectId, SceneError> {
        if object.is_garment() && self.garment().is_some() {
            let err =
                SceneError::InvariantViolation("a garment layer is already present".to_owned());
            log::error!("Rejected add_object: {err}");
            return Err(err);
        }
        if self.get(object.id()).is_some() {
            let err = SceneError::InvariantViolation(format!(
                "object {} is already in the scene",
                object.id()
            ));
            log::error!("Rejected add_object: {err}");
            return Err(err);
        }

        if options.center_in_viewport {
            object.transform.position = self.viewport.center().to_vec2();
        }

        let id = object.id();
        log::debug!("Adding {} object {id}", object.kind().name());
        if object.is_garment() {
            self.objects.insert(0, object);
        } else {
            self.objects.push(object);
        }
        self.committed();
        Ok(id)
    }

    /// Removes a deletable object. Unknown ids and locked objects are ignored.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.position_of(id)?;
        if !self.objects[index].capabilities().deletable {
            log::debug!("Ignoring removal of non-deletable object {id}");
            return None;
        }

        let removed = self.objects.remove(index);
        if self.selection == Some(id) {
            self.selection = None;
        }
        log::debug!("Removed {} object {id}", removed.kind().name());
        self.committed();
        Some(removed)
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn selected(&self) -> Option<&SceneObject> {
        self.selection.and_then(|id| self.get(id))
    }

    /// Selects a selectable object or clears the selection.
    ///
    /// Returns `false` and leaves the selection alone when `id` does not name
    /// a selectable object.
    pub fn set_selection(&mut self, id: Option<ObjectId>) -> bool {
        match id {
            None => {
                if self.selection.take().is_some() {
                    self.committed();
                }
                true
            }
            Some(id) => {
                let selectable = self
                    .get(id)
                    .is_some_and(|object| object.capabilities().selectable);
                if !selectable {
                    return false;
                }
                if self.selection != Some(id) {
                    self.selection = Some(id);
                    self.committed();
                }
                true
            }
        }
    }

    /// Applies `delta` to a movable object. Returns whether anything changed.
    pub fn transform(&mut self, id: ObjectId, delta: TransformDelta) -> bool {
        if delta.is_identity() {
            return false;
        }
        let Some(object) = self.objects.iter_mut().find(|object| object.id() == id) else {
            return false;
        };
        if !object.capabilities().movable {
            return false;
        }
        object.transform.apply(&delta);
        self.committed();
        true
    }

    /// Moves an object to `rank`, shifting the others. Nothing can be moved
    /// onto or below the garment, and the garment itself never moves.
    pub fn reorder(&mut self, id: ObjectId, rank: usize) -> bool {
        let Some(index) = self.position_of(id) else {
            return false;
        };
        if self.objects[index].is_garment() {
            return false;
        }
        let lowest = usize::from(self.garment().is_some());
        let target = rank.clamp(lowest, self.objects.len() - 1);
        if target == index {
            return false;
        }
        let object = self.objects.remove(index);
        self.objects.insert(target, object);
        self.committed();
        true
    }

    /// Replaces the garment's recolor filter. No-op without a garment.
    pub fn recolor_garment(&mut self, color: Color32) -> bool {
        let Some(ObjectKind::Garment(garment)) =
            self.objects.first_mut().map(|object| &mut object.kind)
        else {
            log::debug!("Ignoring recolor: no garment layer");
            return false;
        };
        if garment.color() == color {
            return false;
        }
        garment.set_color(color);
        self.committed();
        true
    }

    /// Topmost selectable object under a viewport point.
    pub fn hit_test(&self, point: Pos2) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .filter(|object| object.capabilities().selectable)
            .find(|object| object.contains(point, &self.fonts))
            .map(SceneObject::id)
    }

    /// Composites every object back to front. Does not touch the graph.
    pub fn to_raster(&self, options: RasterOptions) -> RgbaImage {
        render::composite(self, options)
    }

    pub fn serialize(&self) -> SceneSnapshot {
        let objects = self
            .objects
            .iter()
            .map(|object| ObjectSnapshot {
                id: object.id(),
                transform: object.transform,
                z_order: object.z_order,
                capabilities: object.capabilities(),
                payload: match object.kind() {
                    ObjectKind::Garment(garment) => PayloadSnapshot::Garment {
                        source: garment.source().to_owned(),
                        color: garment.color(),
                    },
                    ObjectKind::Text(text) => PayloadSnapshot::Text(text.clone()),
                    ObjectKind::Image(image) => PayloadSnapshot::Image(image.clone()),
                },
            })
            .collect();

        SceneSnapshot {
            version: SNAPSHOT_VERSION,
            viewport: self.viewport,
            objects,
        }
    }

    /// Rebuilds a graph from a snapshot, reloading garment artwork through
    /// `assets`. Snapshots that break a scene invariant are rejected.
    ///
    /// Missing garment artwork is recoverable: the garment entry is skipped,
    /// the remaining layers keep their relative order, and the load error is
    /// handed back next to the rebuilt graph.
    pub fn deserialize(
        snapshot: &SceneSnapshot,
        assets: &dyn GarmentAssets,
        fonts: Arc<FontBook>,
    ) -> Result<(Self, Option<AssetLoadError>), SceneError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SceneError::UnsupportedSnapshot {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let mut seen = HashSet::new();
        let mut objects = Vec::with_capacity(snapshot.objects.len());
        let mut asset_error = None;
        for (rank, entry) in snapshot.objects.iter().enumerate() {
            if !seen.insert(entry.id) {
                return Err(SceneError::InvariantViolation(format!(
                    "duplicate object id {}",
                    entry.id
                )));
            }
            if entry.z_order as usize != rank {
                return Err(SceneError::InvariantViolation(format!(
                    "object {} has rank {} but is stored at {rank}",
                    entry.id, entry.z_order
                )));
            }

            let kind = match &entry.payload {
                PayloadSnapshot::Garment { source, color } => {
                    if rank != 0 {
                        return Err(SceneError::InvariantViolation(
                            "garment layer must be the first object".to_owned(),
                        ));
                    }
                    match assets.load(source) {
                        Ok(base) => ObjectKind::Garment(GarmentLayer::new(
                            source.clone(),
                            Arc::new(base),
                            *color,
                        )),
                        Err(err) => {
                            log::error!("Reopening without garment artwork: {err}");
                            asset_error = Some(err);
                            continue;
                        }
                    }
                }
                PayloadSnapshot::Text(text) => ObjectKind::Text(text.clone()),
                PayloadSnapshot::Image(image) => ObjectKind::Image(image.clone()),
            };

            let mut object =
                SceneObject::with_parts(entry.id, entry.transform, entry.capabilities, kind);
            object.z_order = objects.len() as u32;
            objects.push(object);
        }

        let graph = Self {
            objects,
            selection: None,
            viewport: snapshot.viewport,
            fonts,
            revision: 0,
        };
        graph.check_invariants()?;
        Ok((graph, asset_error))
    }

    /// Restamps ranks and bumps the revision after a mutation.
    fn committed(&mut self) {
        for (rank, object) in self.objects.iter_mut().enumerate() {
            object.z_order = rank as u32;
        }
        self.revision += 1;
        debug_assert!(
            self.check_invariants().is_ok(),
            "{:?}",
            self.check_invariants()
        );
    }

    pub fn check_invariants(&self) -> Result<(), SceneError> {
        let garments = self.objects.iter().filter(|object| object.is_garment()).count();
        if garments > 1 {
            return Err(SceneError::InvariantViolation(format!("{garments} garment layers")));
        }
        if garments == 1 && !self.objects[0].is_garment() {
            return Err(SceneError::InvariantViolation("garment layer is not at rank 0".to_owned()));
        }
        if let Some(garment) = self.garment() {
            if garment.capabilities() != object::Capabilities::LOCKED {
                return Err(SceneError::InvariantViolation(
                    "garment layer must be locked".to_owned(),
                ));
            }
        }
        for (rank, object) in self.objects.iter().enumerate() {
            if object.z_order as usize != rank {
                return Err(SceneError::InvariantViolation(format!(
                    "object {} has rank {} at position {rank}",
                    object.id(),
                    object.z_order
                )));
            }
        }
        if let Some(id) = self.selection {
            if !self.get(id).is_some_and(|object| object.capabilities().selectable) {
                return Err(SceneError::InvariantViolation(format!("selection {id} is stale")));
            }
        }
        Ok(())
    }
}
