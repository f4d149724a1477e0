//! Turns the current design into a stored preview plus a re-editable record.

pub mod state;
pub mod store;

use std::io::Cursor;
use std::sync::Arc;

use image::ImageFormat;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StudioConfig;
use crate::scene::snapshot::SceneSnapshot;
use crate::scene::{RasterOptions, SceneGraph};
use crate::util::time;
use state::{ExportStage, ExportState};
use store::{BlobStore, RecordId, RecordStore, StoreError, StoredRecord};

pub const PREVIEW_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("An export is already in progress")]
    InFlight,

    #[error("Failed to encode preview: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to serialize design: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Failed to upload preview: {0}")]
    Upload(#[source] StoreError),

    #[error("Failed to save design record: {0}")]
    RecordWrite(#[source] StoreError),
}

impl ExportError {
    /// The stage the run failed in, `None` when the run never started.
    pub fn stage(&self) -> Option<ExportStage> {
        match self {
            ExportError::InFlight => None,
            ExportError::Encode(_) | ExportError::Snapshot(_) => Some(ExportStage::Rasterizing),
            ExportError::Upload(_) => Some(ExportStage::Uploading),
            ExportError::RecordWrite(_) => Some(ExportStage::RecordWriting),
        }
    }
}

/// A saved design as written to the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRecord {
    pub product_id: u64,
    pub preview_url: String,
    pub design_data: SceneSnapshot,
}

impl DesignRecord {
    /// Decodes a row read back from the record store.
    pub fn from_stored(record: &StoredRecord) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(record.fields.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    /// Output pixels per logical viewport unit
    pub oversample: f32,
    pub table: String,
    pub product_id: u64,
}

impl From<&StudioConfig> for ExportSettings {
    fn from(config: &StudioConfig) -> Self {
        Self {
            oversample: config.export_oversample,
            table: config.export_table.clone(),
            product_id: config.product_id,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from(&StudioConfig::default())
    }
}

/// What a committed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub record_id: RecordId,
    pub preview_url: String,
    pub blob_name: String,
}

/// Holds the pipeline's single run slot.
///
/// Released by `commit` or `fail`; dropping it mid-run marks the running
/// stage as errored.
struct InFlight {
    state: Arc<Mutex<ExportState>>,
    done: bool,
}

impl InFlight {
    fn claim(state: &Arc<Mutex<ExportState>>) -> Result<Self, ExportError> {
        let mut current = state.lock();
        if !current.can_transition_to(&ExportState::Rasterizing) {
            log::warn!("Export requested while {current:?}, ignoring");
            return Err(ExportError::InFlight);
        }
        log::info!("Export: {current:?} -> Rasterizing");
        *current = ExportState::Rasterizing;
        Ok(Self {
            state: Arc::clone(state),
            done: false,
        })
    }

    fn advance(&self, next: ExportState) {
        let mut current = self.state.lock();
        if current.can_transition_to(&next) {
            log::info!("Export: {current:?} -> {next:?}");
            *current = next;
        } else {
            log::error!("Invalid export transition {current:?} -> {next:?}");
            debug_assert!(false, "invalid export transition {current:?} -> {next:?}");
        }
    }

    fn fail(mut self, err: ExportError) -> ExportError {
        if let Some(stage) = err.stage() {
            log::error!("Export failed while {stage}: {err}");
            self.advance(ExportState::Errored(stage));
        }
        self.done = true;
        err
    }

    fn commit(mut self, id: RecordId) {
        self.advance(ExportState::Committed(id));
        self.done = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut current = self.state.lock();
        if let Some(stage) = current.stage() {
            log::warn!("Export abandoned while {stage}");
            *current = ExportState::Errored(stage);
        }
    }
}

/// A rasterized design waiting to be uploaded.
///
/// Owns no borrow of the scene, so it can be handed to another thread while
/// the session keeps editing.
pub struct PreparedExport {
    ticket: InFlight,
    blob_name: String,
    png: Vec<u8>,
    design_data: serde_json::Value,
}

impl PreparedExport {
    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }
}

impl std::fmt::Debug for PreparedExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedExport")
            .field("blob_name", &self.blob_name)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// Sequential export: rasterize, upload, write record.
///
/// At most one run is in flight per pipeline. Stages run once each; a failed
/// run is retried by starting a new one, which uploads under a fresh name.
#[derive(Clone)]
pub struct ExportPipeline {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    settings: ExportSettings,
    state: Arc<Mutex<ExportState>>,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("settings", &self.settings)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl ExportPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            blobs,
            records,
            settings,
            state: Arc::new(Mutex::new(ExportState::Idle)),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn state(&self) -> ExportState {
        self.state.lock().clone()
    }

    /// True while a run holds the pipeline; the export trigger should be disabled.
    pub fn is_busy(&self) -> bool {
        self.state.lock().is_in_flight()
    }

    /// Claims the pipeline and runs the rasterizing stage.
    pub fn prepare(&self, scene: &SceneGraph) -> Result<PreparedExport, ExportError> {
        let ticket = InFlight::claim(&self.state)?;
        match self.rasterize(scene) {
            Ok((png, design_data)) => {
                let blob_name = new_blob_name();
                log::debug!("Rasterized {} bytes as {blob_name}", png.len());
                Ok(PreparedExport {
                    ticket,
                    blob_name,
                    png,
                    design_data,
                })
            }
            Err(err) => Err(ticket.fail(err)),
        }
    }

    fn rasterize(&self, scene: &SceneGraph) -> Result<(Vec<u8>, serde_json::Value), ExportError> {
        let raster = scene.to_raster(RasterOptions {
            scale_multiplier: self.settings.oversample,
        });
        let mut png = Cursor::new(Vec::new());
        raster.write_to(&mut png, ImageFormat::Png)?;
        let design_data = scene.serialize().to_json()?;
        Ok((png.into_inner(), design_data))
    }

    /// Runs the uploading and record-writing stages of a prepared run.
    pub async fn publish(&self, prepared: PreparedExport) -> Result<ExportReceipt, ExportError> {
        let PreparedExport {
            ticket,
            blob_name,
            png,
            design_data,
        } = prepared;

        ticket.advance(ExportState::Uploading);
        let preview_url = match self.blobs.put(&blob_name, png, PREVIEW_CONTENT_TYPE).await {
            Ok(url) => url,
            Err(err) => return Err(ticket.fail(ExportError::Upload(err))),
        };

        ticket.advance(ExportState::RecordWriting);
        let record = json!({
            "product_id": self.settings.product_id,
            "preview_url": preview_url,
            "design_data": design_data,
        });
        let stored = match self.records.insert(&self.settings.table, record).await {
            Ok(stored) => stored,
            Err(err) => return Err(ticket.fail(ExportError::RecordWrite(err))),
        };

        let record_id = stored.id;
        log::info!("Design saved as {} record {record_id}", self.settings.table);
        ticket.commit(record_id.clone());
        Ok(ExportReceipt {
            record_id,
            preview_url,
            blob_name,
        })
    }

    /// Runs a whole export against the scene.
    pub async fn export(&self, scene: &SceneGraph) -> Result<ExportReceipt, ExportError> {
        let prepared = self.prepare(scene)?;
        self.publish(prepared).await
    }
}

fn new_blob_name() -> String {
    format!("design-{}-{}.png", time::timestamp_millis(), Uuid::new_v4().simple())
}
