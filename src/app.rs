use std::sync::Arc;

use egui::{Color32, ColorImage, TextureHandle, TextureOptions};
use futures::channel::oneshot;

use crate::assets::FsAssets;
use crate::command::Command;
use crate::config::StudioConfig;
use crate::export::store::{FsBlobStore, FsRecordStore};
use crate::export::{ExportError, ExportPipeline, ExportReceipt, ExportSettings};
use crate::file_handler::FileHandler;
use crate::panels::{central_panel, tools_panel};
use crate::persistence;
use crate::render::preview::PreviewCache;
use crate::tools::Studio;
use crate::util::time;

const STATUS_SECS: f64 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    shown_at: f64,
}

type PendingExport = oneshot::Receiver<Result<ExportReceipt, ExportError>>;

/// The design studio window: tools on the left, the garment canvas in the middle.
pub struct StudioApp {
    studio: Studio,
    pipeline: ExportPipeline,
    preview: PreviewCache,
    texture: Option<TextureHandle>,
    file_handler: FileHandler,
    pending_export: Option<PendingExport>,
    last_receipt: Option<ExportReceipt>,
    status: Option<StatusMessage>,
    /// Colour shown in the picker
    pub(crate) picker_color: Color32,
    /// Path typed into the logo upload field
    pub(crate) upload_path: String,
}

impl StudioApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, config: StudioConfig) -> Self {
        let assets = FsAssets::new(&config.asset_dir);
        let restored = cc.storage.and_then(persistence::load_scene);

        let (studio, asset_error) =
            match restored.map(|snapshot| Studio::reopen(&config, &snapshot, &assets)) {
                Some(Ok((studio, asset_error))) => {
                    log::info!("Restored design with {} objects", studio.scene().len());
                    (studio, asset_error)
                }
                other => {
                    if let Some(Err(err)) = other {
                        log::warn!("Could not restore previous design: {err}");
                    }
                    Studio::open(&config, &assets)
                }
            };
        let status = asset_error.map(|err| StatusMessage {
            kind: StatusKind::Error,
            text: format!("Garment unavailable: {err}"),
            shown_at: time::current_time_secs(),
        });

        let blobs = FsBlobStore::new(config.storage_dir.join(&config.export_bucket));
        let records = FsRecordStore::new(config.storage_dir.join("records"));
        let pipeline = ExportPipeline::new(
            Arc::new(blobs),
            Arc::new(records),
            ExportSettings::from(&config),
        );

        Self {
            picker_color: studio.scene().current_color().unwrap_or(config.default_color),
            studio,
            pipeline,
            preview: PreviewCache::new(),
            texture: None,
            file_handler: FileHandler::new(),
            pending_export: None,
            last_receipt: None,
            status,
            upload_path: String::new(),
        }
    }

    pub fn studio(&self) -> &Studio {
        &self.studio
    }

    /// Runs a command and reports failures in the status line
    pub fn execute(&mut self, command: Command) {
        match command.execute(&mut self.studio) {
            Ok(outcome) => log::debug!("Command outcome: {outcome:?}"),
            Err(err) => {
                log::warn!("Command failed: {err}");
                self.set_status(StatusKind::Error, err.to_string());
            }
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            kind,
            text: text.into(),
            shown_at: time::current_time_secs(),
        });
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn last_receipt(&self) -> Option<&ExportReceipt> {
        self.last_receipt.as_ref()
    }

    /// Reads the file named in the upload field and adds it to the design
    pub fn upload_from_path(&mut self) {
        let path = self.upload_path.trim().to_owned();
        if path.is_empty() {
            return;
        }
        match std::fs::read(&path) {
            Ok(bytes) => self.execute(Command::UploadImage(bytes)),
            Err(err) => {
                log::warn!("Failed to read {path}: {err}");
                self.set_status(StatusKind::Error, format!("Could not read {path}: {err}"));
            }
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.pipeline.is_busy() || self.pending_export.is_some()
    }

    /// Rasterizes now and publishes on a worker thread
    pub fn start_export(&mut self, ctx: &egui::Context) {
        if self.pending_export.is_some() {
            log::warn!("Export already running");
            return;
        }
        let prepared = match self.pipeline.prepare(self.studio.scene()) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.set_status(StatusKind::Error, err.to_string());
                return;
            }
        };

        let (sender, receiver) = oneshot::channel();
        let pipeline = self.pipeline.clone();
        let repaint = ctx.clone();
        std::thread::spawn(move || {
            let result = futures::executor::block_on(pipeline.publish(prepared));
            if sender.send(result).is_err() {
                log::warn!("Export finished after the studio closed");
            }
            repaint.request_repaint();
        });
        self.pending_export = Some(receiver);
        self.set_status(StatusKind::Info, "Saving design...");
    }

    fn poll_export(&mut self) {
        let Some(receiver) = &mut self.pending_export else {
            return;
        };
        let result = match receiver.try_recv() {
            Ok(Some(result)) => result,
            Ok(None) => return,
            Err(oneshot::Canceled) => {
                self.pending_export = None;
                self.set_status(StatusKind::Error, "Export worker stopped unexpectedly");
                return;
            }
        };
        self.pending_export = None;

        match result {
            Ok(receipt) => {
                log::info!("Handing design {} to the cart", receipt.record_id);
                self.set_status(
                    StatusKind::Info,
                    format!("Added to cart as design {}", receipt.record_id),
                );
                self.last_receipt = Some(receipt);
            }
            Err(err) => self.set_status(StatusKind::Error, format!("{err}. Please try again.")),
        }
    }

    /// Re-renders the design when it changed and returns the preview texture
    pub(crate) fn preview_texture(
        &mut self,
        ctx: &egui::Context,
        pixel_ratio: f32,
    ) -> Option<egui::TextureId> {
        if let Some(image) = self.preview.refresh(self.studio.scene(), pixel_ratio) {
            let size = [image.width() as usize, image.height() as usize];
            let color_image = ColorImage::from_rgba_unmultiplied(size, image.as_raw());
            match &mut self.texture {
                Some(texture) => texture.set(color_image, TextureOptions::LINEAR),
                None => {
                    self.texture = Some(ctx.load_texture(
                        "design_preview",
                        color_image,
                        TextureOptions::LINEAR,
                    ));
                }
            }
        }
        self.texture.as_ref().map(TextureHandle::id)
    }

    fn expire_status(&mut self) {
        let expired = self.status.as_ref().is_some_and(|status| {
            status.kind == StatusKind::Info
                && time::current_time_secs() - status.shown_at > STATUS_SECS
        });
        if expired && self.pending_export.is_none() {
            self.status = None;
        }
    }
}

impl eframe::App for StudioApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Err(err) = persistence::save_scene(storage, &self.studio.scene().serialize()) {
            log::error!("Could not save design: {err}");
        }
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_export();
        self.expire_status();

        for dropped in self.file_handler.take_dropped_images(ctx) {
            log::info!("Adding dropped image {}", dropped.name);
            self.execute(Command::UploadImage(dropped.bytes));
        }

        tools_panel(self, ctx);
        central_panel(self, ctx);

        self.file_handler.preview_files_being_dropped(ctx);
    }
}
