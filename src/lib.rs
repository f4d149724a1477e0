#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod assets;
pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod export;
pub mod file_handler;
pub mod panels;
pub mod persistence;
pub mod recolor;
pub mod render;
pub mod scene;
pub mod tools;
pub mod util;

pub use app::StudioApp;
pub use assets::{FsAssets, GarmentAssets, MemoryAssets};
pub use command::{Command, Outcome};
pub use config::StudioConfig;
pub use error::{AssetLoadError, DecodeError, SceneError, ToolError};
pub use export::{DesignRecord, ExportError, ExportPipeline, ExportReceipt};
pub use export::state::ExportState;
pub use recolor::RecolorFilter;
pub use scene::object::{ObjectId, SceneObject};
pub use scene::snapshot::SceneSnapshot;
pub use scene::{SceneGraph, Viewport};
pub use tools::Studio;
