use std::path::{Path, PathBuf};

use egui::Color32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::Viewport;
use crate::scene::object::FontWeight;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "GARMENT_STUDIO_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything tunable about a studio session.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Edge length of the square design canvas in logical units
    pub viewport_size: f32,
    #[serde(with = "crate::color::serde_hex::option")]
    pub background: Option<Color32>,

    /// Directory garment artwork is loaded from
    pub asset_dir: PathBuf,
    pub garment_asset: String,
    /// Garment width as a fraction of the viewport
    pub garment_scale: f32,
    #[serde(with = "crate::color::serde_hex")]
    pub default_color: Color32,

    pub text_label: String,
    pub text_font_family: String,
    pub text_weight: FontWeight,
    #[serde(with = "crate::color::serde_hex")]
    pub text_fill: Color32,
    /// Text size as a fraction of the viewport
    pub text_size: f32,

    /// Largest edge of an uploaded image as a fraction of the viewport
    pub upload_bound: f32,
    /// Uploads larger than this many pixels on either edge are downsampled
    pub upload_max_pixels: u32,

    pub export_oversample: f32,
    pub export_bucket: String,
    pub export_table: String,
    pub product_id: u64,
    /// Root directory of the filesystem object and record stores
    pub storage_dir: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            viewport_size: 500.0,
            background: Some(Color32::WHITE),
            asset_dir: PathBuf::from("assets"),
            garment_asset: "tshirt-transparent.png".to_owned(),
            garment_scale: 0.8,
            default_color: Color32::from_rgb(0xff, 0x00, 0x00),
            text_label: "SARIONYX".to_owned(),
            text_font_family: "Arial".to_owned(),
            text_weight: FontWeight::Bold,
            text_fill: Color32::from_rgb(0x33, 0x33, 0x33),
            text_size: 0.08,
            upload_bound: 0.3,
            upload_max_pixels: 2048,
            export_oversample: 2.0,
            export_bucket: "designs".to_owned(),
            export_table: "saved_designs".to_owned(),
            product_id: 1,
            storage_dir: PathBuf::from("studio-data"),
        }
    }
}

impl StudioConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads from an explicit path, else from `GARMENT_STUDIO_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match path {
            Some(path) => {
                log::info!("Loading studio config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::square(self.viewport_size).with_background(self.background)
    }
}
