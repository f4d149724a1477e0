use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::AssetLoadError;

/// Source of garment base artwork, addressed by a stable reference.
pub trait GarmentAssets {
    fn load(&self, reference: &str) -> Result<RgbaImage, AssetLoadError>;
}

/// Loads artwork from files under a root directory.
#[derive(Debug, Clone)]
pub struct FsAssets {
    root: PathBuf,
}

impl FsAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl GarmentAssets for FsAssets {
    fn load(&self, reference: &str) -> Result<RgbaImage, AssetLoadError> {
        let path = self.root.join(reference);
        log::info!("Loading garment asset from {}", path.display());
        let bytes = std::fs::read(&path).map_err(|source| AssetLoadError::Read {
            reference: reference.to_owned(),
            source,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|source| AssetLoadError::Decode {
            reference: reference.to_owned(),
            source,
        })?;
        Ok(image.to_rgba8())
    }
}

/// Artwork held in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    rasters: HashMap<String, RgbaImage>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: impl Into<String>, raster: RgbaImage) -> Self {
        self.insert(reference, raster);
        self
    }

    pub fn insert(&mut self, reference: impl Into<String>, raster: RgbaImage) {
        self.rasters.insert(reference.into(), raster);
    }
}

impl GarmentAssets for MemoryAssets {
    fn load(&self, reference: &str) -> Result<RgbaImage, AssetLoadError> {
        self.rasters
            .get(reference)
            .cloned()
            .ok_or_else(|| AssetLoadError::Missing(reference.to_owned()))
    }
}
