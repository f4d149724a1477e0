use thiserror::Error;

/// The garment base raster could not be loaded.
///
/// Recoverable: the scene keeps rendering without a garment layer and
/// recoloring becomes a no-op.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("garment asset `{reference}` could not be read: {source}")]
    Read {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    #[error("garment asset `{reference}` is not a valid image: {source}")]
    Decode {
        reference: String,
        #[source]
        source: image::ImageError,
    },

    #[error("garment asset `{0}` is not available")]
    Missing(String),
}

/// Uploaded bytes could not be decoded into a raster.
#[derive(Debug, Error)]
#[error("uploaded file is not a valid image: {0}")]
pub struct DecodeError(#[from] pub image::ImageError);

/// Errors raised by the scene graph itself.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A programming error: the requested mutation would break a scene invariant.
    #[error("scene invariant violated: {0}")]
    InvariantViolation(String),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshot { found: u32, expected: u32 },

    #[error(transparent)]
    Asset(#[from] AssetLoadError),
}

/// Errors surfaced by tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}
