//! Keeps the open design in the app's key-value storage between sessions.
//!
//! eframe's own `set_value`/`get_value` go through RON, which cannot read
//! back the tagged payloads of a snapshot. The snapshot is stored as JSON
//! text instead, the same encoding the record store uses.

use thiserror::Error;

use crate::scene::snapshot::SceneSnapshot;

/// Storage key of the saved design.
pub const SCENE_KEY: &str = "garment_studio_scene";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to encode design: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Writes `snapshot` under [`SCENE_KEY`].
pub fn save_scene(
    storage: &mut dyn eframe::Storage,
    snapshot: &SceneSnapshot,
) -> Result<(), PersistenceError> {
    let json = snapshot.to_json_string()?;
    log::debug!("Saving design ({} bytes)", json.len());
    storage.set_string(SCENE_KEY, json);
    Ok(())
}

/// Reads the saved design back. A missing key yields `None`; unreadable
/// contents are logged and also yield `None`.
pub fn load_scene(storage: &dyn eframe::Storage) -> Option<SceneSnapshot> {
    let json = storage.get_string(SCENE_KEY)?;
    match SceneSnapshot::from_json_str(&json) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            log::warn!("Ignoring unreadable saved design: {err}");
            None
        }
    }
}
