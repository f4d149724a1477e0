use egui::{Color32, Pos2};

use crate::error::ToolError;
use crate::scene::object::ObjectId;
use crate::scene::transform::TransformDelta;
use crate::tools::Studio;

/// Actions the presentation layer can request of a studio
#[derive(Clone)]
pub enum Command {
    /// Change the garment color
    Recolor(Color32),
    /// Add the default text label
    AddText,
    /// Add an image from encoded file bytes
    UploadImage(Vec<u8>),
    /// Remove the selected object
    DeleteSelected,
    /// Select an object by id, or clear the selection
    Select(Option<ObjectId>),
    /// Select whatever is on top at a viewport point
    SelectAt(Pos2),
    /// Move, scale or rotate the selected object
    TransformSelected(TransformDelta),
    BringForward,
    SendBackward,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Recolor(color) => f
                .debug_tuple("Recolor")
                .field(&crate::color::to_hex(*color))
                .finish(),
            Command::AddText => write!(f, "AddText"),
            Command::UploadImage(bytes) => f
                .debug_struct("UploadImage")
                .field("bytes", &bytes.len())
                .finish(),
            Command::DeleteSelected => write!(f, "DeleteSelected"),
            Command::Select(id) => f.debug_tuple("Select").field(id).finish(),
            Command::SelectAt(point) => f.debug_tuple("SelectAt").field(point).finish(),
            Command::TransformSelected(delta) => f
                .debug_tuple("TransformSelected")
                .field(delta)
                .finish(),
            Command::BringForward => write!(f, "BringForward"),
            Command::SendBackward => write!(f, "SendBackward"),
        }
    }
}

/// What executing a command did to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Changed,
    Added(ObjectId),
    Removed(ObjectId),
}

impl Outcome {
    fn changed(changed: bool) -> Self {
        if changed { Outcome::Changed } else { Outcome::Unchanged }
    }
}

impl Command {
    /// Execute the command against the studio
    pub fn execute(&self, studio: &mut Studio) -> Result<Outcome, ToolError> {
        log::debug!("Executing {self:?}");
        let outcome = match self {
            Command::Recolor(color) => Outcome::changed(studio.recolor(*color)),
            Command::AddText => Outcome::Added(studio.add_text()?),
            Command::UploadImage(bytes) => Outcome::Added(studio.upload_image(bytes)?),
            Command::DeleteSelected => match studio.delete_selected() {
                Some(id) => Outcome::Removed(id),
                None => Outcome::Unchanged,
            },
            Command::Select(id) => {
                let before = studio.selection();
                studio.select(*id);
                Outcome::changed(before != studio.selection())
            }
            Command::SelectAt(point) => {
                let before = studio.selection();
                Outcome::changed(before != studio.select_at(*point))
            }
            Command::TransformSelected(delta) => {
                Outcome::changed(studio.transform_selected(*delta))
            }
            Command::BringForward => Outcome::changed(studio.bring_forward()),
            Command::SendBackward => Outcome::changed(studio.send_backward()),
        };
        Ok(outcome)
    }
}
