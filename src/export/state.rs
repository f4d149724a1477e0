//! Lifecycle of one export run.
//!
//! ```text
//! Idle ─► Rasterizing ─► Uploading ─► RecordWriting ─► Committed
//!              │             │              │
//!              └─────────────┴──────────────┴──► Errored
//! ```
//!
//! `Committed` and `Errored` are terminal for a run; a new run may start from
//! either, or from `Idle`.

use super::store::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Rasterizing,
    Uploading,
    RecordWriting,
}

impl std::fmt::Display for ExportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportStage::Rasterizing => "rasterizing",
            ExportStage::Uploading => "uploading",
            ExportStage::RecordWriting => "record writing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Rasterizing,
    Uploading,
    RecordWriting,
    Committed(RecordId),
    /// The run failed during the given stage
    Errored(ExportStage),
}

impl ExportState {
    /// Validates whether a transition to the new state is allowed
    pub fn can_transition_to(&self, next: &ExportState) -> bool {
        match (self, next) {
            // A fresh run can start from any resting state
            (
                ExportState::Idle | ExportState::Committed(_) | ExportState::Errored(_),
                ExportState::Rasterizing,
            ) => true,

            (ExportState::Rasterizing, ExportState::Uploading) => true,
            (ExportState::Uploading, ExportState::RecordWriting) => true,
            (ExportState::RecordWriting, ExportState::Committed(_)) => true,

            (ExportState::Rasterizing, ExportState::Errored(ExportStage::Rasterizing)) => true,
            (ExportState::Uploading, ExportState::Errored(ExportStage::Uploading)) => true,
            (ExportState::RecordWriting, ExportState::Errored(ExportStage::RecordWriting)) => true,

            _ => false,
        }
    }

    /// True while a run occupies the pipeline
    pub fn is_in_flight(&self) -> bool {
        self.stage().is_some()
    }

    /// The stage currently running, if any
    pub fn stage(&self) -> Option<ExportStage> {
        match self {
            ExportState::Rasterizing => Some(ExportStage::Rasterizing),
            ExportState::Uploading => Some(ExportStage::Uploading),
            ExportState::RecordWriting => Some(ExportStage::RecordWriting),
            _ => None,
        }
    }
}
