//! Shared types for the Slotbar orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use slot_tree::{SlotError, SlotTree, StorageError};
use visibility::VisibilityRecord;

/// Error types for Slotbar operations.
#[derive(Debug, thiserror::Error)]
pub enum SlotbarError {
    /// Neither the catalog nor the registry knows the action
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Registration rejected
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    /// Slot tree error
    #[error("Slot error: {0}")]
    Slot(#[from] SlotError),

    /// Storage could not be opened
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for Slotbar operations.
pub type Result<T> = std::result::Result<T, SlotbarError>;

/// Both configuration blobs captured together, for backups and support requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationExport {
    /// When the export was taken
    pub exported_at: DateTime<Utc>,
    /// Slot tree at export time
    pub slots: SlotTree,
    /// Visibility rules at export time
    pub visibility: VisibilityRecord,
}
