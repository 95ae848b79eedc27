//! Slot Tree for Slotbar
//!
//! This crate owns the two-level arrangement of display positions that
//! actions are bound into:
//!
//! - **Primary slots**: `PRIMARY_SLOT_COUNT` top-level positions
//! - **Secondary slots**: `SECONDARY_SLOT_COUNT` child positions under each primary slot
//!
//! Slot identifiers are derived from position (`primary-<i>`,
//! `primary-<i>-secondary-<j>`) and never change. An action id is bound to at
//! most one slot at any time; binding it elsewhere first clears the old slot.
//!
//! # Key Components
//!
//! - [`SlotTree`]: The persisted tree and its invariant-preserving edits
//! - [`SlotTreeManager`]: Async owner of the tree that persists after every mutation
//! - [`BlobStore`]: Trait for the host's key/value configuration storage
//!
//! # Example
//!
//! ```ignore
//! use slot_tree::{Action, ActionKind, MemoryBlobStore, SlotTreeManager};
//!
//! let manager = SlotTreeManager::new(Arc::new(MemoryBlobStore::new()));
//! manager.initialize().await;
//!
//! manager.assign("primary-0", Action::new("close", "Close", ActionKind::Standard)).await?;
//! assert_eq!(manager.slot_bound_to("close").await.unwrap().id(), "primary-0");
//! ```

pub mod manager;
pub mod storage;
pub mod tree;
pub mod types;

// Re-export main types
pub use manager::{SlotError, SlotTreeManager, DEFAULT_SLOT_KEY};
pub use storage::{BlobStore, JsonFileBlobStore, MemoryBlobStore, StorageError};
pub use tree::{DecodedTree, MigrationReport, SlotTree};
pub use types::*;
