//! Visibility rules for Slotbar
//!
//! Tracks two independent concerns:
//!
//! - **Action rules**: who may see an action anywhere, as a mode
//!   (`Everyone`, `AdministratorsOnly`, `Selected`) summarizing per-user overrides
//! - **Slot overrides**: which primary slot indices are hidden from a given user
//!
//! Administrators always see everything. The mode of an action is re-derived
//! from its overrides on every override edit, so it never disagrees with them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │       VisibilityEngine       │
//! │  ┌────────────┐ ┌─────────┐  │
//! │  │ ActionRule │ │  Slot   │  │
//! │  │ per action │ │ per user│  │
//! │  └────────────┘ └─────────┘  │
//! └──────────────┬───────────────┘
//!                ▼
//!        BlobStore (slot-tree)
//! ```

pub mod engine;
pub mod types;

// Re-export main types for convenience
pub use engine::{VisibilityEngine, DEFAULT_VISIBILITY_KEY};
pub use types::*;
