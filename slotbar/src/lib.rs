//! Slotbar - slot assignment and per-user visibility
//!
//! Lets an administrator bind actions into a fixed two-level arrangement of
//! slots and control which slots and actions each user sees:
//!
//! - **Slot tree** ([`slot_tree`]): positions, bindings, migration
//! - **Visibility** ([`visibility`]): per-action modes and per-user hidden slots
//! - **Orchestration** (this crate): action sources, combined per-user layout
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                       Slotbar                        │
//! │                                                      │
//! │  ┌─────────────┐  ┌───────────────┐  ┌────────────┐  │
//! │  │ActionCatalog│  │SlotTreeManager│  │ Visibility │  │
//! │  │ + Registry  │  │               │  │   Engine   │  │
//! │  └─────────────┘  └───────┬───────┘  └─────┬──────┘  │
//! │                           └───────┬────────┘         │
//! │                            ┌──────▼──────┐           │
//! │                            │ HeaderLayout│           │
//! │                            └─────────────┘           │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod hub;
pub mod layout;
pub mod types;

// Re-export main types
pub use catalog::{ActionCatalog, ActionRegistration, ActionRegistry, StandardCatalog};
pub use config::SlotbarConfig;
pub use hub::Slotbar;
pub use layout::{HeaderLayout, PrimaryEntry, SecondaryEntry};
pub use types::*;

pub use slot_tree;
pub use visibility;
