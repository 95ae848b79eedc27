//! Core types for the slot tree.
//!
//! These types are the persisted shape of the slot configuration. Field names
//! follow the stored blob (`button`, `subSlots`, `parentIndex`, `type`).
//! Positional fields (`id`, `index`, `parentIndex`) may be missing or use the
//! older `main-<i>` / `main-<i>-sub-<j>` naming; [`crate::SlotTree::migrate`]
//! rewrites them from each slot's position after loading.
//!
//! With the `typescript` feature enabled, these types can be exported to TypeScript
//! using ts-rs for consistency with a web rendering consumer.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Number of primary slots in the tree.
pub const PRIMARY_SLOT_COUNT: usize = 8;

/// Number of secondary slots under each primary slot.
pub const SECONDARY_SLOT_COUNT: usize = 5;

/// Identifier of the primary slot at `index`.
pub fn primary_slot_id(index: usize) -> String {
    format!("primary-{index}")
}

/// Identifier of the secondary slot at `index` under primary slot `parent_index`.
pub fn secondary_slot_id(parent_index: usize, index: usize) -> String {
    format!("primary-{parent_index}-secondary-{index}")
}

/// Category of an action, as reported by the catalog that discovered it.
///
/// Older blobs used `module` and `api`; both are still accepted on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Built-in window control (close, minimize, ...)
    Standard,
    /// Action contributed by a detected host integration
    #[serde(alias = "module")]
    Integration,
    /// Opens a sidebar tab
    Sidebar,
    /// Registered at runtime through the API
    #[default]
    #[serde(alias = "api")]
    Custom,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Integration => "integration",
            Self::Sidebar => "sidebar",
            Self::Custom => "custom",
        }
    }
}

/// A bindable action.
///
/// Slots hold copies of actions, never references back into the catalog.
/// Editing catalog metadata does not change an action already bound to a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Action {
    /// Globally unique identifier
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Icon reference (icon font class or similar)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Image reference; takes precedence over `icon` when rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// What kind of action this is
    #[serde(rename = "type", default)]
    pub kind: ActionKind,
    /// Name of the host handler that runs the action
    #[serde(rename = "action", default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    /// Opaque data used only when the action is activated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Action {
    /// Create an action with a label and no icon, image or payload.
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            icon: None,
            image: None,
            kind,
            handler: None,
            payload: None,
        }
    }

    /// Builder: set the host handler name.
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Builder: set icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Builder: set image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Builder: set activation payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Stored `type` tag of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Main,
    Sub,
}

impl SlotKind {
    fn main() -> Self {
        Self::Main
    }

    fn sub() -> Self {
        Self::Sub
    }
}

/// A top-level slot with its secondary slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PrimarySlot {
    /// Positional identifier (`primary-<i>`)
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "SlotKind::main")]
    pub kind: SlotKind,
    /// Position among primary slots
    #[serde(default)]
    pub index: usize,
    /// Action bound to this slot, if any
    #[serde(rename = "button", default)]
    pub bound_action: Option<Action>,
    /// Hidden slots are not rendered, nor are their children
    #[serde(default)]
    pub hidden: bool,
    /// Secondary slots in index order
    #[serde(default)]
    pub sub_slots: Vec<SecondarySlot>,
}

impl PrimarySlot {
    /// An unbound, visible primary slot with a full set of secondary slots.
    pub fn empty(index: usize) -> Self {
        Self {
            id: primary_slot_id(index),
            kind: SlotKind::Main,
            index,
            bound_action: None,
            hidden: false,
            sub_slots: (0..SECONDARY_SLOT_COUNT)
                .map(|j| SecondarySlot::empty(index, j))
                .collect(),
        }
    }
}

/// A child slot of a primary slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SecondarySlot {
    /// Positional identifier (`primary-<i>-secondary-<j>`)
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "SlotKind::sub")]
    pub kind: SlotKind,
    /// Index of the owning primary slot
    #[serde(default)]
    pub parent_index: usize,
    /// Position under the parent
    #[serde(default)]
    pub index: usize,
    #[serde(rename = "button", default)]
    pub bound_action: Option<Action>,
    #[serde(default)]
    pub hidden: bool,
}

impl SecondarySlot {
    /// An unbound, visible secondary slot.
    pub fn empty(parent_index: usize, index: usize) -> Self {
        Self {
            id: secondary_slot_id(parent_index, index),
            kind: SlotKind::Sub,
            parent_index,
            index,
            bound_action: None,
            hidden: false,
        }
    }
}

/// Owned view of either kind of slot, as returned by lookups.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Primary(PrimarySlot),
    Secondary(SecondarySlot),
}

impl Slot {
    pub fn id(&self) -> &str {
        match self {
            Self::Primary(slot) => &slot.id,
            Self::Secondary(slot) => &slot.id,
        }
    }

    pub fn bound_action(&self) -> Option<&Action> {
        match self {
            Self::Primary(slot) => slot.bound_action.as_ref(),
            Self::Secondary(slot) => slot.bound_action.as_ref(),
        }
    }

    pub fn hidden(&self) -> bool {
        match self {
            Self::Primary(slot) => slot.hidden,
            Self::Secondary(slot) => slot.hidden,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary(_))
    }
}

/// Position of a slot in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotAddress {
    Primary(usize),
    Secondary { primary: usize, secondary: usize },
}
