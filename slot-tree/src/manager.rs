//! Slot tree management and persistence.
//!
//! [`SlotTreeManager`] owns the authoritative slot tree. Every mutation is
//! applied in memory first and then the whole tree is saved under a single
//! blob key. A failed save is logged and the in-memory state stays
//! authoritative for the rest of the process lifetime.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::storage::BlobStore;
use crate::tree::SlotTree;
use crate::types::*;

/// Default blob key for the slot configuration.
pub const DEFAULT_SLOT_KEY: &str = "slot_configuration";

/// Error types for slot tree operations.
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    /// No slot has the given identifier
    #[error("Slot not found: {0}")]
    NotFound(String),

    /// The action is not bound to any slot
    #[error("Action not assigned to any slot: {0}")]
    NotAssigned(String),

    /// The slot has no bound action to operate on
    #[error("Slot has no action bound: {0}")]
    EmptySlot(String),
}

/// Owner of the slot tree and its bindings.
pub struct SlotTreeManager {
    /// Current tree
    tree: Arc<RwLock<SlotTree>>,
    /// Where the tree is persisted
    store: Arc<dyn BlobStore>,
    /// Blob key of the tree
    key: String,
}

impl SlotTreeManager {
    /// Create a manager persisting under [`DEFAULT_SLOT_KEY`].
    ///
    /// The tree starts as the default empty tree until [`initialize`](Self::initialize) runs.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_key(store, DEFAULT_SLOT_KEY)
    }

    /// Create a manager persisting under a custom key.
    pub fn with_key(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            tree: Arc::new(RwLock::new(SlotTree::default())),
            store,
            key: key.into(),
        }
    }

    /// Blob key this manager saves under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted tree, migrating it to the current shape.
    ///
    /// Unreadable slots and bindings are replaced individually and the rest
    /// of the stored tree is kept. Falls back to the default tree only when
    /// nothing is stored or the blob has no slot list.
    pub async fn initialize(&self) {
        let loaded = match self.store.load_blob(&self.key).await {
            Ok(Some(blob)) => match SlotTree::from_blob(blob) {
                Some(decoded) => {
                    if !decoded.replaced_slots.is_empty() || !decoded.dropped_bindings.is_empty() {
                        warn!(
                            key = %self.key,
                            replaced_slots = ?decoded.replaced_slots,
                            dropped_bindings = ?decoded.dropped_bindings,
                            "Skipped unreadable entries in slot configuration"
                        );
                    }
                    Some(decoded.tree)
                }
                None => {
                    warn!(key = %self.key, "Unreadable slot configuration, using defaults");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "No saved slot configuration, using defaults");
                None
            }
        };

        let tree = match loaded {
            Some(mut tree) => {
                let report = tree.migrate();
                if report.changed() {
                    info!(
                        added_primary = report.added_primary,
                        added_secondary = report.added_secondary,
                        renamed = report.renamed,
                        "Migrated slot configuration"
                    );
                }
                if report.has_surplus {
                    warn!(
                        primary_slots = tree.slots.len(),
                        "Slot configuration has more slots than the current layout; extra slots ignored"
                    );
                }
                tree
            }
            None => SlotTree::default(),
        };

        *self.tree.write().await = tree;
        info!(key = %self.key, "Slot tree initialized");
    }

    /// Primary slot at `index`, or `None` when out of range.
    pub async fn primary_slot(&self, index: usize) -> Option<PrimarySlot> {
        self.tree.read().await.primary(index).cloned()
    }

    /// Secondary slot at (`primary_index`, `sub_index`), or `None` when out of range.
    pub async fn secondary_slot(&self, primary_index: usize, sub_index: usize) -> Option<SecondarySlot> {
        self.tree
            .read()
            .await
            .secondary(primary_index, sub_index)
            .cloned()
    }

    /// Slot with the given identifier.
    pub async fn find_slot(&self, slot_id: &str) -> Option<Slot> {
        let tree = self.tree.read().await;
        tree.find(slot_id).and_then(|address| tree.slot(address))
    }

    /// The slot currently holding `action_id`.
    pub async fn slot_bound_to(&self, action_id: &str) -> Option<Slot> {
        let tree = self.tree.read().await;
        tree.find_bound(action_id)
            .and_then(|address| tree.slot(address))
    }

    /// Whether `action_id` is bound anywhere in the tree.
    pub async fn is_assigned(&self, action_id: &str) -> bool {
        self.tree.read().await.find_bound(action_id).is_some()
    }

    /// Bind `action` to `slot_id`, moving it out of any slot that held it before.
    ///
    /// Overwrites whatever the target slot held.
    pub async fn assign(&self, slot_id: &str, action: Action) -> Result<(), SlotError> {
        {
            let mut tree = self.tree.write().await;
            let Some(address) = tree.find(slot_id) else {
                warn!(slot_id = %slot_id, "Cannot assign to unknown slot");
                return Err(SlotError::NotFound(slot_id.to_string()));
            };

            let action_id = action.id.clone();
            if let Some(displaced) = tree.bind(address, action) {
                debug!(slot_id = %slot_id, displaced = %displaced.id, "Replaced slot occupant");
            }
            debug!(slot_id = %slot_id, action_id = %action_id, "Assigned action");
        }

        self.persist().await;
        Ok(())
    }

    /// Clear the binding of `action_id`, wherever it is. Returns whether anything changed.
    pub async fn unassign(&self, action_id: &str) -> bool {
        let changed = self.tree.write().await.unbind(action_id);
        if changed {
            debug!(action_id = %action_id, "Unassigned action");
            self.persist().await;
        }
        changed
    }

    /// Clear whatever is bound to `slot_id`, returning the removed action.
    pub async fn clear_slot(&self, slot_id: &str) -> Result<Option<Action>, SlotError> {
        let cleared = {
            let mut tree = self.tree.write().await;
            let address = tree
                .find(slot_id)
                .ok_or_else(|| SlotError::NotFound(slot_id.to_string()))?;
            tree.clear(address)
        };

        debug!(slot_id = %slot_id, "Cleared slot");
        self.persist().await;
        Ok(cleared)
    }

    /// Set the slot's own hidden flag.
    ///
    /// Hiding a primary slot does not touch its children's flags; consumers
    /// treat the children as hidden too when rendering.
    pub async fn set_hidden(&self, slot_id: &str, hidden: bool) -> Result<(), SlotError> {
        {
            let mut tree = self.tree.write().await;
            let address = tree
                .find(slot_id)
                .ok_or_else(|| SlotError::NotFound(slot_id.to_string()))?;
            tree.set_hidden(address, hidden);
        }

        debug!(slot_id = %slot_id, hidden, "Set slot hidden flag");
        self.persist().await;
        Ok(())
    }

    /// Move an already bound action to another slot, keeping its bound copy.
    pub async fn move_action(&self, action_id: &str, target_slot_id: &str) -> Result<(), SlotError> {
        let action = {
            let tree = self.tree.read().await;
            tree.find_bound(action_id)
                .and_then(|address| tree.slot(address))
                .and_then(|slot| slot.bound_action().cloned())
                .ok_or_else(|| SlotError::NotAssigned(action_id.to_string()))?
        };

        self.assign(target_slot_id, action).await
    }

    /// Set or clear the custom image of the action bound at `slot_id`.
    pub async fn set_custom_image(&self, slot_id: &str, image: Option<String>) -> Result<(), SlotError> {
        {
            let mut tree = self.tree.write().await;
            let address = tree
                .find(slot_id)
                .ok_or_else(|| SlotError::NotFound(slot_id.to_string()))?;
            let action = tree
                .binding_mut(address)
                .and_then(|binding| binding.as_mut())
                .ok_or_else(|| SlotError::EmptySlot(slot_id.to_string()))?;
            action.image = image;
        }

        debug!(slot_id = %slot_id, "Updated custom image");
        self.persist().await;
        Ok(())
    }

    /// All bound actions in tree order.
    pub async fn assigned_actions(&self) -> Vec<Action> {
        self.tree.read().await.assigned_actions()
    }

    /// Every slot, each primary followed by its secondaries.
    pub async fn all_slots(&self) -> Vec<Slot> {
        self.tree.read().await.all_slots()
    }

    /// Copy of the current tree.
    pub async fn snapshot(&self) -> SlotTree {
        self.tree.read().await.clone()
    }

    /// Replace the tree with the default empty tree and persist it.
    pub async fn reset(&self) {
        *self.tree.write().await = SlotTree::default();
        info!(key = %self.key, "Slot tree reset");
        self.persist().await;
    }

    /// Persist the current tree without changing it.
    pub async fn save(&self) {
        self.persist().await;
    }

    async fn persist(&self) {
        let blob = {
            let tree = self.tree.read().await;
            serde_json::to_value(&*tree)
        };

        let blob = match blob {
            Ok(blob) => blob,
            Err(e) => {
                error!(key = %self.key, error = %e, "Failed to serialize slot configuration");
                return;
            }
        };

        match self.store.save_blob(&self.key, &blob).await {
            Ok(()) => debug!(key = %self.key, "Slot configuration saved"),
            Err(e) => error!(key = %self.key, error = %e, "Failed to save slot configuration"),
        }
    }
}
