//! Visibility engine for tracking who may see which actions and slots.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use slot_tree::{BlobStore, PRIMARY_SLOT_COUNT};

use crate::types::*;

/// Default blob key for the visibility configuration.
pub const DEFAULT_VISIBILITY_KEY: &str = "visibility";

/// Owner of action visibility rules and per-user hidden slots.
///
/// Callers pass the querying user, including the administrator flag, into
/// every check. Operations that derive or populate overrides take the current
/// user roster explicitly.
pub struct VisibilityEngine {
    /// Current rules
    record: Arc<RwLock<VisibilityRecord>>,
    /// Where the rules are persisted
    store: Arc<dyn BlobStore>,
    /// Blob key of the rules
    key: String,
}

impl VisibilityEngine {
    /// Create an engine persisting under [`DEFAULT_VISIBILITY_KEY`].
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_key(store, DEFAULT_VISIBILITY_KEY)
    }

    /// Create an engine persisting under a custom key.
    pub fn with_key(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            record: Arc::new(RwLock::new(VisibilityRecord::default())),
            store,
            key: key.into(),
        }
    }

    /// Blob key this engine saves under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load persisted rules, defaulting to an empty record.
    ///
    /// Unreadable rules and overrides are left out individually; the rest of
    /// the stored record is kept.
    pub async fn initialize(&self) {
        let record = match self.store.load_blob(&self.key).await {
            Ok(Some(blob)) => match VisibilityRecord::from_blob(&blob) {
                Some(decoded) => {
                    if !decoded.skipped.is_empty() {
                        warn!(
                            key = %self.key,
                            skipped = ?decoded.skipped,
                            "Skipped unreadable entries in visibility configuration"
                        );
                    }
                    decoded.record
                }
                None => {
                    warn!(key = %self.key, "Unreadable visibility configuration, using defaults");
                    VisibilityRecord::default()
                }
            },
            Ok(None) => VisibilityRecord::default(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "No saved visibility configuration, using defaults");
                VisibilityRecord::default()
            }
        };

        *self.record.write().await = record;
        info!(key = %self.key, "Visibility engine initialized");
    }

    /// Whether `user` may see `action_id` anywhere.
    ///
    /// Actions without a rule are visible to everyone.
    pub async fn can_user_see_action(&self, user: &User, action_id: &str) -> bool {
        if user.is_admin {
            return true;
        }

        let record = self.record.read().await;
        record
            .action_rules
            .get(action_id)
            .map(|rule| rule.allows(&user.id))
            .unwrap_or(true)
    }

    /// Set one user's override for an action and re-derive the action's mode.
    ///
    /// The edited user counts as a non-administrator during derivation even
    /// when the roster does not list them, unless the roster marks them as an
    /// administrator.
    pub async fn set_action_visibility(&self, action_id: &str, user_id: &str, can_see: bool, roster: &[User]) {
        let mut counted: BTreeSet<&str> = non_admin_ids(roster).collect();
        if !roster.iter().any(|u| u.is_admin && u.id == user_id) {
            counted.insert(user_id);
        }

        let mode = {
            let mut record = self.record.write().await;
            let rule = record.action_rules.entry(action_id.to_string()).or_default();
            rule.users.insert(user_id.to_string(), can_see);
            rule.derive_mode(counted);
            rule.mode
        };

        debug!(
            action_id = %action_id,
            user_id = %user_id,
            can_see,
            mode = mode.as_str(),
            "Set action visibility"
        );
        self.persist().await;
    }

    /// Set an action's mode directly.
    ///
    /// `Everyone` drops all overrides. `AdministratorsOnly` writes an explicit
    /// `false` for every non-administrator in the roster. `Selected` keeps the
    /// overrides as they are.
    pub async fn set_action_visibility_mode(&self, action_id: &str, mode: VisibilityMode, roster: &[User]) {
        {
            let mut record = self.record.write().await;
            let rule = record.action_rules.entry(action_id.to_string()).or_default();
            rule.mode = mode;

            match mode {
                VisibilityMode::Everyone => rule.users.clear(),
                VisibilityMode::AdministratorsOnly => {
                    for id in non_admin_ids(roster) {
                        rule.users.insert(id.to_string(), false);
                    }
                }
                VisibilityMode::Selected => {}
            }
        }

        debug!(action_id = %action_id, mode = mode.as_str(), "Set action visibility mode");
        self.persist().await;
    }

    /// Whether `user` may see the primary slot at `primary_index`.
    pub async fn can_user_see_slot(&self, user: &User, primary_index: usize) -> bool {
        if user.is_admin {
            return true;
        }

        let record = self.record.read().await;
        let hidden = record
            .user_slot_overrides
            .get(&user.id)
            .and_then(|slots| slots.get(&primary_index))
            .copied();

        hidden != Some(true)
    }

    /// Show or hide the primary slot at `primary_index` for one user.
    pub async fn set_slot_visibility(&self, user_id: &str, primary_index: usize, is_visible: bool) {
        if primary_index >= PRIMARY_SLOT_COUNT {
            warn!(user_id = %user_id, primary_index, "Slot visibility set for index outside the slot tree");
        }

        {
            let mut record = self.record.write().await;
            record
                .user_slot_overrides
                .entry(user_id.to_string())
                .or_default()
                .insert(primary_index, !is_visible);
        }

        debug!(user_id = %user_id, primary_index, is_visible, "Set slot visibility");
        self.persist().await;
    }

    /// Stored rule for an action, or the default open rule.
    pub async fn action_rule(&self, action_id: &str) -> ActionRule {
        let record = self.record.read().await;
        record
            .action_rules
            .get(action_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All stored action rules.
    pub async fn action_rules(&self) -> BTreeMap<String, ActionRule> {
        self.record.read().await.action_rules.clone()
    }

    /// Visibility of an action for each non-administrator in the roster.
    pub async fn users_for_action(&self, action_id: &str, roster: &[User]) -> Vec<UserVisibility> {
        let mut users = Vec::new();
        for user in roster.iter().filter(|u| !u.is_admin) {
            users.push(UserVisibility {
                id: user.id.clone(),
                name: user.name.clone(),
                can_see: self.can_user_see_action(user, action_id).await,
            });
        }
        users
    }

    /// All per-user hidden slot flags.
    pub async fn slot_visibility(&self) -> BTreeMap<String, SlotOverrides> {
        self.record.read().await.user_slot_overrides.clone()
    }

    /// Copy of the whole record.
    pub async fn snapshot(&self) -> VisibilityRecord {
        self.record.read().await.clone()
    }

    /// Replace the rules with the empty default and persist it.
    pub async fn reset(&self) {
        *self.record.write().await = VisibilityRecord::default();
        info!(key = %self.key, "Visibility rules reset");
        self.persist().await;
    }

    /// Persist the current rules without changing them.
    pub async fn save(&self) {
        self.persist().await;
    }

    async fn persist(&self) {
        let blob = {
            let record = self.record.read().await;
            serde_json::to_value(&*record)
        };

        let blob = match blob {
            Ok(blob) => blob,
            Err(e) => {
                error!(key = %self.key, error = %e, "Failed to serialize visibility configuration");
                return;
            }
        };

        match self.store.save_blob(&self.key, &blob).await {
            Ok(()) => debug!(key = %self.key, "Visibility configuration saved"),
            Err(e) => error!(key = %self.key, error = %e, "Failed to save visibility configuration"),
        }
    }
}

fn non_admin_ids(roster: &[User]) -> impl Iterator<Item = &str> {
    roster.iter().filter(|u| !u.is_admin).map(|u| u.id.as_str())
}
