//! Visibility rule types.
//!
//! The persisted record keeps the stored blob's field names (`buttons`,
//! `slots`, `users`) and mode strings (`all`, `gm-only`, `selected`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Who may see an action.
///
/// The mode is a summary of the rule's per-user overrides and is re-derived
/// whenever an override changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum VisibilityMode {
    /// Every user sees the action
    #[default]
    #[serde(rename = "all")]
    Everyone,
    /// Only administrators see the action
    #[serde(rename = "gm-only")]
    AdministratorsOnly,
    /// Everyone except users with an explicit `false` override
    #[serde(rename = "selected")]
    Selected,
}

impl VisibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Everyone => "all",
            Self::AdministratorsOnly => "gm-only",
            Self::Selected => "selected",
        }
    }
}

impl std::str::FromStr for VisibilityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "everyone" => Ok(Self::Everyone),
            "gm-only" | "administrators-only" => Ok(Self::AdministratorsOnly),
            "selected" => Ok(Self::Selected),
            other => Err(format!("unknown visibility mode: {other}")),
        }
    }
}

impl VisibilityMode {
    /// Read a stored mode, treating a missing or unknown value as `Everyone`.
    pub fn from_stored(raw: Option<&Value>) -> Self {
        raw.and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

fn lenient_mode<'de, D>(deserializer: D) -> Result<VisibilityMode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(VisibilityMode::from_stored(Some(&raw)))
}

/// Visibility rule for one action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ActionRule {
    /// Summary of `users`
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: VisibilityMode,
    /// Per-user overrides; `false` excludes the user
    #[serde(default)]
    pub users: BTreeMap<String, bool>,
}

impl ActionRule {
    /// Whether a non-administrator with `user_id` passes this rule.
    pub fn allows(&self, user_id: &str) -> bool {
        match self.mode {
            VisibilityMode::Everyone => true,
            VisibilityMode::AdministratorsOnly => false,
            VisibilityMode::Selected => self.users.get(user_id) != Some(&false),
        }
    }

    /// Recompute `mode` from the overrides of the given non-administrators.
    ///
    /// A user counts as allowed unless their override is explicitly `false`.
    /// All allowed (including an empty roster) gives `Everyone`, none allowed
    /// gives `AdministratorsOnly`, anything in between gives `Selected`.
    pub fn derive_mode<'a>(&mut self, non_admin_ids: impl IntoIterator<Item = &'a str>) {
        let mut total = 0usize;
        let mut allowed = 0usize;
        for id in non_admin_ids {
            total += 1;
            if self.users.get(id) != Some(&false) {
                allowed += 1;
            }
        }

        self.mode = if allowed == total {
            VisibilityMode::Everyone
        } else if allowed == 0 {
            VisibilityMode::AdministratorsOnly
        } else {
            VisibilityMode::Selected
        };
    }
}

/// Per-user map of primary slot index to "hidden for this user".
pub type SlotOverrides = BTreeMap<usize, bool>;

/// The whole visibility configuration as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct VisibilityRecord {
    /// Rules keyed by action id
    #[serde(rename = "buttons", default)]
    pub action_rules: BTreeMap<String, ActionRule>,
    /// Hidden primary slots keyed by user id
    #[serde(rename = "slots", default)]
    pub user_slot_overrides: BTreeMap<String, SlotOverrides>,
}

/// Outcome of decoding a stored visibility blob entry by entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedRecord {
    pub record: VisibilityRecord,
    /// Paths of entries that could not be read and were left out
    pub skipped: Vec<String>,
}

impl VisibilityRecord {
    /// Decode a stored blob, keeping every entry that can be read.
    ///
    /// A rule with a missing or unknown mode is read as `Everyone`; override
    /// values that are not booleans and slot keys that are not indices are
    /// left out. Returns `None` when the blob is not an object.
    pub fn from_blob(blob: &Value) -> Option<DecodedRecord> {
        let fields = blob.as_object()?;
        let mut decoded = DecodedRecord::default();

        if let Some(buttons) = fields.get("buttons").and_then(Value::as_object) {
            for (action_id, raw) in buttons {
                let Some(raw) = raw.as_object() else {
                    decoded.skipped.push(format!("buttons.{action_id}"));
                    continue;
                };

                let mut rule = ActionRule {
                    mode: VisibilityMode::from_stored(raw.get("mode")),
                    users: BTreeMap::new(),
                };
                for (user_id, value) in raw.get("users").and_then(Value::as_object).into_iter().flatten() {
                    match value.as_bool() {
                        Some(can_see) => {
                            rule.users.insert(user_id.clone(), can_see);
                        }
                        None => decoded.skipped.push(format!("buttons.{action_id}.users.{user_id}")),
                    }
                }
                decoded.record.action_rules.insert(action_id.clone(), rule);
            }
        }

        if let Some(slots) = fields.get("slots").and_then(Value::as_object) {
            for (user_id, raw) in slots {
                let Some(raw) = raw.as_object() else {
                    decoded.skipped.push(format!("slots.{user_id}"));
                    continue;
                };

                let mut overrides = SlotOverrides::new();
                for (index, value) in raw {
                    match (index.parse::<usize>(), value.as_bool()) {
                        (Ok(index), Some(hidden)) => {
                            overrides.insert(index, hidden);
                        }
                        _ => decoded.skipped.push(format!("slots.{user_id}.{index}")),
                    }
                }
                decoded
                    .record
                    .user_slot_overrides
                    .insert(user_id.clone(), overrides);
            }
        }

        Some(decoded)
    }
}

/// A user as far as visibility is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Administrators bypass every visibility rule
    pub is_admin: bool,
}

impl User {
    /// A regular user.
    pub fn player(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_admin: false,
        }
    }

    /// An administrator.
    pub fn admin(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_admin: true,
        }
    }
}

/// One row of an action's per-user visibility report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVisibility {
    pub id: String,
    pub name: String,
    pub can_see: bool,
}
