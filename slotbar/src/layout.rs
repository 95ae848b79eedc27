//! Per-user header projection.
//!
//! Combines the slot tree with the visibility rules into exactly what one
//! user should be shown. Rendering and activation are left to the consumer.

use serde::{Deserialize, Serialize};

use slot_tree::{Action, SlotTree};
use visibility::{User, VisibilityEngine};

/// Everything one user may see, in slot order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderLayout {
    pub user_id: String,
    /// Visible primary slots in index order
    pub entries: Vec<PrimaryEntry>,
}

/// A visible primary slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryEntry {
    pub slot_id: String,
    pub index: usize,
    /// `None` when the slot is empty or its action is not visible to the user
    pub action: Option<Action>,
    /// Visible, bound secondary slots in index order
    pub children: Vec<SecondaryEntry>,
}

impl PrimaryEntry {
    /// Whether the entry shows nothing but a blank position.
    pub fn is_blank(&self) -> bool {
        self.action.is_none() && self.children.is_empty()
    }
}

/// A visible, bound secondary slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryEntry {
    pub slot_id: String,
    pub index: usize,
    pub action: Action,
}

impl HeaderLayout {
    /// Project `tree` for `user`.
    ///
    /// A primary slot is dropped when it is hidden or hidden for this user,
    /// which also drops its children. Secondary slots are dropped when hidden,
    /// empty, or bound to an action the user may not see.
    pub async fn build(tree: &SlotTree, visibility: &VisibilityEngine, user: &User) -> Self {
        let mut entries = Vec::new();

        for primary in &tree.slots {
            if tree.primary(primary.index).is_none() {
                continue;
            }
            if primary.hidden || !visibility.can_user_see_slot(user, primary.index).await {
                continue;
            }

            let action = match &primary.bound_action {
                Some(action) if visibility.can_user_see_action(user, &action.id).await => {
                    Some(action.clone())
                }
                _ => None,
            };

            let mut children = Vec::new();
            for secondary in &primary.sub_slots {
                if secondary.hidden {
                    continue;
                }
                let Some(action) = &secondary.bound_action else {
                    continue;
                };
                if visibility.can_user_see_action(user, &action.id).await {
                    children.push(SecondaryEntry {
                        slot_id: secondary.id.clone(),
                        index: secondary.index,
                        action: action.clone(),
                    });
                }
            }

            entries.push(PrimaryEntry {
                slot_id: primary.id.clone(),
                index: primary.index,
                action,
                children,
            });
        }

        Self {
            user_id: user.id.clone(),
            entries,
        }
    }

    /// Visible actions in slot order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.entries.iter().flat_map(|entry| {
            entry
                .action
                .iter()
                .chain(entry.children.iter().map(|child| &child.action))
        })
    }

    /// Entry for the primary slot at `index`, if visible.
    pub fn entry(&self, index: usize) -> Option<&PrimaryEntry> {
        self.entries.iter().find(|entry| entry.index == index)
    }
}
