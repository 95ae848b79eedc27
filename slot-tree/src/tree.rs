//! The slot tree data structure.
//!
//! A fixed-shape arena: `PRIMARY_SLOT_COUNT` primary slots, each owning
//! `SECONDARY_SLOT_COUNT` secondary slots, addressed by position. All
//! invariant-preserving edits go through this type; [`crate::SlotTreeManager`]
//! adds locking and persistence on top.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::*;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Outcome of migrating a loaded tree to the current shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Primary slots appended to reach `PRIMARY_SLOT_COUNT`
    pub added_primary: usize,
    /// Secondary slots appended under pre-existing primary slots
    pub added_secondary: usize,
    /// Slots whose id or index did not match their position and were rewritten
    pub renamed: usize,
    /// Slots beyond the current shape were found and left in place
    pub has_surplus: bool,
}

impl MigrationReport {
    /// Whether migration changed the tree.
    pub fn changed(&self) -> bool {
        self.added_primary > 0 || self.added_secondary > 0 || self.renamed > 0
    }
}

/// The whole slot configuration as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SlotTree {
    /// Primary slots in index order
    pub slots: Vec<PrimarySlot>,
}

impl Default for SlotTree {
    fn default() -> Self {
        Self {
            slots: (0..PRIMARY_SLOT_COUNT).map(PrimarySlot::empty).collect(),
        }
    }
}

/// Outcome of decoding a stored blob entry by entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTree {
    pub tree: SlotTree,
    /// Slots that could not be read and were replaced with empty ones
    pub replaced_slots: Vec<String>,
    /// Bindings that could not be read and were dropped, by slot id
    pub dropped_bindings: Vec<String>,
}

impl SlotTree {
    /// Decode a stored blob, keeping every entry that can be read.
    ///
    /// An unreadable slot becomes an empty slot at the same position and an
    /// unreadable binding leaves its slot unbound; the rest of the tree is
    /// kept. A binding without a `label` takes its id as the label. Returns
    /// `None` when the blob has no `slots` list at all.
    pub fn from_blob(mut blob: Value) -> Option<DecodedTree> {
        let Some(Value::Array(primaries)) = blob.get_mut("slots").map(Value::take) else {
            return None;
        };

        let mut decoded = DecodedTree::default();
        let mut slots = Vec::with_capacity(primaries.len());
        for (i, mut raw) in primaries.into_iter().enumerate() {
            let subs = raw.as_object_mut().and_then(|o| o.remove("subSlots"));
            let button = raw.as_object_mut().and_then(|o| o.remove("button"));

            let mut primary = match serde_json::from_value::<PrimarySlot>(raw) {
                Ok(primary) => primary,
                Err(_) => {
                    decoded.replaced_slots.push(primary_slot_id(i));
                    let mut primary = PrimarySlot::empty(i);
                    primary.sub_slots.clear();
                    primary
                }
            };
            primary.bound_action = decode_binding(button, &primary_slot_id(i), &mut decoded.dropped_bindings);

            match subs {
                Some(Value::Array(subs)) => {
                    for (j, mut raw) in subs.into_iter().enumerate() {
                        let button = raw.as_object_mut().and_then(|o| o.remove("button"));
                        let mut secondary = serde_json::from_value::<SecondarySlot>(raw)
                            .unwrap_or_else(|_| {
                                decoded.replaced_slots.push(secondary_slot_id(i, j));
                                SecondarySlot::empty(i, j)
                            });
                        secondary.bound_action =
                            decode_binding(button, &secondary_slot_id(i, j), &mut decoded.dropped_bindings);
                        primary.sub_slots.push(secondary);
                    }
                }
                Some(Value::Null) | None => {}
                Some(_) => decoded.replaced_slots.push(format!("{}/subSlots", primary_slot_id(i))),
            }

            slots.push(primary);
        }

        decoded.tree = SlotTree { slots };
        Some(decoded)
    }

    /// Bring a loaded tree up to the current shape.
    ///
    /// Additive only: missing primary slots are appended with a full set of
    /// secondary slots, and short secondary lists are topped up. Ids and
    /// indices are rewritten from position, which also converts the older
    /// `main-<i>` naming. Bindings and hidden flags are never touched.
    pub fn migrate(&mut self) -> MigrationReport {
        let mut report = MigrationReport::default();

        for (i, primary) in self.slots.iter_mut().enumerate() {
            if primary.id != primary_slot_id(i) || primary.index != i {
                primary.id = primary_slot_id(i);
                primary.index = i;
                report.renamed += 1;
            }
            for (j, secondary) in primary.sub_slots.iter_mut().enumerate() {
                if secondary.id != secondary_slot_id(i, j)
                    || secondary.parent_index != i
                    || secondary.index != j
                {
                    secondary.id = secondary_slot_id(i, j);
                    secondary.parent_index = i;
                    secondary.index = j;
                    report.renamed += 1;
                }
            }
            while primary.sub_slots.len() < SECONDARY_SLOT_COUNT {
                let j = primary.sub_slots.len();
                primary
                    .sub_slots
                    .push(SecondarySlot::empty(primary.index, j));
                report.added_secondary += 1;
            }
            if primary.sub_slots.len() > SECONDARY_SLOT_COUNT {
                report.has_surplus = true;
            }
        }

        while self.slots.len() < PRIMARY_SLOT_COUNT {
            let i = self.slots.len();
            self.slots.push(PrimarySlot::empty(i));
            report.added_primary += 1;
        }
        if self.slots.len() > PRIMARY_SLOT_COUNT {
            report.has_surplus = true;
        }

        report
    }

    /// Primary slot at `index`, if in range.
    pub fn primary(&self, index: usize) -> Option<&PrimarySlot> {
        if index >= PRIMARY_SLOT_COUNT {
            return None;
        }
        self.slots.get(index)
    }

    /// Secondary slot `sub_index` under primary slot `primary_index`, if both are in range.
    pub fn secondary(&self, primary_index: usize, sub_index: usize) -> Option<&SecondarySlot> {
        if sub_index >= SECONDARY_SLOT_COUNT {
            return None;
        }
        self.primary(primary_index)?.sub_slots.get(sub_index)
    }

    /// Locate a slot by its identifier.
    pub fn find(&self, slot_id: &str) -> Option<SlotAddress> {
        self.position_where(|id, _| id == slot_id)
    }

    /// Locate the slot currently bound to `action_id`.
    pub fn find_bound(&self, action_id: &str) -> Option<SlotAddress> {
        self.position_where(|_, action| action.is_some_and(|a| a.id == action_id))
    }

    /// Every slot bound to `action_id`. Holds at most one entry while the tree is valid.
    pub fn bound_slot_ids(&self, action_id: &str) -> Vec<String> {
        self.all_slots()
            .into_iter()
            .filter(|slot| slot.bound_action().is_some_and(|a| a.id == action_id))
            .map(|slot| slot.id().to_string())
            .collect()
    }

    /// Owned view of the slot at `address`.
    pub fn slot(&self, address: SlotAddress) -> Option<Slot> {
        if !in_range(address) {
            return None;
        }
        match address {
            SlotAddress::Primary(i) => self.slots.get(i).cloned().map(Slot::Primary),
            SlotAddress::Secondary { primary, secondary } => self
                .slots
                .get(primary)?
                .sub_slots
                .get(secondary)
                .cloned()
                .map(Slot::Secondary),
        }
    }

    /// Bind `action` at `address`, first clearing any other slot holding the same id.
    ///
    /// Returns the action previously bound at `address`, if it was a different one.
    pub fn bind(&mut self, address: SlotAddress, action: Action) -> Option<Action> {
        self.unbind(&action.id);
        self.binding_mut(address)?.replace(action)
    }

    /// Clear the binding of `action_id` wherever it appears.
    pub fn unbind(&mut self, action_id: &str) -> bool {
        let mut changed = false;
        for primary in self.slots.iter_mut().take(PRIMARY_SLOT_COUNT) {
            changed |= take_if_bound(&mut primary.bound_action, action_id);
            for secondary in primary.sub_slots.iter_mut().take(SECONDARY_SLOT_COUNT) {
                changed |= take_if_bound(&mut secondary.bound_action, action_id);
            }
        }
        changed
    }

    /// Clear whatever is bound at `address`.
    pub fn clear(&mut self, address: SlotAddress) -> Option<Action> {
        self.binding_mut(address)?.take()
    }

    /// Set the hidden flag of the slot at `address`.
    pub fn set_hidden(&mut self, address: SlotAddress, hidden: bool) -> bool {
        if !in_range(address) {
            return false;
        }
        match address {
            SlotAddress::Primary(i) => match self.slots.get_mut(i) {
                Some(slot) => {
                    slot.hidden = hidden;
                    true
                }
                None => false,
            },
            SlotAddress::Secondary { primary, secondary } => {
                match self
                    .slots
                    .get_mut(primary)
                    .and_then(|p| p.sub_slots.get_mut(secondary))
                {
                    Some(slot) => {
                        slot.hidden = hidden;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Mutable access to the action bound at `address`.
    pub fn binding_mut(&mut self, address: SlotAddress) -> Option<&mut Option<Action>> {
        if !in_range(address) {
            return None;
        }
        match address {
            SlotAddress::Primary(i) => self.slots.get_mut(i).map(|s| &mut s.bound_action),
            SlotAddress::Secondary { primary, secondary } => self
                .slots
                .get_mut(primary)?
                .sub_slots
                .get_mut(secondary)
                .map(|s| &mut s.bound_action),
        }
    }

    /// All bound actions, primary then its secondaries, low to high index.
    pub fn assigned_actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        for primary in self.slots.iter().take(PRIMARY_SLOT_COUNT) {
            actions.extend(primary.bound_action.clone());
            for secondary in primary.sub_slots.iter().take(SECONDARY_SLOT_COUNT) {
                actions.extend(secondary.bound_action.clone());
            }
        }
        actions
    }

    /// Flattened slot list: each primary followed by its secondaries.
    pub fn all_slots(&self) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(PRIMARY_SLOT_COUNT * (SECONDARY_SLOT_COUNT + 1));
        for primary in self.slots.iter().take(PRIMARY_SLOT_COUNT) {
            slots.push(Slot::Primary(primary.clone()));
            slots.extend(
                primary
                    .sub_slots
                    .iter()
                    .take(SECONDARY_SLOT_COUNT)
                    .cloned()
                    .map(Slot::Secondary),
            );
        }
        slots
    }

    fn position_where<F>(&self, mut matches: F) -> Option<SlotAddress>
    where
        F: FnMut(&str, Option<&Action>) -> bool,
    {
        for (i, primary) in self.slots.iter().enumerate().take(PRIMARY_SLOT_COUNT) {
            if matches(&primary.id, primary.bound_action.as_ref()) {
                return Some(SlotAddress::Primary(i));
            }
            for (j, secondary) in primary.sub_slots.iter().enumerate().take(SECONDARY_SLOT_COUNT) {
                if matches(&secondary.id, secondary.bound_action.as_ref()) {
                    return Some(SlotAddress::Secondary {
                        primary: i,
                        secondary: j,
                    });
                }
            }
        }
        None
    }
}

/// Whether `address` lies inside the current tree shape.
fn in_range(address: SlotAddress) -> bool {
    match address {
        SlotAddress::Primary(i) => i < PRIMARY_SLOT_COUNT,
        SlotAddress::Secondary { primary, secondary } => {
            primary < PRIMARY_SLOT_COUNT && secondary < SECONDARY_SLOT_COUNT
        }
    }
}

fn decode_binding(raw: Option<Value>, slot_id: &str, dropped: &mut Vec<String>) -> Option<Action> {
    let mut raw = match raw {
        None | Some(Value::Null) => return None,
        Some(raw) => raw,
    };

    if let Some(fields) = raw.as_object_mut() {
        if !fields.contains_key("label") {
            if let Some(id) = fields.get("id").cloned() {
                fields.insert("label".to_string(), id);
            }
        }
    }

    match serde_json::from_value(raw) {
        Ok(action) => Some(action),
        Err(_) => {
            dropped.push(slot_id.to_string());
            None
        }
    }
}

fn take_if_bound(binding: &mut Option<Action>, action_id: &str) -> bool {
    if binding.as_ref().is_some_and(|a| a.id == action_id) {
        *binding = None;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str) -> Action {
        Action::new(id, id.to_uppercase(), ActionKind::Custom)
    }

    #[test]
    fn test_default_shape() {
        let tree = SlotTree::default();
        assert_eq!(tree.slots.len(), PRIMARY_SLOT_COUNT);
        for (i, primary) in tree.slots.iter().enumerate() {
            assert_eq!(primary.index, i);
            assert!(primary.bound_action.is_none());
            assert!(!primary.hidden);
            assert_eq!(primary.sub_slots.len(), SECONDARY_SLOT_COUNT);
            assert!(primary
                .sub_slots
                .iter()
                .all(|s| s.bound_action.is_none() && !s.hidden));
        }
    }

    #[test]
    fn test_bounds_checked_lookups() {
        let tree = SlotTree::default();
        assert!(tree.primary(PRIMARY_SLOT_COUNT - 1).is_some());
        assert!(tree.primary(PRIMARY_SLOT_COUNT).is_none());
        assert!(tree.secondary(0, SECONDARY_SLOT_COUNT - 1).is_some());
        assert!(tree.secondary(0, SECONDARY_SLOT_COUNT).is_none());
        assert!(tree.secondary(PRIMARY_SLOT_COUNT, 0).is_none());
    }

    #[test]
    fn test_bind_moves_existing_binding() {
        let mut tree = SlotTree::default();
        let first = tree.find("primary-0").unwrap();
        let second = tree.find("primary-3-secondary-2").unwrap();

        tree.bind(first, action("a"));
        tree.bind(second, action("a"));

        assert_eq!(tree.bound_slot_ids("a"), vec!["primary-3-secondary-2"]);
        assert!(tree.primary(0).unwrap().bound_action.is_none());
    }

    #[test]
    fn test_bind_returns_displaced_action() {
        let mut tree = SlotTree::default();
        let address = tree.find("primary-1").unwrap();

        assert!(tree.bind(address, action("a")).is_none());
        let displaced = tree.bind(address, action("b")).unwrap();
        assert_eq!(displaced.id, "a");
        assert!(tree.find_bound("a").is_none());
    }

    #[test]
    fn test_unique_binding_over_many_assignments() {
        let mut tree = SlotTree::default();
        let ids: Vec<String> = tree.all_slots().iter().map(|s| s.id().to_string()).collect();
        let actions = ["a", "b", "c", "d"];

        // Deterministic walk over slots and actions, checking the whole tree each step.
        let mut seed: usize = 17;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345) % (1 << 31);
            let slot_id = &ids[seed % ids.len()];
            let action_id = actions[(seed / ids.len()) % actions.len()];

            let address = tree.find(slot_id).unwrap();
            tree.bind(address, action(action_id));

            for id in actions {
                assert!(tree.bound_slot_ids(id).len() <= 1, "{id} bound twice");
            }
            assert_eq!(tree.bound_slot_ids(action_id), vec![slot_id.clone()]);
        }
    }

    #[test]
    fn test_migrate_appends_missing_primaries() {
        let mut tree = SlotTree::default();
        tree.slots.truncate(6);
        tree.slots[2].bound_action = Some(action("keep"));

        let report = tree.migrate();

        assert_eq!(report.added_primary, 2);
        assert!(report.changed());
        assert_eq!(tree.slots.len(), PRIMARY_SLOT_COUNT);
        assert_eq!(tree.slots[7].id, "primary-7");
        assert_eq!(tree.slots[7].sub_slots.len(), SECONDARY_SLOT_COUNT);
        assert_eq!(tree.primary(2).unwrap().bound_action, Some(action("keep")));
    }

    #[test]
    fn test_migrate_tops_up_short_secondary_lists() {
        let mut tree = SlotTree::default();
        tree.slots[4].sub_slots.truncate(3);

        let report = tree.migrate();

        assert_eq!(report.added_secondary, 2);
        assert_eq!(tree.slots[4].sub_slots[4].id, "primary-4-secondary-4");
    }

    #[test]
    fn test_migrate_keeps_surplus() {
        let mut tree = SlotTree::default();
        tree.slots.push(PrimarySlot::empty(PRIMARY_SLOT_COUNT));

        let report = tree.migrate();

        assert!(report.has_surplus);
        assert!(!report.changed());
        assert_eq!(tree.slots.len(), PRIMARY_SLOT_COUNT + 1);
        assert!(tree.primary(PRIMARY_SLOT_COUNT).is_none());
    }

    #[test]
    fn test_surplus_slots_are_out_of_reach() {
        let mut tree = SlotTree::default();
        let mut extra = PrimarySlot::empty(PRIMARY_SLOT_COUNT);
        extra.bound_action = Some(action("x"));
        tree.slots.push(extra);
        tree.slots[0].sub_slots.push(SecondarySlot::empty(0, SECONDARY_SLOT_COUNT));
        tree.slots[0].sub_slots[SECONDARY_SLOT_COUNT].bound_action = Some(action("y"));

        assert!(tree.find("primary-8").is_none());
        assert!(tree.find("primary-0-secondary-5").is_none());
        assert!(tree.find_bound("x").is_none());
        assert!(tree.find_bound("y").is_none());
        assert!(tree.assigned_actions().is_empty());
        assert_eq!(
            tree.all_slots().len(),
            PRIMARY_SLOT_COUNT * (SECONDARY_SLOT_COUNT + 1)
        );

        assert!(tree.binding_mut(SlotAddress::Primary(PRIMARY_SLOT_COUNT)).is_none());
        assert!(!tree.set_hidden(SlotAddress::Primary(PRIMARY_SLOT_COUNT), true));
        assert!(!tree.unbind("x"));
        assert_eq!(tree.slots[PRIMARY_SLOT_COUNT].bound_action, Some(action("x")));
    }

    #[test]
    fn test_migrate_rewrites_legacy_ids() {
        let mut tree = SlotTree::default();
        for (i, primary) in tree.slots.iter_mut().enumerate() {
            primary.id = format!("main-{i}");
            for (j, secondary) in primary.sub_slots.iter_mut().enumerate() {
                secondary.id = format!("main-{i}-sub-{j}");
            }
        }
        tree.slots[3].sub_slots[1].bound_action = Some(action("a"));

        let report = tree.migrate();

        assert_eq!(report.renamed, PRIMARY_SLOT_COUNT * (SECONDARY_SLOT_COUNT + 1));
        assert!(report.changed());
        assert_eq!(
            tree.find("primary-3-secondary-1"),
            tree.find_bound("a")
        );
        assert!(tree.find("main-0").is_none());
        assert!(!tree.migrate().changed());
    }

    #[test]
    fn test_from_blob_keeps_readable_entries() {
        let mut blob = serde_json::to_value(SlotTree::default()).unwrap();
        blob["slots"][0]["button"] = serde_json::json!({ "id": "close", "type": "standard" });
        blob["slots"][1]["button"] = serde_json::json!({ "label": "No id" });
        blob["slots"][2]["hidden"] = serde_json::json!("yes");
        blob["slots"][2]["subSlots"][0]["button"] = serde_json::json!({ "id": "sheet", "label": "Sheet" });
        blob["slots"][4]["subSlots"][3]["index"] = serde_json::json!("three");
        blob["slots"][5]["hidden"] = serde_json::json!(true);

        let decoded = SlotTree::from_blob(blob).unwrap();
        let mut tree = decoded.tree;
        tree.migrate();

        assert_eq!(decoded.dropped_bindings, vec!["primary-1"]);
        assert_eq!(
            decoded.replaced_slots,
            vec!["primary-2", "primary-4-secondary-3"]
        );
        assert_eq!(tree.primary(0).unwrap().bound_action.as_ref().unwrap().label, "close");
        assert!(tree.primary(1).unwrap().bound_action.is_none());
        assert_eq!(
            tree.secondary(2, 0).unwrap().bound_action.as_ref().unwrap().id,
            "sheet"
        );
        assert!(tree.primary(5).unwrap().hidden);
        assert_eq!(tree.slots.len(), PRIMARY_SLOT_COUNT);
        assert!(tree.slots.iter().all(|p| p.sub_slots.len() == SECONDARY_SLOT_COUNT));
    }

    #[test]
    fn test_from_blob_without_slot_list() {
        assert!(SlotTree::from_blob(serde_json::json!({ "slots": "nope" })).is_none());
        assert!(SlotTree::from_blob(serde_json::json!([])).is_none());
    }

    #[test]
    fn test_assigned_actions_order() {
        let mut tree = SlotTree::default();
        for (slot_id, action_id) in [
            ("primary-1", "d"),
            ("primary-0-secondary-3", "b"),
            ("primary-0", "a"),
            ("primary-1-secondary-0", "e"),
            ("primary-0-secondary-4", "c"),
        ] {
            let address = tree.find(slot_id).unwrap();
            tree.bind(address, action(action_id));
        }

        let ids: Vec<String> = tree.assigned_actions().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_all_slots_flattening() {
        let tree = SlotTree::default();
        let slots = tree.all_slots();

        assert_eq!(slots.len(), PRIMARY_SLOT_COUNT * (SECONDARY_SLOT_COUNT + 1));
        assert_eq!(slots[0].id(), "primary-0");
        assert_eq!(slots[1].id(), "primary-0-secondary-0");
        assert_eq!(slots[SECONDARY_SLOT_COUNT + 1].id(), "primary-1");
        assert!(slots[SECONDARY_SLOT_COUNT + 1].is_primary());
    }
}
