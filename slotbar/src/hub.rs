//! Slotbar - the orchestrator.
//!
//! Wires the slot tree, the visibility rules and the action sources
//! together for rendering and administration consumers. The two state owners
//! never talk to each other; everything that combines them happens here.

use std::sync::Arc;
use tracing::{info, warn};

use slot_tree::{Action, BlobStore, JsonFileBlobStore, SlotTreeManager};
use visibility::{User, VisibilityEngine};

use crate::catalog::{ActionCatalog, ActionRegistration, ActionRegistry};
use crate::config::SlotbarConfig;
use crate::layout::HeaderLayout;
use crate::types::{ConfigurationExport, Result, SlotbarError};

/// Slot assignment and visibility for one host.
pub struct Slotbar {
    /// Configuration
    config: SlotbarConfig,
    /// Slot tree owner
    slots: Arc<SlotTreeManager>,
    /// Visibility rules owner
    visibility: Arc<VisibilityEngine>,
    /// Host-discovered actions
    catalog: Arc<dyn ActionCatalog>,
    /// Runtime-registered actions
    registry: Arc<ActionRegistry>,
}

impl Slotbar {
    /// Create with default configuration.
    pub fn new(store: Arc<dyn BlobStore>, catalog: Arc<dyn ActionCatalog>) -> Self {
        Self::with_config(SlotbarConfig::default(), store, catalog)
    }

    /// Create with custom configuration.
    pub fn with_config(
        config: SlotbarConfig,
        store: Arc<dyn BlobStore>,
        catalog: Arc<dyn ActionCatalog>,
    ) -> Self {
        let slots = SlotTreeManager::with_key(store.clone(), config.storage.slot_key.clone());
        let visibility = VisibilityEngine::with_key(store, config.storage.visibility_key.clone());
        let registry = ActionRegistry::new(config.registry.default_icon.clone());

        Self {
            config,
            slots: Arc::new(slots),
            visibility: Arc::new(visibility),
            catalog,
            registry: Arc::new(registry),
        }
    }

    /// Create backed by JSON files in the configured storage directory.
    pub async fn open(config: SlotbarConfig, catalog: Arc<dyn ActionCatalog>) -> Result<Self> {
        let store = JsonFileBlobStore::new(&config.storage.dir).await?;
        Ok(Self::with_config(config, Arc::new(store), catalog))
    }

    /// Load both persisted configurations. Must complete before any other call.
    pub async fn initialize(&self) {
        info!(storage = %self.config.storage.dir.display(), "Initializing Slotbar");
        self.slots.initialize().await;
        self.visibility.initialize().await;
        info!("Slotbar initialized");
    }

    /// Configuration in use.
    pub fn config(&self) -> &SlotbarConfig {
        &self.config
    }

    /// The slot tree owner.
    pub fn slots(&self) -> &SlotTreeManager {
        &self.slots
    }

    /// The visibility rules owner.
    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    /// The runtime registry.
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Every available action: catalog entries first, then registered ones.
    ///
    /// A registered action replaces a catalog action with the same id.
    pub async fn list_actions(&self) -> Vec<Action> {
        let registered = self.registry.all().await;
        let mut actions: Vec<Action> = self
            .catalog
            .list_actions()
            .await
            .into_iter()
            .filter(|a| !registered.iter().any(|r| r.id == a.id))
            .collect();
        actions.extend(registered);
        actions
    }

    /// Look up an available action.
    pub async fn get_action(&self, id: &str) -> Option<Action> {
        match self.registry.get(id).await {
            Some(action) => Some(action),
            None => self.catalog.get_action(id).await,
        }
    }

    /// Register an action at runtime.
    pub async fn register_action(&self, registration: ActionRegistration) -> Result<Action> {
        self.registry.register(registration).await
    }

    /// Unregister a runtime action and remove it from the slot tree.
    pub async fn unregister_action(&self, id: &str) -> bool {
        let removed = self.registry.unregister(id).await;
        if removed {
            self.slots.unassign(id).await;
        }
        removed
    }

    /// Bind an available action, by id, to a slot.
    pub async fn assign_action(&self, action_id: &str, slot_id: &str) -> Result<()> {
        let Some(action) = self.get_action(action_id).await else {
            warn!(action_id = %action_id, "Cannot assign unknown action");
            return Err(SlotbarError::UnknownAction(action_id.to_string()));
        };

        self.slots.assign(slot_id, action).await?;
        Ok(())
    }

    /// What `user` should be shown.
    pub async fn header_layout(&self, user: &User) -> HeaderLayout {
        let tree = self.slots.snapshot().await;
        HeaderLayout::build(&tree, &self.visibility, user).await
    }

    /// Both configurations as one document.
    pub async fn export(&self) -> ConfigurationExport {
        ConfigurationExport {
            exported_at: chrono::Utc::now(),
            slots: self.slots.snapshot().await,
            visibility: self.visibility.snapshot().await,
        }
    }

    /// Reset slots and visibility rules to their defaults.
    pub async fn reset_all(&self) {
        self.slots.reset().await;
        self.visibility.reset().await;
        info!("Slotbar configuration reset");
    }

    /// Persist both configurations as they are.
    pub async fn save_all(&self) {
        self.slots.save().await;
        self.visibility.save().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StandardCatalog;
    use slot_tree::{MemoryBlobStore, SlotError, DEFAULT_SLOT_KEY};
    use tempfile::TempDir;
    use visibility::{VisibilityMode, DEFAULT_VISIBILITY_KEY};

    fn roster() -> Vec<User> {
        vec![
            User::admin("gm", "Game Master"),
            User::player("u1", "Alice"),
            User::player("u2", "Bob"),
        ]
    }

    async fn create_test_slotbar() -> (Slotbar, MemoryBlobStore) {
        let store = MemoryBlobStore::new();
        let slotbar = Slotbar::new(Arc::new(store.clone()), Arc::new(StandardCatalog));
        slotbar.initialize().await;
        (slotbar, store)
    }

    #[tokio::test]
    async fn test_assign_from_catalog() {
        let (slotbar, _store) = create_test_slotbar().await;

        slotbar.assign_action("close", "primary-0").await.unwrap();

        let slot = slotbar.slots().slot_bound_to("close").await.unwrap();
        assert_eq!(slot.id(), "primary-0");
        assert_eq!(slot.bound_action().unwrap().label, "Close");
    }

    #[tokio::test]
    async fn test_assign_unknown_action_or_slot() {
        let (slotbar, _store) = create_test_slotbar().await;

        assert!(matches!(
            slotbar.assign_action("dice", "primary-0").await,
            Err(SlotbarError::UnknownAction(_))
        ));
        assert!(matches!(
            slotbar.assign_action("close", "nowhere").await,
            Err(SlotbarError::Slot(SlotError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_registered_actions_override_catalog() {
        let (slotbar, _store) = create_test_slotbar().await;

        slotbar
            .register_action(ActionRegistration::new("close").label("Shut"))
            .await
            .unwrap();
        slotbar
            .register_action(ActionRegistration::new("weather"))
            .await
            .unwrap();

        let actions = slotbar.list_actions().await;
        assert_eq!(actions.len(), 7);
        assert_eq!(actions.last().unwrap().id, "weather");
        assert_eq!(slotbar.get_action("close").await.unwrap().label, "Shut");
    }

    #[tokio::test]
    async fn test_unregister_unassigns() {
        let (slotbar, _store) = create_test_slotbar().await;
        slotbar
            .register_action(ActionRegistration::new("weather"))
            .await
            .unwrap();
        slotbar
            .assign_action("weather", "primary-2-secondary-0")
            .await
            .unwrap();

        assert!(slotbar.unregister_action("weather").await);
        assert!(!slotbar.slots().is_assigned("weather").await);
        assert!(!slotbar.unregister_action("weather").await);
    }

    #[tokio::test]
    async fn test_bound_copy_ignores_later_registration_edits() {
        let (slotbar, _store) = create_test_slotbar().await;
        slotbar
            .register_action(ActionRegistration::new("weather").label("Weather"))
            .await
            .unwrap();
        slotbar.assign_action("weather", "primary-1").await.unwrap();

        slotbar
            .register_action(ActionRegistration::new("weather").label("Forecast"))
            .await
            .unwrap();

        let slot = slotbar.slots().primary_slot(1).await.unwrap();
        assert_eq!(slot.bound_action.unwrap().label, "Weather");
    }

    #[tokio::test]
    async fn test_header_layout_combines_both_components() {
        let (slotbar, _store) = create_test_slotbar().await;
        let users = roster();
        let (admin, alice, bob) = (&users[0], &users[1], &users[2]);

        slotbar.assign_action("close", "primary-0").await.unwrap();
        slotbar.assign_action("sheet", "primary-0-secondary-0").await.unwrap();
        slotbar.assign_action("token", "primary-0-secondary-1").await.unwrap();
        slotbar.assign_action("import", "primary-1").await.unwrap();
        slotbar.assign_action("configure", "primary-2").await.unwrap();

        slotbar.slots().set_hidden("primary-2", true).await.unwrap();
        slotbar
            .slots()
            .set_hidden("primary-0-secondary-1", true)
            .await
            .unwrap();
        slotbar
            .visibility()
            .set_action_visibility_mode("sheet", VisibilityMode::AdministratorsOnly, &users)
            .await;
        slotbar.visibility().set_slot_visibility("u2", 1, false).await;

        let layout = slotbar.header_layout(alice).await;
        assert_eq!(layout.entries.len(), 7);
        let first = layout.entry(0).unwrap();
        assert_eq!(first.action.as_ref().unwrap().id, "close");
        assert!(first.children.is_empty());
        assert_eq!(layout.entry(1).unwrap().action.as_ref().unwrap().id, "import");
        assert!(layout.entry(2).is_none());
        assert!(layout.entry(3).unwrap().is_blank());

        let layout = slotbar.header_layout(bob).await;
        assert!(layout.entry(1).is_none());
        let ids: Vec<&str> = layout.actions().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["close"]);

        let layout = slotbar.header_layout(admin).await;
        let ids: Vec<&str> = layout.actions().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["close", "sheet", "import"]);
    }

    #[tokio::test]
    async fn test_primary_action_hidden_but_children_visible() {
        let (slotbar, _store) = create_test_slotbar().await;
        let users = roster();

        slotbar.assign_action("close", "primary-4").await.unwrap();
        slotbar.assign_action("minimize", "primary-4-secondary-2").await.unwrap();
        slotbar
            .visibility()
            .set_action_visibility("close", "u1", false, &users)
            .await;

        let layout = slotbar.header_layout(&users[1]).await;
        let entry = layout.entry(4).unwrap();
        assert!(entry.action.is_none());
        assert_eq!(entry.children.len(), 1);
        assert_eq!(entry.children[0].slot_id, "primary-4-secondary-2");
    }

    #[tokio::test]
    async fn test_reset_all() {
        let (slotbar, store) = create_test_slotbar().await;
        let users = roster();
        slotbar.assign_action("close", "primary-0").await.unwrap();
        slotbar
            .visibility()
            .set_action_visibility("close", "u1", false, &users)
            .await;

        slotbar.reset_all().await;

        assert!(slotbar.slots().assigned_actions().await.is_empty());
        assert!(slotbar.visibility().action_rules().await.is_empty());
        assert!(store.get(DEFAULT_SLOT_KEY).await.is_some());
        assert!(store.get(DEFAULT_VISIBILITY_KEY).await.is_some());
    }

    #[tokio::test]
    async fn test_save_all_writes_both_blobs() {
        let (slotbar, store) = create_test_slotbar().await;

        slotbar.save_all().await;

        assert!(store.get(DEFAULT_SLOT_KEY).await.is_some());
        assert!(store.get(DEFAULT_VISIBILITY_KEY).await.is_some());
    }

    #[tokio::test]
    async fn test_export() {
        let (slotbar, _store) = create_test_slotbar().await;
        slotbar.assign_action("token", "primary-3").await.unwrap();
        slotbar.visibility().set_slot_visibility("u1", 3, false).await;

        let export = slotbar.export().await;
        assert_eq!(
            export.slots.slots[3].bound_action.as_ref().unwrap().id,
            "token"
        );
        assert_eq!(export.visibility.user_slot_overrides["u1"].get(&3), Some(&true));

        let json = serde_json::to_value(&export).unwrap();
        assert!(json.get("exportedAt").is_some());
    }

    #[tokio::test]
    async fn test_open_file_backed() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = SlotbarConfig::default();
        config.storage.dir = temp_dir.path().to_path_buf();

        let slotbar = Slotbar::open(config.clone(), Arc::new(StandardCatalog))
            .await
            .unwrap();
        slotbar.initialize().await;
        slotbar.assign_action("minimize", "primary-7").await.unwrap();
        assert!(temp_dir.path().join("slot_configuration.json").exists());

        let reopened = Slotbar::open(config, Arc::new(StandardCatalog))
            .await
            .unwrap();
        reopened.initialize().await;
        assert_eq!(
            reopened.slots().slot_bound_to("minimize").await.unwrap().id(),
            "primary-7"
        );
    }
}
