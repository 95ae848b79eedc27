//! Action catalog and runtime registry.
//!
//! The host discovers which actions exist and exposes them through
//! [`ActionCatalog`]. Actions registered at runtime live in an
//! [`ActionRegistry`] layered over the catalog.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use slot_tree::{Action, ActionKind};

use crate::types::{Result, SlotbarError};

/// Source of the actions available on the host.
#[async_trait]
pub trait ActionCatalog: Send + Sync {
    /// All known actions, in display order.
    async fn list_actions(&self) -> Vec<Action>;

    /// Look up one action by id.
    async fn get_action(&self, id: &str) -> Option<Action> {
        self.list_actions().await.into_iter().find(|a| a.id == id)
    }
}

/// Catalog of the standard window controls.
pub struct StandardCatalog;

impl StandardCatalog {
    /// The standard window controls.
    pub fn actions() -> Vec<Action> {
        [
            ("close", "Close", "fas fa-times"),
            ("minimize", "Minimize", "fas fa-minus"),
            ("configure", "Configure", "fas fa-cog"),
            ("import", "Import", "fas fa-file-import"),
            ("token", "Token", "fas fa-user-circle"),
            ("sheet", "Sheet", "fas fa-id-card"),
        ]
        .into_iter()
        .map(|(id, label, icon)| {
            Action::new(id, label, ActionKind::Standard)
                .with_icon(icon)
                .with_handler(id)
        })
        .collect()
    }
}

#[async_trait]
impl ActionCatalog for StandardCatalog {
    async fn list_actions(&self) -> Vec<Action> {
        Self::actions()
    }
}

/// Request to register an action at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRegistration {
    /// Required, non-empty
    pub id: String,
    /// Defaults to the id
    pub label: Option<String>,
    /// Defaults to the configured default icon
    pub icon: Option<String>,
    pub image: Option<String>,
    /// Host handler name; defaults to `custom`
    pub handler: Option<String>,
    pub payload: Option<serde_json::Value>,
}

impl ActionRegistration {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Builder: set label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder: set icon.
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Actions registered at runtime.
pub struct ActionRegistry {
    /// Registered actions in registration order
    actions: Arc<RwLock<Vec<Action>>>,
    /// Icon for registrations without one
    default_icon: String,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new(default_icon: impl Into<String>) -> Self {
        Self {
            actions: Arc::new(RwLock::new(Vec::new())),
            default_icon: default_icon.into(),
        }
    }

    /// Register an action, replacing any registered action with the same id.
    pub async fn register(&self, registration: ActionRegistration) -> Result<Action> {
        if registration.id.trim().is_empty() {
            return Err(SlotbarError::InvalidRegistration(
                "action must have an id".to_string(),
            ));
        }

        let action = Action {
            label: registration
                .label
                .unwrap_or_else(|| registration.id.clone()),
            icon: Some(registration.icon.unwrap_or_else(|| self.default_icon.clone())),
            image: registration.image,
            kind: ActionKind::Custom,
            handler: Some(registration.handler.unwrap_or_else(|| "custom".to_string())),
            payload: registration.payload,
            id: registration.id,
        };

        let mut actions = self.actions.write().await;
        match actions.iter_mut().find(|a| a.id == action.id) {
            Some(existing) => *existing = action.clone(),
            None => actions.push(action.clone()),
        }

        info!(action_id = %action.id, "Registered action");
        Ok(action)
    }

    /// Remove a registered action. Returns whether it was registered.
    pub async fn unregister(&self, id: &str) -> bool {
        let mut actions = self.actions.write().await;
        let before = actions.len();
        actions.retain(|a| a.id != id);
        let removed = actions.len() != before;

        if removed {
            debug!(action_id = %id, "Unregistered action");
        }
        removed
    }

    /// Registered action with the given id.
    pub async fn get(&self, id: &str) -> Option<Action> {
        let actions = self.actions.read().await;
        actions.iter().find(|a| a.id == id).cloned()
    }

    /// All registered actions.
    pub async fn all(&self) -> Vec<Action> {
        self.actions.read().await.clone()
    }
}

#[async_trait]
impl ActionCatalog for ActionRegistry {
    async fn list_actions(&self) -> Vec<Action> {
        self.all().await
    }

    async fn get_action(&self, id: &str) -> Option<Action> {
        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_standard_catalog() {
        let catalog = StandardCatalog;
        let actions = catalog.list_actions().await;

        assert_eq!(actions.len(), 6);
        assert!(actions.iter().all(|a| a.kind == ActionKind::Standard));
        assert_eq!(catalog.get_action("sheet").await.unwrap().label, "Sheet");
        assert!(catalog.get_action("dice").await.is_none());
    }

    #[tokio::test]
    async fn test_registration_defaults() {
        let registry = ActionRegistry::new("fas fa-puzzle-piece");

        let action = registry
            .register(ActionRegistration::new("weather"))
            .await
            .unwrap();

        assert_eq!(action.label, "weather");
        assert_eq!(action.icon.as_deref(), Some("fas fa-puzzle-piece"));
        assert_eq!(action.kind, ActionKind::Custom);
        assert_eq!(action.handler.as_deref(), Some("custom"));
    }

    #[tokio::test]
    async fn test_register_replaces_same_id() {
        let registry = ActionRegistry::new("x");

        registry
            .register(ActionRegistration::new("weather").label("Weather"))
            .await
            .unwrap();
        registry
            .register(ActionRegistration::new("weather").label("Forecast"))
            .await
            .unwrap();

        let all = registry.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].label, "Forecast");
    }

    #[tokio::test]
    async fn test_register_requires_id() {
        let registry = ActionRegistry::new("x");
        let result = registry.register(ActionRegistration::new("  ")).await;
        assert!(matches!(result, Err(SlotbarError::InvalidRegistration(_))));
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = ActionRegistry::new("x");
        registry
            .register(ActionRegistration::new("weather"))
            .await
            .unwrap();

        assert!(registry.unregister("weather").await);
        assert!(!registry.unregister("weather").await);
        assert!(registry.get("weather").await.is_none());
    }
}
