//! Toggle configuration and builder

use crate::Toggle;
use crate::error::ToggleResult;
use crate::groups::GroupsConfig;
use crate::registry::IntoFeatureNames;
use crate::store::{FeatureStore, MemoryStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Configuration for a [`Toggle`] engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleConfig {
    /// Groups registered at build time
    #[serde(default)]
    pub groups: GroupsConfig,
}

impl ToggleConfig {
    /// Create a new configuration builder
    pub fn builder() -> ToggleBuilder {
        ToggleBuilder::new()
    }

    /// Parse a JSON document of the form `{"groups": {...}}`
    pub fn from_json(source: &str) -> ToggleResult<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.groups.validate()?;
        Ok(config)
    }

    /// Parse a TOML document with a `[groups.<name>]` table per group
    pub fn from_toml(source: &str) -> ToggleResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.groups.validate()?;
        Ok(config)
    }
}

/// Group source text, parsed when the engine is built
#[derive(Debug, Clone)]
enum GroupSource {
    Json(String),
    Toml(String),
}

/// Builder for creating a [`Toggle`]
pub struct ToggleBuilder {
    store: Option<Arc<dyn FeatureStore>>,
    groups: GroupsConfig,
    sources: Vec<GroupSource>,
}

impl ToggleBuilder {
    /// Create a new builder with an in-memory store and no groups
    pub fn new() -> Self {
        Self {
            store: None,
            groups: GroupsConfig::new(),
            sources: Vec::new(),
        }
    }

    /// Use a custom override store
    pub fn store(mut self, store: Arc<dyn FeatureStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use the in-memory store (default)
    pub fn memory_store(mut self) -> Self {
        self.store = Some(Arc::new(MemoryStore::new()));
        self
    }

    /// Apply a whole configuration
    pub fn config(mut self, config: ToggleConfig) -> Self {
        self.groups.0.extend(config.groups.0);
        self
    }

    /// Register a group
    pub fn group(mut self, name: impl Into<String>, features: impl IntoFeatureNames) -> Self {
        self.groups = self.groups.with_group(name, features, None);
        self
    }

    /// Register groups from a parsed configuration
    pub fn groups(mut self, groups: GroupsConfig) -> Self {
        self.groups.0.extend(groups.0);
        self
    }

    /// Register groups from JSON text
    pub fn groups_json(mut self, source: impl Into<String>) -> Self {
        self.sources.push(GroupSource::Json(source.into()));
        self
    }

    /// Register groups from TOML text
    pub fn groups_toml(mut self, source: impl Into<String>) -> Self {
        self.sources.push(GroupSource::Toml(source.into()));
        self
    }

    /// Build the engine
    pub fn build(self) -> ToggleResult<Toggle> {
        let mut groups = self.groups;
        for source in &self.sources {
            let parsed = match source {
                GroupSource::Json(text) => GroupsConfig::from_json(text)?,
                GroupSource::Toml(text) => GroupsConfig::from_toml(text)?,
            };
            groups.0.extend(parsed.0);
        }
        groups.validate()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn FeatureStore>);

        debug!(
            store_type = store.store_type(),
            groups = groups.0.len(),
            "Building toggle engine"
        );

        let toggle = Toggle::with_store(store);
        toggle.load_groups_from_config(&groups);
        Ok(toggle)
    }
}

impl Default for ToggleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToggleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToggleBuilder")
            .field("store", &self.store.as_ref().map(|s| s.store_type()))
            .field("groups", &self.groups)
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToggleError;

    #[test]
    fn test_default_build() {
        let toggle = ToggleBuilder::new().build().unwrap();
        assert!(toggle.all_groups().is_empty());
        assert_eq!(toggle.store().store_type(), "memory");
    }

    #[test]
    fn test_build_with_groups() {
        let toggle = ToggleBuilder::new()
            .group("beta", ["new-ui", "search"])
            .groups_json(r#"{"staff": {"features": ["debug-bar"]}}"#)
            .groups_toml(
                r#"
                [premium]
                features = ["export"]
                description = "Paid plan"
                "#,
            )
            .build()
            .unwrap();

        let names: Vec<_> = toggle.all_groups().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["beta", "premium", "staff"]);
    }

    #[test]
    fn test_build_rejects_bad_source() {
        let result = ToggleBuilder::new().groups_json("{broken").build();
        assert!(matches!(result, Err(ToggleError::Parse(_))));
    }

    #[test]
    fn test_config_from_json_and_toml() {
        let json = ToggleConfig::from_json(r#"{"groups": {"beta": {"features": ["a"]}}}"#).unwrap();
        let toml = ToggleConfig::from_toml(
            r#"
            [groups.beta]
            features = ["a"]
            "#,
        )
        .unwrap();
        assert_eq!(json, toml);

        let toggle = ToggleConfig::builder().config(json).build().unwrap();
        assert_eq!(toggle.get_group("beta").unwrap().members, vec!["a"]);
    }

    #[test]
    fn test_empty_config() {
        let config = ToggleConfig::from_json("{}").unwrap();
        assert!(config.groups.is_empty());
    }
}
