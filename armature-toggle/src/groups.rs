//! Feature Groups
//!
//! Named, ordered collections of feature names used for bulk activation and
//! combined status checks. Members may name features that are not defined.

use crate::error::{ToggleError, ToggleResult};
use crate::registry::IntoFeatureNames;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A named group of features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub name: String,
    pub members: Vec<String>,
    pub description: Option<String>,
}

impl FeatureGroup {
    pub fn new(name: impl Into<String>, members: impl IntoFeatureNames) -> Self {
        Self {
            name: name.into(),
            members: members.into_feature_names(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// One group entry of a configuration source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Group name to group entry, as loaded from JSON or TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupsConfig(pub BTreeMap<String, GroupConfig>);

impl GroupsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(
        mut self,
        name: impl Into<String>,
        features: impl IntoFeatureNames,
        description: Option<&str>,
    ) -> Self {
        self.0.insert(
            name.into(),
            GroupConfig {
                features: features.into_feature_names(),
                description: description.map(str::to_string),
            },
        );
        self
    }

    /// Parse a JSON object of `name -> { features, description }`
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_toggle::GroupsConfig;
    ///
    /// let config = GroupsConfig::from_json(
    ///     r#"{"beta": {"features": ["new-ui", "search"], "description": "Beta testers"}}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.groups().count(), 1);
    /// ```
    pub fn from_json(source: &str) -> ToggleResult<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document with one table per group
    pub fn from_toml(source: &str) -> ToggleResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ToggleResult<()> {
        for (name, group) in &self.0 {
            if name.trim().is_empty() {
                return Err(ToggleError::config("group name must not be empty"));
            }
            if let Some(feature) = group.features.iter().find(|f| f.trim().is_empty()) {
                return Err(ToggleError::config(format!(
                    "group '{}' lists an empty feature name ({:?})",
                    name, feature
                )));
            }
        }
        Ok(())
    }

    pub fn groups(&self) -> impl Iterator<Item = FeatureGroup> + '_ {
        self.0.iter().map(|(name, group)| FeatureGroup {
            name: name.clone(),
            members: group.features.clone(),
            description: group.description.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Registry of feature groups
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<BTreeMap<String, FeatureGroup>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a group, replacing any previous one with the same name
    pub fn define(&self, group: FeatureGroup) {
        debug!(group = %group.name, members = group.members.len(), "Defining feature group");
        self.groups.write().insert(group.name.clone(), group);
    }

    pub fn load(&self, config: &GroupsConfig) -> usize {
        let mut loaded = 0;
        for group in config.groups() {
            self.define(group);
            loaded += 1;
        }
        debug!(loaded, "Loaded feature groups from configuration");
        loaded
    }

    pub fn get(&self, name: &str) -> Option<FeatureGroup> {
        self.groups.read().get(name).cloned()
    }

    /// Look up a group, failing with [`ToggleError::NotDefined`] if unknown
    pub fn require(&self, name: &str) -> ToggleResult<FeatureGroup> {
        self.get(name).ok_or_else(|| {
            warn!(group = %name, "Feature group not defined");
            ToggleError::not_defined(name)
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.read().contains_key(name)
    }

    /// All groups, ordered by name
    pub fn all(&self) -> Vec<FeatureGroup> {
        self.groups.read().values().cloned().collect()
    }
}
