//! Feature Registry
//!
//! Stores feature definitions: resolver, declared dependencies, and an
//! optional expiry. Dependencies are not validated when declared; cycles are
//! handled at evaluation time.

use crate::resolver::Resolver;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Feature definition
#[derive(Debug, Clone)]
pub struct FeatureDefinition {
    /// Feature name
    pub name: String,

    /// Value source when no override applies
    pub resolver: Resolver,

    /// Features that must be active for this one to be active
    pub dependencies: Vec<String>,

    /// After this instant the feature is inactive everywhere
    pub expires_at: Option<DateTime<Utc>>,

    /// Human-readable description
    pub description: Option<String>,
}

impl FeatureDefinition {
    pub fn new(name: impl Into<String>, resolver: impl Into<Resolver>) -> Self {
        Self {
            name: name.into(),
            resolver: resolver.into(),
            dependencies: Vec::new(),
            expires_at: None,
            description: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Anything that names one or more features
pub trait IntoFeatureNames {
    fn into_feature_names(self) -> Vec<String>;
}

impl IntoFeatureNames for &str {
    fn into_feature_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoFeatureNames for String {
    fn into_feature_names(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoFeatureNames for &String {
    fn into_feature_names(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoFeatureNames for Vec<String> {
    fn into_feature_names(self) -> Vec<String> {
        self
    }
}

impl IntoFeatureNames for Vec<&str> {
    fn into_feature_names(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoFeatureNames for &[String] {
    fn into_feature_names(self) -> Vec<String> {
        self.to_vec()
    }
}

impl IntoFeatureNames for &[&str] {
    fn into_feature_names(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoFeatureNames for [&str; N] {
    fn into_feature_names(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoFeatureNames for [String; N] {
    fn into_feature_names(self) -> Vec<String> {
        self.into_iter().collect()
    }
}

/// Registry of feature definitions
#[derive(Debug, Default)]
pub struct Registry {
    definitions: RwLock<HashMap<String, FeatureDefinition>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition, replacing any previous one with the same name
    pub fn define(&self, definition: FeatureDefinition) {
        debug!(feature = %definition.name, "Defining feature");
        self.definitions
            .write()
            .insert(definition.name.clone(), definition);
    }

    /// Append to a feature's dependency list.
    ///
    /// An undefined feature is created with the default (inactive) resolver
    /// so the declaration is not lost.
    pub fn requires(&self, name: &str, dependencies: impl IntoFeatureNames) {
        let dependencies = dependencies.into_feature_names();
        debug!(feature = %name, ?dependencies, "Declaring dependencies");
        self.update(name, |def| def.dependencies.extend(dependencies));
    }

    pub fn set_resolver(&self, name: &str, resolver: Resolver) {
        self.update(name, |def| def.resolver = resolver);
    }

    pub fn set_expires_at(&self, name: &str, expires_at: Option<DateTime<Utc>>) {
        debug!(feature = %name, ?expires_at, "Setting feature expiry");
        self.update(name, |def| def.expires_at = expires_at);
    }

    pub fn set_description(&self, name: &str, description: impl Into<String>) {
        let description = description.into();
        self.update(name, |def| def.description = Some(description));
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut FeatureDefinition)) {
        let mut definitions = self.definitions.write();
        let definition = definitions
            .entry(name.to_string())
            .or_insert_with(|| FeatureDefinition::new(name, Resolver::default()));
        f(definition);
    }

    pub fn get(&self, name: &str) -> Option<FeatureDefinition> {
        self.definitions.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// Declared dependencies, or an empty list for an undefined feature
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        self.definitions
            .read()
            .get(name)
            .map(|def| def.dependencies.clone())
            .unwrap_or_default()
    }

    /// Defined feature names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}

/// Handle returned by [`Toggle::define`](crate::Toggle::define) for
/// refining a definition
#[derive(Debug, Clone)]
pub struct DefinitionHandle<'a> {
    registry: &'a Registry,
    name: String,
}

impl<'a> DefinitionHandle<'a> {
    pub(crate) fn new(registry: &'a Registry, name: String) -> Self {
        Self { registry, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare dependencies (appended to any already declared)
    pub fn requires(self, dependencies: impl IntoFeatureNames) -> Self {
        self.registry.requires(&self.name, dependencies);
        self
    }

    /// Replace the resolver
    pub fn resolver(self, resolver: impl Into<Resolver>) -> Self {
        self.registry.set_resolver(&self.name, resolver.into());
        self
    }

    pub fn expires_at(self, expires_at: DateTime<Utc>) -> Self {
        self.registry.set_expires_at(&self.name, Some(expires_at));
        self
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.registry.set_description(&self.name, description);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_define_and_get() {
        let registry = Registry::new();
        registry.define(FeatureDefinition::new("new-ui", true));

        assert!(registry.contains("new-ui"));
        assert_eq!(registry.get("new-ui").unwrap().name, "new-ui");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_redefine_overwrites() {
        let registry = Registry::new();
        registry.define(FeatureDefinition::new("a", true));
        registry.requires("a", "b");
        registry.define(FeatureDefinition::new("a", false));

        assert_eq!(registry.len(), 1);
        assert!(registry.dependencies("a").is_empty());
    }

    #[test]
    fn test_requires_appends() {
        let registry = Registry::new();
        registry.define(FeatureDefinition::new("a", true));
        registry.requires("a", "b");
        registry.requires("a", ["c", "b"]);

        assert_eq!(registry.dependencies("a"), vec!["b", "c", "b"]);
    }

    #[test]
    fn test_dependencies_of_undefined_feature() {
        let registry = Registry::new();
        assert!(registry.dependencies("ghost").is_empty());
    }

    #[test]
    fn test_handle_chains() {
        let registry = Registry::new();
        registry.define(FeatureDefinition::new("report", true));
        let expiry = Utc::now() + Duration::days(1);

        DefinitionHandle::new(&registry, "report".to_string())
            .requires(vec!["auth", "billing"])
            .description("Quarterly report")
            .expires_at(expiry);

        let def = registry.get("report").unwrap();
        assert_eq!(def.dependencies, vec!["auth", "billing"]);
        assert_eq!(def.description.as_deref(), Some("Quarterly report"));
        assert_eq!(def.expires_at, Some(expiry));
    }

    #[test]
    fn test_expiry_check() {
        let now = Utc::now();
        let mut def = FeatureDefinition::new("promo", true);
        assert!(!def.is_expired_at(now));

        def.expires_at = Some(now - Duration::seconds(1));
        assert!(def.is_expired_at(now));

        def.expires_at = Some(now + Duration::hours(1));
        assert!(!def.is_expired_at(now));
    }

    #[test]
    fn test_names_sorted() {
        let registry = Registry::new();
        registry.define(FeatureDefinition::new("b", true));
        registry.define(FeatureDefinition::new("a", true));
        assert_eq!(registry.names(), vec!["a", "b"]);
    }
}
