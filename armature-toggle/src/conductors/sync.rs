//! Full-state sync of one context

use crate::Toggle;
use crate::context::Context;
use crate::registry::IntoFeatureNames;
use crate::value::Variation;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Replaces a context's overrides or group memberships wholesale
///
/// `features` and `with_values` share one override collection, so whichever
/// runs last wins. `groups` writes the separate membership store.
#[derive(Debug, Clone)]
pub struct SyncConductor<'a> {
    toggle: &'a Toggle,
    context: Context,
}

impl<'a> SyncConductor<'a> {
    pub(crate) fn new(toggle: &'a Toggle, context: Context) -> Self {
        Self { toggle, context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Set exactly these features active; every other override is cleared
    pub fn features(&self, features: impl IntoFeatureNames) -> &Self {
        let overrides: HashMap<String, Variation> = features
            .into_feature_names()
            .into_iter()
            .map(|name| (name, Variation::Boolean(true)))
            .collect();
        debug!(context = %self.context, count = overrides.len(), "Syncing features");
        self.toggle
            .store()
            .replace_overrides(self.context.key(), overrides);
        self
    }

    /// Set exactly these feature values; every other override is cleared
    ///
    /// ```
    /// use armature_toggle::{Context, Toggle, Variation};
    ///
    /// let toggle = Toggle::new();
    /// let user = Context::user("1");
    /// toggle.sync(&user).with_values([("theme", "dark"), ("density", "compact")]);
    ///
    /// assert_eq!(toggle.value("theme", &user), Variation::string("dark"));
    /// ```
    pub fn with_values<K, V>(&self, values: impl IntoIterator<Item = (K, V)>) -> &Self
    where
        K: Into<String>,
        V: Into<Variation>,
    {
        let overrides: HashMap<String, Variation> = values
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        debug!(context = %self.context, count = overrides.len(), "Syncing feature values");
        self.toggle
            .store()
            .replace_overrides(self.context.key(), overrides);
        self
    }

    /// Set exactly these group memberships
    pub fn groups(&self, groups: impl IntoFeatureNames) -> &Self {
        let groups: BTreeSet<String> = groups.into_feature_names().into_iter().collect();
        debug!(context = %self.context, count = groups.len(), "Syncing group memberships");
        self.toggle
            .store()
            .replace_groups(self.context.key(), groups);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_replace_previous_overrides() {
        let toggle = Toggle::new();
        toggle.define("resolved", true);
        let user = Context::user("1");
        toggle.for_context(&user).activate("old");
        toggle.for_context(&user).deactivate("resolved");

        toggle.sync(&user).features(["f1", "f2"]);

        assert!(toggle.active("f1", &user));
        assert!(toggle.active("f2", &user));
        assert!(!toggle.active("old", &user));
        // Cleared override falls back to the resolver
        assert!(toggle.active("resolved", &user));
    }

    #[test]
    fn test_features_idempotent() {
        let toggle = Toggle::new();
        let user = Context::user("1");

        toggle.sync(&user).features(["a", "b"]);
        let once = toggle.active_features(&user);
        toggle.sync(&user).features(["a", "b"]);
        assert_eq!(toggle.active_features(&user), once);
    }

    #[test]
    fn test_with_values_supersedes_features() {
        let toggle = Toggle::new();
        let user = Context::user("1");

        toggle.sync(&user).features(["f1"]);
        toggle.sync(&user).with_values([("theme", "dark")]);

        assert!(!toggle.active("f1", &user));
        assert_eq!(toggle.value("theme", &user), Variation::string("dark"));
    }

    #[test]
    fn test_groups_are_a_separate_store() {
        let toggle = Toggle::new();
        let user = Context::user("1");
        let handle = toggle.for_context(&user);

        toggle.sync(&user).features(["f1"]).groups(["beta", "staff"]);
        assert!(handle.in_group("beta"));
        assert!(handle.active("f1"));

        toggle.sync(&user).groups(["premium"]);
        assert_eq!(handle.groups().into_iter().collect::<Vec<_>>(), vec!["premium"]);
        assert!(handle.active("f1"));

        toggle.sync(&user).features(Vec::<String>::new());
        assert!(handle.in_group("premium"));
    }

    #[test]
    fn test_empty_input_clears_and_other_contexts_untouched() {
        let toggle = Toggle::new();
        let a = Context::user("a");
        let b = Context::user("b");

        toggle.sync(&a).features(["x"]).groups(["g"]);
        toggle.sync(&b).features(["x"]);

        toggle.sync(&a).features(Vec::<String>::new()).groups(Vec::<String>::new());

        assert!(toggle.for_context(&a).overrides().is_empty());
        assert!(toggle.for_context(&a).groups().is_empty());
        assert!(toggle.active("x", &b));
    }
}
