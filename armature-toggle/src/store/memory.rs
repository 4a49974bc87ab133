//! In-memory override store
//!
//! Uses DashMap for thread-safe concurrent access with per-key locking.
//! Each context's overrides sit behind one map entry, so a batch for that
//! context is applied under a single entry lock.

use crate::context::ContextKey;
use crate::store::{FeatureStore, OverrideWrite};
use crate::value::Variation;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

/// In-memory override store
pub struct MemoryStore {
    /// Per-context overrides
    overrides: DashMap<ContextKey, HashMap<String, Variation>>,
    /// Global overrides
    global: DashMap<String, Variation>,
    /// Per-context group memberships
    memberships: DashMap<ContextKey, BTreeSet<String>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        debug!("Creating new in-memory feature store");
        Self {
            overrides: DashMap::new(),
            global: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    /// Number of contexts holding at least one override (for monitoring)
    pub fn context_count(&self) -> usize {
        self.overrides.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("contexts", &self.overrides.len())
            .field("global", &self.global.len())
            .field("memberships", &self.memberships.len())
            .finish()
    }
}

impl FeatureStore for MemoryStore {
    fn get(&self, feature: &str, context: &ContextKey) -> Option<Variation> {
        self.overrides
            .get(context)
            .and_then(|features| features.get(feature).cloned())
    }

    fn set(&self, feature: &str, context: &ContextKey, value: Variation) {
        trace!(feature = %feature, context = %context, ?value, "Storing override");
        self.overrides
            .entry(context.clone())
            .or_default()
            .insert(feature.to_string(), value);
    }

    fn has(&self, feature: &str, context: &ContextKey) -> bool {
        self.overrides
            .get(context)
            .is_some_and(|features| features.contains_key(feature))
    }

    fn forget(&self, feature: &str, context: &ContextKey) -> bool {
        let removed = match self.overrides.get_mut(context) {
            Some(mut features) => features.remove(feature).is_some(),
            None => false,
        };
        self.overrides.remove_if(context, |_, features| features.is_empty());
        removed
    }

    fn get_global(&self, feature: &str) -> Option<Variation> {
        self.global.get(feature).map(|entry| entry.value().clone())
    }

    fn set_global(&self, feature: &str, value: Variation) {
        trace!(feature = %feature, ?value, "Storing global override");
        self.global.insert(feature.to_string(), value);
    }

    fn forget_global(&self, feature: &str) -> bool {
        self.global.remove(feature).is_some()
    }

    fn global_overrides(&self) -> HashMap<String, Variation> {
        self.global
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn overrides(&self, context: &ContextKey) -> HashMap<String, Variation> {
        self.overrides
            .get(context)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn replace_overrides(&self, context: &ContextKey, overrides: HashMap<String, Variation>) {
        debug!(context = %context, count = overrides.len(), "Replacing context overrides");
        if overrides.is_empty() {
            self.overrides.remove(context);
        } else {
            self.overrides.insert(context.clone(), overrides);
        }
    }

    fn apply(&self, writes: Vec<OverrideWrite>) {
        let mut by_context: BTreeMap<ContextKey, Vec<(String, Variation)>> = BTreeMap::new();
        for write in writes {
            by_context
                .entry(write.context)
                .or_default()
                .push((write.feature, write.value));
        }

        for (context, writes) in by_context {
            trace!(context = %context, count = writes.len(), "Applying override batch");
            let mut features = self.overrides.entry(context).or_default();
            features.extend(writes);
        }
    }

    fn groups(&self, context: &ContextKey) -> BTreeSet<String> {
        self.memberships
            .get(context)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn replace_groups(&self, context: &ContextKey, groups: BTreeSet<String>) {
        debug!(context = %context, count = groups.len(), "Replacing group memberships");
        if groups.is_empty() {
            self.memberships.remove(context);
        } else {
            self.memberships.insert(context.clone(), groups);
        }
    }

    fn add_group(&self, context: &ContextKey, group: &str) {
        self.memberships
            .entry(context.clone())
            .or_default()
            .insert(group.to_string());
    }

    fn purge(&self, feature: &str) {
        debug!(feature = %feature, "Purging feature overrides");
        self.global.remove(feature);
        self.overrides.iter_mut().for_each(|mut features| {
            features.remove(feature);
        });
        self.overrides.retain(|_, features| !features.is_empty());
    }

    fn flush(&self) {
        debug!("Flushing all overrides");
        self.overrides.clear();
        self.global.clear();
        self.memberships.clear();
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
