//! Toggle Engine
//!
//! [`Toggle`] owns the feature registry, the group registry and the override
//! store. Every operation goes through an explicitly constructed instance;
//! two instances never share state.

use crate::conductors::{
    BatchConductor, GroupConductor, InheritConductor, Operation, SyncConductor,
};
use crate::config::ToggleBuilder;
use crate::context::{Context, FeatureScope};
use crate::error::ToggleResult;
use crate::evaluator::Evaluator;
use crate::groups::{FeatureGroup, GroupRegistry, GroupsConfig};
use crate::handle::ContextHandle;
use crate::registry::{DefinitionHandle, FeatureDefinition, IntoFeatureNames, Registry};
use crate::resolver::Resolver;
use crate::store::{FeatureStore, MemoryStore};
use crate::value::Variation;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// The feature toggle engine
pub struct Toggle {
    registry: Registry,
    groups: GroupRegistry,
    store: Arc<dyn FeatureStore>,
}

impl Toggle {
    /// Create an engine backed by an in-memory store
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Create an engine backed by the given store
    pub fn with_store(store: Arc<dyn FeatureStore>) -> Self {
        Self {
            registry: Registry::new(),
            groups: GroupRegistry::new(),
            store,
        }
    }

    /// Create a new engine builder
    pub fn builder() -> ToggleBuilder {
        ToggleBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn group_registry(&self) -> &GroupRegistry {
        &self.groups
    }

    pub fn store(&self) -> &dyn FeatureStore {
        self.store.as_ref()
    }

    /// Read-only evaluator over this engine's state
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.registry, self.store.as_ref())
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    /// Define (or redefine) a feature
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_toggle::{Context, Toggle};
    ///
    /// let toggle = Toggle::new();
    /// toggle.define("billing", true);
    /// toggle
    ///     .define("invoices", false)
    ///     .requires("billing")
    ///     .resolver(|ctx: &Context| ctx.kind() == "team");
    ///
    /// assert!(toggle.active("invoices", &Context::team("1")));
    /// assert!(!toggle.active("invoices", &Context::user("1")));
    /// ```
    pub fn define(
        &self,
        name: impl Into<String>,
        resolver: impl Into<Resolver>,
    ) -> DefinitionHandle<'_> {
        let name = name.into();
        self.registry.define(FeatureDefinition::new(name.clone(), resolver));
        DefinitionHandle::new(&self.registry, name)
    }

    pub fn definition(&self, name: &str) -> Option<FeatureDefinition> {
        self.registry.get(name)
    }

    /// Defined feature names, sorted
    pub fn defined(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn get_dependencies(&self, name: &str) -> Vec<String> {
        self.registry.dependencies(name)
    }

    /// Whether the feature's dependencies are met; without a context the
    /// anonymous context is used.
    pub fn dependencies_met(&self, name: &str, context: Option<&Context>) -> bool {
        match context {
            Some(context) => self.evaluator().dependencies_met(name, context),
            None => self
                .evaluator()
                .dependencies_met(name, &Context::anonymous()),
        }
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    pub fn active(&self, name: &str, context: &Context) -> bool {
        self.evaluator().active(name, context)
    }

    pub fn inactive(&self, name: &str, context: &Context) -> bool {
        !self.active(name, context)
    }

    pub fn value(&self, name: &str, context: &Context) -> Variation {
        self.evaluator().value(name, context)
    }

    /// Names of every feature active for the context, sorted.
    ///
    /// Candidates are defined features plus anything overridden for the
    /// context or globally.
    pub fn active_features(&self, context: &Context) -> Vec<String> {
        let mut candidates: BTreeSet<String> = self.registry.names().into_iter().collect();
        candidates.extend(self.store.overrides(context.key()).into_keys());
        candidates.extend(self.store.global_overrides().into_keys());

        let evaluator = self.evaluator();
        candidates
            .into_iter()
            .filter(|name| evaluator.active(name, context))
            .collect()
    }

    /// Scoped operations for one context
    pub fn for_context(&self, scope: impl FeatureScope) -> ContextHandle<'_> {
        ContextHandle::new(self, scope.feature_context())
    }

    // ------------------------------------------------------------------
    // Global overrides
    // ------------------------------------------------------------------

    pub fn activate_for_everyone(&self, name: &str) {
        self.activate_for_everyone_with(name, Variation::Boolean(true));
    }

    pub fn activate_for_everyone_with(&self, name: &str, value: impl Into<Variation>) {
        debug!(feature = %name, "Activating feature for everyone");
        self.store.set_global(name, value.into());
    }

    pub fn deactivate_for_everyone(&self, name: &str) {
        debug!(feature = %name, "Deactivating feature for everyone");
        self.store.set_global(name, Variation::Boolean(false));
    }

    /// Remove a feature's overrides everywhere, per-context and global
    pub fn purge(&self, name: &str) {
        self.store.purge(name);
    }

    /// Remove every override and group membership
    pub fn flush(&self) {
        self.store.flush();
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    pub fn define_group(&self, name: impl Into<String>, members: impl IntoFeatureNames) {
        self.groups.define(FeatureGroup::new(name, members));
    }

    pub fn register_group(&self, group: FeatureGroup) {
        self.groups.define(group);
    }

    pub fn get_group(&self, name: &str) -> Option<FeatureGroup> {
        self.groups.get(name)
    }

    pub fn all_groups(&self) -> Vec<FeatureGroup> {
        self.groups.all()
    }

    /// Register every group in a configuration; returns how many were loaded
    pub fn load_groups_from_config(&self, config: &GroupsConfig) -> usize {
        self.groups.load(config)
    }

    pub fn activate_group_for_everyone(&self, name: &str) -> ToggleResult<()> {
        self.set_group_globally(name, Operation::Activate)
    }

    pub fn deactivate_group_for_everyone(&self, name: &str) -> ToggleResult<()> {
        self.set_group_globally(name, Operation::Deactivate)
    }

    fn set_group_globally(&self, name: &str, operation: Operation) -> ToggleResult<()> {
        let group = self.groups.require(name)?;
        debug!(
            group = %name,
            ?operation,
            members = group.members.len(),
            "Setting group for everyone"
        );
        for member in &group.members {
            self.store.set_global(member, operation.default_value());
        }
        Ok(())
    }

    /// Whether every member of the group is active (true for an empty group)
    pub fn active_in_group(&self, context: &Context, name: &str) -> ToggleResult<bool> {
        let group = self.groups.require(name)?;
        let evaluator = self.evaluator();
        Ok(group
            .members
            .iter()
            .all(|member| evaluator.active(member, context)))
    }

    /// Whether any member of the group is active (false for an empty group)
    pub fn some_active_in_group(&self, context: &Context, name: &str) -> ToggleResult<bool> {
        let group = self.groups.require(name)?;
        let evaluator = self.evaluator();
        Ok(group
            .members
            .iter()
            .any(|member| evaluator.active(member, context)))
    }

    // ------------------------------------------------------------------
    // Conductors
    // ------------------------------------------------------------------

    pub fn batch(&self) -> BatchConductor<'_> {
        BatchConductor::new(self)
    }

    pub fn activate_group_conductor(&self, name: impl Into<String>) -> GroupConductor<'_> {
        GroupConductor::new(self, Operation::Activate, name.into())
    }

    pub fn deactivate_group_conductor(&self, name: impl Into<String>) -> GroupConductor<'_> {
        GroupConductor::new(self, Operation::Deactivate, name.into())
    }

    pub fn inherit(&self, child: impl FeatureScope) -> InheritConductor<'_> {
        InheritConductor::new(self, child.feature_context())
    }

    pub fn sync(&self, scope: impl FeatureScope) -> SyncConductor<'_> {
        SyncConductor::new(self, scope.feature_context())
    }
}

impl Default for Toggle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Toggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toggle")
            .field("features", &self.registry.len())
            .field("groups", &self.groups.all().len())
            .field("store", &self.store.store_type())
            .finish()
    }
}
