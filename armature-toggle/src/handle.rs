//! Context-scoped operations

use crate::Toggle;
use crate::conductors::Operation;
use crate::context::Context;
use crate::error::ToggleResult;
use crate::store::OverrideWrite;
use crate::value::Variation;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Operations bound to one context, returned by [`Toggle::for_context`]
#[derive(Debug, Clone)]
pub struct ContextHandle<'a> {
    toggle: &'a Toggle,
    context: Context,
}

impl<'a> ContextHandle<'a> {
    pub(crate) fn new(toggle: &'a Toggle, context: Context) -> Self {
        Self { toggle, context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn active(&self, name: &str) -> bool {
        self.toggle.active(name, &self.context)
    }

    pub fn inactive(&self, name: &str) -> bool {
        !self.active(name)
    }

    pub fn value(&self, name: &str) -> Variation {
        self.toggle.value(name, &self.context)
    }

    /// Store an active override (`true`)
    pub fn activate(&self, name: &str) {
        self.activate_with(name, Variation::Boolean(true));
    }

    /// Store an override carrying a payload
    pub fn activate_with(&self, name: &str, value: impl Into<Variation>) {
        let value = value.into();
        debug!(feature = %name, context = %self.context, ?value, "Activating feature");
        self.toggle.store().set(name, self.context.key(), value);
    }

    /// Store an inactive override (`false`)
    pub fn deactivate(&self, name: &str) {
        debug!(feature = %name, context = %self.context, "Deactivating feature");
        self.toggle
            .store()
            .set(name, self.context.key(), Variation::Boolean(false));
    }

    /// Drop this context's override so resolution falls through again
    pub fn forget(&self, name: &str) -> bool {
        self.toggle.store().forget(name, self.context.key())
    }

    /// Activate every member of a group for this context and record the
    /// membership
    pub fn activate_group(&self, group: &str) -> ToggleResult<()> {
        self.set_group(group, Operation::Activate)?;
        self.toggle.store().add_group(self.context.key(), group);
        Ok(())
    }

    /// Deactivate every member of a group for this context
    pub fn deactivate_group(&self, group: &str) -> ToggleResult<()> {
        self.set_group(group, Operation::Deactivate)
    }

    fn set_group(&self, name: &str, operation: Operation) -> ToggleResult<()> {
        let group = self.toggle.group_registry().require(name)?;
        let writes = group
            .members
            .iter()
            .map(|member| {
                OverrideWrite::new(self.context.key().clone(), member, operation.default_value())
            })
            .collect();
        self.toggle.store().apply(writes);
        Ok(())
    }

    pub fn active_in_group(&self, group: &str) -> ToggleResult<bool> {
        self.toggle.active_in_group(&self.context, group)
    }

    pub fn some_active_in_group(&self, group: &str) -> ToggleResult<bool> {
        self.toggle.some_active_in_group(&self.context, group)
    }

    /// Groups this context is a member of
    pub fn groups(&self) -> BTreeSet<String> {
        self.toggle.store().groups(self.context.key())
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups().contains(group)
    }

    /// Snapshot of this context's stored overrides
    pub fn overrides(&self) -> HashMap<String, Variation> {
        self.toggle.store().overrides(self.context.key())
    }

    /// Every feature active for this context, sorted
    pub fn active_features(&self) -> Vec<String> {
        self.toggle.active_features(&self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_then_deactivate() {
        let toggle = Toggle::new();
        toggle.define("a", true);
        let handle = toggle.for_context(Context::user("c1"));

        handle.activate("a");
        assert!(handle.active("a"));
        handle.deactivate("a");
        assert!(handle.inactive("a"));
    }

    #[test]
    fn test_payload_and_forget() {
        let toggle = Toggle::new();
        toggle.define("theme", "light");
        let handle = toggle.for_context(Context::user("1"));

        handle.activate_with("theme", "dark");
        assert_eq!(handle.value("theme"), Variation::string("dark"));

        assert!(handle.forget("theme"));
        assert_eq!(handle.value("theme"), Variation::string("light"));
        assert!(handle.overrides().is_empty());
    }

    #[test]
    fn test_activate_group_records_membership() {
        let toggle = Toggle::new();
        toggle.define_group("beta", ["new-ui", "search"]);
        let handle = toggle.for_context(Context::user("1"));

        handle.activate_group("beta").unwrap();
        assert!(handle.active_in_group("beta").unwrap());
        assert!(handle.in_group("beta"));

        handle.deactivate_group("beta").unwrap();
        assert!(!handle.some_active_in_group("beta").unwrap());

        // Other contexts untouched
        let other = toggle.for_context(Context::user("2"));
        assert!(!other.some_active_in_group("beta").unwrap());
        assert!(other.groups().is_empty());
    }

    #[test]
    fn test_activate_unknown_group_writes_nothing() {
        let toggle = Toggle::new();
        let handle = toggle.for_context(Context::user("1"));

        assert!(handle.activate_group("ghost").unwrap_err().is_not_defined());
        assert!(handle.groups().is_empty());
        assert!(handle.overrides().is_empty());
    }
}
