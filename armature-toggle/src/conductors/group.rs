//! Group-first activation

use super::{BatchConductor, Operation};
use crate::Toggle;
use crate::context::IntoContexts;
use crate::error::ToggleResult;
use crate::value::Variation;
use tracing::debug;

/// Staged activate/deactivate of one group's members
///
/// Members are looked up when the conductor executes, so a group redefined
/// after staging is applied with its current members.
#[derive(Debug, Clone)]
pub struct GroupConductor<'a> {
    toggle: &'a Toggle,
    operation: Operation,
    group: String,
    value: Variation,
}

impl<'a> GroupConductor<'a> {
    pub(crate) fn new(toggle: &'a Toggle, operation: Operation, group: String) -> Self {
        Self {
            toggle,
            operation,
            group,
            value: operation.default_value(),
        }
    }

    /// Payload to write when activating (ignored for deactivation)
    pub fn with_value(mut self, value: impl Into<Variation>) -> Self {
        if self.operation == Operation::Activate {
            self.value = value.into();
        }
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn value(&self) -> &Variation {
        &self.value
    }

    /// Execute across members x contexts.
    ///
    /// Fails with [`ToggleError::NotDefined`](crate::ToggleError::NotDefined)
    /// before writing anything if the group is unknown.
    pub fn for_contexts(&self, contexts: impl IntoContexts) -> ToggleResult<usize> {
        let group = self.toggle.group_registry().require(&self.group)?;
        debug!(group = %self.group, operation = ?self.operation, "Executing group conductor");

        let batch = match self.operation {
            Operation::Activate => self
                .toggle
                .batch()
                .activate_with(group.members, self.value.clone()),
            Operation::Deactivate => self.toggle.batch().deactivate(group.members),
        };
        Ok(batch.for_contexts(contexts))
    }
}
