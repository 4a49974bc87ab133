//! Cartesian batch activation

use super::Operation;
use crate::Toggle;
use crate::context::{Context, IntoContexts};
use crate::registry::IntoFeatureNames;
use crate::store::OverrideWrite;
use crate::value::Variation;
use tracing::debug;

/// Staged activate/deactivate over every (feature, context) pair
///
/// ```
/// use armature_toggle::{Context, Toggle};
///
/// let toggle = Toggle::new();
/// let users = [Context::user("1"), Context::user("2")];
///
/// toggle
///     .batch()
///     .activate(["export", "reports"])
///     .for_contexts(&users[..]);
///
/// assert!(toggle.active("reports", &users[1]));
/// ```
#[derive(Debug, Clone)]
pub struct BatchConductor<'a> {
    toggle: &'a Toggle,
    operation: Operation,
    features: Vec<String>,
    value: Variation,
}

impl<'a> BatchConductor<'a> {
    pub(crate) fn new(toggle: &'a Toggle) -> Self {
        Self {
            toggle,
            operation: Operation::Activate,
            features: Vec::new(),
            value: Operation::Activate.default_value(),
        }
    }

    /// Stage activation with the default `true` payload
    pub fn activate(self, features: impl IntoFeatureNames) -> Self {
        self.activate_with(features, Operation::Activate.default_value())
    }

    /// Stage activation with an explicit payload
    pub fn activate_with(
        mut self,
        features: impl IntoFeatureNames,
        value: impl Into<Variation>,
    ) -> Self {
        self.operation = Operation::Activate;
        self.features = features.into_feature_names();
        self.value = value.into();
        self
    }

    /// Stage deactivation
    pub fn deactivate(mut self, features: impl IntoFeatureNames) -> Self {
        self.operation = Operation::Deactivate;
        self.features = features.into_feature_names();
        self.value = Operation::Deactivate.default_value();
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Payload written for each pair (`false` when deactivating)
    pub fn value(&self) -> &Variation {
        &self.value
    }

    /// Execute for every staged feature and every context.
    ///
    /// Returns the number of overrides written. Re-running is idempotent.
    pub fn for_contexts(&self, contexts: impl IntoContexts) -> usize {
        let contexts = contexts.into_contexts();
        let writes = self.writes(&contexts);
        let count = writes.len();

        debug!(
            operation = ?self.operation,
            features = self.features.len(),
            contexts = contexts.len(),
            "Executing batch"
        );

        if count > 0 {
            self.toggle.store().apply(writes);
        }
        count
    }

    fn writes(&self, contexts: &[Context]) -> Vec<OverrideWrite> {
        contexts
            .iter()
            .flat_map(|context| {
                self.features.iter().map(move |feature| {
                    OverrideWrite::new(context.key().clone(), feature, self.value.clone())
                })
            })
            .collect()
    }
}
