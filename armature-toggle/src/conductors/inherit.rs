//! Context inheritance

use crate::Toggle;
use crate::context::Context;
use crate::registry::IntoFeatureNames;
use crate::store::OverrideWrite;
use std::collections::HashSet;
use tracing::debug;

/// Copies a parent's active features onto a child context
///
/// Filters return a new conductor and leave the receiver as it was:
///
/// ```
/// use armature_toggle::{Context, Toggle};
///
/// let toggle = Toggle::new();
/// let base = toggle.inherit(Context::user("child"));
/// let narrowed = base.only(["reports"]);
///
/// assert!(base.only_features().is_none());
/// assert_eq!(narrowed.only_features().unwrap(), &["reports".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct InheritConductor<'a> {
    toggle: &'a Toggle,
    child: Context,
    only: Option<Vec<String>>,
    except: Option<Vec<String>>,
}

impl<'a> InheritConductor<'a> {
    pub(crate) fn new(toggle: &'a Toggle, child: Context) -> Self {
        Self {
            toggle,
            child,
            only: None,
            except: None,
        }
    }

    /// Inherit only these features
    pub fn only(&self, features: impl IntoFeatureNames) -> Self {
        Self {
            only: Some(features.into_feature_names()),
            ..self.clone()
        }
    }

    /// Inherit everything except these features
    pub fn except(&self, features: impl IntoFeatureNames) -> Self {
        Self {
            except: Some(features.into_feature_names()),
            ..self.clone()
        }
    }

    pub fn child_context(&self) -> &Context {
        &self.child
    }

    pub fn only_features(&self) -> Option<&[String]> {
        self.only.as_deref()
    }

    pub fn except_features(&self) -> Option<&[String]> {
        self.except.as_deref()
    }

    /// Execute against a parent context.
    ///
    /// Takes the parent's active features, narrows by `only`, removes
    /// `except`, then skips anything the child already overrides (whatever
    /// its value). Each survivor gets the parent's resolved value. Returns
    /// the inherited feature names, sorted.
    pub fn from(&self, parent: &Context) -> Vec<String> {
        let store = self.toggle.store();
        let evaluator = self.toggle.evaluator();

        let only: Option<HashSet<&str>> = self
            .only
            .as_ref()
            .map(|names| names.iter().map(String::as_str).collect());
        let except: HashSet<&str> = self
            .except
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();

        let inherited: Vec<String> = self
            .toggle
            .active_features(parent)
            .into_iter()
            .filter(|name| only.as_ref().is_none_or(|only| only.contains(name.as_str())))
            .filter(|name| !except.contains(name.as_str()))
            .filter(|name| !store.has(name, self.child.key()))
            .collect();

        let writes = inherited
            .iter()
            .map(|name| {
                OverrideWrite::new(self.child.key().clone(), name, evaluator.value(name, parent))
            })
            .collect();
        store.apply(writes);

        debug!(
            parent = %parent,
            child = %self.child,
            inherited = inherited.len(),
            "Inherited features"
        );

        inherited
    }
}
