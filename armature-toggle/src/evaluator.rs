//! Feature Evaluation
//!
//! Read-only resolution of `active` / `value` for a (feature, context) pair.
//!
//! Order of checks for `active`:
//!
//! 1. every declared dependency must itself be active (a cycle fails),
//! 2. an expired feature is inactive,
//! 3. per-context override, then global override, then the resolver,
//!    then inactive for an undefined feature,
//! 4. the resolved payload's truthiness decides.
//!
//! Dependencies are walked with an explicit work stack, so chain depth is
//! bounded by memory rather than by the thread's stack. Each top-level call
//! owns its walk state: the features whose dependency check is on the current
//! path, plus the finished results. A feature on a cycle is inactive from
//! every entry point, so finished results never depend on the path taken and
//! can be reused for the rest of the call.

use crate::context::Context;
use crate::registry::{FeatureDefinition, Registry};
use crate::store::FeatureStore;
use crate::value::Variation;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Walk state for one top-level evaluation
#[derive(Default)]
struct Walk {
    /// Features whose dependency check is on the current path
    in_flight: HashSet<String>,
    /// Features already evaluated during this call
    finished: HashMap<String, bool>,
}

/// A feature whose dependencies are being checked
struct Frame {
    feature: String,
    definition: Option<FeatureDefinition>,
    next: usize,
    met: bool,
}

impl Frame {
    fn new(feature: String, definition: Option<FeatureDefinition>) -> Self {
        Self {
            feature,
            definition,
            next: 0,
            met: true,
        }
    }

    /// Next dependency to check, until one fails or all are done
    fn next_dependency(&mut self) -> Option<String> {
        if !self.met {
            return None;
        }
        let dependency = self.definition.as_ref()?.dependencies.get(self.next)?.clone();
        self.next += 1;
        Some(dependency)
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Per-context override
    Context,
    /// Global override
    Global,
    /// The definition's resolver
    Resolver,
    /// Feature is not defined and has no override
    Undefined,
}

/// Evaluator over a registry and an override store
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a Registry,
    store: &'a dyn FeatureStore,
    now: DateTime<Utc>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator; expiry is judged against the current time
    pub fn new(registry: &'a Registry, store: &'a dyn FeatureStore) -> Self {
        Self {
            registry,
            store,
            now: Utc::now(),
        }
    }

    /// Judge expiry against a fixed instant instead
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Whether the feature is active for the context
    pub fn active(&self, feature: &str, context: &Context) -> bool {
        let frame = self.walk(feature, context, &mut Walk::default());
        self.finish(&frame, context)
    }

    /// Raw resolved payload, without dependency or expiry gating
    pub fn value(&self, feature: &str, context: &Context) -> Variation {
        let definition = self.registry.get(feature);
        self.resolve(feature, definition.as_ref(), context).0
    }

    /// Resolved payload along with where it came from
    pub fn resolve_with_source(&self, feature: &str, context: &Context) -> (Variation, Source) {
        let definition = self.registry.get(feature);
        self.resolve(feature, definition.as_ref(), context)
    }

    /// Whether every declared dependency is active for the context
    pub fn dependencies_met(&self, feature: &str, context: &Context) -> bool {
        self.walk(feature, context, &mut Walk::default()).met
    }

    /// Check the root's dependencies depth-first and return its frame with
    /// `met` settled. Every feature below the root is finished on the way.
    fn walk(&self, feature: &str, context: &Context, state: &mut Walk) -> Frame {
        let mut root = Frame::new(feature.to_string(), self.registry.get(feature));
        let mut stack: Vec<Frame> = Vec::new();
        state.in_flight.insert(root.feature.clone());

        loop {
            let current = stack.last_mut().unwrap_or(&mut root);
            if let Some(dependency) = current.next_dependency() {
                match state.finished.get(&dependency) {
                    Some(&active) => current.met = active,
                    None if state.in_flight.contains(&dependency) => {
                        trace!(feature = %dependency, "Dependency cycle detected");
                        current.met = false;
                    }
                    None => {
                        state.in_flight.insert(dependency.clone());
                        let definition = self.registry.get(&dependency);
                        stack.push(Frame::new(dependency, definition));
                    }
                }
                continue;
            }

            let Some(done) = stack.pop() else {
                break;
            };
            state.in_flight.remove(&done.feature);
            let active = self.finish(&done, context);
            if !active {
                stack.last_mut().unwrap_or(&mut root).met = false;
            }
            state.finished.insert(done.feature, active);
        }

        state.in_flight.remove(&root.feature);
        root
    }

    /// Gate a frame with settled dependencies on expiry and its resolved value
    fn finish(&self, frame: &Frame, context: &Context) -> bool {
        let feature = frame.feature.as_str();
        if !frame.met {
            trace!(feature = %feature, context = %context, "Dependencies not met");
            return false;
        }

        if let Some(ref def) = frame.definition
            && def.is_expired_at(self.now)
        {
            trace!(feature = %feature, expires_at = ?def.expires_at, "Feature expired");
            return false;
        }

        let (value, source) = self.resolve(feature, frame.definition.as_ref(), context);
        let active = value.is_truthy();
        trace!(feature = %feature, context = %context, ?source, active, "Evaluated feature");
        active
    }

    fn resolve(
        &self,
        feature: &str,
        definition: Option<&FeatureDefinition>,
        context: &Context,
    ) -> (Variation, Source) {
        if let Some(value) = self.store.get(feature, context.key()) {
            return (value, Source::Context);
        }
        if let Some(value) = self.store.get_global(feature) {
            return (value, Source::Global);
        }
        match definition {
            Some(def) => (def.resolver.resolve(context), Source::Resolver),
            None => (Variation::Boolean(false), Source::Undefined),
        }
    }
}

impl std::fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("store", &self.store.store_type())
            .field("now", &self.now)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn define(registry: &Registry, name: &str, value: bool, deps: &[&str]) {
        registry.define(FeatureDefinition::new(name, value));
        if !deps.is_empty() {
            registry.requires(name, deps);
        }
    }

    #[test]
    fn test_resolution_order() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "f", false, &[]);
        let ctx = Context::user("1");
        let eval = Evaluator::new(&registry, &store);

        assert_eq!(eval.resolve_with_source("f", &ctx).1, Source::Resolver);

        store.set_global("f", Variation::boolean(true));
        assert_eq!(eval.resolve_with_source("f", &ctx).1, Source::Global);
        assert!(eval.active("f", &ctx));

        store.set("f", ctx.key(), Variation::boolean(false));
        assert_eq!(eval.resolve_with_source("f", &ctx).1, Source::Context);
        assert!(!eval.active("f", &ctx));
    }

    #[test]
    fn test_undefined_feature_is_inactive() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        let eval = Evaluator::new(&registry, &store);
        let ctx = Context::user("1");

        assert!(!eval.active("ghost", &ctx));
        assert_eq!(eval.value("ghost", &ctx), Variation::Boolean(false));
        assert!(eval.dependencies_met("ghost", &ctx));
    }

    #[test]
    fn test_undefined_dependency_is_unmet() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "f", true, &["ghost"]);
        let eval = Evaluator::new(&registry, &store);

        assert!(!eval.dependencies_met("f", &Context::user("1")));
        assert!(!eval.active("f", &Context::user("1")));
    }

    #[test]
    fn test_dependency_beats_override() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "dep", false, &[]);
        define(&registry, "f", true, &["dep"]);
        let ctx = Context::user("1");
        store.set("f", ctx.key(), Variation::boolean(true));
        let eval = Evaluator::new(&registry, &store);

        assert!(!eval.active("f", &ctx));

        store.set("dep", ctx.key(), Variation::boolean(true));
        assert!(eval.active("f", &ctx));
    }

    #[test]
    fn test_cycle_is_inactive() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "a", true, &["b"]);
        define(&registry, "b", true, &["c"]);
        define(&registry, "c", true, &["a"]);
        define(&registry, "self", true, &["self"]);
        let ctx = Context::user("1");
        store.set_global("a", Variation::boolean(true));
        let eval = Evaluator::new(&registry, &store);

        for feature in ["a", "b", "c", "self"] {
            assert!(!eval.active(feature, &ctx), "{} should be inactive", feature);
        }
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "base", true, &[]);
        define(&registry, "left", true, &["base"]);
        define(&registry, "right", true, &["base"]);
        define(&registry, "top", true, &["left", "right", "left"]);
        let eval = Evaluator::new(&registry, &store);

        assert!(eval.active("top", &Context::user("1")));
    }

    #[test]
    fn test_deep_chain_does_not_exhaust_stack() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "f0", true, &[]);
        for i in 1..20_000 {
            let previous = format!("f{}", i - 1);
            define(&registry, &format!("f{}", i), true, &[previous.as_str()]);
        }
        let ctx = Context::user("1");
        let eval = Evaluator::new(&registry, &store);

        assert!(eval.active("f19999", &ctx));
        assert!(eval.dependencies_met("f19999", &ctx));

        store.set("f0", ctx.key(), Variation::boolean(false));
        assert!(!eval.active("f19999", &ctx));
    }

    #[test]
    fn test_diamond_ladder_is_evaluated_once_per_feature() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "l0", true, &[]);
        for i in 1..=40 {
            let below = format!("l{}", i - 1);
            define(&registry, &format!("a{}", i), true, &[below.as_str()]);
            define(&registry, &format!("b{}", i), true, &[below.as_str()]);
            let (a, b) = (format!("a{}", i), format!("b{}", i));
            define(&registry, &format!("l{}", i), true, &[a.as_str(), b.as_str()]);
        }
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry.set_resolver(
            "l0",
            Resolver::from(move |_: &Context| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );
        let ctx = Context::user("1");
        let eval = Evaluator::new(&registry, &store);

        assert!(eval.active("l40", &ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.set("b1", ctx.key(), Variation::boolean(false));
        assert!(!eval.active("l40", &ctx));
        assert!(eval.active("a1", &ctx));
    }

    #[test]
    fn test_cycle_below_shared_dependency() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "x", true, &["y"]);
        define(&registry, "y", true, &["x"]);
        define(&registry, "left", true, &["x"]);
        define(&registry, "right", true, &["x"]);
        define(&registry, "top", true, &["left", "right"]);
        define(&registry, "clean", true, &[]);
        define(&registry, "mixed", true, &["clean", "top"]);
        let ctx = Context::user("1");
        let eval = Evaluator::new(&registry, &store);

        for feature in ["x", "y", "left", "right", "top", "mixed"] {
            assert!(!eval.active(feature, &ctx), "{} should be inactive", feature);
        }
        assert!(eval.active("clean", &ctx));
        assert!(!eval.dependencies_met("x", &ctx));
    }

    #[test]
    fn test_expiry() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        define(&registry, "promo", true, &[]);
        let ctx = Context::user("1");
        store.set("promo", ctx.key(), Variation::boolean(true));
        registry.set_expires_at("promo", Some(Utc::now() + Duration::hours(1)));

        let eval = Evaluator::new(&registry, &store);
        assert!(eval.active("promo", &ctx));
        assert!(!eval.at(Utc::now() + Duration::hours(2)).active("promo", &ctx));
    }

    #[test]
    fn test_payload_truthiness() {
        let registry = Registry::new();
        let store = MemoryStore::new();
        let ctx = Context::user("1");
        store.set("theme", ctx.key(), Variation::string("dark"));
        store.set("limit", ctx.key(), Variation::number(0.0));
        store.set("nothing", ctx.key(), Variation::Null);
        let eval = Evaluator::new(&registry, &store);

        assert!(eval.active("theme", &ctx));
        assert_eq!(eval.value("theme", &ctx), Variation::string("dark"));
        assert!(eval.active("limit", &ctx));
        assert!(!eval.active("nothing", &ctx));
    }
}
