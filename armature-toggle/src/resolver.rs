//! Feature Resolvers
//!
//! A resolver produces a feature's value for a context when no override
//! applies. Constant values, closures, and rule-based targeting all share
//! the single [`Resolver::resolve`] entry point.

use crate::context::Context;
use crate::error::{ToggleError, ToggleResult};
use crate::value::Variation;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Closure resolver signature
pub type ResolverFn = dyn Fn(&Context) -> Variation + Send + Sync;

/// Feature resolver
#[derive(Clone)]
pub enum Resolver {
    /// Same value for every context
    Constant(Variation),
    /// Computed per context
    Dynamic(Arc<ResolverFn>),
    /// Targeting rules, then rollout, then a default
    Targeted(Targeting),
}

impl Resolver {
    pub fn constant(value: impl Into<Variation>) -> Self {
        Self::Constant(value.into())
    }

    /// Wrap a closure as a resolver
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_toggle::{Context, Resolver, Variation};
    ///
    /// let resolver = Resolver::dynamic(|ctx: &Context| Variation::boolean(ctx.id() == "1"));
    /// assert!(resolver.resolve(&Context::user("1")).is_truthy());
    /// ```
    pub fn dynamic<F, V>(f: F) -> Self
    where
        F: Fn(&Context) -> V + Send + Sync + 'static,
        V: Into<Variation>,
    {
        Self::Dynamic(Arc::new(move |ctx: &Context| -> Variation { f(ctx).into() }))
    }

    pub fn resolve(&self, context: &Context) -> Variation {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Dynamic(f) => f(context),
            Self::Targeted(targeting) => targeting.evaluate(context),
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::Targeted(targeting) => f.debug_tuple("Targeted").field(targeting).finish(),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::Constant(Variation::Boolean(false))
    }
}

impl From<Variation> for Resolver {
    fn from(value: Variation) -> Self {
        Self::Constant(value)
    }
}

impl From<bool> for Resolver {
    fn from(value: bool) -> Self {
        Self::Constant(value.into())
    }
}

impl From<&str> for Resolver {
    fn from(value: &str) -> Self {
        Self::Constant(value.into())
    }
}

impl From<String> for Resolver {
    fn from(value: String) -> Self {
        Self::Constant(value.into())
    }
}

impl From<f64> for Resolver {
    fn from(value: f64) -> Self {
        Self::Constant(value.into())
    }
}

impl From<serde_json::Value> for Resolver {
    fn from(value: serde_json::Value) -> Self {
        Self::Constant(value.into())
    }
}

impl From<Targeting> for Resolver {
    fn from(targeting: Targeting) -> Self {
        Self::Targeted(targeting)
    }
}

impl<F, V> From<F> for Resolver
where
    F: Fn(&Context) -> V + Send + Sync + 'static,
    V: Into<Variation>,
{
    fn from(f: F) -> Self {
        Self::dynamic(f)
    }
}

/// Rule-based resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Targeting {
    /// Feature key mixed into rollout bucketing
    pub key: String,

    /// Rules checked in order; first match wins
    pub rules: Vec<TargetingRule>,

    /// Rollout checked after rules
    pub rollout: Option<Rollout>,

    /// Value when nothing matches
    pub default_variation: Variation,
}

impl Targeting {
    pub fn new(key: impl Into<String>, default_variation: impl Into<Variation>) -> Self {
        Self {
            key: key.into(),
            rules: Vec::new(),
            rollout: None,
            default_variation: default_variation.into(),
        }
    }

    pub fn with_rule(mut self, rule: TargetingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rollout(mut self, rollout: Rollout) -> Self {
        self.rollout = Some(rollout);
        self
    }

    pub fn evaluate(&self, context: &Context) -> Variation {
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(context)) {
            return rule.variation.clone();
        }

        if let Some(ref rollout) = self.rollout
            && let Some(variation) = rollout.evaluate(context, &self.key)
        {
            return variation;
        }

        self.default_variation.clone()
    }
}

/// Targeting rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetingRule {
    /// Rule conditions (all must match)
    pub conditions: Vec<Condition>,

    /// Variation to return if rule matches
    pub variation: Variation,
}

impl TargetingRule {
    pub fn new(variation: impl Into<Variation>) -> Self {
        Self {
            conditions: Vec::new(),
            variation: variation.into(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn matches(&self, context: &Context) -> bool {
        self.conditions.iter().all(|c| c.matches(context))
    }
}

/// Targeting condition over one context attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub operator: Operator,
    pub values: Vec<String>,

    /// Compiled `Matches` patterns, built on first use
    #[serde(skip)]
    patterns: OnceLock<Vec<Regex>>,
}

impl Condition {
    pub fn new(
        attribute: impl Into<String>,
        operator: Operator,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
            patterns: OnceLock::new(),
        }
    }

    /// Regex condition; fails if any pattern does not compile
    pub fn pattern(
        attribute: impl Into<String>,
        patterns: impl IntoIterator<Item = impl Into<String>>,
    ) -> ToggleResult<Self> {
        let condition = Self::new(attribute, Operator::Matches, patterns);
        let compiled = condition.compile()?;
        let _ = condition.patterns.set(compiled);
        Ok(condition)
    }

    /// Check that every `Matches` pattern compiles
    pub fn validate(&self) -> ToggleResult<()> {
        match self.operator {
            Operator::Matches => self.compile().map(|_| ()),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, context: &Context) -> bool {
        let Some(actual) = context.get(&self.attribute) else {
            // A missing attribute is "not in" anything
            return matches!(self.operator, Operator::NotIn);
        };

        match self.operator {
            Operator::In => self.values.iter().any(|v| v == actual),
            Operator::NotIn => !self.values.iter().any(|v| v == actual),
            Operator::Contains => self.values.iter().any(|v| actual.contains(v.as_str())),
            Operator::StartsWith => self.values.iter().any(|v| actual.starts_with(v.as_str())),
            Operator::EndsWith => self.values.iter().any(|v| actual.ends_with(v.as_str())),
            Operator::Matches => self.regexes().iter().any(|re| re.is_match(actual)),
        }
    }

    fn compile(&self) -> ToggleResult<Vec<Regex>> {
        self.values
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ToggleError::config(format!(
                        "Invalid pattern '{}' for attribute '{}': {}",
                        pattern, self.attribute, e
                    ))
                })
            })
            .collect()
    }

    /// Patterns that failed to compile never match
    fn regexes(&self) -> &[Regex] {
        self.patterns.get_or_init(|| {
            self.values
                .iter()
                .filter_map(|pattern| match Regex::new(pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(
                            attribute = %self.attribute,
                            pattern = %pattern,
                            error = %e,
                            "Ignoring invalid match pattern"
                        );
                        None
                    }
                })
                .collect()
        })
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

/// Percentage rollout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rollout {
    /// Percentage (0-100)
    pub percentage: u8,

    /// Variation served to contexts inside the rollout
    pub variation: Variation,

    /// Attribute to bucket by (default: the context id)
    pub bucket_by: Option<String>,
}

impl Rollout {
    pub fn new(percentage: u8, variation: impl Into<Variation>) -> Self {
        Self {
            percentage: percentage.min(100),
            variation: variation.into(),
            bucket_by: None,
        }
    }

    pub fn with_bucket_by(mut self, attribute: impl Into<String>) -> Self {
        self.bucket_by = Some(attribute.into());
        self
    }

    pub fn evaluate(&self, context: &Context, feature_key: &str) -> Option<Variation> {
        let bucket_attr = self.bucket_by.as_deref().unwrap_or("id");
        let bucket_value = context.get(bucket_attr)?;

        if Self::bucket(feature_key, bucket_value) < self.percentage {
            Some(self.variation.clone())
        } else {
            None
        }
    }

    /// Stable bucket in 0..100 for a (feature, value) pair
    fn bucket(feature_key: &str, value: &str) -> u8 {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(feature_key.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
        let digest = hasher.finalize();

        let n = u16::from_be_bytes([digest[0], digest[1]]);
        (n % 100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_resolver_ignores_context() {
        let resolver = Resolver::from(true);
        assert!(resolver.resolve(&Context::user("1")).is_truthy());
        assert!(resolver.resolve(&Context::team("9")).is_truthy());
    }

    #[test]
    fn test_dynamic_resolver() {
        let resolver = Resolver::from(|ctx: &Context| ctx.kind() == "team");
        assert!(!resolver.resolve(&Context::user("1")).is_truthy());
        assert!(resolver.resolve(&Context::team("1")).is_truthy());
    }

    #[test]
    fn test_default_resolver_is_inactive() {
        assert_eq!(
            Resolver::default().resolve(&Context::user("1")),
            Variation::Boolean(false)
        );
    }

    #[test]
    fn test_pattern_condition_rejects_invalid_regex() {
        let ctx = Context::user("1").with_attribute("email", "ops@example.com");

        let condition = Condition::pattern("email", [r"^[a-z]+@example\.com$"]).unwrap();
        assert!(condition.matches(&ctx));
        assert!(condition.matches(&ctx));
        assert!(condition.validate().is_ok());

        let err = Condition::pattern("email", ["(unclosed"]).unwrap_err();
        assert!(matches!(err, ToggleError::Config(_)));
        assert!(
            Condition::new("email", Operator::Matches, ["[z-a]"])
                .validate()
                .is_err()
        );
        assert!(
            Condition::new("email", Operator::In, ["(unclosed"])
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_deserialized_condition_compiles_lazily() {
        let condition: Condition = serde_json::from_value(serde_json::json!({
            "attribute": "country",
            "operator": "matches",
            "values": ["^N"]
        }))
        .unwrap();

        assert!(condition.matches(&Context::user("1").with_attribute("country", "NL")));
        assert!(!condition.matches(&Context::user("2").with_attribute("country", "BE")));
    }

    #[test]
    fn test_targeting_rule() {
        let rule = TargetingRule::new(true).with_condition(Condition::new(
            "email",
            Operator::EndsWith,
            ["@example.com"],
        ));
        let targeting = Targeting::new("beta", false).with_rule(rule);

        let insider = Context::user("1").with_attribute("email", "dev@example.com");
        let outsider = Context::user("2").with_attribute("email", "someone@else.org");

        assert_eq!(targeting.evaluate(&insider), Variation::Boolean(true));
        assert_eq!(targeting.evaluate(&outsider), Variation::Boolean(false));
    }

    #[test]
    fn test_operators() {
        let ctx = Context::user("1").with_attribute("country", "NL");

        assert!(Condition::new("country", Operator::In, ["NL", "BE"]).matches(&ctx));
        assert!(!Condition::new("country", Operator::NotIn, ["NL"]).matches(&ctx));
        assert!(Condition::new("country", Operator::Contains, ["L"]).matches(&ctx));
        assert!(Condition::new("country", Operator::StartsWith, ["N"]).matches(&ctx));
        assert!(Condition::new("country", Operator::Matches, ["^[A-Z]{2}$"]).matches(&ctx));
        assert!(!Condition::new("country", Operator::Matches, ["(unclosed", "^X"]).matches(&ctx));

        // Missing attributes only satisfy NotIn
        assert!(Condition::new("plan", Operator::NotIn, ["pro"]).matches(&ctx));
        assert!(!Condition::new("plan", Operator::In, ["pro"]).matches(&ctx));
    }

    #[test]
    fn test_rollout_distribution() {
        let targeting =
            Targeting::new("new-algorithm", false).with_rollout(Rollout::new(50, true));

        let enabled = (0..1000)
            .filter(|i| targeting.evaluate(&Context::user(i.to_string())).is_truthy())
            .count();

        assert!((400..=600).contains(&enabled), "got {}", enabled);
    }

    #[test]
    fn test_rollout_is_stable() {
        let rollout = Rollout::new(30, true);
        let ctx = Context::user("user-17");
        let first = rollout.evaluate(&ctx, "checkout");
        for _ in 0..10 {
            assert_eq!(rollout.evaluate(&ctx, "checkout"), first);
        }
    }

    #[test]
    fn test_rollout_buckets_by_identity() {
        let rollout = Rollout::new(30, true);
        for i in 0..50 {
            let plain = Context::user(i.to_string());
            let shadowed = Context::user(i.to_string()).with_attribute("id", "constant");
            assert_eq!(rollout.evaluate(&plain, "f"), rollout.evaluate(&shadowed, "f"));
        }
    }

    #[test]
    fn test_rollout_bounds() {
        let ctx = Context::user("u");
        assert!(Rollout::new(0, true).evaluate(&ctx, "f").is_none());
        assert!(Rollout::new(100, true).evaluate(&ctx, "f").is_some());
        assert_eq!(Rollout::new(250, true).percentage, 100);
    }
}
