//! Evaluation Context
//!
//! A [`Context`] is the subject a feature is evaluated against: a user, a
//! team, a tenant. Its identity is the pair of a kind discriminator and a
//! stable identifier, so `user:1` and `team:1` never collide.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity of a context, used as the override store key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextKey {
    pub kind: String,
    pub id: String,
}

impl ContextKey {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Evaluation context (identity plus attributes)
///
/// Equality and hashing only consider the identity; attributes are extra
/// data for resolvers and targeting rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    key: ContextKey,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

impl Context {
    /// Kind used by [`Context::anonymous`]
    pub const ANONYMOUS_KIND: &'static str = "anonymous";

    /// Create a context from a kind discriminator and identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_toggle::Context;
    ///
    /// let user = Context::new("user", "42");
    /// assert_eq!(user.id(), "42");
    /// ```
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: ContextKey::new(kind, id),
            attributes: HashMap::new(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new("user", id)
    }

    pub fn team(id: impl Into<String>) -> Self {
        Self::new("team", id)
    }

    pub fn tenant(id: impl Into<String>) -> Self {
        Self::new("tenant", id)
    }

    /// The context used when a caller supplies none.
    ///
    /// It carries no overrides of its own unless something writes them, so
    /// evaluation against it only sees global overrides and resolvers.
    pub fn anonymous() -> Self {
        Self::new(Self::ANONYMOUS_KIND, "")
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    pub fn kind(&self) -> &str {
        &self.key.kind
    }

    pub fn id(&self) -> &str {
        &self.key.id
    }

    /// Look up an attribute; `id` and `kind` always resolve to the identity,
    /// even when an attribute of the same name was set.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(self.id()),
            "kind" => Some(self.kind()),
            _ => self.attributes.get(key).map(String::as_str),
        }
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key.fmt(f)
    }
}

/// Conversion from application entities into a feature [`Context`]
///
/// Adapters implement this for their own user/team/tenant types.
///
/// ```
/// use armature_toggle::{Context, FeatureScope};
///
/// struct Account {
///     id: u64,
///     plan: String,
/// }
///
/// impl FeatureScope for Account {
///     fn feature_context(&self) -> Context {
///         Context::new("account", self.id.to_string()).with_attribute("plan", &self.plan)
///     }
/// }
///
/// let account = Account { id: 7, plan: "pro".into() };
/// assert_eq!(account.feature_context().get("plan"), Some("pro"));
/// ```
pub trait FeatureScope {
    fn feature_context(&self) -> Context;
}

impl FeatureScope for Context {
    fn feature_context(&self) -> Context {
        self.clone()
    }
}

impl<T: FeatureScope + ?Sized> FeatureScope for &T {
    fn feature_context(&self) -> Context {
        (**self).feature_context()
    }
}

/// Anything that names one or more contexts
pub trait IntoContexts {
    fn into_contexts(self) -> Vec<Context>;
}

impl IntoContexts for Context {
    fn into_contexts(self) -> Vec<Context> {
        vec![self]
    }
}

impl IntoContexts for &Context {
    fn into_contexts(self) -> Vec<Context> {
        vec![self.clone()]
    }
}

impl IntoContexts for Vec<Context> {
    fn into_contexts(self) -> Vec<Context> {
        self
    }
}

impl IntoContexts for &[Context] {
    fn into_contexts(self) -> Vec<Context> {
        self.to_vec()
    }
}

impl IntoContexts for &Vec<Context> {
    fn into_contexts(self) -> Vec<Context> {
        self.clone()
    }
}

impl<const N: usize> IntoContexts for [Context; N] {
    fn into_contexts(self) -> Vec<Context> {
        self.into_iter().collect()
    }
}
