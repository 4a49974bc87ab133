//! Feature Toggles for Armature
//!
//! Per-context feature toggles: decide whether a named feature is active for
//! a user, team or tenant, with dependencies between features, named groups,
//! and bulk mutation through conductors.
//!
//! # Features
//!
//! - 🚦 **Per-context overrides** - Activate features for one subject
//! - 🌍 **Global overrides** - Activate features for everyone
//! - 🔗 **Dependencies** - A feature is only active if its dependencies are
//! - 📦 **Groups** - Named feature sets with combined status checks
//! - 🎼 **Conductors** - Batch, group, inherit and sync bulk operations
//! - 🎯 **Targeting** - Rule and percentage-rollout resolvers
//!
//! # Quick Start
//!
//! ```
//! use armature_toggle::*;
//!
//! let toggle = Toggle::new();
//! toggle.define("new-ui", false);
//!
//! let user = Context::user("user-123");
//! toggle.for_context(&user).activate("new-ui");
//!
//! assert!(toggle.active("new-ui", &user));
//! assert!(!toggle.active("new-ui", &Context::user("user-456")));
//! ```
//!
//! # Dependencies
//!
//! Unmet dependencies win over every override, and a dependency cycle makes
//! every feature in it inactive.
//!
//! ```
//! use armature_toggle::*;
//!
//! let toggle = Toggle::new();
//! toggle.define("dep", false);
//! toggle.define("dependent", false).requires("dep").resolver(|_: &Context| false);
//! toggle.activate_for_everyone("dependent");
//!
//! assert!(!toggle.active("dependent", &Context::user("1")));
//! ```
//!
//! # Conductors
//!
//! ```
//! use armature_toggle::*;
//!
//! # fn main() -> ToggleResult<()> {
//! let toggle = Toggle::new();
//! toggle.define_group("beta", ["new-ui", "search"]);
//!
//! let team = Context::team("core");
//! let users = vec![Context::user("1"), Context::user("2")];
//!
//! // Every feature x every context
//! toggle.batch().activate(["export", "reports"]).for_contexts(users.clone());
//!
//! // Every group member x every context
//! toggle.activate_group_conductor("beta").for_contexts(&team)?;
//!
//! // Copy the team's active features onto a user, minus one
//! toggle.inherit(&users[0]).except("search").from(&team);
//!
//! // Replace a user's overrides wholesale
//! toggle.sync(&users[1]).features(["export"]).groups(["beta"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Targeting Rules
//!
//! ```
//! use armature_toggle::*;
//!
//! let targeting = Targeting::new("beta-feature", false)
//!     .with_rule(TargetingRule::new(true).with_condition(Condition::new(
//!         "email",
//!         Operator::EndsWith,
//!         ["@company.com"],
//!     )))
//!     .with_rollout(Rollout::new(25, true));
//!
//! let toggle = Toggle::new();
//! toggle.define("beta-feature", targeting);
//!
//! let staff = Context::user("7").with_attribute("email", "ana@company.com");
//! assert!(toggle.active("beta-feature", &staff));
//! ```

pub mod conductors;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod groups;
pub mod handle;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod value;

pub use conductors::{BatchConductor, GroupConductor, InheritConductor, Operation, SyncConductor};
pub use config::{ToggleBuilder, ToggleConfig};
pub use context::{Context, ContextKey, FeatureScope, IntoContexts};
pub use engine::Toggle;
pub use error::{ToggleError, ToggleResult};
pub use evaluator::{Evaluator, Source};
pub use groups::{FeatureGroup, GroupConfig, GroupRegistry, GroupsConfig};
pub use handle::ContextHandle;
pub use registry::{DefinitionHandle, FeatureDefinition, IntoFeatureNames, Registry};
pub use resolver::{Condition, Operator, Resolver, Rollout, Targeting, TargetingRule};
pub use store::{FeatureStore, MemoryStore, OverrideWrite};
pub use value::Variation;
