//! Conductors
//!
//! Staged bulk mutations. A conductor describes an operation, then executes
//! it against the engine with `for_contexts` (or `from` for inheritance).
//!
//! - [`BatchConductor`]: Cartesian activate/deactivate of features x contexts
//! - [`GroupConductor`]: the same, with members taken from a named group
//! - [`InheritConductor`]: copy a parent's active features onto a child
//! - [`SyncConductor`]: replace a context's overrides or group memberships

mod batch;
mod group;
mod inherit;
mod sync;

pub use batch::BatchConductor;
pub use group::GroupConductor;
pub use inherit::InheritConductor;
pub use sync::SyncConductor;

use crate::value::Variation;
use serde::{Deserialize, Serialize};

/// Staged operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Activate,
    Deactivate,
}

impl Operation {
    /// Value written when no explicit payload is staged
    pub fn default_value(self) -> Variation {
        Variation::Boolean(matches!(self, Self::Activate))
    }
}
