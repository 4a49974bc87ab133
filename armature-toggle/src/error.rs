//! Error types for feature toggles

use thiserror::Error;

/// Result type for toggle operations
pub type ToggleResult<T> = Result<T, ToggleError>;

/// Toggle errors
///
/// Unknown features and unknown dependencies are never errors: they resolve
/// as inactive. Only operations that name an unregistered group fail.
#[derive(Debug, Error)]
pub enum ToggleError {
    /// A group operation referenced a group that was never defined
    #[error("Feature group not defined: {0}")]
    NotDefined(String),

    /// Group configuration is structurally invalid
    #[error("Toggle configuration error: {0}")]
    Config(String),

    /// Group configuration source could not be parsed
    #[error("Failed to parse toggle configuration: {0}")]
    Parse(String),
}

impl ToggleError {
    /// Create a new not-defined error for a group name
    pub fn not_defined<S: Into<String>>(group: S) -> Self {
        Self::NotDefined(group.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is a not-defined error
    pub fn is_not_defined(&self) -> bool {
        matches!(self, Self::NotDefined(_))
    }
}

impl From<serde_json::Error> for ToggleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("JSON parse error: {}", err))
    }
}

impl From<toml::de::Error> for ToggleError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(format!("TOML parse error: {}", err))
    }
}
