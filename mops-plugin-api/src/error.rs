//! Error types for plugin authors

use thiserror::Error;

/// Which side of the accepted range a version fell out of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incompatibility {
    /// Below the minimum bound
    TooOld,
    /// Above the maximum bound
    TooNew,
}

impl std::fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooOld => f.write_str("too old"),
            Self::TooNew => f.write_str("too new"),
        }
    }
}

/// Errors produced while parsing or checking versions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The string does not follow `major.minor.patch[-prerelease][+build]`
    #[error("Invalid version format '{input}': {reason}")]
    InvalidFormat { input: String, reason: String },

    /// The version is outside the accepted range
    #[error("Version {version} is {direction} (bound: {bound})")]
    IncompatibleVersion {
        version: String,
        bound: String,
        direction: Incompatibility,
    },
}

impl VersionError {
    pub(crate) fn invalid(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// The too-old/too-new distinction, if this is a range failure
    pub fn incompatibility(&self) -> Option<Incompatibility> {
        match self {
            Self::IncompatibleVersion { direction, .. } => Some(*direction),
            Self::InvalidFormat { .. } => None,
        }
    }
}

/// Errors raised by executors, providers and functions
///
/// These cover "the call could not be dispatched". An action that ran and
/// failed is reported through [`ActionResult`](crate::ActionResult) instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// Action id is not declared by the executor
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// A required parameter is absent
    #[error("Missing required parameter '{parameter}' for '{action}'")]
    MissingParameter { action: String, parameter: String },

    /// A present parameter does not match its declared type
    #[error("Parameter '{parameter}' must be of type {expected}, got {found}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        found: String,
    },

    /// A value is not one of the declared options
    #[error("Parameter '{parameter}' must be one of [{}], got {value}", .options.join(", "))]
    InvalidOption {
        parameter: String,
        value: String,
        options: Vec<String>,
    },

    /// A dynamic provider was asked for a parameter it does not support
    #[error("Provider '{provider}' does not support parameter '{param}'")]
    UnsupportedParam { provider: String, param: String },

    /// The executor panicked while handling the call
    #[error("Executor '{id}' panicked: {message}")]
    Panicked { id: String, message: String },

    /// Infrastructure failure inside the executor
    #[error("Action failed: {0}")]
    Failed(String),
}

/// Errors that plugins can return from lifecycle hooks
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Initialization could not complete
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an initialization error
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = PluginError::Config("missing key".to_string());
        assert_eq!(config_err.to_string(), "Configuration error: missing key");

        let custom_err = PluginError::Custom("something happened".to_string());
        assert_eq!(custom_err.to_string(), "something happened");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let plugin_err: PluginError = io_err.into();

        assert!(matches!(plugin_err, PluginError::Io(_)));
        assert!(plugin_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(PluginError::custom("x"), PluginError::Custom(_)));
        assert!(matches!(PluginError::config("x"), PluginError::Config(_)));
        assert!(matches!(
            PluginError::initialization("x"),
            PluginError::Initialization(_)
        ));
    }

    #[test]
    fn test_incompatible_version_display() {
        let err = VersionError::IncompatibleVersion {
            version: "0.9.0".into(),
            bound: "1.0.0".into(),
            direction: Incompatibility::TooOld,
        };
        let msg = err.to_string();
        assert!(msg.contains("0.9.0"));
        assert!(msg.contains("too old"));
        assert!(msg.contains("1.0.0"));
        assert_eq!(err.incompatibility(), Some(Incompatibility::TooOld));
    }

    #[test]
    fn test_invalid_format_has_no_incompatibility() {
        let err = VersionError::invalid("1.2", "expected 3 components");
        assert!(err.to_string().contains("1.2"));
        assert_eq!(err.incompatibility(), None);
    }

    #[test]
    fn test_missing_parameter_display() {
        let err = ActionError::MissingParameter {
            action: "add".into(),
            parameter: "b".into(),
        };
        assert!(err.to_string().contains("'b'"));
        assert!(err.to_string().contains("'add'"));
    }

    #[test]
    fn test_invalid_option_lists_options() {
        let err = ActionError::InvalidOption {
            parameter: "level".into(),
            value: "loud".into(),
            options: vec!["low".into(), "high".into()],
        };
        assert!(err.to_string().contains("low, high"));
    }
}
