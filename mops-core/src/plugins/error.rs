//! Plugin host error types

use std::time::Duration;

use mops_plugin_api::{ActionError, PluginError, VersionError};
use thiserror::Error;

/// Kind of registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Executor,
    Provider,
    Function,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executor => f.write_str("executor"),
            Self::Provider => f.write_str("provider"),
            Self::Function => f.write_str("function"),
        }
    }
}

/// Errors from registration and dispatch in the [`ActionRegistry`](super::ActionRegistry)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Entry has an empty id
    #[error("Cannot register {kind} with an empty id")]
    EmptyId { kind: EntryKind },

    /// An entry with this id is already registered
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: EntryKind, id: String },

    /// Dispatch to an unregistered executor
    #[error("Executor '{0}' not found")]
    ExecutorNotFound(String),

    /// Lookup of an unregistered provider
    #[error("Provider '{0}' not found")]
    ProviderNotFound(String),

    /// Dispatch to an unregistered function
    #[error("Function '{0}' not found")]
    FunctionNotFound(String),

    /// Validation failure or panic reported by the target
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Errors that can occur in the plugin host
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// Plugin is disabled by the loader config or its own config
    #[error("Plugin '{name}' is disabled")]
    Disabled { name: String },

    /// A plugin with this name is already loaded
    #[error("Plugin '{name}' is already loaded")]
    AlreadyLoaded { name: String },

    /// Plugin not found
    #[error("Plugin '{name}' not found")]
    NotFound { name: String },

    /// Plugin failed the version admission gate
    #[error("Plugin '{name}' rejected: {source}")]
    Incompatible {
        name: String,
        #[source]
        source: VersionError,
    },

    /// Plugin initialization returned an error
    #[error("Plugin '{name}' initialization failed: {source}")]
    InitFailed {
        name: String,
        #[source]
        source: PluginError,
    },

    /// Plugin panicked during initialization
    #[error("Plugin '{name}' panicked during initialization")]
    InitPanicked { name: String },

    /// Registration or dispatch error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Action exceeded its execution deadline
    #[error("Executor '{executor}' timed out after {timeout:?}")]
    Timeout { executor: String, timeout: Duration },

    /// The blocking dispatch task could not be joined
    #[error("Dispatch task failed: {0}")]
    Join(String),
}

impl PluginHostError {
    /// The version failure behind an admission rejection, if any
    pub fn version_error(&self) -> Option<&VersionError> {
        match self {
            Self::Incompatible { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mops_plugin_api::Incompatibility;

    #[test]
    fn test_duplicate_id_display() {
        let err = RegistryError::DuplicateId {
            kind: EntryKind::Executor,
            id: "x".into(),
        };
        assert_eq!(err.to_string(), "Duplicate executor id: x");
    }

    #[test]
    fn test_action_error_is_transparent() {
        let err: RegistryError = ActionError::UnknownAction("nope".into()).into();
        assert_eq!(err.to_string(), "Unknown action: nope");
    }

    #[test]
    fn test_incompatible_display_and_accessor() {
        let err = PluginHostError::Incompatible {
            name: "future".into(),
            source: VersionError::IncompatibleVersion {
                version: "2.0.0".into(),
                bound: "1.99.99".into(),
                direction: Incompatibility::TooNew,
            },
        };
        assert!(err.to_string().contains("future"));
        assert!(err.to_string().contains("too new"));
        assert_eq!(
            err.version_error().and_then(VersionError::incompatibility),
            Some(Incompatibility::TooNew)
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = PluginHostError::Timeout {
            executor: "slow".to_string(),
            timeout: Duration::from_secs(5),
        };
        let msg = err.to_string();
        assert!(msg.contains("slow"));
        assert!(msg.contains("5"));
    }

    #[test]
    fn test_registry_error_conversion() {
        let err: PluginHostError = RegistryError::ExecutorNotFound("x".into()).into();
        assert!(matches!(
            err,
            PluginHostError::Registry(RegistryError::ExecutorNotFound(_))
        ));
    }
}
