//! mops-core: host side of the mops plugin contract
//!
//! Plugins are built against [`mops_plugin_api`]. This crate admits them,
//! keeps the registry of the capabilities they publish, and routes action
//! calls to the right executor. See [`plugins`] for the details.

pub mod plugins;

// Re-export key types for convenience
pub use plugins::{
    ActionRegistry, EntryKind, PluginHost, PluginHostConfig, PluginHostError, PluginInfo,
    RegistryError,
};
