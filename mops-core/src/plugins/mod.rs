//! Plugin system for mops
//!
//! This module provides the host side of the plugin contract:
//!
//! - [`PluginHost`]: admits plugins through the API version gate, initializes
//!   them, registers their capabilities and unloads them
//! - [`ActionRegistry`]: maps ids to executors, providers and functions and
//!   mediates every dispatch
//! - [`PluginHostError`] and [`RegistryError`]: error types for those operations
//!
//! Discovering plugin files and loading shared libraries is left to the
//! embedding application. It hands the host either a boxed [`Plugin`] or a
//! [`PluginConstructor`].
//!
//! # Example
//!
//! ```ignore
//! use mops_core::plugins::{PluginHost, PluginHostConfig};
//! use mops_plugin_api::PluginConfig;
//!
//! let mut host = PluginHost::new(PluginHostConfig::default());
//! host.load_from(simple_plugin::new_plugin, PluginConfig::new("simple-plugin", "1.0.0"))?;
//!
//! let result = host.execute_action("simple-actions", "hello", &Default::default())?;
//! assert_eq!(result.message, "Hello, World!");
//!
//! host.unload("simple-plugin")?;
//! ```
//!
//! [`Plugin`]: mops_plugin_api::Plugin
//! [`PluginConstructor`]: mops_plugin_api::PluginConstructor

mod error;
mod host;
mod registry;

pub use error::{EntryKind, PluginHostError, RegistryError};
pub use host::{PluginHost, PluginHostConfig, PluginInfo, Registrations};
pub use registry::ActionRegistry;
