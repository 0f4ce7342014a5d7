//! mops-plugin-api - the contract between the mops host and its plugins
//!
//! This crate provides the traits and types needed to write plugins for mops.
//! A plugin declares the API version it was built against, is initialized
//! once with a [`PluginConfig`], and then publishes capabilities: action
//! executors, dynamic menu providers and interactive functions. The host
//! registers those capabilities and dispatches calls to them.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mops_plugin_api::{
//!     ActionExecutor, Plugin, PluginConfig, PluginError, PluginManifest, export_plugin,
//! };
//!
//! #[derive(Default)]
//! pub struct MyPlugin;
//!
//! impl Plugin for MyPlugin {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest {
//!             name: "my-plugin".to_string(),
//!             version: "0.1.0".to_string(),
//!             description: "My custom plugin".to_string(),
//!             ..Default::default()
//!         }
//!     }
//!
//!     fn initialize(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!
//!     fn executors(&self) -> Vec<Arc<dyn ActionExecutor>> {
//!         vec![]
//!     }
//!
//!     fn cleanup(&mut self) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//! }
//!
//! export_plugin!(MyPlugin);
//! ```

use std::sync::Arc;

pub mod action;
pub mod config;
pub mod error;
pub mod executor;
pub mod types;
pub mod version;

pub use action::{
    ActionExample, ActionInfo, ActionResult, MenuEntry, ParameterInfo, Params, find_action,
};
pub use config::{
    BuildInfo, DependencyInfo, LoaderConfig, Permissions, PluginConfig, PluginMetadata,
    PluginRepository, RepositoryKind, ResourceLimits, SecurityConfig,
};
pub use error::{ActionError, Incompatibility, PluginError, VersionError};
pub use executor::{ActionExecutor, DynamicProvider, InteractiveFunction};
pub use types::PluginManifest;
pub use version::{
    CURRENT_API_VERSION, CURRENT_API_VERSION_CSTR, MAX_API_VERSION, MIN_API_VERSION, Version,
    VersionRange, check_api_compatibility, current_api_version,
};

/// Symbol name of the exported constructor
pub const CREATE_SYMBOL: &[u8] = b"_mops_plugin_create";

/// Symbol name of the exported API version accessor
pub const API_VERSION_SYMBOL: &[u8] = b"_mops_plugin_api_version";

/// Signature of a plugin constructor
pub type PluginConstructor = fn() -> Box<dyn Plugin>;

/// The plugin lifecycle - implement this to create a mops plugin.
///
/// The host calls, in order: [`manifest`](Self::manifest) (to run the API
/// admission gate), [`initialize`](Self::initialize) once, the capability
/// accessors, and finally [`cleanup`](Self::cleanup) once after no more calls
/// can reach the plugin's capabilities.
pub trait Plugin: Send + Sync {
    /// Return plugin identity and declared API version
    fn manifest(&self) -> PluginManifest;

    /// Called once after admission, before capabilities are collected
    fn initialize(&mut self, config: &PluginConfig) -> Result<(), PluginError>;

    /// Action executors provided by this plugin
    fn executors(&self) -> Vec<Arc<dyn ActionExecutor>> {
        Vec::new()
    }

    /// Dynamic providers provided by this plugin
    fn providers(&self) -> Vec<Arc<dyn DynamicProvider>> {
        Vec::new()
    }

    /// Interactive functions provided by this plugin
    fn functions(&self) -> Vec<Arc<dyn InteractiveFunction>> {
        Vec::new()
    }

    /// Called once when the plugin is unloaded
    fn cleanup(&mut self) -> Result<(), PluginError>;
}

/// Export a plugin type for dynamic loading.
///
/// The plugin type must implement [`Default`].
///
/// # Usage
///
/// ```ignore
/// mops_plugin_api::export_plugin!(MyPlugin);
/// ```
///
/// # Generated Functions
///
/// - `_mops_plugin_create()`: Creates a new plugin instance
/// - `_mops_plugin_api_version()`: Returns the API version the plugin was built with
/// - `_mops_plugin_destroy()`: Destroys a plugin instance
/// - `new_plugin()`: Safe Rust constructor matching [`PluginConstructor`]
#[macro_export]
macro_rules! export_plugin {
    ($plugin_type:ty) => {
        /// Plugin constructor for in-process hosts
        pub fn new_plugin() -> Box<dyn $crate::Plugin> {
            Box::new(<$plugin_type>::default())
        }

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _mops_plugin_create() -> *mut dyn $crate::Plugin {
            Box::into_raw(new_plugin())
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _mops_plugin_api_version() -> *const ::std::ffi::c_char {
            $crate::CURRENT_API_VERSION_CSTR.as_ptr()
        }

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _mops_plugin_destroy(ptr: *mut dyn $crate::Plugin) {
            if !ptr.is_null() {
                unsafe {
                    drop(Box::from_raw(ptr));
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_api_version_cstr_matches() {
        assert_eq!(CURRENT_API_VERSION_CSTR.to_str().unwrap(), CURRENT_API_VERSION);
    }

    #[test]
    fn test_plugin_trait_is_object_safe() {
        // This compiles only if Plugin is object-safe
        fn _takes_boxed_plugin(_: Box<dyn Plugin>) {}
    }

    #[test]
    fn test_current_api_version_is_admitted() {
        assert!(check_api_compatibility(CURRENT_API_VERSION).is_ok());
    }

    mod exported {
        use crate::{Plugin, PluginConfig, PluginError, PluginManifest};

        #[derive(Default)]
        pub struct Empty;

        impl Plugin for Empty {
            fn manifest(&self) -> PluginManifest {
                PluginManifest {
                    name: "empty".into(),
                    ..Default::default()
                }
            }

            fn initialize(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
                Ok(())
            }

            fn cleanup(&mut self) -> Result<(), PluginError> {
                Ok(())
            }
        }

        crate::export_plugin!(Empty);
    }

    #[test]
    fn test_export_plugin_generates_constructor() {
        let constructor: PluginConstructor = exported::new_plugin;
        let plugin = constructor();
        assert_eq!(plugin.manifest().name, "empty");
        assert!(plugin.executors().is_empty());
        assert!(plugin.providers().is_empty());
        assert!(plugin.functions().is_empty());
    }

    #[test]
    fn test_export_plugin_raw_symbols() {
        let version = unsafe { CStr::from_ptr(exported::_mops_plugin_api_version()) };
        assert_eq!(version.to_str().unwrap(), CURRENT_API_VERSION);

        let raw = exported::_mops_plugin_create();
        assert!(!raw.is_null());
        exported::_mops_plugin_destroy(raw);
    }
}
