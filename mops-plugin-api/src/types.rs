//! Plugin identity

use serde::{Deserialize, Serialize};

/// Identity a plugin reports to the host before it is initialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin name
    pub name: String,
    /// Plugin release version (semver)
    pub version: String,
    /// Human-readable description
    pub description: String,
    /// Contract version this plugin was built against
    pub api_version: String,
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: "0.0.1".to_string(),
            description: String::new(),
            api_version: crate::CURRENT_API_VERSION.to_string(),
        }
    }
}
