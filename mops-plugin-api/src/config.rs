//! Configuration value objects
//!
//! [`PluginConfig`] is handed to a plugin once, in
//! [`Plugin::initialize`](crate::Plugin::initialize). [`PluginMetadata`] is the
//! plugin's descriptor file. [`LoaderConfig`] stays on the host side and is
//! never shown to plugins.
//!
//! All of them are plain TOML documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, VersionError};
use crate::version::{Version, VersionRange, check_api_compatibility};

fn default_true() -> bool {
    true
}

/// Configuration passed to a plugin at initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    pub version: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Plugin-specific settings
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub config: toml::Table,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceLimits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

/// Resource constraints declared for a plugin
///
/// Only `max_execution_seconds` is enforced, by the host, as a dispatch
/// deadline. The rest is informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cpu_percent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_execution_seconds: Option<u64>,
}

/// What a plugin is allowed to do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub network_access: bool,
    #[serde(default)]
    pub filesystem_access: bool,
    #[serde(default)]
    pub system_commands: bool,
    /// Paths reachable when `filesystem_access` is set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_paths: Vec<PathBuf>,
    /// Commands runnable when `system_commands` is set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_commands: Vec<String>,
}

/// Descriptor shipped alongside a plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Oldest host version the plugin runs on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mops_version_min: Option<String>,
    /// Newest host version the plugin runs on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mops_version_max: Option<String>,
    pub api_version: String,

    #[serde(default)]
    pub requires_network: bool,
    #[serde(default)]
    pub requires_system_commands: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<BuildInfo>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// How a plugin binary was built
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub rustc_version: String,
    pub build_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
    pub target_os: String,
    pub target_arch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyInfo>,
}

/// A dependency recorded in [`BuildInfo`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Host-side plugin loading policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Plugins to load; empty means every available plugin
    pub enabled_plugins: Vec<String>,
    /// Plugins never to load, even if listed in `enabled_plugins`
    pub disabled_plugins: Vec<String>,
    /// Abort loading on the first plugin that fails
    pub fail_on_error: bool,
    /// Log admission decisions at info level
    pub verbose_logging: bool,
    pub plugin_directories: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugin_repositories: Vec<PluginRepository>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
}

/// Source of plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRepository {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: RepositoryKind,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
}

/// Kind of plugin repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryKind {
    Github,
    Local,
    Http,
}

/// Security settings for plugin loading
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub allow_unsigned: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_signatures: Vec<String>,
    pub enable_sandbox: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_permissions: Option<Permissions>,
}

// ─── TOML file helpers ───────────────────────────────────────────────

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, PluginError> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| PluginError::Config(format!("{}: {e}", path.display())))
}

fn write_toml<T: Serialize>(value: &T, path: &Path) -> Result<(), PluginError> {
    let content =
        toml::to_string_pretty(value).map_err(|e| PluginError::Serialization(e.to_string()))?;

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent().filter(|p| !p.exists()) {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    tracing::debug!(path = %path.display(), "Wrote config");
    Ok(())
}

impl PluginConfig {
    /// Create an enabled config with no settings
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            enabled: true,
            config: toml::Table::new(),
            environment: HashMap::new(),
            limits: None,
            permissions: None,
        }
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        read_toml(path)
    }

    /// Save to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), PluginError> {
        write_toml(self, path)
    }

    /// Read a plugin-specific setting
    ///
    /// Returns `None` if the key is missing or has a different type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.get(key).and_then(|v| v.clone().try_into().ok())
    }

    /// Set a plugin-specific setting
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PluginError> {
        let value =
            toml::Value::try_from(value).map_err(|e| PluginError::Serialization(e.to_string()))?;
        self.config.insert(key.to_string(), value);
        Ok(())
    }

    /// Builder: set resource limits
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Builder: set permissions
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Dispatch deadline derived from the resource limits, if any
    pub fn execution_timeout(&self) -> Option<Duration> {
        self.limits.as_ref().and_then(ResourceLimits::execution_timeout)
    }
}

impl ResourceLimits {
    /// `max_execution_seconds` as a duration; zero means no limit
    pub fn execution_timeout(&self) -> Option<Duration> {
        self.max_execution_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl PluginMetadata {
    /// Load a descriptor from a TOML file
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        read_toml(path)
    }

    /// Save the descriptor to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), PluginError> {
        write_toml(self, path)
    }

    /// Range of host versions this plugin declares support for
    pub fn host_range(&self) -> Result<VersionRange, VersionError> {
        VersionRange::parse(
            self.mops_version_min.as_deref(),
            self.mops_version_max.as_deref(),
        )
    }

    /// Check the declared API version and host range against a host
    pub fn check_compatibility(&self, host_version: &Version) -> Result<(), VersionError> {
        check_api_compatibility(&self.api_version)?;
        self.host_range()?.check(host_version)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            enabled_plugins: Vec::new(),
            disabled_plugins: Vec::new(),
            fail_on_error: false,
            verbose_logging: false,
            plugin_directories: vec![PathBuf::from("./plugins"), mops_paths::plugin_dir()],
            plugin_repositories: Vec::new(),
            security: Some(SecurityConfig {
                allow_unsigned: true,
                required_signatures: Vec::new(),
                enable_sandbox: false,
                default_permissions: Some(Permissions {
                    network_access: true,
                    filesystem_access: true,
                    system_commands: true,
                    ..Default::default()
                }),
            }),
        }
    }
}

impl LoaderConfig {
    /// Load from a TOML file
    ///
    /// Returns the default config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No loader config, using defaults");
            return Ok(Self::default());
        }
        read_toml(path)
    }

    /// Save to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), PluginError> {
        write_toml(self, path)
    }

    /// Whether a plugin passes the enabled/disabled lists
    ///
    /// The disabled list wins over the enabled list.
    pub fn is_plugin_allowed(&self, name: &str) -> bool {
        if self.disabled_plugins.iter().any(|p| p == name) {
            return false;
        }
        self.enabled_plugins.is_empty() || self.enabled_plugins.iter().any(|p| p == name)
    }

    /// Permissions granted to plugins whose config declares none
    pub fn default_permissions(&self) -> Permissions {
        self.security
            .as_ref()
            .and_then(|s| s.default_permissions.clone())
            .unwrap_or_default()
    }
}
