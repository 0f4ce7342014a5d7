//! PluginHost - admits plugins, manages their lifecycle, and dispatches actions

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use mops_plugin_api::{
    ActionResult, LoaderConfig, Params, Plugin, PluginConfig, PluginConstructor, PluginManifest,
    PluginMetadata, Version, check_api_compatibility,
};

use super::error::{PluginHostError, RegistryError};
use super::registry::ActionRegistry;

/// Ids a plugin contributed to the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registrations {
    pub executors: Vec<String>,
    pub providers: Vec<String>,
    pub functions: Vec<String>,
}

/// Count of deadline dispatches still running on blocking threads
///
/// A timed-out call returns to its caller while the executor keeps running,
/// so unload waits on this before the plugin is cleaned up.
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        InFlightGuard(Arc::clone(self))
    }

    fn pending(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self
                .idle
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Held by a dispatch for as long as plugin code may be running
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// A loaded plugin with its runtime state
struct LoadedPlugin {
    manifest: PluginManifest,
    instance: Box<dyn Plugin>,
    config: PluginConfig,
    registrations: Registrations,
    in_flight: Arc<InFlight>,
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        // Callers retract registry entries before the plugin is dropped, so no
        // dispatch can reach it once cleanup runs.
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| self.instance.cleanup()));
        match result {
            Ok(Ok(())) => {
                tracing::debug!(plugin = %self.manifest.name, "Plugin cleaned up");
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    plugin = %self.manifest.name,
                    error = %e,
                    "Plugin cleanup returned error"
                );
            }
            Err(_) => {
                tracing::error!(plugin = %self.manifest.name, "Plugin panicked in cleanup");
            }
        }
    }
}

/// Configuration for PluginHost
#[derive(Debug, Clone)]
pub struct PluginHostConfig {
    /// Allow/deny lists and security policy
    pub loader: LoaderConfig,
    /// Version of the host, checked against plugin descriptors
    pub host_version: Version,
    /// Deadline for plugins whose limits don't declare one
    pub default_timeout: Option<Duration>,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            host_version: Version::parse(env!("CARGO_PKG_VERSION"))
                .unwrap_or_else(|_| Version::new(0, 0, 0)),
            default_timeout: None,
        }
    }
}

/// Information about a loaded plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Plugin name
    pub name: String,
    /// Plugin manifest
    pub manifest: PluginManifest,
    /// Ids the plugin registered
    pub registrations: Registrations,
}

impl LoadedPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.manifest.name.clone(),
            manifest: self.manifest.clone(),
            registrations: self.registrations.clone(),
        }
    }
}

/// The plugin host admits plugins, registers their capabilities and routes
/// action calls to them.
///
/// Loading and unloading take `&mut self` and happen before and after the
/// dispatch window. Dispatch takes `&self` and may run concurrently.
pub struct PluginHost {
    /// Loaded plugins by name
    plugins: HashMap<String, LoadedPlugin>,
    registry: Arc<ActionRegistry>,
    config: PluginHostConfig,
}

impl PluginHost {
    /// Create a new plugin host with its own registry
    pub fn new(config: PluginHostConfig) -> Self {
        Self::with_registry(config, Arc::new(ActionRegistry::new()))
    }

    /// Create a plugin host that registers into an existing registry
    pub fn with_registry(config: PluginHostConfig, registry: Arc<ActionRegistry>) -> Self {
        Self {
            plugins: HashMap::new(),
            registry,
            config,
        }
    }

    /// The registry plugins are registered into
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Host configuration
    pub fn config(&self) -> &PluginHostConfig {
        &self.config
    }

    fn log_rejection(&self, name: &str, reason: &str) {
        if self.config.loader.verbose_logging {
            tracing::info!(plugin = %name, reason = %reason, "Plugin not loaded");
        } else {
            tracing::debug!(plugin = %name, reason = %reason, "Plugin not loaded");
        }
    }

    /// Check a plugin descriptor against this host before loading anything
    ///
    /// Runs the API admission gate on `api_version`, then checks the host
    /// version against `mops_version_min`/`mops_version_max`.
    pub fn check_metadata(&self, metadata: &PluginMetadata) -> Result<(), PluginHostError> {
        metadata
            .check_compatibility(&self.config.host_version)
            .map_err(|source| PluginHostError::Incompatible {
                name: metadata.name.clone(),
                source,
            })
    }

    /// Construct a plugin and load it
    pub fn load_from(
        &mut self,
        constructor: PluginConstructor,
        config: PluginConfig,
    ) -> Result<PluginInfo, PluginHostError> {
        self.load(constructor(), config)
    }

    /// Admit, initialize and register a plugin
    ///
    /// Steps, in order:
    /// 1. Loader allow/deny lists and `config.enabled`
    /// 2. Duplicate plugin name
    /// 3. API admission gate on the manifest's `api_version`
    /// 4. `initialize`, with panic isolation
    /// 5. Registration of every executor, provider and function
    ///
    /// A plugin rejected before step 4 is never initialized. If step 5 hits a
    /// conflict, the plugin's entries are retracted and it is cleaned up.
    pub fn load(
        &mut self,
        mut instance: Box<dyn Plugin>,
        mut config: PluginConfig,
    ) -> Result<PluginInfo, PluginHostError> {
        let manifest = instance.manifest();
        let name = manifest.name.clone();

        if !self.config.loader.is_plugin_allowed(&name) || !config.enabled {
            self.log_rejection(&name, "disabled");
            return Err(PluginHostError::Disabled { name });
        }

        if self.plugins.contains_key(&name) {
            return Err(PluginHostError::AlreadyLoaded { name });
        }

        if let Err(source) = check_api_compatibility(&manifest.api_version) {
            self.log_rejection(&name, &source.to_string());
            return Err(PluginHostError::Incompatible { name, source });
        }

        if config.permissions.is_none() {
            config.permissions = Some(self.config.loader.default_permissions());
        }

        let init = std::panic::catch_unwind(AssertUnwindSafe(|| instance.initialize(&config)));
        match init {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                tracing::error!(plugin = %name, error = %source, "Plugin initialization failed");
                return Err(PluginHostError::InitFailed { name, source });
            }
            Err(_) => {
                tracing::error!(plugin = %name, "Plugin panicked in initialize");
                return Err(PluginHostError::InitPanicked { name });
            }
        }

        let mut loaded = LoadedPlugin {
            manifest,
            instance,
            config,
            registrations: Registrations::default(),
            in_flight: Arc::default(),
        };

        if let Err(e) = self.register_capabilities(&mut loaded) {
            tracing::error!(plugin = %name, error = %e, "Plugin registration failed");
            self.retract(&loaded.registrations);
            return Err(e.into());
        }

        tracing::info!(
            plugin = %name,
            version = %loaded.manifest.version,
            api_version = %loaded.manifest.api_version,
            executors = loaded.registrations.executors.len(),
            providers = loaded.registrations.providers.len(),
            functions = loaded.registrations.functions.len(),
            "Plugin loaded"
        );

        let info = loaded.info();
        self.plugins.insert(name, loaded);
        Ok(info)
    }

    /// Load a batch of plugins
    ///
    /// Disabled plugins are always skipped. With `fail_on_error` unset,
    /// failures are logged and skipped. With it set, the first failure is
    /// returned and later plugins are not loaded.
    pub fn load_all(
        &mut self,
        plugins: impl IntoIterator<Item = (PluginConstructor, PluginConfig)>,
    ) -> Result<Vec<PluginInfo>, PluginHostError> {
        let mut loaded = Vec::new();
        for (constructor, config) in plugins {
            match self.load_from(constructor, config) {
                Ok(info) => loaded.push(info),
                Err(PluginHostError::Disabled { .. }) => {}
                Err(e) if self.config.loader.fail_on_error => return Err(e),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load plugin");
                }
            }
        }
        Ok(loaded)
    }

    fn register_capabilities(&self, loaded: &mut LoadedPlugin) -> Result<(), RegistryError> {
        for executor in loaded.instance.executors() {
            let id = executor.id().to_string();
            self.registry.register_executor(executor)?;
            loaded.registrations.executors.push(id);
        }
        for provider in loaded.instance.providers() {
            let id = provider.id().to_string();
            self.registry.register_provider(provider)?;
            loaded.registrations.providers.push(id);
        }
        for function in loaded.instance.functions() {
            let id = function.id().to_string();
            self.registry.register_function(function)?;
            loaded.registrations.functions.push(id);
        }
        Ok(())
    }

    fn retract(&self, registrations: &Registrations) {
        for id in &registrations.executors {
            self.registry.unregister_executor(id);
        }
        for id in &registrations.providers {
            self.registry.unregister_provider(id);
        }
        for id in &registrations.functions {
            self.registry.unregister_function(id);
        }
    }

    /// Unload a plugin: retract its registry entries, wait for any of its
    /// actions still running after a timeout, then clean it up
    pub fn unload(&mut self, name: &str) -> Result<(), PluginHostError> {
        let plugin = self
            .plugins
            .remove(name)
            .ok_or_else(|| PluginHostError::NotFound {
                name: name.to_string(),
            })?;

        self.retract(&plugin.registrations);

        let pending = plugin.in_flight.pending();
        if pending > 0 {
            tracing::debug!(
                plugin = %name,
                pending,
                "Waiting for running actions before cleanup"
            );
            plugin.in_flight.wait_idle();
        }
        drop(plugin);

        tracing::info!(plugin = %name, "Plugin unloaded");
        Ok(())
    }

    /// Unload every plugin
    pub fn unload_all(&mut self) {
        let names: Vec<String> = self.plugins.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.unload(&name) {
                tracing::warn!(plugin = %name, error = %e, "Failed to unload plugin");
            }
        }
    }

    /// Information about a loaded plugin
    pub fn plugin_info(&self, name: &str) -> Option<PluginInfo> {
        self.plugins.get(name).map(LoadedPlugin::info)
    }

    /// Information about every loaded plugin
    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        let mut plugins: Vec<PluginInfo> = self.plugins.values().map(LoadedPlugin::info).collect();
        plugins.sort_by(|a, b| a.name.cmp(&b.name));
        plugins
    }

    /// Whether a plugin is loaded
    pub fn is_plugin_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Name of the plugin that registered an executor
    pub fn executor_owner(&self, executor_id: &str) -> Option<&str> {
        self.plugins
            .values()
            .find(|p| p.registrations.executors.iter().any(|id| id == executor_id))
            .map(|p| p.manifest.name.as_str())
    }

    fn owner_of(&self, executor_id: &str) -> Option<&LoadedPlugin> {
        self.executor_owner(executor_id).and_then(|name| self.plugins.get(name))
    }

    fn deadline_for(&self, executor_id: &str) -> Option<Duration> {
        self.owner_of(executor_id)
            .and_then(|p| p.config.execution_timeout())
            .or(self.config.default_timeout)
    }

    /// Resolve, validate and execute an action
    pub fn execute_action(
        &self,
        executor_id: &str,
        action_id: &str,
        params: &Params,
    ) -> Result<ActionResult, PluginHostError> {
        Ok(self.registry.execute_action(executor_id, action_id, params)?)
    }

    /// Execute an action on a blocking thread, bounded by the owning plugin's
    /// `max_execution_seconds` (or the host default)
    ///
    /// On timeout the caller gets [`PluginHostError::Timeout`]. The executor
    /// thread itself cannot be interrupted and runs to completion in the
    /// background; unloading its plugin waits for it.
    pub async fn execute_action_with_deadline(
        &self,
        executor_id: &str,
        action_id: &str,
        params: Params,
    ) -> Result<ActionResult, PluginHostError> {
        let deadline = self.deadline_for(executor_id);
        let guard = self.owner_of(executor_id).map(|p| p.in_flight.enter());
        let registry = Arc::clone(&self.registry);
        let executor = executor_id.to_string();
        let action = action_id.to_string();

        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            registry.execute_action(&executor, &action, &params)
        });

        let joined = match deadline {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                tracing::warn!(executor = %executor_id, timeout = ?limit, "Action timed out");
                PluginHostError::Timeout {
                    executor: executor_id.to_string(),
                    timeout: limit,
                }
            })?,
            None => task.await,
        };

        Ok(joined.map_err(|e| PluginHostError::Join(e.to_string()))??)
    }
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new(PluginHostConfig::default())
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        self.unload_all();
    }
}
