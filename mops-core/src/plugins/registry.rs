//! Action registry - maps ids to executors, providers and functions
//!
//! The tables sit behind a single `RwLock`. Registration takes the write
//! lock; lookups take the read lock. Dispatch resolves the target under the
//! read lock, clones its `Arc`, and releases the lock before calling into
//! plugin code, so a slow action never blocks registration or other dispatch.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use mops_plugin_api::{
    ActionError, ActionExecutor, ActionResult, DynamicProvider, InteractiveFunction, MenuEntry,
    Params,
};

use super::error::{EntryKind, RegistryError};

#[derive(Default)]
struct Tables {
    executors: HashMap<String, Arc<dyn ActionExecutor>>,
    providers: HashMap<String, Arc<dyn DynamicProvider>>,
    functions: HashMap<String, Arc<dyn InteractiveFunction>>,
}

/// Registry of every capability contributed by loaded plugins
///
/// Duplicate ids are rejected: the first registration stays in place and the
/// second fails with [`RegistryError::DuplicateId`].
#[derive(Default)]
pub struct ActionRegistry {
    tables: RwLock<Tables>,
}

fn insert<T: ?Sized>(
    table: &mut HashMap<String, Arc<T>>,
    kind: EntryKind,
    id: &str,
    entry: Arc<T>,
) -> Result<(), RegistryError> {
    if id.is_empty() {
        return Err(RegistryError::EmptyId { kind });
    }
    if table.contains_key(id) {
        return Err(RegistryError::DuplicateId {
            kind,
            id: id.to_string(),
        });
    }
    table.insert(id.to_string(), entry);
    tracing::debug!(kind = %kind, id = %id, "Registered");
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run plugin code, turning a panic into [`ActionError::Panicked`]
fn guarded<T>(id: &str, f: impl FnOnce() -> Result<T, ActionError>) -> Result<T, ActionError> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(id = %id, panic = %message, "Capability panicked");
        Err(ActionError::Panicked {
            id: id.to_string(),
            message,
        })
    })
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Registration ────────────────────────────────────────────────

    /// Register an action executor
    pub fn register_executor(
        &self,
        executor: Arc<dyn ActionExecutor>,
    ) -> Result<(), RegistryError> {
        let id = executor.id().to_string();
        insert(&mut self.write().executors, EntryKind::Executor, &id, executor)
    }

    /// Register a dynamic provider
    pub fn register_provider(
        &self,
        provider: Arc<dyn DynamicProvider>,
    ) -> Result<(), RegistryError> {
        let id = provider.id().to_string();
        insert(&mut self.write().providers, EntryKind::Provider, &id, provider)
    }

    /// Register an interactive function
    pub fn register_function(
        &self,
        function: Arc<dyn InteractiveFunction>,
    ) -> Result<(), RegistryError> {
        let id = function.id().to_string();
        insert(&mut self.write().functions, EntryKind::Function, &id, function)
    }

    /// Remove an executor, returning it if it was registered
    pub fn unregister_executor(&self, id: &str) -> Option<Arc<dyn ActionExecutor>> {
        self.write().executors.remove(id)
    }

    /// Remove a provider, returning it if it was registered
    pub fn unregister_provider(&self, id: &str) -> Option<Arc<dyn DynamicProvider>> {
        self.write().providers.remove(id)
    }

    /// Remove a function, returning it if it was registered
    pub fn unregister_function(&self, id: &str) -> Option<Arc<dyn InteractiveFunction>> {
        self.write().functions.remove(id)
    }

    // ─── Lookup ──────────────────────────────────────────────────────

    /// Find an executor by id
    pub fn executor(&self, id: &str) -> Option<Arc<dyn ActionExecutor>> {
        self.read().executors.get(id).cloned()
    }

    /// Find a provider by id
    pub fn provider(&self, id: &str) -> Option<Arc<dyn DynamicProvider>> {
        self.read().providers.get(id).cloned()
    }

    /// Find a function by id
    pub fn function(&self, id: &str) -> Option<Arc<dyn InteractiveFunction>> {
        self.read().functions.get(id).cloned()
    }

    /// Snapshot of all executors
    pub fn executors(&self) -> HashMap<String, Arc<dyn ActionExecutor>> {
        self.read().executors.clone()
    }

    /// Snapshot of all providers
    pub fn providers(&self) -> HashMap<String, Arc<dyn DynamicProvider>> {
        self.read().providers.clone()
    }

    /// Snapshot of all functions
    pub fn functions(&self) -> HashMap<String, Arc<dyn InteractiveFunction>> {
        self.read().functions.clone()
    }

    // ─── Dispatch ────────────────────────────────────────────────────

    /// Resolve an executor, validate the call, then execute it
    ///
    /// # Errors
    ///
    /// - [`RegistryError::ExecutorNotFound`] if no executor has that id; no
    ///   plugin code runs in that case.
    /// - [`RegistryError::Action`] carrying the executor's validation error
    ///   unchanged, or a panic raised by the executor.
    ///
    /// An action that ran but failed comes back as `Ok` with
    /// `success == false`.
    pub fn execute_action(
        &self,
        executor_id: &str,
        action_id: &str,
        params: &Params,
    ) -> Result<ActionResult, RegistryError> {
        let executor = self
            .executor(executor_id)
            .ok_or_else(|| RegistryError::ExecutorNotFound(executor_id.to_string()))?;

        guarded(executor_id, || executor.validate(action_id, params))?;
        let result = guarded(executor_id, || executor.execute(action_id, params))?;

        tracing::debug!(
            executor = %executor_id,
            action = %action_id,
            success = result.success,
            "Action executed"
        );
        Ok(result)
    }

    /// Resolve a function, validate the call, then execute it
    pub fn execute_function(
        &self,
        function_id: &str,
        params: &Params,
    ) -> Result<ActionResult, RegistryError> {
        let function = self
            .function(function_id)
            .ok_or_else(|| RegistryError::FunctionNotFound(function_id.to_string()))?;

        guarded(function_id, || function.validate(params))?;
        let result = guarded(function_id, || function.execute(params))?;

        tracing::debug!(function = %function_id, success = result.success, "Function executed");
        Ok(result)
    }

    /// Resolve a provider and produce its entries for `param`
    ///
    /// `supports_param` is checked first, so an unsupported parameter never
    /// reaches `entries`.
    pub fn provider_entries(
        &self,
        provider_id: &str,
        param: &str,
    ) -> Result<Vec<MenuEntry>, RegistryError> {
        let provider = self
            .provider(provider_id)
            .ok_or_else(|| RegistryError::ProviderNotFound(provider_id.to_string()))?;

        if !guarded(provider_id, || Ok(provider.supports_param(param)))? {
            return Err(provider.unsupported(param).into());
        }
        Ok(guarded(provider_id, || provider.entries(param))?)
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.read();
        let mut executors: Vec<_> = tables.executors.keys().collect();
        let mut providers: Vec<_> = tables.providers.keys().collect();
        let mut functions: Vec<_> = tables.functions.keys().collect();
        executors.sort();
        providers.sort();
        functions.sort();
        f.debug_struct("ActionRegistry")
            .field("executors", &executors)
            .field("providers", &providers)
            .field("functions", &functions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mops_plugin_api::{ActionInfo, ParameterInfo};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Executor that counts calls and echoes its tag
    struct Tagged {
        id: String,
        tag: &'static str,
        validations: AtomicUsize,
        executions: AtomicUsize,
    }

    impl Tagged {
        fn new(id: &str, tag: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                tag,
                validations: AtomicUsize::new(0),
                executions: AtomicUsize::new(0),
            })
        }
    }

    impl ActionExecutor for Tagged {
        fn id(&self) -> &str {
            &self.id
        }

        fn actions(&self) -> Vec<ActionInfo> {
            vec![
                ActionInfo::new("run", "Run", "Returns the tag")
                    .with_parameter(ParameterInfo::required("n", "number")),
                ActionInfo::new("boom", "Boom", "Panics"),
            ]
        }

        fn validate(&self, action_id: &str, params: &Params) -> Result<(), ActionError> {
            self.validations.fetch_add(1, Ordering::SeqCst);
            let actions = self.actions();
            let action = mops_plugin_api::find_action(&actions, action_id)
                .ok_or_else(|| ActionError::UnknownAction(action_id.to_string()))?;
            action.validate_params(params)
        }

        fn execute(&self, action_id: &str, _params: &Params) -> Result<ActionResult, ActionError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            match action_id {
                "run" => Ok(ActionResult::success(self.tag)),
                "boom" => panic!("executor exploded"),
                other => Ok(ActionResult::failure(format!("Unknown action: {other}"))),
            }
        }
    }

    struct Numbers;

    impl DynamicProvider for Numbers {
        fn id(&self) -> &str {
            "numbers"
        }

        fn description(&self) -> String {
            "Counts up to a number".into()
        }

        fn supports_param(&self, param: &str) -> bool {
            param.parse::<u8>().is_ok()
        }

        fn entries(&self, param: &str) -> Result<Vec<MenuEntry>, ActionError> {
            let n: u8 = param.parse().map_err(|_| self.unsupported(param))?;
            Ok((1..=n)
                .map(|i| MenuEntry {
                    id: i.to_string(),
                    label: format!("Item {i}"),
                    ..Default::default()
                })
                .collect())
        }
    }

    struct Negate;

    impl InteractiveFunction for Negate {
        fn id(&self) -> &str {
            "negate"
        }

        fn description(&self) -> String {
            "Negates a number".into()
        }

        fn parameters(&self) -> Vec<ParameterInfo> {
            vec![ParameterInfo::required("x", "number")]
        }

        fn execute(&self, params: &Params) -> Result<ActionResult, ActionError> {
            Ok(match params.get("x").and_then(|v| v.as_f64()) {
                Some(x) => ActionResult::success(format!("{}", -x)).with_data("result", -x),
                None => ActionResult::failure("x must be a number"),
            })
        }
    }

    fn bag(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_duplicate_executor_rejected_and_first_kept() {
        let registry = ActionRegistry::new();
        registry.register_executor(Tagged::new("x", "first")).unwrap();

        let err = registry.register_executor(Tagged::new("x", "second")).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateId { kind: EntryKind::Executor, ref id } if id == "x"
        ));

        let result = registry.execute_action("x", "run", &bag(json!({"n": 1}))).unwrap();
        assert_eq!(result.message, "first");
        assert_eq!(registry.executors().len(), 1);
    }

    #[test]
    fn test_same_id_allowed_across_kinds() {
        let registry = ActionRegistry::new();
        registry.register_executor(Tagged::new("numbers", "t")).unwrap();
        registry.register_provider(Arc::new(Numbers)).unwrap();
        assert!(registry.executor("numbers").is_some());
        assert!(registry.provider("numbers").is_some());
    }

    #[test]
    fn test_empty_id_rejected() {
        let registry = ActionRegistry::new();
        let err = registry.register_executor(Tagged::new("", "t")).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyId { kind: EntryKind::Executor }));
    }

    #[test]
    fn test_lookup_missing_returns_none() {
        let registry = ActionRegistry::new();
        assert!(registry.executor("nope").is_none());
        assert!(registry.provider("nope").is_none());
        assert!(registry.function("nope").is_none());
        assert!(registry.executors().is_empty());
        assert!(registry.providers().is_empty());
        assert!(registry.functions().is_empty());
    }

    #[test]
    fn test_execute_unknown_executor() {
        let registry = ActionRegistry::new();
        let other = Tagged::new("other", "t");
        registry.register_executor(other.clone()).unwrap();

        let err = registry.execute_action("missing", "run", &Params::new()).unwrap_err();
        assert!(matches!(err, RegistryError::ExecutorNotFound(ref id) if id == "missing"));
        assert_eq!(other.validations.load(Ordering::SeqCst), 0);
        assert_eq!(other.executions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validation_failure_skips_execute() {
        let registry = ActionRegistry::new();
        let executor = Tagged::new("x", "t");
        registry.register_executor(executor.clone()).unwrap();

        let err = registry.execute_action("x", "run", &Params::new()).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Action(ActionError::MissingParameter { .. })
        ));

        let err = registry.execute_action("x", "nope", &Params::new()).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Action(ActionError::UnknownAction("nope".into()))
        );

        assert_eq!(executor.validations.load(Ordering::SeqCst), 2);
        assert_eq!(executor.executions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validate_then_execute() {
        let registry = ActionRegistry::new();
        let executor = Tagged::new("x", "hello");
        registry.register_executor(executor.clone()).unwrap();

        let result = registry.execute_action("x", "run", &bag(json!({"n": 2}))).unwrap();
        assert!(result.success);
        assert_eq!(result.message, "hello");
        assert_eq!(executor.validations.load(Ordering::SeqCst), 1);
        assert_eq!(executor.executions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_executor_panic_is_contained() {
        let registry = ActionRegistry::new();
        registry.register_executor(Tagged::new("x", "t")).unwrap();

        let err = registry.execute_action("x", "boom", &Params::new()).unwrap_err();
        match err {
            RegistryError::Action(ActionError::Panicked { id, message }) => {
                assert_eq!(id, "x");
                assert!(message.contains("exploded"));
            }
            other => panic!("expected panic error, got {other:?}"),
        }

        // Registry still usable afterwards
        assert!(registry.execute_action("x", "run", &bag(json!({"n": 1}))).is_ok());
    }

    #[test]
    fn test_unregister_executor() {
        let registry = ActionRegistry::new();
        registry.register_executor(Tagged::new("x", "t")).unwrap();
        assert!(registry.unregister_executor("x").is_some());
        assert!(registry.unregister_executor("x").is_none());
        assert!(matches!(
            registry.execute_action("x", "run", &Params::new()),
            Err(RegistryError::ExecutorNotFound(_))
        ));
        // The id is free again
        registry.register_executor(Tagged::new("x", "t")).unwrap();
    }

    #[test]
    fn test_provider_entries() {
        let registry = ActionRegistry::new();
        registry.register_provider(Arc::new(Numbers)).unwrap();

        let entries = registry.provider_entries("numbers", "3").unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].label, "Item 3");

        let err = registry.provider_entries("numbers", "many").unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Action(ActionError::UnsupportedParam { .. })
        ));

        assert!(matches!(
            registry.provider_entries("missing", "1"),
            Err(RegistryError::ProviderNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_provider_and_function() {
        let registry = ActionRegistry::new();
        registry.register_provider(Arc::new(Numbers)).unwrap();
        registry.register_function(Arc::new(Negate)).unwrap();
        assert!(matches!(
            registry.register_provider(Arc::new(Numbers)),
            Err(RegistryError::DuplicateId { kind: EntryKind::Provider, .. })
        ));
        assert!(matches!(
            registry.register_function(Arc::new(Negate)),
            Err(RegistryError::DuplicateId { kind: EntryKind::Function, .. })
        ));
    }

    #[test]
    fn test_execute_function() {
        let registry = ActionRegistry::new();
        registry.register_function(Arc::new(Negate)).unwrap();

        let result = registry.execute_function("negate", &bag(json!({"x": 2.5}))).unwrap();
        assert_eq!(result.data.get("result"), Some(&json!(-2.5)));

        assert!(matches!(
            registry.execute_function("negate", &Params::new()),
            Err(RegistryError::Action(ActionError::MissingParameter { .. }))
        ));
        assert!(matches!(
            registry.execute_function("missing", &Params::new()),
            Err(RegistryError::FunctionNotFound(_))
        ));
    }

    #[test]
    fn test_snapshots_are_independent() {
        let registry = ActionRegistry::new();
        registry.register_executor(Tagged::new("a", "t")).unwrap();
        let snapshot = registry.executors();
        registry.register_executor(Tagged::new("b", "t")).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.executors().len(), 2);
    }

    #[test]
    fn test_debug_lists_ids() {
        let registry = ActionRegistry::new();
        registry.register_executor(Tagged::new("a", "t")).unwrap();
        let debug = format!("{registry:?}");
        assert!(debug.contains("\"a\""));
    }
}
