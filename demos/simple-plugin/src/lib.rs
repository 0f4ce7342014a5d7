//! Simple Plugin - a small example plugin for mops
//!
//! This plugin demonstrates:
//! - Basic plugin structure with the `export_plugin!` macro
//! - Implementing the `Plugin` lifecycle (`initialize`, `cleanup`)
//! - An action executor with optional, required and numeric parameters
//! - A dynamic provider and an interactive function
//!
//! ## Building
//!
//! ```bash
//! cargo build --release -p simple-plugin
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p ~/.mops/plugins/simple-plugin
//! cp target/release/libsimple_plugin.so ~/.mops/plugins/simple-plugin/
//! ```

use std::sync::Arc;

use mops_plugin_api::{
    ActionError, ActionExecutor, ActionInfo, ActionResult, DynamicProvider, InteractiveFunction,
    MenuEntry, ParameterInfo, Params, Plugin, PluginConfig, PluginError, PluginManifest,
    export_plugin, find_action,
};
use serde_json::Value;

/// A plugin exposing greeting and arithmetic actions.
#[derive(Default)]
pub struct SimplePlugin {
    config: Option<PluginConfig>,
}

impl SimplePlugin {
    fn greeting(&self) -> String {
        self.config
            .as_ref()
            .and_then(|c| c.get::<String>("greeting"))
            .unwrap_or_else(|| "Hello".to_string())
    }
}

impl Plugin for SimplePlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest {
            name: "simple-plugin".to_string(),
            version: "1.0.0".to_string(),
            description: "A simple example mops plugin demonstrating basic functionality"
                .to_string(),
            api_version: "1.0.0".to_string(),
        }
    }

    fn initialize(&mut self, config: &PluginConfig) -> Result<(), PluginError> {
        tracing::info!(
            plugin = %config.name,
            version = %config.version,
            "Simple plugin initialized"
        );
        self.config = Some(config.clone());
        Ok(())
    }

    fn executors(&self) -> Vec<Arc<dyn ActionExecutor>> {
        vec![Arc::new(SimpleExecutor {
            greeting: self.greeting(),
        })]
    }

    fn providers(&self) -> Vec<Arc<dyn DynamicProvider>> {
        vec![Arc::new(ActionMenu)]
    }

    fn functions(&self) -> Vec<Arc<dyn InteractiveFunction>> {
        vec![Arc::new(Uppercase)]
    }

    fn cleanup(&mut self) -> Result<(), PluginError> {
        tracing::info!("Simple plugin cleaned up");
        self.config = None;
        Ok(())
    }
}

/// Executor for `hello`, `echo` and `add`.
pub struct SimpleExecutor {
    greeting: String,
}

impl Default for SimpleExecutor {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
        }
    }
}

pub const EXECUTOR_ID: &str = "simple-actions";

impl ActionExecutor for SimpleExecutor {
    fn id(&self) -> &str {
        EXECUTOR_ID
    }

    fn actions(&self) -> Vec<ActionInfo> {
        vec![
            ActionInfo::new("hello", "Hello World", "Prints a hello message")
                .with_parameter(
                    ParameterInfo::optional("name", "string")
                        .with_description("Name to greet")
                        .with_default("World"),
                )
                .with_category("demo"),
            ActionInfo::new("echo", "Echo Message", "Echoes back the provided message")
                .with_parameter(
                    ParameterInfo::required("message", "string")
                        .with_description("Message to echo back"),
                )
                .with_category("demo"),
            ActionInfo::new("add", "Add Numbers", "Adds two numbers together")
                .with_parameter(
                    ParameterInfo::required("a", "number").with_description("First number"),
                )
                .with_parameter(
                    ParameterInfo::required("b", "number").with_description("Second number"),
                )
                .with_category("math"),
        ]
    }

    fn execute(&self, action_id: &str, params: &Params) -> Result<ActionResult, ActionError> {
        let actions = self.actions();
        let Some(action) = find_action(&actions, action_id) else {
            return Ok(ActionResult::failure(format!("Unknown action: {action_id}")));
        };
        let params = action.apply_defaults(params);

        let result = match action_id {
            "hello" => {
                let name = match params.get("name") {
                    Some(Value::String(name)) => name.as_str(),
                    _ => "World",
                };
                ActionResult::success(format!("{}, {name}!", self.greeting))
                    .with_data("greeting", name)
            }
            "echo" => match params.get("message") {
                Some(Value::String(message)) => ActionResult::success(format!("Echo: {message}"))
                    .with_data("original", message.as_str())
                    .with_data("echo", message.as_str()),
                _ => ActionResult::failure("Message parameter is required and must be a string"),
            },
            "add" => match (
                params.get("a").and_then(Value::as_f64),
                params.get("b").and_then(Value::as_f64),
            ) {
                (Some(a), Some(b)) => {
                    let sum = a + b;
                    ActionResult::success(format!("{a:.2} + {b:.2} = {sum:.2}"))
                        .with_data("a", a)
                        .with_data("b", b)
                        .with_data("result", sum)
                }
                _ => ActionResult::failure(
                    "Both 'a' and 'b' parameters are required and must be numbers",
                ),
            },
            other => ActionResult::failure(format!("Unknown action: {other}")),
        };
        Ok(result)
    }
}

/// Lists the executor's actions, optionally filtered by category.
pub struct ActionMenu;

impl DynamicProvider for ActionMenu {
    fn id(&self) -> &str {
        "simple-menu"
    }

    fn description(&self) -> String {
        "Menu of simple actions; param is a category or `all`".to_string()
    }

    fn supports_param(&self, param: &str) -> bool {
        matches!(param, "all" | "demo" | "math")
    }

    fn entries(&self, param: &str) -> Result<Vec<MenuEntry>, ActionError> {
        if !self.supports_param(param) {
            return Err(self.unsupported(param));
        }
        Ok(SimpleExecutor::default()
            .actions()
            .into_iter()
            .filter(|a| param == "all" || a.category.as_deref() == Some(param))
            .map(|a| MenuEntry {
                id: a.id.clone(),
                label: a.name,
                description: Some(a.description),
                executor: Some(EXECUTOR_ID.to_string()),
                action: Some(a.id),
                params: Params::new(),
            })
            .collect())
    }
}

/// Upper-cases a string.
pub struct Uppercase;

impl InteractiveFunction for Uppercase {
    fn id(&self) -> &str {
        "uppercase"
    }

    fn description(&self) -> String {
        "Converts text to upper case".to_string()
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        vec![ParameterInfo::required("text", "string").with_description("Text to convert")]
    }

    fn execute(&self, params: &Params) -> Result<ActionResult, ActionError> {
        Ok(match params.get("text") {
            Some(Value::String(text)) => {
                let upper = text.to_uppercase();
                ActionResult::success(upper.clone()).with_data("result", upper)
            }
            _ => ActionResult::failure("Text parameter is required and must be a string"),
        })
    }
}

// This macro generates the C ABI entry points for dynamic loading
export_plugin!(SimplePlugin);
