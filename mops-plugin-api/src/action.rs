//! Action metadata and results
//!
//! These records are what executors publish about themselves. They carry no
//! behavior of their own beyond checking a parameter bag against the declared
//! parameters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ActionError;

/// Parameter bag passed to executors and functions
pub type Params = serde_json::Map<String, Value>;

/// Describes an action an executor can perform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionInfo {
    /// Identifier, unique within the owning executor
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ActionExample>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: Params,
}

/// Describes one parameter of an action or function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    /// Type tag: `string`, `number`, `integer`, `boolean`, `object`, `array`, `any`
    ///
    /// Other tags are allowed; the built-in validator does not check them.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Used when the parameter is optional and absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Free-form rule hint for the executor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
}

/// A usage example for an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionExample {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

/// Outcome of running an action
///
/// `success == false` means the action ran and reported a failure; it is not
/// an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Params,
}

/// A menu entry produced by a dynamic provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Executor to dispatch to when the entry is chosen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub params: Params,
}

impl ActionInfo {
    /// Create an action with no parameters
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Builder: add a parameter
    pub fn with_parameter(mut self, parameter: ParameterInfo) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Builder: add an example
    pub fn with_example(mut self, example: ActionExample) -> Self {
        self.examples.push(example);
        self
    }

    /// Builder: add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Builder: set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Look up a declared parameter by name
    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Check a parameter bag against the declared parameters
    pub fn validate_params(&self, params: &Params) -> Result<(), ActionError> {
        validate_params(&self.id, &self.parameters, params)
    }

    /// Copy of `params` with defaults filled in for absent optional parameters
    pub fn apply_defaults(&self, params: &Params) -> Params {
        apply_defaults(&self.parameters, params)
    }
}

/// Find an action by id in an executor's action list
pub fn find_action<'a>(actions: &'a [ActionInfo], id: &str) -> Option<&'a ActionInfo> {
    actions.iter().find(|a| a.id == id)
}

/// Check a parameter bag against declared parameters
///
/// `owner` names the action or function in error messages. Parameters not
/// declared are ignored. Checks, in order: required presence, declared type,
/// declared options.
pub fn validate_params(
    owner: &str,
    declared: &[ParameterInfo],
    params: &Params,
) -> Result<(), ActionError> {
    for parameter in declared {
        match params.get(&parameter.name) {
            None if parameter.required => {
                return Err(ActionError::MissingParameter {
                    action: owner.to_string(),
                    parameter: parameter.name.clone(),
                });
            }
            None => {}
            Some(value) => parameter.check_value(value)?,
        }
    }
    Ok(())
}

/// Fill absent optional parameters from their declared defaults
pub fn apply_defaults(declared: &[ParameterInfo], params: &Params) -> Params {
    let mut resolved = params.clone();
    for parameter in declared {
        if let Some(default) = parameter.default.as_ref().filter(|_| !parameter.required) {
            resolved
                .entry(parameter.name.clone())
                .or_insert_with(|| default.clone());
        }
    }
    resolved
}

impl ParameterInfo {
    /// A required parameter
    pub fn required(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            description: String::new(),
            required: true,
            default: None,
            options: Vec::new(),
            validation: None,
        }
    }

    /// An optional parameter
    pub fn optional(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    /// Builder: set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the default value
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Builder: set the allowed values
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `value` matches this parameter's declared type tag
    ///
    /// Unrecognised tags always match.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self.kind.as_str(), value) {
            ("string", Value::String(_)) => true,
            ("number", Value::Number(_)) => true,
            ("integer", Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            ("boolean" | "bool", Value::Bool(_)) => true,
            ("object" | "map", Value::Object(_)) => true,
            ("array" | "list", Value::Array(_)) => true,
            ("string" | "number" | "integer" | "boolean" | "bool" | "object" | "map" | "array"
            | "list", _) => false,
            _ => true,
        }
    }

    fn check_value(&self, value: &Value) -> Result<(), ActionError> {
        if !self.accepts(value) {
            return Err(ActionError::TypeMismatch {
                parameter: self.name.clone(),
                expected: self.kind.clone(),
                found: value_kind(value).to_string(),
            });
        }
        if self.options.is_empty() {
            return Ok(());
        }
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if self.options.contains(&rendered) {
            Ok(())
        } else {
            Err(ActionError::InvalidOption {
                parameter: self.name.clone(),
                value: rendered,
                options: self.options.clone(),
            })
        }
    }
}

/// Type tag of a dynamic value, as used in error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ActionResult {
    /// A successful result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Params::new(),
        }
    }

    /// A result reporting that the action could not complete
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Params::new(),
        }
    }

    /// Builder: attach a data value
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn add_action() -> ActionInfo {
        ActionInfo::new("add", "Add Numbers", "Adds two numbers together")
            .with_parameter(ParameterInfo::required("a", "number"))
            .with_parameter(ParameterInfo::required("b", "number"))
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = add_action().validate_params(&params(json!({"a": 1}))).unwrap_err();
        assert_eq!(
            err,
            ActionError::MissingParameter {
                action: "add".into(),
                parameter: "b".into()
            }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = add_action()
            .validate_params(&params(json!({"a": 1, "b": "two"})))
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::TypeMismatch { ref parameter, ref found, .. }
                if parameter == "b" && found == "string"
        ));
    }

    #[test]
    fn test_valid_params_and_extra_keys_ignored() {
        let result = add_action().validate_params(&params(json!({"a": 1, "b": 2.5, "c": true})));
        assert!(result.is_ok());
    }

    #[test]
    fn test_optional_absent_is_valid() {
        let action = ActionInfo::new("hello", "Hello", "Greets")
            .with_parameter(ParameterInfo::optional("name", "string").with_default("World"));
        assert!(action.validate_params(&Params::new()).is_ok());
    }

    #[test]
    fn test_apply_defaults() {
        let action = ActionInfo::new("hello", "Hello", "Greets")
            .with_parameter(ParameterInfo::optional("name", "string").with_default("World"));

        let resolved = action.apply_defaults(&Params::new());
        assert_eq!(resolved.get("name"), Some(&json!("World")));

        let resolved = action.apply_defaults(&params(json!({"name": "Ada"})));
        assert_eq!(resolved.get("name"), Some(&json!("Ada")));
    }

    #[test]
    fn test_required_default_not_applied() {
        let mut parameter = ParameterInfo::required("x", "number");
        parameter.default = Some(json!(1));
        let resolved = apply_defaults(&[parameter], &Params::new());
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_integer_tag() {
        let p = ParameterInfo::required("n", "integer");
        assert!(p.accepts(&json!(3)));
        assert!(p.accepts(&json!(3.0)));
        assert!(!p.accepts(&json!(3.5)));
        assert!(!p.accepts(&json!("3")));
    }

    #[test]
    fn test_unknown_tag_accepts_anything() {
        let p = ParameterInfo::required("when", "datetime");
        assert!(p.accepts(&json!("2024-01-01")));
        assert!(p.accepts(&json!(12)));
        let any = ParameterInfo::required("v", "any");
        assert!(any.accepts(&Value::Null));
    }

    #[test]
    fn test_options() {
        let action = ActionInfo::new("set", "Set level", "")
            .with_parameter(
                ParameterInfo::required("level", "string").with_options(["low", "high"]),
            );
        assert!(action.validate_params(&params(json!({"level": "low"}))).is_ok());
        assert!(matches!(
            action.validate_params(&params(json!({"level": "loud"}))),
            Err(ActionError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_find_action() {
        let actions = vec![add_action(), ActionInfo::new("echo", "Echo", "")];
        assert_eq!(find_action(&actions, "echo").map(|a| a.id.as_str()), Some("echo"));
        assert!(find_action(&actions, "missing").is_none());
    }

    #[test]
    fn test_action_result_builders() {
        let ok = ActionResult::success("done").with_data("result", 3);
        assert!(ok.success);
        assert_eq!(ok.data.get("result"), Some(&json!(3)));

        let failed = ActionResult::failure("nope");
        assert!(!failed.success);
        assert!(failed.data.is_empty());
    }

    #[test]
    fn test_parameter_type_field_name() {
        let param = ParameterInfo::optional("name", "string").with_default("World");
        let json = serde_json::to_value(param).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["default"], "World");
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_action_info_from_json() {
        let action: ActionInfo = serde_json::from_value(json!({
            "id": "echo",
            "name": "Echo Message",
            "description": "Echoes back the provided message",
            "parameters": [{"name": "message", "type": "string", "required": true}],
            "tags": ["text", "demo"]
        }))
        .unwrap();
        assert_eq!(action.parameters.len(), 1);
        assert!(action.parameters[0].required);
        assert!(action.tags.contains("demo"));
        assert!(action.category.is_none());
    }
}
