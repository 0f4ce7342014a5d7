//! Capability traits published by plugins
//!
//! A plugin exposes three kinds of capability:
//!
//! - [`ActionExecutor`]: performs named, parameterized actions
//! - [`DynamicProvider`]: produces menu entries from a string parameter
//! - [`InteractiveFunction`]: a single operation with its own parameters
//!
//! Each validates before it executes. Validation reports problems as
//! [`ActionError`]; execution reports business failures as an
//! [`ActionResult`] with `success == false` and keeps `Err` for
//! infrastructure failures.

use crate::action::{
    ActionInfo, ActionResult, MenuEntry, ParameterInfo, Params, find_action, validate_params,
};
use crate::error::ActionError;

/// An entity that performs named actions
///
/// # Example
///
/// ```
/// use mops_plugin_api::{ActionError, ActionExecutor, ActionInfo, ActionResult, Params};
///
/// struct Ping;
///
/// impl ActionExecutor for Ping {
///     fn id(&self) -> &str {
///         "ping"
///     }
///
///     fn actions(&self) -> Vec<ActionInfo> {
///         vec![ActionInfo::new("ping", "Ping", "Replies with pong")]
///     }
///
///     fn execute(&self, action_id: &str, _params: &Params) -> Result<ActionResult, ActionError> {
///         Ok(match action_id {
///             "ping" => ActionResult::success("pong"),
///             other => ActionResult::failure(format!("Unknown action: {other}")),
///         })
///     }
/// }
///
/// assert!(Ping.validate("ping", &Params::new()).is_ok());
/// assert!(Ping.validate("pong", &Params::new()).is_err());
/// ```
pub trait ActionExecutor: Send + Sync {
    /// Stable identifier, unique within a registry
    fn id(&self) -> &str;

    /// Every action this executor supports
    fn actions(&self) -> Vec<ActionInfo>;

    /// Check that an action can run with the given parameters
    ///
    /// Must not have side effects. The default checks the action exists and
    /// that `params` satisfies its declared parameters.
    fn validate(&self, action_id: &str, params: &Params) -> Result<(), ActionError> {
        let actions = self.actions();
        let action = find_action(&actions, action_id)
            .ok_or_else(|| ActionError::UnknownAction(action_id.to_string()))?;
        action.validate_params(params)
    }

    /// Run an action
    ///
    /// Must cope with callers that skipped [`validate`](Self::validate): an
    /// unknown action or a missing required parameter yields
    /// `Ok(ActionResult { success: false, .. })`.
    fn execute(&self, action_id: &str, params: &Params) -> Result<ActionResult, ActionError>;
}

/// Produces dynamic menu entries
pub trait DynamicProvider: Send + Sync {
    /// Stable identifier, unique within a registry
    fn id(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> String;

    /// Whether [`entries`](Self::entries) can handle `param`
    fn supports_param(&self, param: &str) -> bool;

    /// Generate entries for `param`
    ///
    /// Fails with [`ActionError::UnsupportedParam`] when `param` is not
    /// supported.
    fn entries(&self, param: &str) -> Result<Vec<MenuEntry>, ActionError>;

    /// Error for a parameter this provider does not handle
    fn unsupported(&self, param: &str) -> ActionError {
        ActionError::UnsupportedParam {
            provider: self.id().to_string(),
            param: param.to_string(),
        }
    }
}

/// A single operation callable from menus
pub trait InteractiveFunction: Send + Sync {
    /// Stable identifier, unique within a registry
    fn id(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> String;

    /// Declared parameters
    fn parameters(&self) -> Vec<ParameterInfo>;

    /// Check the parameters; the default uses [`parameters`](Self::parameters)
    fn validate(&self, params: &Params) -> Result<(), ActionError> {
        validate_params(self.id(), &self.parameters(), params)
    }

    /// Run the function
    fn execute(&self, params: &Params) -> Result<ActionResult, ActionError>;
}
