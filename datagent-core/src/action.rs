//! # Actions and the Action Registry
//!
//! An action is a named capability the model may invoke: a declared parameter
//! schema, a handler, and a terminal flag. The registry maps names to actions
//! and always carries the reserved `terminate` action.
//!
//! Actions do no argument validation of their own. The schema is shown to the
//! model; the handler reads what it needs through [`ActionArgs`] and reports
//! problems as ordinary errors, which the environment turns into failure
//! envelopes.

use crate::environment::ActionContext;
use crate::error::{self, Error, Result};
use crate::schema::{ParamType, ParameterSchema, ParameterSpec};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name of the reserved terminal action
pub const TERMINATE_ACTION: &str = "terminate";

/// Suffix appended to the terminate message
pub const TERMINATE_SUFFIX: &str = "\nTerminating...";

// ============================================================================
// Arguments
// ============================================================================

/// Keyword arguments decoded from an invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionArgs(Map<String, Value>);

impl ActionArgs {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// A required string argument
    pub fn str(&self, name: &str) -> Result<&str> {
        self.opt_str(name)?.ok_or_else(|| error::missing_argument(name))
    }

    /// An optional string argument; `null` counts as absent
    pub fn opt_str(&self, name: &str) -> Result<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(error::argument_type(name, "a string")),
        }
    }

    /// An optional array argument, empty when absent
    pub fn array(&self, name: &str) -> Result<Vec<Value>> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => Err(error::argument_type(name, "an array")),
        }
    }

    /// An optional object argument, empty when absent
    pub fn object(&self, name: &str) -> Result<Map<String, Value>> {
        match self.get(name) {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(error::argument_type(name, "an object")),
        }
    }
}

impl From<Map<String, Value>> for ActionArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// Handler
// ============================================================================

/// The callable behind an action.
///
/// Handlers receive the environment's session context (data directory, frame
/// store) by mutable reference and the decoded arguments.
pub trait ActionHandler: Send + Sync {
    fn call(&self, ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value>;
}

impl<F> ActionHandler for F
where
    F: Fn(&mut ActionContext, &ActionArgs) -> Result<Value> + Send + Sync,
{
    fn call(&self, ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
        self(ctx, args)
    }
}

// ============================================================================
// Action
// ============================================================================

/// A named, schema-described, executable capability
#[derive(Clone)]
pub struct Action {
    name: String,
    description: String,
    schema: ParameterSchema,
    /// JSON schema rendered from `schema` at construction
    parameters: Value,
    terminal: bool,
    handler: Arc<dyn ActionHandler>,
}

impl Action {
    /// Create a non-terminal action. Fails if the schema cannot be rendered.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: impl ActionHandler + 'static,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::config_invalid("action name must not be empty")
                .with_operation("action::new"));
        }

        let parameters = schema
            .to_json_schema()
            .map_err(|e| e.with_operation("action::new").with_context("action", name.clone()))?;

        Ok(Self {
            name,
            description: description.into(),
            schema,
            parameters,
            terminal: false,
            handler: Arc::new(handler),
        })
    }

    /// Mark the action as ending the loop once executed
    pub fn with_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    /// The built-in `terminate` action: echoes its message with a fixed suffix
    pub fn terminate() -> Self {
        let schema = ParameterSchema::new(vec![ParameterSpec::required(
            "message",
            ParamType::String,
            "The final analysis to provide to the user.",
        )]);

        let handler = |_: &mut ActionContext, args: &ActionArgs| -> Result<Value> {
            let message = args.str("message")?;
            Ok(Value::String(format!("{}{}", message, TERMINATE_SUFFIX)))
        };

        // The declared schema is static and valid, so rendering cannot fail.
        let parameters = schema.to_json_schema().unwrap_or_default();

        Self {
            name: TERMINATE_ACTION.to_string(),
            description: "Terminates the session and prints the final answer to the user.".into(),
            schema,
            parameters,
            terminal: true,
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// JSON schema object for the tool descriptor
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Forward to the handler
    pub fn execute(&self, ctx: &mut ActionContext, args: &ActionArgs) -> Result<Value> {
        self.handler.call(ctx, args)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("terminal", &self.terminal)
            .field("parameters", &self.parameters)
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Name -> action mapping with stable presentation order
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    actions: Vec<Action>,
    index: HashMap<String, usize>,
}

impl ActionRegistry {
    /// A registry holding only the built-in `terminate` action
    pub fn new() -> Self {
        let terminate = Action::terminate();
        let mut index = HashMap::new();
        index.insert(terminate.name().to_string(), 0);
        Self {
            actions: vec![terminate],
            index,
        }
    }

    /// Insert or replace an action by name. A replaced action keeps its
    /// position in the presentation order.
    ///
    /// `terminate` is the only terminal action: registering a non-terminal
    /// `terminate`, or a terminal action under any other name, is rejected.
    pub fn register(&mut self, action: Action) -> Result<()> {
        let reserved = action.name() == TERMINATE_ACTION;
        if reserved != action.is_terminal() {
            return Err(Error::config_invalid(format!(
                "only '{}' may be terminal",
                TERMINATE_ACTION
            ))
            .with_operation("registry::register")
            .with_context("action", action.name().to_string()));
        }

        match self.index.get(action.name()) {
            Some(&pos) => self.actions[pos] = action,
            None => {
                self.index.insert(action.name().to_string(), self.actions.len());
                self.actions.push(action);
            }
        }
        Ok(())
    }

    /// Look up an action; unknown names yield `None`
    pub fn get_action(&self, name: &str) -> Option<&Action> {
        self.index.get(name).map(|&pos| &self.actions[pos])
    }

    /// All actions in presentation order
    pub fn get_actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.name())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn echo_action(name: &str) -> Action {
        Action::new(
            name,
            "Echo the arguments back",
            ParameterSchema::empty(),
            |_: &mut ActionContext, args: &ActionArgs| -> Result<Value> {
                Ok(Value::Object(args.as_map().clone()))
            },
        )
        .unwrap()
    }

    #[test]
    fn test_registry_starts_with_terminate() {
        let registry = ActionRegistry::new();
        assert_eq!(registry.len(), 1);

        let terminate = registry.get_action(TERMINATE_ACTION).unwrap();
        assert!(terminate.is_terminal());
        assert_eq!(terminate.parameters()["required"], json!(["message"]));
    }

    #[test]
    fn test_unknown_action_is_none() {
        let registry = ActionRegistry::new();
        assert!(registry.get_action("list_files").is_none());
    }

    #[test]
    fn test_register_overwrites_in_place() {
        let mut registry = ActionRegistry::new();
        registry.register(echo_action("a")).unwrap();
        registry.register(echo_action("b")).unwrap();

        let replacement = Action::new(
            "a",
            "Replacement",
            ParameterSchema::empty(),
            |_: &mut ActionContext, _: &ActionArgs| -> Result<Value> { Ok(json!(1)) },
        )
        .unwrap();
        registry.register(replacement).unwrap();

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["terminate", "a", "b"]);
        assert_eq!(registry.get_action("a").unwrap().description(), "Replacement");
    }

    #[test]
    fn test_only_terminate_may_be_terminal() {
        let mut registry = ActionRegistry::new();

        let rogue = echo_action("stop_now").with_terminal(true);
        let err = registry.register(rogue).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let soft_terminate = echo_action(TERMINATE_ACTION);
        assert!(registry.register(soft_terminate).is_err());
        assert!(registry.get_action(TERMINATE_ACTION).unwrap().is_terminal());
    }

    #[test]
    fn test_action_construction_fails_fast() {
        let schema = ParameterSchema::new(vec![
            ParameterSpec::required("path", ParamType::String, ""),
            ParameterSpec::required("path", ParamType::String, ""),
        ]);
        let result = Action::new(
            "bad",
            "",
            schema,
            |_: &mut ActionContext, _: &ActionArgs| -> Result<Value> { Ok(Value::Null) },
        );
        assert!(result.is_err_and(|e| e.kind() == ErrorKind::ConfigInvalid));

        let unnamed = Action::new(
            "",
            "",
            ParameterSchema::empty(),
            |_: &mut ActionContext, _: &ActionArgs| -> Result<Value> { Ok(Value::Null) },
        );
        assert!(unnamed.is_err());
    }

    #[test]
    fn test_terminate_appends_suffix() {
        let mut ctx = ActionContext::default();
        let args = ActionArgs::new().with("message", json!("done"));
        let result = Action::terminate().execute(&mut ctx, &args).unwrap();
        assert_eq!(result, json!("done\nTerminating..."));
    }

    #[test]
    fn test_args_accessors() {
        let args = ActionArgs::new()
            .with("alias", json!("prev"))
            .with("args", json!([2]))
            .with("how", Value::Null)
            .with("n", json!(3));

        assert_eq!(args.str("alias").unwrap(), "prev");
        assert_eq!(args.opt_str("how").unwrap(), None);
        assert_eq!(args.array("args").unwrap(), vec![json!(2)]);
        assert!(args.object("kwargs").unwrap().is_empty());

        let err = args.str("n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = args.str("missing").unwrap_err();
        assert!(err.message().contains("missing"));
    }
}
