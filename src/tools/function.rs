//! In-process function registration and expression evaluation.
//!
//! Code strings are Rhai. `register_function` compiles the supplied source
//! once, binding it to a single `args` parameter; `execute_function` later
//! evaluates the stored AST with concrete arguments in scope.
//! `evaluate_expression` evaluates a one-off expression with no registration.
//!
//! In safe mode (the default) every code string is checked against the
//! denylist in [`crate::sandbox`] before it is compiled, so a rejected string
//! is never executed and never registered.

use std::collections::BTreeMap;

use rhai::{Dynamic, Engine, Scope, AST};
use serde_json::{json, Value};
use tracing::debug;

use crate::encode::{dynamic_to_json, encode_value};
use crate::error::{ToolError, ToolResult};
use crate::sandbox::{self, EngineLimits};
use crate::tool::{opt_array_arg, str_arg, ActionSpec, Param, ParamKind, Tool};

/// One registered function: the exact source supplied plus the AST compiled
/// from it. Recompiled only by re-registration under the same name, which
/// silently overwrites the prior entry.
struct RegisteredFunction {
    source: String,
    ast: AST,
}

/// Adapter for registering, executing and evaluating custom functions.
pub struct FunctionTool {
    name: String,
    description: String,
    engine: Engine,
    functions: BTreeMap<String, RegisteredFunction>,
    safe_mode: bool,
}

const ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "register_function",
        params: &[
            Param::required("name", ParamKind::Str),
            Param::required("code", ParamKind::Str),
        ],
    },
    ActionSpec {
        name: "execute_function",
        params: &[
            Param::required("name", ParamKind::Str),
            Param::optional("args", ParamKind::Array),
        ],
    },
    ActionSpec {
        name: "list_functions",
        params: &[],
    },
    ActionSpec {
        name: "evaluate_expression",
        params: &[Param::required("expression", ParamKind::Str)],
    },
];

impl FunctionTool {
    /// Create a function tool with safe mode on and default engine limits.
    pub fn new() -> Self {
        Self::with_limits(EngineLimits::default())
    }

    /// Create a function tool with custom engine limits.
    pub fn with_limits(limits: EngineLimits) -> Self {
        let mut engine = Engine::new();
        limits.apply(&mut engine);

        Self {
            name: "function".to_string(),
            description: "Execute custom functions and code".to_string(),
            engine,
            functions: BTreeMap::new(),
            safe_mode: true,
        }
    }

    /// Disable the denylist gate. The caller takes on supervision of every
    /// code string this instance is handed.
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    fn register_function(&mut self, name: &str, code: &str) -> ToolResult<String> {
        if name.is_empty() {
            return Err(ToolError::new("Function name cannot be empty"));
        }
        if self.safe_mode {
            sandbox::check_code(code)?;
        }

        let ast = self
            .engine
            .compile(code)
            .map_err(|e| ToolError::context("Error registering function", e))?;

        self.functions.insert(
            name.to_string(),
            RegisteredFunction {
                source: code.to_string(),
                ast,
            },
        );
        debug!(function = name, "registered function");

        Ok(encode_value(&json!({
            "status": "success",
            "message": format!("Function '{name}' registered successfully"),
        })))
    }

    fn execute_function(&self, name: &str, args: &[Value]) -> ToolResult<String> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ToolError::new(format!("Function '{name}' not found")))?;

        let dyn_args = rhai::serde::to_dynamic(args)
            .map_err(|e| ToolError::context(format!("Error executing function '{name}'"), e))?;

        let mut scope = Scope::new();
        scope.push_dynamic("args", dyn_args);

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &function.ast)
            .map_err(|e| ToolError::context(format!("Error executing function '{name}'"), e))?;

        Ok(encode_value(&dynamic_to_json(&result)))
    }

    fn list_functions(&self) -> ToolResult<String> {
        let listing: Vec<Value> = self
            .functions
            .iter()
            .map(|(name, function)| json!({ "name": name, "code": function.source }))
            .collect();

        Ok(encode_value(&Value::Array(listing)))
    }

    fn evaluate_expression(&self, expression: &str) -> ToolResult<String> {
        if self.safe_mode {
            sandbox::check_code(expression)?;
        }

        let result = self
            .engine
            .eval::<Dynamic>(expression)
            .map_err(|e| ToolError::context("Error evaluating expression", e))?;

        Ok(encode_value(&dynamic_to_json(&result)))
    }
}

impl Default for FunctionTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    fn dispatch(&mut self, action: &str, args: &[Value]) -> ToolResult<String> {
        debug!(tool = %self.name, action, "dispatch");
        let Some(spec) = ActionSpec::find(ACTIONS, action) else {
            return Err(ToolError::unknown_action("Function", action));
        };

        match spec.name {
            "register_function" => {
                let name = str_arg(spec, args, 0)?;
                let code = str_arg(spec, args, 1)?;
                self.register_function(name, code)
            }
            "execute_function" => {
                let name = str_arg(spec, args, 0)?;
                let fn_args = opt_array_arg(spec, args, 1)?.unwrap_or(&[]);
                self.execute_function(name, fn_args)
            }
            "list_functions" => self.list_functions(),
            "evaluate_expression" => {
                let expression = str_arg(spec, args, 0)?;
                self.evaluate_expression(expression)
            }
            _ => Err(ToolError::unknown_action("Function", action)),
        }
    }
}
