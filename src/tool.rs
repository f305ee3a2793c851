//! The uniform capability surface every adapter implements, plus the typed
//! parameter descriptors and argument-extraction helpers operations validate
//! their inputs with.

use serde_json::Value;

use crate::error::{ToolError, ToolResult};

/// A tool adapter: a name, a description, and one dispatch entry point
/// accepting an action identifier plus positional, loosely-typed arguments.
///
/// `dispatch` is the only operation with effects, and those effects are
/// confined to the specific action invoked. Dispatching an action outside the
/// adapter's recognized set always fails with
/// `"Unknown <Adapter> action: <action>"` and has no side effect.
///
/// One instance is not synchronized for concurrent use; callers either
/// serialize access themselves or construct one instance per user.
pub trait Tool {
    /// Stable, agent-facing identifier.
    fn name(&self) -> &str;

    /// Human-readable description, fixed at construction.
    fn description(&self) -> &str;

    /// The adapter's recognized actions with their declared argument shapes.
    fn actions(&self) -> &'static [ActionSpec];

    /// Route `action` to the matching operation and run it to completion.
    /// Returns the encoded result text or exactly one [`ToolError`].
    fn dispatch(&mut self, action: &str, args: &[Value]) -> ToolResult<String>;
}

/// Expected type of one positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int,
    Bool,
    Array,
    /// Any JSON value is accepted.
    Value,
}

impl ParamKind {
    /// Label used in validation error messages.
    pub fn label(self) -> &'static str {
        match self {
            ParamKind::Str => "string",
            ParamKind::Int => "integer",
            ParamKind::Bool => "boolean",
            ParamKind::Array => "array",
            ParamKind::Value => "value",
        }
    }
}

/// One declared positional parameter of an action.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl Param {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Declared shape of one action: identifier plus positional parameters.
///
/// These tables exist so the accepted argument shape of every operation is
/// written down once and tests can enumerate valid and invalid inputs
/// mechanically. Validation itself stays local to each operation.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub name: &'static str,
    pub params: &'static [Param],
}

impl ActionSpec {
    /// Find the spec for `action` in an adapter's table.
    pub fn find<'a>(table: &'a [ActionSpec], action: &str) -> Option<&'a ActionSpec> {
        table.iter().find(|spec| spec.name == action)
    }

    fn param(&self, idx: usize) -> ToolResult<&Param> {
        self.params.get(idx).ok_or_else(|| {
            ToolError::new(format!(
                "{} takes at most {} arguments",
                self.name,
                self.params.len()
            ))
        })
    }

    fn missing(&self, param: &Param, idx: usize) -> ToolError {
        ToolError::new(format!(
            "{} expects {} '{}' at position {idx}",
            self.name,
            param.kind.label(),
            param.name
        ))
    }
}

/// Extract a required string argument.
pub fn str_arg<'a>(spec: &ActionSpec, args: &'a [Value], idx: usize) -> ToolResult<&'a str> {
    opt_str_arg(spec, args, idx)?
        .ok_or_else(|| spec.missing(&spec.params[idx], idx))
}

/// Extract an optional string argument; absent or null yields `None`.
pub fn opt_str_arg<'a>(
    spec: &ActionSpec,
    args: &'a [Value],
    idx: usize,
) -> ToolResult<Option<&'a str>> {
    let param = spec.param(idx)?;
    match args.get(idx) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(spec.missing(param, idx)),
    }
}

/// Extract an optional non-negative integer argument.
pub fn opt_int_arg(spec: &ActionSpec, args: &[Value], idx: usize) -> ToolResult<Option<u64>> {
    let param = spec.param(idx)?;
    match args.get(idx) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| spec.missing(param, idx)),
    }
}

/// Extract an optional boolean argument.
pub fn opt_bool_arg(spec: &ActionSpec, args: &[Value], idx: usize) -> ToolResult<Option<bool>> {
    let param = spec.param(idx)?;
    match args.get(idx) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(spec.missing(param, idx)),
    }
}

/// Extract an optional array argument; absent or null yields `None`.
pub fn opt_array_arg<'a>(
    spec: &ActionSpec,
    args: &'a [Value],
    idx: usize,
) -> ToolResult<Option<&'a [Value]>> {
    let param = spec.param(idx)?;
    match args.get(idx) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.as_slice())),
        Some(_) => Err(spec.missing(param, idx)),
    }
}
