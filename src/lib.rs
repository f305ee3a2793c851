//! Toolbelt - uniform tool adapters for autonomous agents
//!
//! Each adapter exposes a handful of named actions an agent invokes by
//! string identifier with positional, loosely-typed arguments, receiving a
//! normalized JSON-or-scalar text result or a single [`ToolError`]. The core
//! is the dispatch contract plus the sandboxed code-execution subsystem: an
//! in-process function/expression engine and an out-of-process script runner,
//! both gated by an explicit, best-effort denylist of dangerous code shapes.
//!
//! Dispatch is synchronous and blocking throughout: a call runs to
//! completion, including any subprocess wait or HTTP round-trip, before
//! returning. One tool instance is not synchronized for concurrent callers.
//!
//! ## Example
//!
//! ```ignore
//! use serde_json::json;
//! use toolbelt::{FunctionTool, Tool};
//!
//! let mut tool = FunctionTool::new();
//! tool.dispatch("register_function", &[
//!     json!("add"),
//!     json!("let total = 0; for v in args { total += v; } total"),
//! ])?;
//!
//! let sum = tool.dispatch("execute_function", &[json!("add"), json!([1, 2, 3, 4, 5])])?;
//! assert_eq!(sum, "15");
//! # Ok::<(), toolbelt::ToolError>(())
//! ```

pub mod encode;
pub mod error;
pub mod sandbox;
pub mod tool;
pub mod tools;

pub use encode::{dynamic_to_json, encode_value};
pub use error::{ToolError, ToolResult};
pub use sandbox::{EngineLimits, ForbiddenPattern, FORBIDDEN_PATTERNS};
pub use tool::{ActionSpec, Param, ParamKind, Tool};
pub use tools::{DockerTool, FinancialDatasetsTool, FunctionTool, HackerNewsTool, ScriptTool};
