//! The concrete tool adapters.

pub mod docker;
pub mod financial;
pub mod function;
pub mod hackernews;
pub mod script;

pub use docker::DockerTool;
pub use financial::FinancialDatasetsTool;
pub use function::FunctionTool;
pub use hackernews::HackerNewsTool;
pub use script::ScriptTool;
