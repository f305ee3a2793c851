//! The single error type surfaced by every tool adapter.

use thiserror::Error;

/// Error raised by every layer of the tool belt.
///
/// There is deliberately one kind: a tagged failure carrying a human-readable
/// message. Each layer that catches an underlying failure re-wraps it with
/// one layer of context, so a caller always receives a single `ToolError`
/// whose message reads as a concatenation of context prefixes, never a stack
/// of nested foreign error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolError {
    message: String,
}

impl ToolError {
    /// Create an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap an underlying failure with an operation-level prefix,
    /// e.g. `ToolError::context("Error fetching stock price", err)`.
    pub fn context(prefix: impl AsRef<str>, cause: impl std::fmt::Display) -> Self {
        Self::new(format!("{}: {}", prefix.as_ref(), cause))
    }

    /// The error produced when an adapter is dispatched an action outside
    /// its recognized set.
    pub fn unknown_action(adapter: &str, action: &str) -> Self {
        Self::new(format!("Unknown {adapter} action: {action}"))
    }

    /// The composed message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convenience alias used throughout the crate.
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message() {
        let err = ToolError::new("something broke");
        assert_eq!(err.to_string(), "something broke");
    }

    #[test]
    fn test_context_prefixes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ToolError::context("Error reading file", io);
        assert!(err.to_string().starts_with("Error reading file: "));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_unknown_action_message() {
        let err = ToolError::unknown_action("Function", "fly");
        assert_eq!(err.to_string(), "Unknown Function action: fly");
    }

    #[test]
    fn test_context_layers_compose() {
        let inner = ToolError::new("connection refused");
        let outer = ToolError::context("Error fetching top stories", inner);
        assert_eq!(
            outer.to_string(),
            "Error fetching top stories: connection refused"
        );
    }
}
