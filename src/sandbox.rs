//! Best-effort safety gate and resource limits for dynamic code execution.
//!
//! The denylist is a textual pattern filter, not a capability sandbox: it
//! rejects known-dangerous call shapes before compilation or staging, but it
//! cannot guarantee containment against obfuscated or indirect access. True
//! isolation requires OS-level sandboxing, which is outside this crate.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};

/// One forbidden code shape: a short label plus the regex that detects it.
#[derive(Debug, Clone, Copy)]
pub struct ForbiddenPattern {
    pub label: &'static str,
    pub pattern: &'static str,
}

/// The fixed set of dangerous syntactic patterns rejected in safe mode.
pub const FORBIDDEN_PATTERNS: &[ForbiddenPattern] = &[
    ForbiddenPattern {
        label: "shell escape",
        pattern: r"`",
    },
    ForbiddenPattern {
        label: "process spawn",
        pattern: r"\b(?:system|exec|spawn|popen)\s*\(",
    },
    ForbiddenPattern {
        label: "nested eval",
        pattern: r"\beval\s*\(",
    },
    ForbiddenPattern {
        label: "file access",
        pattern: r"\b(?:open|read_file|write_file|remove_file)\s*\(",
    },
    ForbiddenPattern {
        label: "environment access",
        pattern: r"\bENV\b|\benviron\b|\bgetenv\b",
    },
    ForbiddenPattern {
        label: "library loading",
        pattern: r"\b(?:import|require)\b",
    },
];

fn compiled_patterns() -> &'static [(&'static ForbiddenPattern, Regex)] {
    static COMPILED: OnceLock<Vec<(&'static ForbiddenPattern, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        FORBIDDEN_PATTERNS
            .iter()
            .filter_map(|fp| Regex::new(fp.pattern).ok().map(|re| (fp, re)))
            .collect()
    })
}

/// Check a code string against the denylist.
///
/// Returns an error citing the offending pattern on the first match. Called
/// before compilation or staging, so a rejected string is never executed.
pub fn check_code(code: &str) -> ToolResult<()> {
    for (fp, re) in compiled_patterns() {
        if re.is_match(code) {
            return Err(ToolError::new(format!(
                "Forbidden code pattern detected ({}): {}",
                fp.label, fp.pattern
            )));
        }
    }
    Ok(())
}

/// Resource limits applied to the in-process evaluation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineLimits {
    /// Maximum number of operations (prevents infinite loops)
    pub max_operations: u64,
    /// Maximum string size in bytes
    pub max_string_size: usize,
    /// Maximum array size
    pub max_array_size: usize,
    /// Maximum map size
    pub max_map_size: usize,
    /// Maximum expression nesting depth
    pub max_expr_depth: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_operations: 100_000,
            max_string_size: 10_000_000, // 10MB
            max_array_size: 10_000,
            max_map_size: 1_000,
            max_expr_depth: 64,
        }
    }
}

impl EngineLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set max operations
    pub fn with_max_operations(mut self, max: u64) -> Self {
        self.max_operations = max;
        self
    }

    /// Builder: set max string size
    pub fn with_max_string_size(mut self, size: usize) -> Self {
        self.max_string_size = size;
        self
    }

    /// Builder: set max array size
    pub fn with_max_array_size(mut self, size: usize) -> Self {
        self.max_array_size = size;
        self
    }

    /// Builder: set max map size
    pub fn with_max_map_size(mut self, size: usize) -> Self {
        self.max_map_size = size;
        self
    }

    /// Apply these limits to a Rhai engine.
    pub fn apply(&self, engine: &mut rhai::Engine) {
        engine.set_max_operations(self.max_operations);
        engine.set_max_string_size(self.max_string_size);
        engine.set_max_array_size(self.max_array_size);
        engine.set_max_map_size(self.max_map_size);
        engine.set_max_expr_depths(self.max_expr_depth, self.max_expr_depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_code_passes() {
        assert!(check_code("1 + 2 * 3").is_ok());
        assert!(check_code("args.len()").is_ok());
        assert!(check_code("[1, 2, 3].filter(|x| x % 2 == 0)").is_ok());
    }

    #[test]
    fn test_shell_escape_rejected() {
        let err = check_code("`ls -la`").unwrap_err();
        assert!(err.to_string().contains("Forbidden code pattern detected"));
        assert!(err.to_string().contains("shell escape"));
    }

    #[test]
    fn test_process_spawn_rejected() {
        assert!(check_code(r#"system("rm -rf /")"#).is_err());
        assert!(check_code(r#"exec ("/bin/sh")"#).is_err());
        assert!(check_code(r#"popen("cat")"#).is_err());
    }

    #[test]
    fn test_nested_eval_rejected() {
        let err = check_code(r#"eval("1 + 1")"#).unwrap_err();
        assert!(err.to_string().contains("nested eval"));
    }

    #[test]
    fn test_file_access_rejected() {
        assert!(check_code(r#"open("/etc/passwd")"#).is_err());
        assert!(check_code(r#"read_file("secrets.txt")"#).is_err());
    }

    #[test]
    fn test_environment_access_rejected() {
        assert!(check_code(r#"ENV["PATH"]"#).is_err());
        assert!(check_code("getenv").is_err());
    }

    #[test]
    fn test_library_loading_rejected() {
        assert!(check_code("import os").is_err());
        assert!(check_code(r#"require "net/http""#).is_err());
    }

    #[test]
    fn test_default_limits() {
        let limits = EngineLimits::default();
        assert_eq!(limits.max_operations, 100_000);
        assert_eq!(limits.max_array_size, 10_000);
    }

    #[test]
    fn test_builder_pattern() {
        let limits = EngineLimits::new()
            .with_max_operations(50_000)
            .with_max_array_size(100);
        assert_eq!(limits.max_operations, 50_000);
        assert_eq!(limits.max_array_size, 100);
    }

    #[test]
    fn test_every_pattern_compiles() {
        assert_eq!(compiled_patterns().len(), FORBIDDEN_PATTERNS.len());
    }
}
