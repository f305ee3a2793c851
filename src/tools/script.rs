//! Out-of-process script execution via an external interpreter.
//!
//! Code is staged to disk (a temp file, or a named path under the tool's
//! base directory) and run as a child process of the configured interpreter
//! binary. The result of a run is whatever the child printed to standard
//! output, trimmed of surrounding whitespace.
//!
//! The "return a named variable" contract is deliberately weak: the tool
//! does not introspect the interpreter's variable bindings. If the caller
//! names a variable, they get the trimmed stdout, or a fixed
//! `"Variable <name> not found"` message when stdout was empty. Scripts must
//! print the value themselves.

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ToolError, ToolResult};
use crate::sandbox;
use crate::tool::{opt_bool_arg, opt_str_arg, str_arg, ActionSpec, Param, ParamKind, Tool};

/// Adapter that stages and runs scripts with an external interpreter,
/// confined to a base directory for named files.
pub struct ScriptTool {
    name: String,
    description: String,
    interpreter: String,
    installer: String,
    base_dir: PathBuf,
    safe_mode: bool,
}

const ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "run_code",
        params: &[
            Param::required("code", ParamKind::Str),
            Param::optional("variable_to_return", ParamKind::Str),
        ],
    },
    ActionSpec {
        name: "save_to_file_and_run",
        params: &[
            Param::required("file_name", ParamKind::Str),
            Param::required("code", ParamKind::Str),
            Param::optional("variable_to_return", ParamKind::Str),
            Param::optional("overwrite", ParamKind::Bool),
        ],
    },
    ActionSpec {
        name: "install_package",
        params: &[Param::required("package", ParamKind::Str)],
    },
    ActionSpec {
        name: "run_file_return_variable",
        params: &[
            Param::required("file_name", ParamKind::Str),
            Param::optional("variable_to_return", ParamKind::Str),
        ],
    },
    ActionSpec {
        name: "read_file",
        params: &[Param::required("file_name", ParamKind::Str)],
    },
    ActionSpec {
        name: "list_files",
        params: &[],
    },
];

impl ScriptTool {
    /// Create a script tool rooted at `base_dir`, running `python3` and
    /// installing packages with `pip3`. Safe mode is off: out-of-process
    /// execution is expected to run real scripts under human supervision.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "script".to_string(),
            description: "Execute scripts with an external interpreter and manage staged files"
                .to_string(),
            interpreter: "python3".to_string(),
            installer: "pip3".to_string(),
            base_dir: base_dir.into(),
            safe_mode: false,
        }
    }

    /// Builder: use a different interpreter binary.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Builder: use a different package installer binary.
    pub fn with_installer(mut self, installer: impl Into<String>) -> Self {
        self.installer = installer.into();
        self
    }

    /// Builder: apply the denylist gate before staging any code string.
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Resolve a caller-supplied file name under the base directory.
    /// Absolute paths and parent-directory components are rejected so staged
    /// files cannot escape the configured root.
    fn resolve(&self, file_name: &str) -> ToolResult<PathBuf> {
        if file_name.is_empty() {
            return Err(ToolError::new("File name cannot be empty"));
        }
        let relative = Path::new(file_name);
        let escapes = relative.components().any(|c| {
            !matches!(c, Component::Normal(_) | Component::CurDir)
        });
        if escapes {
            return Err(ToolError::new(format!(
                "File name must stay within the base directory: {file_name}"
            )));
        }
        Ok(self.base_dir.join(relative))
    }

    /// Run a staged file and apply the stdout-capture result contract.
    fn run_staged(
        &self,
        path: &Path,
        variable: Option<&str>,
        success_msg: &str,
    ) -> ToolResult<String> {
        warn!(
            tool = %self.name,
            interpreter = %self.interpreter,
            "running arbitrary code, provide human supervision"
        );

        let output = Command::new(&self.interpreter)
            .arg(path)
            .output()
            .map_err(|e| {
                ToolError::context(format!("Error running {}", self.interpreter), e)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::new(format!(
                "Interpreter exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match variable {
            None => Ok(success_msg.to_string()),
            Some(name) => {
                let trimmed = stdout.trim();
                if trimmed.is_empty() {
                    Ok(format!("Variable {name} not found"))
                } else {
                    Ok(trimmed.to_string())
                }
            }
        }
    }

    fn run_code(&self, code: &str, variable: Option<&str>) -> ToolResult<String> {
        if self.safe_mode {
            sandbox::check_code(code)?;
        }

        let mut staged = tempfile::NamedTempFile::new()
            .map_err(|e| ToolError::context("Error running code", e))?;
        staged
            .write_all(code.as_bytes())
            .and_then(|()| staged.flush())
            .map_err(|e| ToolError::context("Error running code", e))?;

        self.run_staged(staged.path(), variable, "successfully ran code")
    }

    fn save_to_file_and_run(
        &self,
        file_name: &str,
        code: &str,
        variable: Option<&str>,
        overwrite: bool,
    ) -> ToolResult<String> {
        if self.safe_mode {
            sandbox::check_code(code)?;
        }

        let path = self.resolve(file_name)?;
        if path.exists() && !overwrite {
            return Ok(format!("File {file_name} already exists"));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::context("Error saving and running code", e))?;
        }
        std::fs::write(&path, code)
            .map_err(|e| ToolError::context("Error saving and running code", e))?;
        debug!(file = %path.display(), "staged script");

        let success = format!("successfully ran {}", path.display());
        self.run_staged(&path, variable, &success)
    }

    fn run_file(&self, file_name: &str, variable: Option<&str>) -> ToolResult<String> {
        let path = self.resolve(file_name)?;
        let success = format!("successfully ran {}", path.display());
        self.run_staged(&path, variable, &success)
    }

    fn install_package(&self, package: &str) -> ToolResult<String> {
        if package.is_empty() {
            return Err(ToolError::new("Package name cannot be empty"));
        }

        let output = Command::new(&self.installer)
            .arg("install")
            .arg(package)
            .output()
            .map_err(|e| ToolError::context(format!("Error installing package {package}"), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::new(format!(
                "Error installing package {package}: {}",
                stderr.trim()
            )));
        }

        Ok(format!("successfully installed package {package}"))
    }

    fn read_file(&self, file_name: &str) -> ToolResult<String> {
        let path = self.resolve(file_name)?;
        std::fs::read_to_string(&path).map_err(|e| ToolError::context("Error reading file", e))
    }

    fn list_files(&self) -> ToolResult<String> {
        let entries = std::fs::read_dir(&self.base_dir)
            .map_err(|e| ToolError::context("Error reading files", e))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();

        Ok(names.join(", "))
    }
}

impl Tool for ScriptTool {
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
            return Err(ToolError::unknown_action("Script", action));
        };

        match spec.name {
            "run_code" => {
                let code = str_arg(spec, args, 0)?;
                let variable = opt_str_arg(spec, args, 1)?;
                self.run_code(code, variable)
            }
            "save_to_file_and_run" => {
                let file_name = str_arg(spec, args, 0)?;
                let code = str_arg(spec, args, 1)?;
                let variable = opt_str_arg(spec, args, 2)?;
                let overwrite = opt_bool_arg(spec, args, 3)?.unwrap_or(true);
                self.save_to_file_and_run(file_name, code, variable, overwrite)
            }
            "install_package" => {
                let package = str_arg(spec, args, 0)?;
                self.install_package(package)
            }
            "run_file_return_variable" => {
                let file_name = str_arg(spec, args, 0)?;
                let variable = opt_str_arg(spec, args, 1)?;
                self.run_file(file_name, variable)
            }
            "read_file" => {
                let file_name = str_arg(spec, args, 0)?;
                self.read_file(file_name)
            }
            "list_files" => self.list_files(),
            _ => Err(ToolError::unknown_action("Script", action)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sh_tool(dir: &TempDir) -> ScriptTool {
        ScriptTool::new(dir.path()).with_interpreter("sh")
    }

    #[test]
    fn test_unknown_action() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        let err = tool.dispatch("invalid_action", &[]).unwrap_err();
        assert!(err.to_string().contains("Unknown Script action"));
    }

    #[test]
    fn test_run_code_captures_stdout() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        let result = tool
            .dispatch("run_code", &[json!("echo 42"), json!("x")])
            .unwrap();
        assert_eq!(result, "42");
    }

    #[test]
    fn test_run_code_without_variable() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        let result = tool.dispatch("run_code", &[json!("echo hi")]).unwrap();
        assert_eq!(result, "successfully ran code");
    }

    #[test]
    fn test_variable_not_found_on_empty_stdout() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        let result = tool
            .dispatch("run_code", &[json!("true"), json!("x")])
            .unwrap();
        assert_eq!(result, "Variable x not found");
    }

    #[test]
    fn test_nonzero_exit_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        let err = tool
            .dispatch("run_code", &[json!("exit 3"), json!("x")])
            .unwrap_err();
        assert!(err.to_string().contains("Interpreter exited with"));
    }

    #[test]
    fn test_save_creates_intermediate_dirs_and_exact_bytes() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        let code = "echo hello\n# trailing comment\n";
        let result = tool
            .dispatch(
                "save_to_file_and_run",
                &[json!("nested/deep/hello.sh"), json!(code), json!("x")],
            )
            .unwrap();
        assert_eq!(result, "hello");

        let staged = dir.path().join("nested/deep/hello.sh");
        assert_eq!(std::fs::read(&staged).unwrap(), code.as_bytes());
    }

    #[test]
    fn test_save_respects_overwrite_flag() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        tool.dispatch(
            "save_to_file_and_run",
            &[json!("keep.sh"), json!("echo one")],
        )
        .unwrap();

        let result = tool
            .dispatch(
                "save_to_file_and_run",
                &[json!("keep.sh"), json!("echo two"), json!(null), json!(false)],
            )
            .unwrap();
        assert_eq!(result, "File keep.sh already exists");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("keep.sh")).unwrap(),
            "echo one"
        );
    }

    #[test]
    fn test_run_file_return_variable() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("script.sh"), "echo staged").unwrap();
        let mut tool = sh_tool(&dir);
        let result = tool
            .dispatch(
                "run_file_return_variable",
                &[json!("script.sh"), json!("out")],
            )
            .unwrap();
        assert_eq!(result, "staged");
    }

    #[test]
    fn test_read_file_and_list_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "contents").unwrap();
        std::fs::write(dir.path().join("b.txt"), "more").unwrap();
        std::fs::write(dir.path().join(".hidden"), "skip").unwrap();

        let mut tool = sh_tool(&dir);
        assert_eq!(
            tool.dispatch("read_file", &[json!("a.txt")]).unwrap(),
            "contents"
        );
        assert_eq!(
            tool.dispatch("list_files", &[]).unwrap(),
            "a.txt, b.txt"
        );
    }

    #[test]
    fn test_read_missing_file_is_wrapped() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        let err = tool.dispatch("read_file", &[json!("ghost.txt")]).unwrap_err();
        assert!(err.to_string().starts_with("Error reading file: "));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        for action in ["read_file", "run_file_return_variable"] {
            let err = tool
                .dispatch(action, &[json!("../outside.txt")])
                .unwrap_err();
            assert!(err.to_string().contains("base directory"));
        }
        let err = tool
            .dispatch("save_to_file_and_run", &[json!("/etc/x"), json!("echo")])
            .unwrap_err();
        assert!(err.to_string().contains("base directory"));
    }

    #[test]
    fn test_safe_mode_gates_staging() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir).with_safe_mode(true);
        let err = tool
            .dispatch(
                "save_to_file_and_run",
                &[json!("bad.sh"), json!("getenv secrets")],
            )
            .unwrap_err();
        assert!(err.to_string().contains("Forbidden code pattern detected"));
        // Nothing was staged.
        assert!(!dir.path().join("bad.sh").exists());
    }

    #[test]
    fn test_empty_package_rejected() {
        let dir = TempDir::new().unwrap();
        let mut tool = sh_tool(&dir);
        let err = tool.dispatch("install_package", &[json!("")]).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }
}
