//! Container management through the `docker` CLI.
//!
//! Every action shells out to the host's `docker` binary and normalizes the
//! tabular or JSON output into the canonical response form.

use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::encode::encode_value;
use crate::error::{ToolError, ToolResult};
use crate::tool::{opt_bool_arg, opt_str_arg, str_arg, ActionSpec, Param, ParamKind, Tool};

/// Adapter wrapping the Docker CLI.
pub struct DockerTool {
    name: String,
    description: String,
}

const ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "list_containers",
        params: &[Param::optional("all", ParamKind::Bool)],
    },
    ActionSpec {
        name: "list_images",
        params: &[],
    },
    ActionSpec {
        name: "run_container",
        params: &[
            Param::required("image", ParamKind::Str),
            Param::optional("name", ParamKind::Str),
            Param::optional("ports", ParamKind::Value),
        ],
    },
    ActionSpec {
        name: "stop_container",
        params: &[Param::required("container_id", ParamKind::Str)],
    },
    ActionSpec {
        name: "remove_container",
        params: &[Param::required("container_id", ParamKind::Str)],
    },
    ActionSpec {
        name: "container_logs",
        params: &[Param::required("container_id", ParamKind::Str)],
    },
];

fn column_split() -> &'static Regex {
    static SPLIT: OnceLock<Regex> = OnceLock::new();
    SPLIT.get_or_init(|| Regex::new(r"\s{2,}").expect("valid column split regex"))
}

impl DockerTool {
    pub fn new() -> Self {
        Self {
            name: "docker".to_string(),
            description: "Manage Docker containers and images".to_string(),
        }
    }

    /// Run a docker subcommand, surfacing a non-zero exit with the given
    /// operation prefix.
    fn docker(&self, args: &[&str], op: &str) -> ToolResult<String> {
        debug!(tool = %self.name, ?args, "running docker");
        let output = Command::new("docker")
            .args(args)
            .output()
            .map_err(|e| ToolError::context(op, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::new(format!("{op}: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Parse the column-aligned table docker prints (`docker ps`,
    /// `docker images`) into one object per row, keyed by snake_cased
    /// header names.
    fn parse_table(output: &str) -> Vec<Value> {
        let mut lines = output.lines().filter(|l| !l.trim().is_empty());
        let Some(header_line) = lines.next() else {
            return Vec::new();
        };

        let headers: Vec<String> = column_split()
            .split(header_line)
            .filter(|h| !h.trim().is_empty())
            .map(|h| {
                h.trim()
                    .to_lowercase()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join("_")
            })
            .collect();

        lines
            .map(|line| {
                let parts: Vec<&str> = column_split().split(line).collect();
                let mut row = Map::new();
                for (index, header) in headers.iter().enumerate() {
                    let cell = parts
                        .get(index)
                        .map(|p| Value::String(p.trim().to_string()))
                        .unwrap_or(Value::Null);
                    row.insert(header.clone(), cell);
                }
                Value::Object(row)
            })
            .collect()
    }

    fn list_containers(&self, all: bool) -> ToolResult<String> {
        let mut args = vec!["ps"];
        if all {
            args.push("-a");
        }
        let output = self.docker(&args, "Error listing containers")?;
        Ok(encode_value(&Value::Array(Self::parse_table(&output))))
    }

    fn list_images(&self) -> ToolResult<String> {
        let output = self.docker(&["images"], "Error listing images")?;
        Ok(encode_value(&Value::Array(Self::parse_table(&output))))
    }

    fn run_container(
        &self,
        image: &str,
        name: Option<&str>,
        ports: Option<&Value>,
    ) -> ToolResult<String> {
        let mut args: Vec<String> = vec!["run".into(), "-d".into()];
        if let Some(name) = name {
            args.push(format!("--name={name}"));
        }
        for port in Self::port_mappings(ports)? {
            args.push("-p".into());
            args.push(port);
        }
        args.push(image.to_string());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.docker(&arg_refs, "Error running container")?;
        let container_id = output.trim().to_string();
        if container_id.is_empty() {
            return Err(ToolError::new("Error running container: no container id"));
        }

        let inspect = self.docker(&["inspect", &container_id], "Error running container")?;
        let parsed: Value = serde_json::from_str(&inspect)
            .map_err(|e| ToolError::context("Error running container", e))?;
        let info = &parsed[0];

        Ok(encode_value(&json!({
            "id": container_id,
            "name": info["Name"],
            "image": info["Config"]["Image"],
            "status": info["State"]["Status"],
            "ports": info["NetworkSettings"]["Ports"],
        })))
    }

    fn port_mappings(ports: Option<&Value>) -> ToolResult<Vec<String>> {
        let Some(ports) = ports else {
            return Ok(Vec::new());
        };
        match ports {
            Value::String(p) => Ok(vec![p.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ToolError::new("Port mappings must be strings"))
                })
                .collect(),
            _ => Err(ToolError::new(
                "run_container expects 'ports' as a string or array of strings",
            )),
        }
    }

    fn stop_container(&self, container_id: &str) -> ToolResult<String> {
        let output = self.docker(&["stop", container_id], "Error stopping container")?;
        if output.trim() != container_id {
            return Err(ToolError::new(format!(
                "Error stopping container: failed to stop {container_id}"
            )));
        }
        Ok(encode_value(&json!({
            "status": "success",
            "container_id": container_id,
        })))
    }

    fn remove_container(&self, container_id: &str) -> ToolResult<String> {
        let output = self.docker(&["rm", container_id], "Error removing container")?;
        if output.trim() != container_id {
            return Err(ToolError::new(format!(
                "Error removing container: failed to remove {container_id}"
            )));
        }
        Ok(encode_value(&json!({
            "status": "success",
            "container_id": container_id,
        })))
    }

    fn container_logs(&self, container_id: &str) -> ToolResult<String> {
        let logs = self.docker(&["logs", container_id], "Error getting container logs")?;
        Ok(encode_value(&json!({
            "container_id": container_id,
            "logs": logs,
        })))
    }
}

impl Default for DockerTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DockerTool {
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
            return Err(ToolError::unknown_action("Docker", action));
        };

        match spec.name {
            "list_containers" => {
                let all = opt_bool_arg(spec, args, 0)?.unwrap_or(false);
                self.list_containers(all)
            }
            "list_images" => self.list_images(),
            "run_container" => {
                let image = str_arg(spec, args, 0)?;
                let name = opt_str_arg(spec, args, 1)?;
                let ports = args.get(2).filter(|v| !v.is_null());
                self.run_container(image, name, ports)
            }
            "stop_container" => {
                let container_id = str_arg(spec, args, 0)?;
                self.stop_container(container_id)
            }
            "remove_container" => {
                let container_id = str_arg(spec, args, 0)?;
                self.remove_container(container_id)
            }
            "container_logs" => {
                let container_id = str_arg(spec, args, 0)?;
                self.container_logs(container_id)
            }
            _ => Err(ToolError::unknown_action("Docker", action)),
        }
    }
}
