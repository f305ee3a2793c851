//! Hacker News stories and user data via the public Firebase API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::encode::encode_value;
use crate::error::{ToolError, ToolResult};
use crate::tool::{opt_int_arg, str_arg, ActionSpec, Param, ParamKind, Tool};

const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STORY_COUNT: u64 = 10;

/// Adapter for the Hacker News Firebase API.
pub struct HackerNewsTool {
    name: String,
    description: String,
    client: Client,
}

const ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "get_top_hackernews_stories",
        params: &[Param::optional("num_stories", ParamKind::Int)],
    },
    ActionSpec {
        name: "get_user_details",
        params: &[Param::required("username", ParamKind::Str)],
    },
];

impl HackerNewsTool {
    pub fn new() -> ToolResult<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ToolError::context("Error building HTTP client", e))?;

        Ok(Self {
            name: "hacker_news".to_string(),
            description: "Access Hacker News stories and user data".to_string(),
            client,
        })
    }

    fn get_json(&self, url: &str, op: &str) -> ToolResult<Value> {
        debug!(tool = %self.name, url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ToolError::context(op, e))?;

        if !response.status().is_success() {
            return Err(ToolError::new(format!("{op}: {}", response.status())));
        }

        response.json().map_err(|e| ToolError::context(op, e))
    }

    fn get_top_stories(&self, num_stories: u64) -> ToolResult<String> {
        let op = "Error fetching HackerNews stories";
        let ids = self.get_json(&format!("{API_BASE}/topstories.json"), op)?;
        let ids = ids
            .as_array()
            .ok_or_else(|| ToolError::new(format!("{op}: unexpected response shape")))?;

        let mut stories = Vec::new();
        for id in ids.iter().take(num_stories as usize) {
            let Some(id) = id.as_u64() else { continue };
            // Individual story failures are skipped, not fatal.
            let Ok(mut story) = self.get_json(&format!("{API_BASE}/item/{id}.json"), op) else {
                continue;
            };
            if let Some(by) = story.get("by").and_then(Value::as_str).map(str::to_string) {
                story["username"] = Value::String(by);
            }
            stories.push(story);
        }

        Ok(encode_value(&Value::Array(stories)))
    }

    fn get_user_details(&self, username: &str) -> ToolResult<String> {
        let op = "Error getting user details";
        let user = self.get_json(&format!("{API_BASE}/user/{username}.json"), op)?;
        if user.is_null() {
            return Err(ToolError::new(format!("{op}: user '{username}' not found")));
        }

        let submitted = user
            .get("submitted")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);

        Ok(encode_value(&json!({
            "id": user["id"],
            "karma": user["karma"],
            "about": user["about"],
            "total_items_submitted": submitted,
        })))
    }
}

impl Tool for HackerNewsTool {
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
            return Err(ToolError::unknown_action("HackerNews", action));
        };

        match spec.name {
            "get_top_hackernews_stories" => {
                let count = opt_int_arg(spec, args, 0)?.unwrap_or(DEFAULT_STORY_COUNT);
                self.get_top_stories(count)
            }
            "get_user_details" => {
                let username = str_arg(spec, args, 0)?;
                self.get_user_details(username)
            }
            _ => Err(ToolError::unknown_action("HackerNews", action)),
        }
    }
}
