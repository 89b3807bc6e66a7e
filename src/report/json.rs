//! JSON output for pull and status results.
//!
//! Serializes results for scripting and piping.

use crate::sync::{PullResult, StatusResult};

pub fn render_pull(result: &PullResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| String::from("{}"))
}

pub fn render_status(result: &StatusResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| String::from("{}"))
}
