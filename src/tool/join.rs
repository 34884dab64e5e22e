// src/tool/join.rs

use futures::future::BoxFuture;

use crate::tool::{Tool, ToolOutcome, ToolRequest};

/// Built-in tool that merges its upstream outputs into one object keyed by
/// dependency id. Useful as the sink of a fan-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinTool;

impl JoinTool {
    pub const ID: &'static str = "join";
}

impl Tool for JoinTool {
    fn id(&self) -> &str {
        Self::ID
    }

    fn execute(&self, request: ToolRequest) -> BoxFuture<'_, ToolOutcome> {
        Box::pin(async move {
            let merged: serde_json::Map<String, serde_json::Value> =
                request.upstream.into_iter().collect();
            Ok(serde_json::Value::Object(merged))
        })
    }
}
