// src/tool/func.rs

use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::tool::{Tool, ToolOutcome, ToolRequest};

/// A tool backed by an async closure.
///
/// ```ignore
/// let upper = tool_fn("upper", |req: ToolRequest| async move {
///     let text = req.input.as_str().unwrap_or_default();
///     Ok(serde_json::json!(text.to_uppercase()))
/// });
/// ```
pub struct FnTool<F> {
    id: String,
    f: F,
}

/// Wrap `f` as a tool with the given id.
pub fn tool_fn<F, Fut>(id: impl Into<String>, f: F) -> FnTool<F>
where
    F: Fn(ToolRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolOutcome> + Send + 'static,
{
    FnTool { id: id.into(), f }
}

impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(ToolRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolOutcome> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, request: ToolRequest) -> BoxFuture<'_, ToolOutcome> {
        (self.f)(request).boxed()
    }
}
