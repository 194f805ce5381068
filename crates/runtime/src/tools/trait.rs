//! Tool host client trait.

use crate::tools::{ToolArguments, ToolError};
use mcp::{CallToolResult, Tool};
use std::future::Future;

/// Handle to a tool host.
///
/// This is the boundary between the chat exchange and side effects. One
/// handle is built per process and shared by every request.
pub trait ToolHostClient: Send + Sync {
    /// Establish the channel if it is not already up.
    fn connect(&self) -> impl Future<Output = Result<(), ToolError>> + Send;

    /// Whether the channel is currently established.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// The host's catalog, in the host's order.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<Tool>, ToolError>> + Send;

    /// Execute one tool call.
    fn call_tool(
        &self,
        name: &str,
        arguments: ToolArguments,
    ) -> impl Future<Output = Result<CallToolResult, ToolError>> + Send;
}
