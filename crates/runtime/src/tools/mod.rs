//! Tool host clients and the types shared with the chat exchange.

pub mod errors;
mod local;
mod mcp_client;
mod mcp_host;
mod r#trait;
mod types;

pub use errors::ToolError;
pub use r#trait::ToolHostClient;
pub use local::LocalToolHost;
pub use mcp_client::McpClient;
pub use mcp_host::{DEFAULT_TIMEOUT, HostCommand, McpToolHost};
pub use types::{ToolArguments, result_text, tool_specs};
