use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while listing or calling tools on the tool host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("tool host timed out after {0}ms")]
    Timeout(u64),
    #[error("tool host channel failed: {0}")]
    Channel(String),
    #[error("execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    /// Whether the failure means the connection to the host is unusable.
    pub fn is_channel(&self) -> bool {
        matches!(self, Self::Channel(_))
    }
}

impl From<mcp::CallError> for ToolError {
    fn from(err: mcp::CallError) -> Self {
        match err {
            mcp::CallError::UnknownTool(name) => Self::NotFound(name),
            mcp::CallError::InvalidArguments(reason) => Self::InvalidInput(reason),
        }
    }
}
