//! Tool host error types.

use crate::protocol::{JsonRpcError, codes};
use thiserror::Error;

/// Errors from running the tool host itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("stdio transport failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("duplicate tool name in catalog: {0}")]
    DuplicateTool(String),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single `tools/call` was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl From<CallError> for JsonRpcError {
    fn from(err: CallError) -> Self {
        let code = match &err {
            CallError::UnknownTool(_) => codes::UNKNOWN_TOOL,
            CallError::InvalidArguments(_) => codes::INVALID_PARAMS,
        };
        JsonRpcError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_errors_map_to_distinct_codes() {
        let unknown: JsonRpcError = CallError::UnknownTool("nope".into()).into();
        assert_eq!(unknown.code, codes::UNKNOWN_TOOL);
        assert_eq!(unknown.message, "unknown tool: nope");

        let invalid: JsonRpcError = CallError::InvalidArguments("missing `message`".into()).into();
        assert_eq!(invalid.code, codes::INVALID_PARAMS);
        assert!(invalid.message.starts_with("invalid arguments"));
    }
}
