//! Child-process tool host connection over the rmcp SDK.
//!
//! ```ignore
//! let client = McpClient::spawn("toolbridge", ["host"]).await?;
//! let result = client.call_tool("echo", args).await;
//! let result: mcp::CallToolResult = convert(&result.map_err(|e| classify("echo", e))?)?;
//! ```

use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult, Tool},
    service::{RoleClient, RunningService, ServiceError},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::{Map, Value};
use tokio::process::Command;

use super::ToolError;

/// An MCP client connected to a server process.
pub struct McpClient {
    service: RunningService<RoleClient, ()>,
}

impl McpClient {
    /// Start `command` with `args` and complete the initialize handshake.
    ///
    /// Both a failed spawn and a failed handshake are channel errors.
    pub async fn spawn(
        command: impl AsRef<str>,
        args: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, ToolError> {
        let program = command.as_ref();
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();

        let transport =
            TokioChildProcess::new(Command::new(program).configure(|cmd| {
                cmd.args(&args);
            }))
            .map_err(|e| ToolError::Channel(format!("failed to spawn {program}: {e}")))?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| ToolError::Channel(format!("handshake with {program} failed: {e}")))?;

        Ok(Self { service })
    }

    /// Whether the service loop has stopped, e.g. because the process exited.
    pub fn is_closed(&self) -> bool {
        self.service.is_closed() || self.service.is_transport_closed()
    }

    /// The host's descriptors, in rmcp's shape.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, ServiceError> {
        let response = self.service.list_tools(Default::default()).await?;
        Ok(response.tools)
    }

    pub async fn call_tool(
        &self,
        name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, ServiceError> {
        let params = CallToolRequestParams {
            name: name.into().into(),
            arguments: Some(arguments),
            meta: None,
            task: None,
        };

        self.service.call_tool(params).await
    }
}

/// Map an rmcp failure for a call to `tool`.
///
/// JSON-RPC error responses carry the host's verdict; everything else means
/// the channel itself is gone.
pub(crate) fn classify(tool: &str, err: ServiceError) -> ToolError {
    match err {
        ServiceError::McpError(error) => {
            let message = error.message.to_string();
            match error.code.0 {
                mcp::codes::UNKNOWN_TOOL => ToolError::NotFound(tool.to_string()),
                mcp::codes::INVALID_PARAMS => ToolError::InvalidInput(
                    message
                        .strip_prefix("invalid arguments: ")
                        .unwrap_or(&message)
                        .to_string(),
                ),
                _ => ToolError::Execution(message),
            }
        }
        other => ToolError::Channel(other.to_string()),
    }
}

/// Re-shape an rmcp payload into the host's own wire type.
pub(crate) fn convert<T, U>(value: &T) -> Result<U, ToolError>
where
    T: serde::Serialize,
    U: serde::de::DeserializeOwned,
{
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|e| ToolError::Execution(format!("unexpected host payload: {e}")))
}
