//! MCP-backed tool host.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mcp::{CallToolResult, Tool};
use tracing::{info, warn};

use super::mcp_client::{classify, convert};
use super::{McpClient, ToolArguments, ToolError, ToolHostClient};

/// Default timeout for a single tool host operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// How to start the tool host process.
#[derive(Debug, Clone)]
pub struct HostCommand {
    pub command: String,
    pub args: Vec<String>,
}

/// Tool host reached over a child process's stdio.
///
/// The process is spawned on first use and shared by every caller. When the
/// channel breaks or the process exits, the connection is dropped and the
/// next operation spawns a fresh process. Starting the process and its
/// handshake are bounded by the same timeout as every other operation.
pub struct McpToolHost {
    command: HostCommand,
    timeout: Duration,
    /// Never held across an await.
    client: Mutex<Option<Arc<McpClient>>>,
    /// Serializes spawns so concurrent callers share one process.
    spawning: tokio::sync::Mutex<()>,
}

impl McpToolHost {
    pub fn new(command: HostCommand) -> Self {
        Self {
            command,
            timeout: DEFAULT_TIMEOUT,
            client: Mutex::new(None),
            spawning: tokio::sync::Mutex::new(()),
        }
    }

    /// Bound every spawn, list, and call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<McpClient>>> {
        self.client.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The live connection, if any. A closed one is forgotten.
    fn current(&self) -> Option<Arc<McpClient>> {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|c| c.is_closed()) {
            warn!("tool host exited, will reconnect on next use");
            *slot = None;
        }
        slot.clone()
    }

    async fn client(&self) -> Result<Arc<McpClient>, ToolError> {
        if let Some(client) = self.current() {
            return Ok(client);
        }

        let _spawning = self.spawning.lock().await;
        if let Some(client) = self.current() {
            return Ok(client);
        }

        let HostCommand { command, args } = &self.command;
        info!(%command, ?args, "starting tool host");
        let spawn = McpClient::spawn(command, args);
        let client = match tokio::time::timeout(self.timeout, spawn).await {
            Ok(spawned) => Arc::new(spawned?),
            Err(_) => {
                warn!(%command, timeout = ?self.timeout, "tool host did not finish its handshake");
                return Err(self.timeout_error());
            }
        };
        *self.slot() = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Forget `broken` unless another caller already replaced it.
    fn disconnect(&self, broken: &Arc<McpClient>) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, broken)) {
            warn!("tool host channel lost, will reconnect on next use");
            *slot = None;
        }
    }

    fn settle<T>(
        &self,
        client: &Arc<McpClient>,
        result: Result<T, ToolError>,
    ) -> Result<T, ToolError> {
        if matches!(&result, Err(err) if err.is_channel()) {
            self.disconnect(client);
        }
        result
    }

    fn timeout_error(&self) -> ToolError {
        ToolError::Timeout(self.timeout.as_millis() as u64)
    }
}

impl ToolHostClient for McpToolHost {
    async fn connect(&self) -> Result<(), ToolError> {
        self.client().await.map(|_| ())
    }

    /// Never waits on a spawn in progress; a host that is still starting
    /// reports `false`.
    async fn is_connected(&self) -> bool {
        self.current().is_some()
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, ToolError> {
        let client = self.client().await?;
        let result: Result<Vec<Tool>, ToolError> =
            match tokio::time::timeout(self.timeout, client.list_tools()).await {
                Ok(Ok(tools)) => tools.iter().map(convert).collect(),
                Ok(Err(e)) => Err(classify("tools/list", e)),
                Err(_) => Err(self.timeout_error()),
            };
        self.settle(&client, result)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, ToolError> {
        let client = self.client().await?;
        let call = client.call_tool(name, arguments.0);
        let result: Result<CallToolResult, ToolError> =
            match tokio::time::timeout(self.timeout, call).await {
                Ok(Ok(result)) => convert(&result),
                Ok(Err(e)) => Err(classify(name, e)),
                Err(_) => Err(self.timeout_error()),
            };
        self.settle(&client, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::{ErrorCode, ErrorData};
    use rmcp::service::ServiceError;
    use std::path::{Path, PathBuf};

    /// A shell host that logs each start to `$1`, answers the handshake,
    /// then runs `body` against the remaining frames.
    fn scripted_host(log: &Path, body: &str) -> HostCommand {
        let script = format!(
            r#"echo start >> "$1"
read -r line
id=$(printf '%s' "$line" | sed 's/.*"id":\([0-9]*\).*/\1/')
printf '{{"jsonrpc":"2.0","id":%s,"result":{{"protocolVersion":"2025-03-26","capabilities":{{"tools":{{}}}},"serverInfo":{{"name":"scripted","version":"0"}}}}}}\n' "$id"
read -r _
{body}"#
        );
        HostCommand {
            command: "sh".into(),
            args: vec!["-c".into(), script, "sh".into(), log.display().to_string()],
        }
    }

    fn start_log() -> PathBuf {
        std::env::temp_dir().join(format!("toolbridge-host-{}.log", uuid::Uuid::new_v4()))
    }

    fn starts(log: &Path) -> usize {
        std::fs::read_to_string(log)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn silent_host_times_out_and_health_does_not_wait() {
        let host = McpToolHost::new(HostCommand {
            command: "sleep".into(),
            args: vec!["30".into()],
        })
        .with_timeout(Duration::from_millis(300));

        let (listed, connected) = tokio::join!(
            tokio::time::timeout(Duration::from_secs(5), host.list_tools()),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                tokio::time::timeout(Duration::from_secs(1), host.is_connected()).await
            }
        );

        assert_eq!(connected, Ok(false));
        assert_eq!(listed.unwrap().unwrap_err(), ToolError::Timeout(300));
        assert!(!host.is_connected().await);
    }

    #[tokio::test]
    async fn dropped_channel_reconnects_on_next_use() {
        let log = start_log();
        // exits right after the handshake
        let host = McpToolHost::new(scripted_host(&log, "exit 0"))
            .with_timeout(Duration::from_secs(10));

        host.connect().await.unwrap();
        let before = starts(&log);
        assert_eq!(before, 1);

        let err = host.list_tools().await.unwrap_err();
        assert!(err.is_channel(), "{err}");
        assert!(!host.is_connected().await);

        host.connect().await.unwrap();
        assert!(starts(&log) > before);

        let _ = std::fs::remove_file(&log);
    }

    #[tokio::test]
    async fn host_error_replies_keep_the_connection() {
        let log = start_log();
        let host = McpToolHost::new(scripted_host(
            &log,
            r#"while read -r line; do
  case "$line" in
    *'"id":'*)
      id=$(printf '%s' "$line" | sed 's/.*"id":\([0-9]*\).*/\1/')
      printf '{"jsonrpc":"2.0","id":%s,"error":{"code":-32001,"message":"unknown tool: shout"}}\n' "$id"
      ;;
  esac
done"#,
        ))
        .with_timeout(Duration::from_secs(10));

        for _ in 0..2 {
            let err = host
                .call_tool("shout", ToolArguments::default())
                .await
                .unwrap_err();
            assert_eq!(err, ToolError::NotFound("shout".into()));
            assert!(host.is_connected().await);
        }
        assert_eq!(starts(&log), 1);

        let _ = std::fs::remove_file(&log);
    }

    #[tokio::test]
    async fn spawn_failure_is_a_channel_error_and_stays_disconnected() {
        let host = McpToolHost::new(HostCommand {
            command: "/nonexistent/toolbridge-host".into(),
            args: Vec::new(),
        });

        let err = host.list_tools().await.unwrap_err();
        assert!(err.is_channel(), "{err}");
        assert!(!host.is_connected().await);

        // every later operation retries the spawn rather than reusing a dead handle
        let err = host
            .call_tool("echo", ToolArguments::default())
            .await
            .unwrap_err();
        assert!(err.is_channel(), "{err}");
    }

    #[test]
    fn host_errors_keep_their_meaning() {
        let unknown = ServiceError::McpError(ErrorData::new(
            ErrorCode(mcp::codes::UNKNOWN_TOOL),
            "unknown tool: shout",
            None,
        ));
        assert_eq!(classify("shout", unknown), ToolError::NotFound("shout".into()));

        let invalid = ServiceError::McpError(ErrorData::new(
            ErrorCode(mcp::codes::INVALID_PARAMS),
            "invalid arguments: missing required field `message`",
            None,
        ));
        assert_eq!(
            classify("echo", invalid),
            ToolError::InvalidInput("missing required field `message`".into())
        );
    }

    #[test]
    fn rmcp_results_convert_to_host_types() {
        let result = rmcp::model::CallToolResult::success(vec![rmcp::model::Content::text(
            "Echo: hi",
        )]);
        let converted: CallToolResult = convert(&result).unwrap();
        assert_eq!(converted.first_text(), Some("Echo: hi"));
    }
}
