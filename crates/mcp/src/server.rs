//! Line-delimited JSON-RPC serving loop for the tool host.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, ServerCapabilities, ServerInfo, codes,
};

/// Maximum accepted frame size (1MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// A tool host serving one [`Catalog`].
///
/// Requests are handled one at a time in the order they arrive; there is no
/// internal parallelism.
pub struct Server {
    catalog: Catalog,
    info: ServerInfo,
}

impl Server {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            info: ServerInfo {
                name: "toolbridge-host".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve frames read from `reader`, writing responses to `writer`.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(name = %self.info.name, tools = self.catalog.len(), "tool host ready");

        let mut buf = Vec::new();
        loop {
            let response = match read_frame(&mut reader, &mut buf).await? {
                Frame::Eof => {
                    info!("input closed, shutting down");
                    return Ok(());
                }
                Frame::Oversize(size) => {
                    let err = Error::FrameTooLarge {
                        size,
                        max: MAX_FRAME_SIZE,
                    };
                    warn!("{err}");
                    Some(JsonRpcResponse::failure(
                        None,
                        JsonRpcError::new(codes::INVALID_REQUEST, err.to_string()),
                    ))
                }
                Frame::Line => match std::str::from_utf8(&buf) {
                    Ok(text) => {
                        let frame = text.trim();
                        if frame.is_empty() {
                            continue;
                        }
                        self.handle_frame(frame)
                    }
                    Err(e) => {
                        warn!(error = %e, "frame is not UTF-8");
                        Some(JsonRpcResponse::failure(
                            None,
                            JsonRpcError::new(codes::PARSE_ERROR, format!("parse error: {e}")),
                        ))
                    }
                },
            };

            if let Some(response) = response {
                let json = serde_json::to_string(&response)?;
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
    }

    /// Handle one raw frame. Notifications produce no response.
    pub fn handle_frame(&self, frame: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(frame) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "unparseable frame");
                return Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(codes::PARSE_ERROR, format!("parse error: {e}")),
                ));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }

        let id = request.id.clone();
        Some(match self.dispatch(&request) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(method = %request.method, %error, "request failed");
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    fn dispatch(&self, request: &JsonRpcRequest) -> std::result::Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => {
                let params: InitializeParams = request.params().unwrap_or_default();
                if let Some(client) = &params.client_info {
                    info!(client = %client.name, "client connected");
                }
                to_value(InitializeResult {
                    protocol_version: params
                        .protocol_version
                        .unwrap_or_else(|| PROTOCOL_VERSION.to_string()),
                    capabilities: ServerCapabilities::default(),
                    server_info: self.info.clone(),
                })
            }
            "ping" => Ok(Value::Object(Default::default())),
            "tools/list" => to_value(ListToolsResult {
                tools: self.catalog.list(),
            }),
            "tools/call" => {
                let params: CallToolParams = request.params()?;
                debug!(tool = %params.name, "tools/call");
                let result = self.catalog.call(&params.name, params.arguments)?;
                to_value(result)
            }
            other => Err(JsonRpcError::new(
                codes::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            )),
        }
    }
}

enum Frame {
    Eof,
    /// A complete line is in the buffer.
    Line,
    /// The line exceeded [`MAX_FRAME_SIZE`] and was discarded.
    Oversize(usize),
}

/// Read one newline-terminated frame into `buf`.
///
/// At most `MAX_FRAME_SIZE + 1` bytes are buffered; the rest of an oversized
/// line is consumed and dropped.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut seen = 0usize;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(match seen {
                0 => Frame::Eof,
                n if n > MAX_FRAME_SIZE => Frame::Oversize(n),
                _ => Frame::Line,
            });
        }

        let (len, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        let room = (MAX_FRAME_SIZE + 1).saturating_sub(buf.len());
        buf.extend_from_slice(&available[..len.min(room)]);
        reader.consume(len);
        seen += len;

        if done {
            return Ok(if seen > MAX_FRAME_SIZE {
                Frame::Oversize(seen)
            } else {
                Frame::Line
            });
        }
    }
}

fn to_value(value: impl serde::Serialize) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(codes::INTERNAL_ERROR, format!("serialize result: {e}")))
}
