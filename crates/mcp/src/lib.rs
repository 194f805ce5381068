//! MCP (Model Context Protocol) tool host.
//!
//! This crate advertises a fixed catalog of schema-described tools and
//! executes them on request, speaking newline-delimited JSON-RPC 2.0 over
//! stdio.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Catalog, Server};
//!
//! # async fn example() -> mcp::Result<()> {
//! let server = Server::new(Catalog::builtin());
//! server.serve_stdio().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The catalog can also be used directly, without a transport:
//!
//! ```
//! use mcp::Catalog;
//! use serde_json::json;
//!
//! let catalog = Catalog::builtin();
//! let result = catalog.call("echo", Some(json!({ "message": "hi" }))).unwrap();
//! assert_eq!(result.first_text(), Some("Echo: hi"));
//! ```

mod catalog;
mod error;
mod protocol;
pub mod schema;
mod server;

pub use catalog::{Capability, Catalog, ECHO_PREFIX, Echo};
pub use error::{CallError, Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, ClientInfo, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, RequestId,
    ServerCapabilities, ServerInfo, Tool, ToolContent, ToolsCapability, codes,
};
pub use server::{MAX_FRAME_SIZE, Server};
