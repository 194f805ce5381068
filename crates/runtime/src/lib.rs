//! Toolbridge runtime: model backends, tool host clients, and chat exchanges.
//!
//! The runtime sits between an LLM and a tool host. It is organized around
//! these concepts:
//!
//! - **Backend**: a trait abstracting LLM providers (OpenAI chat completions).
//! - **ToolHostClient**: a trait abstracting the tool host, reached over an
//!   MCP child process or served in-process.
//! - **Exchange**: one chat request, with at most one round of tool calls.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{Exchange, HostCommand, McpToolHost, OpenAiBackend};
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = OpenAiBackend::builder(std::env::var("OPENAI_API_KEY").ok(), "gpt-4o-mini").build()?;
//! let host = McpToolHost::new(HostCommand {
//!     command: "toolbridge".into(),
//!     args: vec!["host".into()],
//! });
//!
//! let outcome = Exchange::new(&backend, &host).run("Please echo 'hi'", &[]).await?;
//! println!("{}", outcome.content);
//! # Ok(())
//! # }
//! ```

mod error;
mod exchange;
pub mod model;
pub mod providers;
pub mod tools;

pub use error::{Error, Result};
pub use exchange::{
    ChatOutcome, DEFAULT_SYSTEM_PROMPT, Exchange, HistoryRole, HistoryTurn, ToolCallRecord,
};
pub use model::{Backend, Message, ModelError, Role, ToolChoice, ToolSpec};
pub use providers::{OpenAiBackend, OpenAiBackendBuilder};
pub use tools::{HostCommand, LocalToolHost, McpToolHost, ToolArguments, ToolError, ToolHostClient};
