//! In-process tool host.

use super::{ToolArguments, ToolError, ToolHostClient};
use mcp::{CallToolResult, Catalog, Tool};

/// Serves a [`Catalog`] directly, without a child process.
#[derive(Debug)]
pub struct LocalToolHost {
    catalog: Catalog,
}

impl LocalToolHost {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl Default for LocalToolHost {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}

impl ToolHostClient for LocalToolHost {
    async fn connect(&self) -> Result<(), ToolError> {
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        true
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, ToolError> {
        Ok(self.catalog.list())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<CallToolResult, ToolError> {
        Ok(self.catalog.call(name, Some(arguments.into_value()))?)
    }
}
