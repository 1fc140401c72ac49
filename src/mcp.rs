//! Model Context Protocol server over newline-delimited JSON-RPC 2.0 on stdio.
//!
//! Supported methods are `initialize`, `ping`, `tools/list`, and `tools/call`. Tool execution
//! is delegated to a [`ToolHandler`].

mod server;
mod types;

pub use server::*;
pub use types::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`ToolHandler::call`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<CallToolResult, ToolError>> + 'a + Send>>;

/// Tool catalogue behind `tools/list` and `tools/call`.
pub trait ToolHandler
where
	Self: Send + Sync,
{
	/// Every tool definition, in listing order.
	fn tools(&self) -> Vec<McpTool>;

	/// Runs tool `name` with its arguments object.
	fn call<'a>(&'a self, name: &'a str, arguments: JsonValue) -> ToolFuture<'a>;
}

/// Why a tool call produced no result.
#[derive(Debug, ThisError)]
pub enum ToolError {
	/// No tool with this name.
	#[error("Unknown tool: {name}.")]
	UnknownTool {
		/// Requested tool name.
		name: String,
	},
	/// Arguments did not match the tool's schema.
	#[error("Invalid arguments: {message}.")]
	InvalidArguments {
		/// Deserialization failure, including the offending path.
		message: String,
	},
	/// The tool ran and failed.
	#[error(transparent)]
	Failed(#[from] Error),
}
