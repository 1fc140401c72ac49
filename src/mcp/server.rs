// std
use std::io;
// crates.io
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
// self
use crate::{
	_prelude::*,
	mcp::{
		CallToolParams, InitializeResult, JsonRpcError, JsonRpcMessage, JsonRpcResponse,
		ListToolsResult, PROTOCOL_VERSION, ServerCapabilities, ToolError, ToolHandler,
		Implementation,
	},
};

/// Name announced in `serverInfo`.
pub const SERVER_NAME: &str = "x-mcp-server";

/// Line-delimited JSON-RPC server dispatching `tools/*` to a [`ToolHandler`].
pub struct McpServer {
	info: Implementation,
	handler: Arc<dyn ToolHandler>,
}
impl McpServer {
	/// Creates a server that exposes `handler`'s tools.
	pub fn new(handler: Arc<dyn ToolHandler>) -> Self {
		Self {
			info: Implementation {
				name: SERVER_NAME.into(),
				version: env!("CARGO_PKG_VERSION").into(),
			},
			handler,
		}
	}

	/// Serves stdin/stdout until stdin closes.
	pub async fn run_stdio(&self) -> io::Result<()> {
		self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
	}

	/// Serves one message per line from `reader`, writing one response line per request.
	///
	/// Returns when `reader` reaches EOF.
	pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> io::Result<()>
	where
		R: AsyncBufRead + Unpin,
		W: AsyncWrite + Unpin,
	{
		let mut line = String::new();

		tracing::info!(server = %self.info.name, "MCP server listening on stdio");

		loop {
			line.clear();

			if reader.read_line(&mut line).await? == 0 {
				tracing::info!("stdin closed; stopping MCP server");

				return Ok(());
			}

			let message = line.trim();

			if message.is_empty() {
				continue;
			}

			let Some(response) = self.handle_message(message).await else {
				continue;
			};
			let mut encoded = serde_json::to_vec(&response).map_err(io::Error::other)?;

			encoded.push(b'\n');
			writer.write_all(&encoded).await?;
			writer.flush().await?;
		}
	}

	/// Handles one raw message; `None` for notifications.
	pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
		let value: JsonValue = match serde_json::from_str(raw) {
			Ok(value) => value,
			Err(e) => {
				tracing::warn!(error = %e, "unparsable JSON-RPC message");

				return Some(JsonRpcResponse::error(
					None,
					JsonRpcError::new(JsonRpcError::PARSE_ERROR, format!("Parse error: {e}")),
				));
			},
		};
		let message: JsonRpcMessage = match serde_json::from_value(value.clone()) {
			Ok(message) => message,
			Err(e) => {
				let id = value.get("id").cloned().and_then(|id| serde_json::from_value(id).ok());

				return Some(JsonRpcResponse::error(
					id,
					JsonRpcError::new(JsonRpcError::INVALID_REQUEST, format!("Invalid request: {e}")),
				));
			},
		};

		if message.is_notification() {
			tracing::debug!(method = %message.method, "notification received");

			return None;
		}

		tracing::debug!(method = %message.method, "request received");

		let id = message.id.clone();

		Some(match self.dispatch(message).await {
			Ok(result) => JsonRpcResponse::success(id, result),
			Err(error) => JsonRpcResponse::error(id, error),
		})
	}

	async fn dispatch(&self, message: JsonRpcMessage) -> Result<JsonValue, JsonRpcError> {
		match message.method.as_str() {
			"initialize" => to_value(InitializeResult {
				protocol_version: PROTOCOL_VERSION.into(),
				capabilities: ServerCapabilities::default(),
				server_info: self.info.clone(),
			}),
			"ping" => Ok(json!({})),
			"tools/list" => to_value(ListToolsResult { tools: self.handler.tools() }),
			"tools/call" => {
				let params: CallToolParams = message
					.params
					.ok_or_else(|| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "Missing params"))
					.and_then(|params| {
						serde_json::from_value(params).map_err(|e| {
							JsonRpcError::new(JsonRpcError::INVALID_PARAMS, format!("Invalid params: {e}"))
						})
					})?;
				let arguments = params.arguments.unwrap_or_else(|| json!({}));

				tracing::info!(tool = %params.name, "calling tool");

				match self.handler.call(&params.name, arguments).await {
					Ok(result) => to_value(result),
					Err(e) => {
						tracing::warn!(tool = %params.name, error = %e, "tool call failed");

						Err(e.into_rpc_error())
					},
				}
			},
			method => Err(JsonRpcError::new(
				JsonRpcError::METHOD_NOT_FOUND,
				format!("Method not found: {method}"),
			)),
		}
	}
}
impl Debug for McpServer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("McpServer").field("info", &self.info).finish()
	}
}

impl ToolError {
	/// Maps the failure onto its JSON-RPC error object.
	pub fn into_rpc_error(self) -> JsonRpcError {
		match self {
			ToolError::UnknownTool { name } =>
				JsonRpcError::new(JsonRpcError::METHOD_NOT_FOUND, format!("Unknown tool: {name}")),
			ToolError::InvalidArguments { message } =>
				JsonRpcError::new(JsonRpcError::INVALID_PARAMS, format!("Invalid arguments: {message}")),
			ToolError::Failed(e @ Error::InvalidIdentifier { .. }) =>
				JsonRpcError::new(JsonRpcError::INVALID_PARAMS, format!("Invalid arguments: {e}")),
			ToolError::Failed(Error::Api(api)) => {
				let message = format!("Tool execution failed: {api}");

				JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, message)
					.with_data(json!({ "status": api.status, "detail": api.detail }))
			},
			ToolError::Failed(e) =>
				JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, format!("Tool execution failed: {e}")),
		}
	}
}

fn to_value(result: impl Serialize) -> Result<JsonValue, JsonRpcError> {
	serde_json::to_value(result)
		.map_err(|e| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, format!("Serialization failed: {e}")))
}
