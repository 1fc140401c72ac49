//! JSON-RPC 2.0 envelopes and the MCP payloads the server speaks.

// self
use crate::_prelude::*;

/// JSON-RPC protocol version tag.
pub const JSONRPC_VERSION: &str = "2.0";
/// MCP protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC request id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
	/// Numeric id.
	Number(i64),
	/// String id.
	String(String),
}
impl From<i64> for RequestId {
	fn from(n: i64) -> Self {
		Self::Number(n)
	}
}
impl From<&str> for RequestId {
	fn from(s: &str) -> Self {
		Self::String(s.to_owned())
	}
}

/// Inbound request or notification; notifications carry no id.
#[derive(Clone, Debug, Deserialize)]
pub struct JsonRpcMessage {
	/// Protocol version, expected to be `2.0`.
	#[serde(default)]
	pub jsonrpc: Option<String>,
	/// Request id; absent for notifications.
	#[serde(default)]
	pub id: Option<RequestId>,
	/// Method name.
	pub method: String,
	/// Method parameters.
	#[serde(default)]
	pub params: Option<JsonValue>,
}
impl JsonRpcMessage {
	/// Returns `true` when no response is expected.
	pub fn is_notification(&self) -> bool {
		self.id.is_none()
	}
}

/// Outbound response. `id` serializes as `null` when the request id could not be read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
	/// Protocol version.
	pub jsonrpc: String,
	/// Id of the request being answered.
	pub id: Option<RequestId>,
	/// Result on success.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<JsonValue>,
	/// Error on failure.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<JsonRpcError>,
}
impl JsonRpcResponse {
	/// Success response carrying `result`.
	pub fn success(id: Option<RequestId>, result: impl Serialize) -> Self {
		match serde_json::to_value(result) {
			Ok(result) =>
				Self { jsonrpc: JSONRPC_VERSION.into(), id, result: Some(result), error: None },
			Err(e) => Self::error(
				id,
				JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, format!("Serialization failed: {e}")),
			),
		}
	}

	/// Error response.
	pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
		Self { jsonrpc: JSONRPC_VERSION.into(), id, result: None, error: Some(error) }
	}
}

/// JSON-RPC error object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
	/// Error code.
	pub code: i32,
	/// Error message.
	pub message: String,
	/// Structured context.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<JsonValue>,
}
impl JsonRpcError {
	/// Invalid JSON.
	pub const PARSE_ERROR: i32 = -32700;
	/// Well-formed JSON that is not a request.
	pub const INVALID_REQUEST: i32 = -32600;
	/// Unknown method or tool.
	pub const METHOD_NOT_FOUND: i32 = -32601;
	/// Bad parameters.
	pub const INVALID_PARAMS: i32 = -32602;
	/// Handler failure.
	pub const INTERNAL_ERROR: i32 = -32603;

	/// Error without data.
	pub fn new(code: i32, message: impl Into<String>) -> Self {
		Self { code, message: message.into(), data: None }
	}

	/// Attaches structured data.
	pub fn with_data(mut self, data: JsonValue) -> Self {
		self.data = Some(data);

		self
	}
}

/// Name and version pair identifying a peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
	/// Peer name.
	pub name: String,
	/// Peer version.
	pub version: String,
}

/// `initialize` result.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
	/// Negotiated protocol revision.
	pub protocol_version: String,
	/// Advertised capabilities.
	pub capabilities: ServerCapabilities,
	/// Server identity.
	pub server_info: Implementation,
}

/// Capabilities advertised by the server; only tools are offered.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
	/// Tool support.
	pub tools: ToolsCapability,
}

/// Tool capability flags.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
	/// Whether `notifications/tools/list_changed` is ever sent.
	pub list_changed: bool,
}

/// Tool definition returned by `tools/list`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
	/// Tool name.
	pub name: String,
	/// Human-readable purpose.
	pub description: String,
	/// JSON Schema for the arguments object.
	pub input_schema: JsonValue,
}
impl McpTool {
	/// Creates a tool definition.
	pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: JsonValue) -> Self {
		Self { name: name.into(), description: description.into(), input_schema }
	}
}

/// `tools/list` result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListToolsResult {
	/// Every available tool.
	pub tools: Vec<McpTool>,
}

/// `tools/call` parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct CallToolParams {
	/// Tool name.
	pub name: String,
	/// Tool arguments; missing means `{}`.
	#[serde(default)]
	pub arguments: Option<JsonValue>,
}

/// `tools/call` result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
	/// Result content blocks.
	pub content: Vec<ToolResultContent>,
	/// Set when the tool reports a soft failure.
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub is_error: bool,
}
impl CallToolResult {
	/// Single text block result.
	pub fn text(text: impl Into<String>) -> Self {
		Self { content: vec![ToolResultContent::Text { text: text.into() }], is_error: false }
	}

	/// Pretty-printed JSON result.
	pub fn json(value: &JsonValue) -> Self {
		Self::text(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
	}

	/// Concatenated text of every block.
	pub fn text_content(&self) -> String {
		self.content
			.iter()
			.map(|block| match block {
				ToolResultContent::Text { text } => text.as_str(),
			})
			.collect::<Vec<_>>()
			.join("\n")
	}
}

/// Tool result content block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ToolResultContent {
	/// Plain text.
	Text {
		/// Text value.
		text: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn notifications_have_no_id() {
		let message: JsonRpcMessage =
			serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
				.expect("Notification should parse.");

		assert!(message.is_notification());

		let message: JsonRpcMessage =
			serde_json::from_str(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#)
				.expect("Request should parse.");

		assert_eq!(message.id, Some(RequestId::from("a")));
	}

	#[test]
	fn responses_serialize_in_wire_shape() {
		let ok = serde_json::to_value(JsonRpcResponse::success(Some(1.into()), json!({})))
			.expect("Response should serialize.");

		assert_eq!(ok, json!({ "jsonrpc": "2.0", "id": 1, "result": {} }));

		let err = serde_json::to_value(JsonRpcResponse::error(
			None,
			JsonRpcError::new(JsonRpcError::PARSE_ERROR, "Parse error"),
		))
		.expect("Response should serialize.");

		assert_eq!(
			err,
			json!({ "jsonrpc": "2.0", "id": null, "error": { "code": -32700, "message": "Parse error" } })
		);
	}

	#[test]
	fn tool_results_use_text_blocks() {
		let value = serde_json::to_value(CallToolResult::text("done"))
			.expect("Tool result should serialize.");

		assert_eq!(value, json!({ "content": [{ "type": "text", "text": "done" }] }));
	}
}
