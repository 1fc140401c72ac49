mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::Duration;
// self
use common::*;
use x_mcp_broker::{
	api::XApi,
	client::{AuthenticatedClient, ReqwestTransport},
	http::ReqwestHttpClient,
	mcp::McpServer,
	store::MemoryStore,
	tools::XTools,
};

fn server(mock: &MockServer) -> McpServer {
	let descriptor = descriptor(mock);
	let transport = ReqwestTransport::new(
		descriptor.clone(),
		ReqwestHttpClient::new().expect("HTTP client should build."),
	);
	let tokens = token_set("A1", Some("R1"), Duration::ZERO, Duration::hours(2));
	let client = AuthenticatedClient::new(tokens, Arc::new(transport), Arc::new(MemoryStore::default()))
		.with_exchanger(Arc::new(exchanger(&descriptor)));

	McpServer::new(Arc::new(XTools::new(Arc::new(XApi::new(Arc::new(client))))))
}

/// Feeds newline-delimited requests and returns every response line as JSON.
async fn exchange(server: &McpServer, requests: &[Value]) -> Vec<Value> {
	let input = requests.iter().map(|r| format!("{r}\n")).collect::<String>();
	let mut output = Vec::new();

	server.serve(input.as_bytes(), &mut output).await.expect("Session should end cleanly.");

	String::from_utf8(output)
		.expect("Responses should be UTF-8.")
		.lines()
		.map(|line| serde_json::from_str(line).expect("Every line should be one JSON response."))
		.collect()
}

#[tokio::test]
async fn session_lists_tools_and_fetches_the_profile() {
	let mock = MockServer::start_async().await;
	let profile = mock
		.mock_async(|when, then| {
			when.method(GET).path("/2/users/me").header("authorization", "Bearer A1");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"data":{"id":"42","username":"ferris","name":"Ferris"}}"#);
		})
		.await;
	let server = server(&mock);
	let responses = exchange(
		&server,
		&[
			json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
			json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
			json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
			json!({
				"jsonrpc": "2.0",
				"id": 3,
				"method": "tools/call",
				"params": { "name": "get_profile", "arguments": {} }
			}),
		],
	)
	.await;

	assert_eq!(responses.len(), 3, "Notifications get no response.");
	assert_eq!(responses[0]["id"], 1);
	assert_eq!(responses[0]["result"]["serverInfo"]["name"], "x-mcp-server");
	assert_eq!(responses[1]["result"]["tools"].as_array().map(Vec::len), Some(18));

	let text = responses[2]["result"]["content"][0]["text"]
		.as_str()
		.expect("Tool result should be text content.");
	let body: Value = serde_json::from_str(text).expect("Profile text should be JSON.");

	assert_eq!(body["username"], "ferris");
	profile.assert_calls_async(1).await;
}

#[tokio::test]
async fn api_failure_becomes_an_internal_error_with_detail() {
	let mock = MockServer::start_async().await;
	let _forbidden = mock
		.mock_async(|when, then| {
			when.method(POST).path("/2/tweets");
			then.status(403)
				.header("content-type", "application/json")
				.body(r#"{"title":"Forbidden","detail":"Not permitted."}"#);
		})
		.await;
	let token = mock
		.mock_async(|when, then| {
			when.method(POST).path("/2/oauth2/token");
			then.status(200);
		})
		.await;
	let server = server(&mock);
	let responses = exchange(
		&server,
		&[json!({
			"jsonrpc": "2.0",
			"id": "post-1",
			"method": "tools/call",
			"params": { "name": "create_tweet", "arguments": { "text": "hello" } }
		})],
	)
	.await;
	let error = &responses[0]["error"];

	assert_eq!(responses[0]["id"], "post-1");
	assert_eq!(error["code"], -32603);
	assert!(error["message"].as_str().is_some_and(|m| m.starts_with("Tool execution failed")));
	assert_eq!(error["data"]["status"], 403);
	assert_eq!(error["data"]["detail"]["title"], "Forbidden");
	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn malformed_lines_do_not_end_the_session() {
	let mock = MockServer::start_async().await;
	let server = server(&mock);
	let mut output = Vec::new();
	let input = "{not json\n\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n";

	server.serve(input.as_bytes(), &mut output).await.expect("Session should end cleanly.");

	let responses: Vec<Value> = String::from_utf8(output)
		.expect("Responses should be UTF-8.")
		.lines()
		.map(|line| serde_json::from_str(line).expect("Every line should be one JSON response."))
		.collect();

	assert_eq!(responses.len(), 2);
	assert_eq!(responses[0]["error"]["code"], -32700);
	assert_eq!(responses[0]["id"], Value::Null);
	assert_eq!(responses[1]["id"], 7);
	assert_eq!(responses[1]["result"], json!({}));
}
