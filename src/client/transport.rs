//! Request/response model for the X resource API and the transport seam beneath the
//! authenticated client.

// crates.io
use reqwest::{
	Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ApiError, ConfigError, TransportError},
	http::ReqwestHttpClient,
	provider::ProviderDescriptor,
};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// HTTP verbs used against the X API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiMethod {
	/// `GET`.
	Get,
	/// `POST` with a JSON body.
	Post,
	/// `DELETE`.
	Delete,
}
impl ApiMethod {
	fn as_reqwest(self) -> Method {
		match self {
			ApiMethod::Get => Method::GET,
			ApiMethod::Post => Method::POST,
			ApiMethod::Delete => Method::DELETE,
		}
	}
}

/// One outbound API call, relative to the API root.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: ApiMethod,
	/// Path below the API root, e.g. `users/me`.
	pub path: String,
	/// Query parameters in insertion order.
	pub query: Vec<(String, String)>,
	/// JSON body for `POST` requests.
	pub body: Option<JsonValue>,
}
impl ApiRequest {
	/// `GET path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self { method: ApiMethod::Get, path: path.into(), query: Vec::new(), body: None }
	}

	/// `POST path` with a JSON body.
	pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
		Self { method: ApiMethod::Post, path: path.into(), query: Vec::new(), body: Some(body) }
	}

	/// `DELETE path`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self { method: ApiMethod::Delete, path: path.into(), query: Vec::new(), body: None }
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}
}

/// Raw API answer; the body is JSON when the server sent JSON and a string otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Decoded body (`null` when empty).
	pub body: JsonValue,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Converts non-2xx responses into [`ApiError`].
	pub fn into_result(self) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(ApiError { status: self.status, detail: self.body }.into())
		}
	}
}

/// Sends one request with the supplied bearer token. Implementations must not retry or
/// refresh; that is the authenticated client's job.
pub trait ApiTransport
where
	Self: Send + Sync,
{
	/// Executes `request`, returning the response for every HTTP status.
	fn send<'a>(&'a self, request: &'a ApiRequest, bearer: &'a TokenSecret)
	-> TransportFuture<'a>;
}

/// Reqwest-backed [`ApiTransport`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	http_client: ReqwestHttpClient,
	descriptor: ProviderDescriptor,
}
impl ReqwestTransport {
	/// Creates a transport rooted at the descriptor's API base.
	pub fn new(descriptor: ProviderDescriptor, http_client: ReqwestHttpClient) -> Self {
		Self { http_client, descriptor }
	}
}
impl ApiTransport for ReqwestTransport {
	fn send<'a>(
		&'a self,
		request: &'a ApiRequest,
		bearer: &'a TokenSecret,
	) -> TransportFuture<'a> {
		Box::pin(async move {
			let mut url = self
				.descriptor
				.api_url(&request.path)
				.map_err(|source| ConfigError::InvalidDescriptor { source })?;

			if !request.query.is_empty() {
				url.query_pairs_mut().extend_pairs(request.query.iter());
			}

			let mut builder = self
				.http_client
				.request(request.method.as_reqwest(), url)
				.header(AUTHORIZATION, bearer.bearer())
				.header(ACCEPT, "application/json");

			if let Some(body) = &request.body {
				let payload = serde_json::to_vec(body).map_err(|e| TransportError::Io(e.into()))?;

				builder = builder.header(CONTENT_TYPE, "application/json").body(payload);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let bytes = response.bytes().await.map_err(TransportError::from)?;

			tracing::debug!(method = ?request.method, path = %request.path, status, "X API responded");

			Ok(ApiResponse { status, body: decode_body(&bytes) })
		})
	}
}

fn decode_body(bytes: &[u8]) -> JsonValue {
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return JsonValue::Null;
	}

	serde_json::from_slice(bytes)
		.unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(bytes).into_owned()))
}
