//! Classification of token endpoint failures.
//!
//! Implementations map raw OAuth error fields and HTTP statuses into the crate error
//! taxonomy without tying the exchanger to any particular HTTP client.

// self
use crate::_prelude::*;

/// Grants issued against the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantType {
	/// Authorization code + PKCE verifier exchange.
	AuthorizationCode,
	/// Refresh token rotation.
	RefreshToken,
}
impl GrantType {
	/// Returns the `grant_type` form value.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Strategy hook that classifies token endpoint failures.
pub trait ProviderStrategy: Send + Sync {
	/// Maps low-level HTTP/JSON errors into the crate taxonomy for a token request.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Provider rejected the authorization grant (bad code/refresh token).
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes exceed what the client may obtain.
	InsufficientScope,
	/// Failure is temporary.
	Transient,
}

/// Primitive data describing a failed token request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant type associated with the failing request.
	pub grant_type: GrantType,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Indicates whether the failure originated from the network/transport layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	/// Creates a new context scoped to the provided grant type.
	pub fn new(grant_type: GrantType) -> Self {
		Self {
			grant_type,
			http_status: None,
			oauth_error: None,
			error_description: None,
			network_error: false,
		}
	}

	/// Adds an HTTP status code (e.g., 400, 401, 500).
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code string returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Marks the failure as a transport-level one.
	pub fn with_network_error(mut self) -> Self {
		self.network_error = true;

		self
	}
}

/// Default strategy applying RFC 6749 §5.2 error codes, then the HTTP status.
///
/// X answers a bad or reused refresh token with `invalid_request` and a 400, which the
/// status fallback turns into [`ProviderErrorKind::InvalidGrant`].
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		ctx.oauth_error
			.as_deref()
			.and_then(classify_oauth_error)
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_oauth_error(value: &str) -> Option<ProviderErrorKind> {
	match value.to_ascii_lowercase().as_str() {
		"invalid_grant" | "access_denied" => Some(ProviderErrorKind::InvalidGrant),
		"invalid_client" | "unauthorized_client" => Some(ProviderErrorKind::InvalidClient),
		"invalid_scope" | "insufficient_scope" => Some(ProviderErrorKind::InsufficientScope),
		"temporarily_unavailable" | "server_error" => Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}
