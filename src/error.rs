//! Crate-level error types shared across flows, the API client, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; safe to retry later.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// X API answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Search query could not be assembled.
	#[error(transparent)]
	Query(#[from] crate::api::QueryError),
	/// A tweet, user, or list identifier is not a single path segment.
	#[error("Invalid {name}: {value:?}.")]
	InvalidIdentifier {
		/// Argument the identifier came from.
		name: &'static str,
		/// Rejected value.
		value: String,
	},

	/// Granted token lacks the scopes required by the call.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// The resource owner declined the authorization request.
	#[error("Authorization was denied: {error}{}.", describe(.description))]
	AuthorizationDenied {
		/// `error` query parameter from the redirect.
		error: String,
		/// Optional `error_description` query parameter.
		description: Option<String>,
	},
	/// The redirect carried a state that does not match the pending session.
	#[error("Callback state does not match the authorization session.")]
	StateMismatch,
	/// The redirect carried a matching state but no authorization code.
	#[error("Callback did not include an authorization code.")]
	MissingCode,
	/// The redirect's query string could not be decoded (e.g., a repeated parameter).
	#[error("Callback query could not be decoded: {reason}.")]
	MalformedCallback {
		/// Decoder message.
		reason: String,
	},
	/// No redirect arrived before the deadline.
	#[error("Timed out after {seconds}s waiting for the authorization callback.")]
	AuthorizationTimeout {
		/// Configured wait, in seconds.
		seconds: u64,
	},
	/// The local redirect listener could not be started or failed while serving.
	#[error("Callback listener failed.")]
	Listener(#[source] std::io::Error),
}
impl Error {
	/// Returns `true` for failures raised by the token endpoint exchange.
	pub fn is_exchange_failure(&self) -> bool {
		matches!(
			self,
			Self::InvalidGrant { .. }
				| Self::InvalidClient { .. }
				| Self::InsufficientScope { .. }
				| Self::Transient(_)
				| Self::Transport(_)
		)
	}
}

fn describe(description: &Option<String>) -> String {
	description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// An environment setting holds a value that cannot be parsed.
	#[error("Setting `{name}` has an invalid value: {value}.")]
	InvalidSetting {
		/// Environment variable name.
		name: &'static str,
		/// Offending raw value.
		value: String,
	},

	/// `X_CLIENT_ID` is not configured.
	#[error("X_CLIENT_ID is not configured.")]
	MissingClientId,
	/// Neither the credential file nor the environment supplied an access token.
	#[error("No access token is available; run x-mcp-setup or set X_OAUTH2_ACCESS_TOKEN.")]
	MissingAccessToken,
	/// Token set has no refresh token to rotate with.
	#[error("Token set is missing a refresh token.")]
	MissingRefreshToken,
	/// Scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token set builder validation failed.
	#[error("Unable to build token set.")]
	TokenBuild(#[from] crate::auth::TokenSetBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling X.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling X.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Non-success answer from the X resource API.
#[derive(Debug, ThisError)]
#[error("X API request failed with status {status}: {detail}.")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Response body, parsed as JSON when possible and wrapped as a string otherwise.
	pub detail: JsonValue,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exchange_failures_are_classified() {
		assert!(Error::InvalidGrant { reason: "bad code".into() }.is_exchange_failure());
		assert!(Error::InvalidClient { reason: "unknown".into() }.is_exchange_failure());
		assert!(!Error::StateMismatch.is_exchange_failure());
		assert!(
			!Error::Api(ApiError { status: 403, detail: JsonValue::Null }).is_exchange_failure()
		);
	}

	#[test]
	fn denied_message_includes_description() {
		let err = Error::AuthorizationDenied {
			error: "access_denied".into(),
			description: Some("User cancelled".into()),
		};

		assert_eq!(err.to_string(), "Authorization was denied: access_denied (User cancelled).");

		let bare = Error::AuthorizationDenied { error: "access_denied".into(), description: None };

		assert_eq!(bare.to_string(), "Authorization was denied: access_denied.");
	}
}
