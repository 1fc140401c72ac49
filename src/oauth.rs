//! Token endpoint exchanges built on the `oauth2` crate.
//!
//! [`TokenExchanger`] is the seam the setup flow and the authenticated client call through;
//! [`OAuthExchanger`] is the production implementation. Both grants POST a form body to the
//! token endpoint with an HTTP Basic header of `client_id:client_secret` (the secret may be
//! empty) and additionally repeat `client_id` in the body, which X requires for public
//! clients.

pub use oauth2;

// crates.io
use oauth2::{
	AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenGrant, TokenSecret},
	error::{ConfigError, TransientError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{
		DefaultProviderStrategy, GrantType, ProviderDescriptor, ProviderErrorContext,
		ProviderErrorKind, ProviderStrategy,
	},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Boxed future returned by [`TokenExchanger`] operations.
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenGrant>> + 'a + Send>>;

/// Performs the two token endpoint grants.
///
/// Failures surface as exchange errors ([`Error::is_exchange_failure`]) and are never
/// retried here.
pub trait TokenExchanger
where
	Self: Send + Sync,
{
	/// Trades an authorization code plus its PKCE verifier for tokens.
	fn exchange_code<'a>(&'a self, code: &'a str, verifier: &'a str) -> ExchangeFuture<'a>;

	/// Trades a refresh token for a new access token (and possibly a rotated refresh token).
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> ExchangeFuture<'a>;
}

/// `oauth2`-backed [`TokenExchanger`] for X.
pub struct OAuthExchanger {
	oauth_client: ConfiguredBasicClient,
	client_id: String,
	token_url: Url,
	http_client: ReqwestHttpClient,
	strategy: Arc<dyn ProviderStrategy>,
}
impl OAuthExchanger {
	/// Builds an exchanger for the descriptor's token endpoint.
	pub fn new(
		descriptor: &ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: Option<&str>,
		redirect_uri: &Url,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let client_id = client_id.into();
		let auth_url = AuthUrl::from_url(descriptor.endpoints.authorization.clone());
		let token_url = TokenUrl::from_url(descriptor.endpoints.token.clone());
		let redirect_url = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		// An empty secret still yields a Basic header, which X accepts for public clients.
		let oauth_client = BasicClient::new(ClientId::new(client_id.clone()))
			.set_client_secret(ClientSecret::new(client_secret.unwrap_or_default().to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		Ok(Self {
			oauth_client,
			client_id,
			token_url: descriptor.endpoints.token.clone(),
			http_client,
			strategy: Arc::new(DefaultProviderStrategy),
		})
	}
}
impl TokenExchanger for OAuthExchanger {
	fn exchange_code<'a>(&'a self, code: &'a str, verifier: &'a str) -> ExchangeFuture<'a> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.instrumented(meta.clone());
			let response = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_owned()))
				.add_extra_param("client_id", &self.client_id)
				.request_async(&handle)
				.await
				.map_err(|err| {
					map_request_error(
						self.strategy.as_ref(),
						GrantType::AuthorizationCode,
						meta.take(),
						err,
					)
				})?;

			tracing::debug!(grant = %GrantType::AuthorizationCode, "token endpoint accepted grant");

			map_token_response(response)
		})
	}

	fn refresh<'a>(&'a self, refresh_token: &'a str) -> ExchangeFuture<'a> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.instrumented(meta.clone());
			let secret = RefreshToken::new(refresh_token.to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&secret)
				.add_extra_param("client_id", &self.client_id)
				.request_async(&handle)
				.await
				.map_err(|err| {
					map_request_error(
						self.strategy.as_ref(),
						GrantType::RefreshToken,
						meta.take(),
						err,
					)
				})?;

			tracing::debug!(grant = %GrantType::RefreshToken, "token endpoint accepted grant");

			map_token_response(response)
		})
	}
}
impl Debug for OAuthExchanger {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthExchanger")
			.field("client_id", &self.client_id)
			.field("token_url", &self.token_url.as_str())
			.finish()
	}
}

fn map_token_response(response: BasicTokenResponse) -> Result<TokenGrant> {
	let expires_in = response.expires_in().ok_or(TransientError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| TransientError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(TransientError::NonPositiveExpiresIn.into());
	}

	let scope = response
		.scopes()
		.map(|scopes| ScopeSet::new(scopes.iter().map(|scope| scope.as_str())))
		.transpose()
		.map_err(ConfigError::from)?;

	Ok(TokenGrant {
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		refresh_token: response
			.refresh_token()
			.map(|token| TokenSecret::new(token.secret().to_owned())),
		expires_in: Duration::seconds(expires_in),
		scope,
	})
}

fn map_request_error(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(strategy, grant, response, meta),
		RequestTokenError::Request(error) => map_transport_error(meta, error),
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status: meta_status(meta) }.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn map_server_response_error(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let mut ctx =
		ProviderErrorContext::new(grant).with_oauth_error(response.error().as_ref().to_string());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let message = match response.error_description() {
		Some(description) => format!("{} ({description})", response.error().as_ref()),
		None => response.error().as_ref().to_string(),
	};

	tracing::warn!(%grant, status = ?meta_status(meta), %message, "token endpoint rejected grant");

	match strategy.classify_token_error(&ctx) {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason: message },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason: message },
		ProviderErrorKind::InsufficientScope => Error::InsufficientScope { reason: message },
		ProviderErrorKind::Transient => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn map_transport_error(
	meta: Option<&ResponseMetadata>,
	err: HttpClientError<ReqwestError>,
) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => {
			let inner = *inner;

			if inner.is_builder() {
				return ConfigError::from(inner).into();
			}
			if inner.is_timeout() {
				return TransientError::TokenEndpoint {
					message: "request timed out".into(),
					status: meta_status(meta).or_else(|| inner.status().map(|s| s.as_u16())),
					retry_after: meta_retry_after(meta),
				}
				.into();
			}

			TransportError::from(inner).into()
		},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
		_ => TransientError::TokenEndpoint {
			message: "unrecognized HTTP client failure".into(),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
