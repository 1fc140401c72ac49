//! Environment-driven settings shared by both binaries.

// std
use std::{
	net::{Ipv4Addr, SocketAddr},
	path::PathBuf,
	time::Duration as StdDuration,
};
// self
use crate::{
	_prelude::*,
	auth::{BOOTSTRAP_LIFETIME, ScopeSet, TokenSet},
	error::ConfigError,
	flows::{CALLBACK_PATH, SetupOptions},
	http::ReqwestHttpClient,
	oauth::OAuthExchanger,
	provider::{ProviderDescriptor, X_API_BASE_URL, X_AUTHORIZE_URL, X_TOKEN_URL},
	store::FileStore,
};

/// Default loopback port for the authorization redirect.
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;
/// Default wait for the authorization redirect, in seconds.
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 300;

const ACCESS_TOKEN_VARS: [&str; 3] = ["X_OAUTH2_ACCESS_TOKEN", "X_ACCESS_TOKEN", "X_BEARER_TOKEN"];

/// Runtime settings resolved from the environment.
#[derive(Clone)]
pub struct Settings {
	/// OAuth client id; required for setup and for refresh.
	pub client_id: Option<String>,
	/// OAuth client secret; empty for public clients.
	pub client_secret: Option<String>,
	/// Bootstrap access token.
	pub access_token: Option<String>,
	/// Bootstrap refresh token.
	pub refresh_token: Option<String>,
	/// Credential file location.
	pub credentials_path: PathBuf,
	/// Loopback port of the redirect listener.
	pub callback_port: u16,
	/// Upper bound on the authorization wait.
	pub auth_timeout: StdDuration,
	/// Scopes requested during setup.
	pub scope: ScopeSet,
	/// Authorization endpoint.
	pub authorize_url: String,
	/// Token endpoint.
	pub token_url: String,
	/// Resource API root.
	pub api_base_url: String,
}
impl Settings {
	/// Reads the process environment.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads settings through `lookup`; blank values count as unset.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let credentials_path = match get("X_CREDENTIALS_PATH") {
			Some(path) => PathBuf::from(path),
			None => default_credentials_path(),
		};
		let callback_port = match get("X_CALLBACK_PORT") {
			Some(raw) => parse_setting("X_CALLBACK_PORT", &raw)?,
			None => DEFAULT_CALLBACK_PORT,
		};
		let auth_timeout_secs = match get("X_AUTH_TIMEOUT_SECS") {
			Some(raw) => parse_setting("X_AUTH_TIMEOUT_SECS", &raw)?,
			None => DEFAULT_AUTH_TIMEOUT_SECS,
		};
		let scope = match get("X_SCOPES") {
			Some(raw) => ScopeSet::new(raw.split_whitespace()).map_err(ConfigError::from)?,
			None => ScopeSet::x_default(),
		};

		Ok(Self {
			client_id: get("X_CLIENT_ID"),
			client_secret: get("X_CLIENT_SECRET"),
			access_token: ACCESS_TOKEN_VARS.iter().find_map(|name| get(name)),
			refresh_token: get("X_OAUTH2_REFRESH_TOKEN"),
			credentials_path,
			callback_port,
			auth_timeout: StdDuration::from_secs(auth_timeout_secs),
			scope,
			authorize_url: get("X_AUTHORIZE_URL").unwrap_or_else(|| X_AUTHORIZE_URL.into()),
			token_url: get("X_TOKEN_URL").unwrap_or_else(|| X_TOKEN_URL.into()),
			api_base_url: get("X_API_BASE_URL").unwrap_or_else(|| X_API_BASE_URL.into()),
		})
	}

	/// Validated endpoint descriptor.
	pub fn descriptor(&self) -> Result<ProviderDescriptor> {
		let descriptor = ProviderDescriptor::builder()
			.authorization_endpoint(parse_url("X_AUTHORIZE_URL", &self.authorize_url)?)
			.token_endpoint(parse_url("X_TOKEN_URL", &self.token_url)?)
			.api_base(parse_url("X_API_BASE_URL", &self.api_base_url)?)
			.build()
			.map_err(ConfigError::from)?;

		Ok(descriptor)
	}

	/// `http://localhost:<port>/callback`, which must match the X app registration.
	pub fn redirect_uri(&self) -> Result<Url> {
		let raw = format!("http://localhost:{}{CALLBACK_PATH}", self.callback_port);

		Url::parse(&raw).map_err(|source| ConfigError::InvalidRedirect { source }.into())
	}

	/// Client id or [`ConfigError::MissingClientId`].
	pub fn require_client_id(&self) -> Result<&str> {
		self.client_id.as_deref().ok_or_else(|| ConfigError::MissingClientId.into())
	}

	/// Token set built from environment tokens, assumed freshly issued with the standard
	/// two hour lifetime.
	pub fn bootstrap_tokens(&self) -> Result<Option<TokenSet>> {
		let Some(access_token) = &self.access_token else {
			return Ok(None);
		};
		let mut builder = TokenSet::builder()
			.access_token(access_token.as_str())
			.issued_at(OffsetDateTime::now_utc())
			.expires_in(BOOTSTRAP_LIFETIME)
			.scope(self.scope.clone());

		if let Some(refresh_token) = &self.refresh_token {
			builder = builder.refresh_token(refresh_token.as_str());
		}

		Ok(Some(builder.build().map_err(ConfigError::from)?))
	}

	/// Exchanger for the configured client; requires `X_CLIENT_ID`.
	pub fn exchanger(
		&self,
		descriptor: &ProviderDescriptor,
		http_client: ReqwestHttpClient,
	) -> Result<OAuthExchanger> {
		OAuthExchanger::new(
			descriptor,
			self.require_client_id()?,
			self.client_secret.as_deref(),
			&self.redirect_uri()?,
			http_client,
		)
	}

	/// File store at [`credentials_path`](Self::credentials_path).
	pub fn credential_store(&self) -> FileStore {
		FileStore::new(self.credentials_path.clone())
	}

	/// Options for the interactive authorization, binding the loopback interface.
	pub fn setup_options(&self) -> Result<SetupOptions> {
		Ok(SetupOptions {
			client_id: self.require_client_id()?.to_owned(),
			redirect_uri: self.redirect_uri()?,
			scope: self.scope.clone(),
			callback_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, self.callback_port)),
			auth_timeout: self.auth_timeout,
		})
	}
}
impl Debug for Settings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Settings")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("access_token_set", &self.access_token.is_some())
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("credentials_path", &self.credentials_path)
			.field("callback_port", &self.callback_port)
			.field("auth_timeout", &self.auth_timeout)
			.field("scope", &self.scope)
			.finish()
	}
}

/// `<config dir>/x-mcp/credentials.json`, or a relative path when no config dir exists.
pub fn default_credentials_path() -> PathBuf {
	dirs::config_dir().unwrap_or_default().join("x-mcp").join("credentials.json")
}

fn parse_setting<T>(name: &'static str, raw: &str) -> Result<T>
where
	T: FromStr,
{
	raw.parse().map_err(|_| ConfigError::InvalidSetting { name, value: raw.to_owned() }.into())
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url> {
	Url::parse(raw).map_err(|_| ConfigError::InvalidSetting { name, value: raw.to_owned() }.into())
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
		let vars: HashMap<String, String> =
			vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();

		Settings::from_lookup(|name| vars.get(name).cloned())
	}

	#[test]
	fn defaults_apply_when_unset() {
		let settings = settings(&[]).expect("Empty environment should load.");

		assert_eq!(settings.callback_port, 8080);
		assert_eq!(settings.auth_timeout, StdDuration::from_secs(300));
		assert_eq!(settings.scope, ScopeSet::x_default());
		assert!(settings.credentials_path.ends_with("x-mcp/credentials.json"));
		assert_eq!(
			settings.redirect_uri().expect("Redirect should build.").as_str(),
			"http://localhost:8080/callback"
		);
		assert!(settings.bootstrap_tokens().expect("Bootstrap should not fail.").is_none());
		assert!(matches!(
			settings.require_client_id(),
			Err(Error::Config(ConfigError::MissingClientId))
		));
	}

	#[test]
	fn access_token_variables_are_tried_in_order() {
		let settings = settings(&[("X_BEARER_TOKEN", "B"), ("X_ACCESS_TOKEN", "A"), ("X_OAUTH2_ACCESS_TOKEN", " ")])
			.expect("Environment should load.");

		assert_eq!(settings.access_token.as_deref(), Some("A"));
	}

	#[test]
	fn bootstrap_tokens_expire_after_the_margin() {
		let settings = settings(&[("X_OAUTH2_ACCESS_TOKEN", "A1"), ("X_OAUTH2_REFRESH_TOKEN", "R1")])
			.expect("Environment should load.");
		let tokens = settings
			.bootstrap_tokens()
			.expect("Bootstrap should build.")
			.expect("Tokens should be present.");

		assert_eq!(tokens.expires_at - tokens.issued_at, Duration::seconds(6_900));
		assert_eq!(tokens.refresh_token.as_ref().map(|t| t.expose()), Some("R1"));
	}

	#[test]
	fn invalid_numbers_are_reported_by_name() {
		let err = settings(&[("X_CALLBACK_PORT", "eighty")]).expect_err("Port must be numeric.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidSetting { name: "X_CALLBACK_PORT", .. })
		));
	}

	#[test]
	fn endpoint_overrides_feed_the_descriptor() {
		let settings = settings(&[
			("X_AUTHORIZE_URL", "http://127.0.0.1:9000/i/oauth2/authorize"),
			("X_TOKEN_URL", "http://127.0.0.1:9000/2/oauth2/token"),
			("X_API_BASE_URL", "http://127.0.0.1:9000/2"),
			("X_SCOPES", "tweet.read offline.access"),
		])
		.expect("Environment should load.");
		let descriptor = settings.descriptor().expect("Loopback overrides are allowed.");

		assert_eq!(descriptor.endpoints.token.path(), "/2/oauth2/token");
		assert_eq!(descriptor.endpoints.api_base.as_str(), "http://127.0.0.1:9000/2/");
		assert_eq!(settings.scope.len(), 2);
	}
}
