//! Fixtures shared by the integration suites.

#![allow(dead_code)]

// std
use std::{
	env,
	path::PathBuf,
	sync::atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::MockServer;
use time::{Duration, OffsetDateTime};
// self
use x_mcp_broker::{
	auth::{ScopeSet, TokenSet},
	http::ReqwestHttpClient,
	oauth::OAuthExchanger,
	provider::ProviderDescriptor,
	store::{CredentialStore, StoreError, StoreFuture},
	url::Url,
};

pub const CLIENT_ID: &str = "client-it";
pub const CLIENT_SECRET: &str = "secret-it";
/// `base64("client-it:secret-it")`.
pub const BASIC_AUTH: &str = "Basic Y2xpZW50LWl0OnNlY3JldC1pdA==";
pub const REDIRECT_URI: &str = "http://localhost:8080/callback";

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse fixture URL.")
}

/// Descriptor whose authorize, token, and API endpoints all live on `server`.
pub fn descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::builder()
		.authorization_endpoint(url(&server.url("/i/oauth2/authorize")))
		.token_endpoint(url(&server.url("/2/oauth2/token")))
		.api_base(url(&server.url("/2")))
		.build()
		.expect("Mock descriptor should pass validation.")
}

pub fn exchanger(descriptor: &ProviderDescriptor) -> OAuthExchanger {
	OAuthExchanger::new(
		descriptor,
		CLIENT_ID,
		Some(CLIENT_SECRET),
		&url(REDIRECT_URI),
		ReqwestHttpClient::new().expect("HTTP client should build."),
	)
	.expect("Exchanger should build.")
}

/// Token set issued `age` ago that lives `lifetime` before the safety margin.
pub fn token_set(
	access: &str,
	refresh: Option<&str>,
	age: Duration,
	lifetime: Duration,
) -> TokenSet {
	let mut builder = TokenSet::builder()
		.access_token(access)
		.issued_at(OffsetDateTime::now_utc() - age)
		.expires_in(lifetime)
		.scope(ScopeSet::new(["tweet.read", "offline.access"]).expect("Scope fixture."));

	if let Some(refresh) = refresh {
		builder = builder.refresh_token(refresh);
	}

	builder.build().expect("Token set fixture should build.")
}

pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> String {
	let mut body = serde_json::json!({
		"access_token": access,
		"token_type": "bearer",
		"expires_in": expires_in,
		"scope": "tweet.read offline.access",
	});

	if let Some(refresh) = refresh {
		body["refresh_token"] = refresh.into();
	}

	body.to_string()
}

/// Unique, not yet existing credential file path.
pub fn temp_credentials(label: &str) -> PathBuf {
	static COUNTER: AtomicUsize = AtomicUsize::new(0);

	env::temp_dir().join(format!(
		"x-mcp-it-{label}-{}-{}/credentials.json",
		std::process::id(),
		COUNTER.fetch_add(1, Ordering::Relaxed)
	))
}

/// Store whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore {
	pub attempts: AtomicUsize,
}
impl CredentialStore for FailingStore {
	fn persist<'a>(&'a self, _tokens: &'a TokenSet) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.attempts.fetch_add(1, Ordering::SeqCst);

			Err(StoreError::Backend { message: "disk full".into() })
		})
	}

	fn load(&self) -> StoreFuture<'_, Option<TokenSet>> {
		Box::pin(async { Ok(None) })
	}
}
