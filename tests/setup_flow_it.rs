mod common;

// std
use std::{
	net::{Ipv4Addr, SocketAddr},
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration as StdDuration,
};
// crates.io
use reqwest::StatusCode;
use time::Duration;
// self
use common::*;
use x_mcp_broker::{
	auth::{ScopeSet, TokenGrant, TokenSecret},
	error::Error,
	flows::{AuthorizationFlow, PendingAuthorization, SetupOptions},
	oauth::{ExchangeFuture, TokenExchanger},
	provider::ProviderDescriptor,
	store::MemoryStore,
};

/// Records the code and verifier of every exchange.
#[derive(Default)]
struct RecordingExchanger {
	calls: AtomicUsize,
	last: parking_lot::Mutex<Option<(String, String)>>,
}
impl TokenExchanger for RecordingExchanger {
	fn exchange_code<'a>(&'a self, code: &'a str, verifier: &'a str) -> ExchangeFuture<'a> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			*self.last.lock() = Some((code.to_owned(), verifier.to_owned()));

			Ok(TokenGrant {
				access_token: TokenSecret::new("A1"),
				refresh_token: Some(TokenSecret::new("R1")),
				expires_in: Duration::hours(2),
				scope: None,
			})
		})
	}

	fn refresh<'a>(&'a self, _refresh_token: &'a str) -> ExchangeFuture<'a> {
		Box::pin(async { Err(Error::InvalidGrant { reason: "unused".into() }) })
	}
}

fn x_descriptor() -> ProviderDescriptor {
	ProviderDescriptor::builder()
		.authorization_endpoint(url("https://x.com/i/oauth2/authorize"))
		.token_endpoint(url("https://api.x.com/2/oauth2/token"))
		.api_base(url("https://api.x.com/2"))
		.build()
		.expect("X descriptor should pass validation.")
}

async fn start() -> PendingAuthorization {
	let options = SetupOptions {
		client_id: CLIENT_ID.into(),
		redirect_uri: url(REDIRECT_URI),
		scope: ScopeSet::new(["tweet.read", "users.read", "offline.access"])
			.expect("Scope fixture."),
		callback_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
		auth_timeout: StdDuration::from_secs(10),
	};

	AuthorizationFlow::start(&x_descriptor(), options).await.expect("Flow should start.")
}

fn query_param(url: &x_mcp_broker::url::Url, key: &str) -> String {
	url.query_pairs()
		.find(|(k, _)| k == key)
		.map(|(_, v)| v.into_owned())
		.unwrap_or_else(|| panic!("Authorize URL should carry `{key}`."))
}

async fn hit(addr: SocketAddr, path_and_query: &str) -> (StatusCode, String) {
	let response = reqwest::Client::new()
		.get(format!("http://{addr}{path_and_query}"))
		.send()
		.await
		.expect("Callback request should reach the listener.");
	let status = response.status();
	let body = response.text().await.expect("Callback page should be readable.");

	(status, body)
}

#[tokio::test]
async fn valid_callback_exchanges_and_persists() {
	let pending = start().await;
	let addr = pending.local_addr();
	let state = query_param(pending.authorize_url(), "state");
	let challenge = query_param(pending.authorize_url(), "code_challenge");
	let exchanger = RecordingExchanger::default();
	let store = MemoryStore::default();
	let callback = format!("/callback?code=C1&state={state}");
	let (outcome, (status, body)) =
		tokio::join!(pending.complete(&exchanger, &store), hit(addr, &callback));
	let tokens = outcome.expect("Flow should succeed.");

	assert_eq!(status, StatusCode::OK);
	assert!(body.contains("Authorization complete"));
	assert_eq!(tokens.access_token.expose(), "A1");
	assert_eq!(exchanger.calls.load(Ordering::SeqCst), 1);

	let (code, verifier) = exchanger.last.lock().clone().expect("Exchange should be recorded.");

	assert_eq!(code, "C1");
	assert_eq!(x_mcp_broker::flows::compute_pkce_challenge(&verifier), challenge);
	assert_eq!(
		store.snapshot().expect("Tokens should be persisted.").access_token.expose(),
		"A1"
	);
}

#[tokio::test]
async fn mismatched_state_never_reaches_the_token_endpoint() {
	let pending = start().await;
	let addr = pending.local_addr();
	let exchanger = RecordingExchanger::default();
	let store = MemoryStore::default();
	let (outcome, (status, _)) = tokio::join!(
		pending.complete(&exchanger, &store),
		hit(addr, "/callback?code=C1&state=forged")
	);

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(matches!(outcome, Err(Error::StateMismatch)));
	assert_eq!(exchanger.calls.load(Ordering::SeqCst), 0);
	assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn denial_is_reported_with_the_provider_reason() {
	let pending = start().await;
	let addr = pending.local_addr();
	let state = query_param(pending.authorize_url(), "state");
	let exchanger = RecordingExchanger::default();
	let store = MemoryStore::default();
	let callback = format!("/callback?error=access_denied&error_description=nope&state={state}");
	let (outcome, (status, body)) =
		tokio::join!(pending.complete(&exchanger, &store), hit(addr, &callback));

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(body.contains("access_denied"));
	assert!(matches!(outcome, Err(Error::AuthorizationDenied { .. })));
	assert_eq!(exchanger.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unrelated_paths_do_not_end_the_wait() {
	let pending = start().await;
	let addr = pending.local_addr();
	let state = query_param(pending.authorize_url(), "state");
	let exchanger = RecordingExchanger::default();
	let store = MemoryStore::default();
	let (outcome, stray) = tokio::join!(pending.complete(&exchanger, &store), async {
		let stray = hit(addr, "/favicon.ico").await;

		hit(addr, &format!("/callback?code=C2&state={state}")).await;

		stray
	});

	assert_eq!(stray.0, StatusCode::NOT_FOUND);
	assert_eq!(outcome.expect("Flow should succeed after the stray request.").access_token.expose(), "A1");
	assert_eq!(exchanger.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blank_client_id_fails_before_binding() {
	let options = SetupOptions {
		client_id: "  ".into(),
		redirect_uri: url(REDIRECT_URI),
		scope: ScopeSet::x_default(),
		callback_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
		auth_timeout: StdDuration::from_secs(1),
	};
	let err = AuthorizationFlow::start(&x_descriptor(), options)
		.await
		.expect_err("A blank client id must be rejected.");

	assert!(matches!(err, Error::Config(_)));
	assert_eq!(x_mcp_broker::flows::exit_code(&err), 1);
}
