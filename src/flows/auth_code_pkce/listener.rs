//! One-shot loopback listener that receives the authorization redirect.

// std
use std::{
	io,
	net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
	time::Duration as StdDuration,
};
// crates.io
use axum::{
	Router,
	extract::{Query, State, rejection::QueryRejection},
	http::StatusCode,
	response::Html,
	routing::get,
};
use tokio::{
	net::TcpListener,
	sync::{oneshot, watch},
};
// self
use crate::_prelude::*;

/// Path the redirect URI must point at.
pub const CALLBACK_PATH: &str = "/callback";

const SHUTDOWN_GRACE: StdDuration = StdDuration::from_secs(2);

/// Query parameters X appends to the redirect.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
	/// Authorization code on success.
	pub code: Option<String>,
	/// Echoed CSRF state.
	pub state: Option<String>,
	/// OAuth error code when the user declined or the request was invalid.
	pub error: Option<String>,
	/// Human-readable companion to `error`.
	pub error_description: Option<String>,
}
impl CallbackParams {
	/// Resolves the redirect into the authorization code or a terminal error.
	///
	/// An `error` parameter wins; otherwise the state is compared before the code is looked at.
	pub fn resolve(self, expected_state: &str) -> Result<String> {
		if let Some(error) = self.error {
			return Err(Error::AuthorizationDenied { error, description: self.error_description });
		}
		if self.state.as_deref() != Some(expected_state) {
			return Err(Error::StateMismatch);
		}

		self.code.filter(|code| !code.is_empty()).ok_or(Error::MissingCode)
	}
}

struct CallbackShared {
	expected_state: String,
	outcome: Mutex<Option<oneshot::Sender<Result<String>>>>,
}

/// Bound loopback sockets awaiting exactly one `/callback` request.
#[derive(Debug)]
pub struct CallbackListener {
	listeners: Vec<TcpListener>,
	local_addr: SocketAddr,
}
impl CallbackListener {
	/// Binds `addr`; a busy port surfaces as [`Error::Listener`].
	///
	/// When `addr` is the IPv4 loopback, `[::1]` is bound on the same port as well so a
	/// `localhost` redirect reaches the listener whichever family the browser resolves first.
	pub async fn bind(addr: SocketAddr) -> Result<Self> {
		let primary = TcpListener::bind(addr).await.map_err(Error::Listener)?;
		let local_addr = primary.local_addr().map_err(Error::Listener)?;
		let mut listeners = vec![primary];

		if local_addr.ip() == IpAddr::V4(Ipv4Addr::LOCALHOST) {
			match TcpListener::bind((Ipv6Addr::LOCALHOST, local_addr.port())).await {
				Ok(v6) => listeners.push(v6),
				Err(e) => tracing::debug!(error = %e, "IPv6 loopback unavailable; serving IPv4 only"),
			}
		}

		tracing::debug!(%local_addr, sockets = listeners.len(), "callback listener bound");

		Ok(Self { listeners, local_addr })
	}

	/// Address actually bound (useful when binding port 0).
	pub fn local_addr(&self) -> SocketAddr {
		self.local_addr
	}

	/// Serves until the first `/callback` request or until `timeout` elapses, then tears the
	/// listener down.
	///
	/// Requests to other paths are answered with 404 and do not end the wait.
	pub async fn wait(self, expected_state: &str, timeout: StdDuration) -> Result<String> {
		let (outcome_tx, outcome_rx) = oneshot::channel();
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let shared = Arc::new(CallbackShared {
			expected_state: expected_state.to_owned(),
			outcome: Mutex::new(Some(outcome_tx)),
		});
		let router = Router::new().route(CALLBACK_PATH, get(handle_callback)).with_state(shared);
		let servers = self
			.listeners
			.into_iter()
			.map(|listener| {
				let router = router.clone();
				let mut shutdown_rx = shutdown_rx.clone();

				tokio::spawn(async move {
					axum::serve(listener, router)
						.with_graceful_shutdown(async move {
							let _ = shutdown_rx.changed().await;
						})
						.await
				})
			})
			.collect::<Vec<_>>();
		let outcome = tokio::time::timeout(timeout, outcome_rx).await;
		let _ = shutdown_tx.send(true);

		for mut server in servers {
			match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
				Ok(Ok(Ok(()))) => tracing::debug!("callback listener stopped"),
				Ok(Ok(Err(e))) =>
					tracing::warn!(error = %e, "callback listener exited with an error"),
				Ok(Err(e)) => tracing::warn!(error = %e, "callback listener task failed"),
				Err(_) => {
					tracing::warn!("callback listener did not stop in time; aborting");
					server.abort();
				},
			}
		}

		match outcome {
			Ok(Ok(result)) => result,
			Ok(Err(_)) =>
				Err(Error::Listener(io::Error::other("listener stopped before a callback arrived"))),
			Err(_) => Err(Error::AuthorizationTimeout { seconds: timeout.as_secs() }),
		}
	}
}

async fn handle_callback(
	State(shared): State<Arc<CallbackShared>>,
	query: Result<Query<CallbackParams>, QueryRejection>,
) -> (StatusCode, Html<String>) {
	let Some(outcome_tx) = shared.outcome.lock().take() else {
		return (StatusCode::GONE, page("Already handled", "This authorization attempt is over."));
	};
	let result = match query {
		Ok(Query(params)) => params.resolve(&shared.expected_state),
		Err(rejection) => Err(Error::MalformedCallback { reason: rejection.body_text() }),
	};
	let response = match &result {
		Ok(_) => (
			StatusCode::OK,
			page("Authorization complete", "You can close this tab and return to the terminal."),
		),
		Err(Error::StateMismatch) => {
			tracing::warn!("callback state mismatch; discarding the authorization code");

			(
				StatusCode::BAD_REQUEST,
				page("Security check failed", "The state parameter did not match. Please retry."),
			)
		},
		Err(e) => (StatusCode::BAD_REQUEST, page("Authorization failed", &e.to_string())),
	};
	let _ = outcome_tx.send(result);

	response
}

fn page(title: &str, message: &str) -> Html<String> {
	Html(format!(
		"<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
		 <body><h1>{title}</h1><p>{}</p></body></html>",
		escape_html(message)
	))
}

fn escape_html(raw: &str) -> String {
	let mut escaped = String::with_capacity(raw.len());

	for c in raw.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(c),
		}
	}

	escaped
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn params(code: Option<&str>, state: Option<&str>, error: Option<&str>) -> CallbackParams {
		CallbackParams {
			code: code.map(Into::into),
			state: state.map(Into::into),
			error: error.map(Into::into),
			error_description: None,
		}
	}

	#[test]
	fn resolution_order_is_error_then_state_then_code() {
		assert_eq!(params(Some("XYZ"), Some("S1"), None).resolve("S1").expect("Valid code."), "XYZ");
		assert!(matches!(
			params(Some("XYZ"), Some("S1"), Some("access_denied")).resolve("S1"),
			Err(Error::AuthorizationDenied { .. })
		));
		assert!(matches!(
			params(Some("XYZ"), Some("S2"), None).resolve("S1"),
			Err(Error::StateMismatch)
		));
		assert!(matches!(params(Some("XYZ"), None, None).resolve("S1"), Err(Error::StateMismatch)));
		assert!(matches!(params(None, Some("S1"), None).resolve("S1"), Err(Error::MissingCode)));
		assert!(matches!(params(Some(""), Some("S1"), None).resolve("S1"), Err(Error::MissingCode)));
	}

	#[test]
	fn pages_escape_markup() {
		let Html(body) = page("Authorization failed", "<script>alert('x')</script>");

		assert!(body.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
		assert!(!body.contains("<script>"));
	}

	#[tokio::test]
	async fn wait_times_out_without_a_callback() {
		let listener = CallbackListener::bind("127.0.0.1:0".parse().expect("Loopback address."))
			.await
			.expect("Loopback bind should succeed.");
		let err = listener
			.wait("S1", StdDuration::from_millis(50))
			.await
			.expect_err("Nobody calls back, so the wait must time out.");

		assert!(matches!(err, Error::AuthorizationTimeout { .. }));
	}

	#[tokio::test]
	async fn busy_port_is_a_listener_error() {
		let first = CallbackListener::bind("127.0.0.1:0".parse().expect("Loopback address."))
			.await
			.expect("Loopback bind should succeed.");
		let err = CallbackListener::bind(first.local_addr())
			.await
			.expect_err("Second bind on the same port must fail.");

		assert!(matches!(err, Error::Listener(_)));
	}

	async fn answer(
		listener: CallbackListener,
		target: SocketAddr,
		path_and_query: &str,
	) -> (Result<String>, StatusCode) {
		let url = format!("http://{target}{path_and_query}");
		let (outcome, response) = tokio::join!(
			listener.wait("S1", StdDuration::from_secs(5)),
			reqwest::Client::new().get(&url).send()
		);

		(outcome, response.expect("Callback request should reach the listener.").status())
	}

	#[tokio::test]
	async fn ipv6_loopback_receives_the_callback_too() {
		let listener = CallbackListener::bind("127.0.0.1:0".parse().expect("Loopback address."))
			.await
			.expect("Loopback bind should succeed.");

		// Hosts without IPv6 keep the IPv4 socket only.
		if listener.listeners.len() < 2 {
			return;
		}

		let target = SocketAddr::from((Ipv6Addr::LOCALHOST, listener.local_addr().port()));
		let (outcome, status) = answer(listener, target, "/callback?code=C6&state=S1").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(outcome.expect("Callback over IPv6 should resolve."), "C6");
	}

	#[tokio::test]
	async fn undecodable_query_ends_the_wait() {
		let listener = CallbackListener::bind("127.0.0.1:0".parse().expect("Loopback address."))
			.await
			.expect("Loopback bind should succeed.");
		let target = listener.local_addr();
		let (outcome, status) =
			answer(listener, target, "/callback?code=C1&state=S1&state=S1").await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(matches!(outcome, Err(Error::MalformedCallback { .. })));
	}
}
