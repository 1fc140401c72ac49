//! Authenticated access to the X API with transparent token rotation.
//!
//! [`AuthenticatedClient::send_with_auth`] wraps every call in two layers:
//!
//! - pre-flight: when the token set is past its margin-adjusted expiry and a refresh token is
//!   known, rotate before sending;
//! - reactive: when X answers 401 and a refresh token is known, rotate once and retry once. A
//!   second 401 is returned to the caller as is.
//!
//! Rotations are serialized through a shared latch. A caller that waited on the latch first
//! checks whether the token it saw has already been replaced and reuses the new one instead of
//! spending another refresh grant. Rotated tokens are persisted on a best-effort basis.

mod metrics;
mod transport;

pub use metrics::RefreshMetrics;
pub use transport::*;

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenSet},
	error::ConfigError,
	oauth::TokenExchanger,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CredentialStore,
};

/// Bearer-authenticating, self-refreshing API client.
pub struct AuthenticatedClient {
	tokens: RwLock<TokenSet>,
	refresh_latch: AsyncMutex<()>,
	exchanger: Option<Arc<dyn TokenExchanger>>,
	store: Arc<dyn CredentialStore>,
	transport: Arc<dyn ApiTransport>,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl AuthenticatedClient {
	/// Creates a client that owns `tokens` and mirrors rotations into `store`.
	///
	/// Without an exchanger (see [`with_exchanger`](Self::with_exchanger)) every rotation
	/// fails with [`ConfigError::MissingClientId`].
	pub fn new(
		tokens: TokenSet,
		transport: Arc<dyn ApiTransport>,
		store: Arc<dyn CredentialStore>,
	) -> Self {
		Self {
			tokens: RwLock::new(tokens),
			refresh_latch: AsyncMutex::new(()),
			exchanger: None,
			store,
			transport,
			refresh_metrics: Default::default(),
		}
	}

	/// Attaches the exchanger used for refresh grants.
	pub fn with_exchanger(mut self, exchanger: Arc<dyn TokenExchanger>) -> Self {
		self.exchanger = Some(exchanger);

		self
	}

	/// Snapshot of the current token set.
	pub fn tokens(&self) -> TokenSet {
		self.tokens.read().clone()
	}

	/// Rotation counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	/// Sends `request` with a bearer token, refreshing before the call when the token is
	/// expiring and once more after a 401.
	///
	/// Non-2xx answers (including a 401 that survives the retry) surface as
	/// [`Error::Api`].
	pub async fn send_with_auth(&self, request: &ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::ApiCall;

		let span = FlowSpan::new(KIND, "send_with_auth");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let bearer = self.preflight_bearer().await?;
				let response = self.transport.send(request, &bearer).await?;

				if response.status != 401 {
					return response.into_result();
				}

				let Some(rotated) = self.bearer_after_rejection(&bearer).await? else {
					return response.into_result();
				};

				tracing::info!(path = %request.path, "retrying once after 401 with rotated token");

				self.transport.send(request, &rotated).await?.into_result()
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Returns a bearer that is not past its expiry, rotating first when needed.
	async fn preflight_bearer(&self) -> Result<TokenSecret> {
		if let Some(bearer) = self.unexpired_bearer() {
			return Ok(bearer);
		}

		let _latch = self.refresh_latch.lock().await;

		if let Some(bearer) = self.unexpired_bearer() {
			self.refresh_metrics.record_reuse();

			return Ok(bearer);
		}

		tracing::debug!("access token expired; rotating before the request");

		self.rotate().await
	}

	/// Rotates after `rejected` drew a 401. `None` means no refresh token is available and
	/// the 401 should be returned as is.
	async fn bearer_after_rejection(&self, rejected: &TokenSecret) -> Result<Option<TokenSecret>> {
		if !self.has_refresh_token() {
			return Ok(None);
		}

		let _latch = self.refresh_latch.lock().await;

		if let Some(current) = self.replaced_bearer(rejected) {
			self.refresh_metrics.record_reuse();

			return Ok(Some(current));
		}

		self.rotate().await.map(Some)
	}

	/// Performs one refresh grant. Callers must hold the latch.
	async fn rotate(&self) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "rotate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				let exchanger = self.exchanger.as_ref().ok_or(ConfigError::MissingClientId)?;
				let refresh = self.current_refresh_token().ok_or(ConfigError::MissingRefreshToken)?;
				let grant = exchanger.refresh(refresh.expose()).await?;
				let snapshot = self.apply_grant(grant);

				if let Err(e) = self.store.persist(&snapshot).await {
					tracing::warn!(error = %e, "failed to persist rotated credentials; continuing with in-memory tokens");
				}

				tracing::info!(expires_at = %snapshot.expires_at, "access token rotated");

				Ok(snapshot.access_token)
			})
			.await;

		match &result {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(e) => {
				tracing::warn!(error = %e, "token refresh failed");
				self.refresh_metrics.record_failure();
			},
		}

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	fn unexpired_bearer(&self) -> Option<TokenSecret> {
		let tokens = self.tokens.read();

		(!tokens.needs_refresh_at(OffsetDateTime::now_utc())).then(|| tokens.access_token.clone())
	}

	fn replaced_bearer(&self, rejected: &TokenSecret) -> Option<TokenSecret> {
		let tokens = self.tokens.read();

		(tokens.access_token != *rejected).then(|| tokens.access_token.clone())
	}

	fn has_refresh_token(&self) -> bool {
		self.tokens.read().refresh_token.is_some()
	}

	fn current_refresh_token(&self) -> Option<TokenSecret> {
		self.tokens.read().refresh_token.clone()
	}

	fn apply_grant(&self, grant: crate::auth::TokenGrant) -> TokenSet {
		let mut tokens = self.tokens.write();

		tokens.apply_refresh(grant, OffsetDateTime::now_utc());

		tokens.clone()
	}
}
impl Debug for AuthenticatedClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("tokens", &*self.tokens.read())
			.field("refreshable", &self.exchanger.is_some())
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
