//! End-to-end browser authorization: bind the listener, send the user to X, exchange the code,
//! and persist the resulting token set.

// std
use std::{net::SocketAddr, time::Duration as StdDuration};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSet},
	error::ConfigError,
	flows::{AuthorizationSession, CallbackListener},
	oauth::TokenExchanger,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::ProviderDescriptor,
	store::CredentialStore,
};

/// Inputs for one interactive authorization.
#[derive(Clone, Debug)]
pub struct SetupOptions {
	/// OAuth client id registered with X.
	pub client_id: String,
	/// Redirect URI registered with X; must point at the listener's `/callback`.
	pub redirect_uri: Url,
	/// Scopes to request.
	pub scope: ScopeSet,
	/// Local address the listener binds.
	pub callback_addr: SocketAddr,
	/// Upper bound on the wait for the redirect.
	pub auth_timeout: StdDuration,
}

/// Starts interactive authorizations.
pub struct AuthorizationFlow;
impl AuthorizationFlow {
	/// Binds the callback listener and prepares a fresh session.
	///
	/// Binding happens first so a busy port fails before the user is sent to X.
	pub async fn start(
		descriptor: &ProviderDescriptor,
		options: SetupOptions,
	) -> Result<PendingAuthorization> {
		if options.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId.into());
		}

		let listener = CallbackListener::bind(options.callback_addr).await?;
		let session = AuthorizationSession::new(
			descriptor,
			&options.client_id,
			options.redirect_uri,
			options.scope,
		);

		tracing::info!(local_addr = %listener.local_addr(), "waiting for the authorization redirect");

		Ok(PendingAuthorization { session, listener, auth_timeout: options.auth_timeout })
	}
}

/// Authorization whose redirect has not arrived yet.
#[derive(Debug)]
pub struct PendingAuthorization {
	session: AuthorizationSession,
	listener: CallbackListener,
	auth_timeout: StdDuration,
}
impl PendingAuthorization {
	/// URL the user must visit.
	pub fn authorize_url(&self) -> &Url {
		&self.session.authorize_url
	}

	/// Address the listener is bound to.
	pub fn local_addr(&self) -> SocketAddr {
		self.listener.local_addr()
	}

	/// Tries to open the authorize URL in the default browser. Failure is logged only; the URL
	/// should be printed regardless.
	pub fn open_browser(&self) -> bool {
		match open::that(self.session.authorize_url.as_str()) {
			Ok(()) => true,
			Err(e) => {
				tracing::warn!(error = %e, "could not open a browser");

				false
			},
		}
	}

	/// Waits for the redirect, exchanges the code, and persists the token set.
	///
	/// A state mismatch, denial, missing code, or timeout ends the flow before any exchange.
	/// Persistence failures are logged and do not fail the flow.
	pub async fn complete(
		self,
		exchanger: &dyn TokenExchanger,
		store: &dyn CredentialStore,
	) -> Result<TokenSet> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "complete");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let Self { session, listener, auth_timeout } = self;
				let code = listener.wait(&session.state, auth_timeout).await?;

				tracing::info!("authorization code received; exchanging");

				let grant = exchanger.exchange_code(&code, session.pkce_verifier()).await?;
				let tokens = TokenSet::from_grant(grant, OffsetDateTime::now_utc());

				if let Err(e) = store.persist(&tokens).await {
					tracing::warn!(error = %e, "failed to persist credentials");
				}

				Ok(tokens)
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}

/// Process exit code for a failed setup run.
///
/// `1` configuration, `2` denied, `3` state mismatch, `4` exchange failure, `5` timeout,
/// listener failure, or an unusable callback.
pub fn exit_code(error: &Error) -> u8 {
	match error {
		Error::Config(_) => 1,
		Error::AuthorizationDenied { .. } => 2,
		Error::StateMismatch => 3,
		e if e.is_exchange_failure() => 4,
		Error::AuthorizationTimeout { .. }
		| Error::Listener(_)
		| Error::MissingCode
		| Error::MalformedCallback { .. } => 5,
		_ => 1,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exit_codes_follow_failure_class() {
		assert_eq!(exit_code(&ConfigError::MissingClientId.into()), 1);
		assert_eq!(
			exit_code(&Error::AuthorizationDenied { error: "access_denied".into(), description: None }),
			2
		);
		assert_eq!(exit_code(&Error::StateMismatch), 3);
		assert_eq!(exit_code(&Error::InvalidClient { reason: "bad".into() }), 4);
		assert_eq!(exit_code(&Error::AuthorizationTimeout { seconds: 300 }), 5);
		assert_eq!(exit_code(&Error::MissingCode), 5);
		assert_eq!(exit_code(&Error::MalformedCallback { reason: "duplicate field".into() }), 5);
	}
}
