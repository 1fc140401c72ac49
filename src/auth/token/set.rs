//! The process-wide token set and the grants that produce or rotate it.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Lead time subtracted from every provider lifetime so tokens rotate before X rejects them.
pub const SAFETY_MARGIN: Duration = Duration::minutes(5);
/// Lifetime assumed for bootstrap tokens read from the environment.
pub const BOOTSTRAP_LIFETIME: Duration = Duration::hours(2);

/// Errors produced by [`TokenSetBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenSetBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Successful token endpoint response, before it is folded into a [`TokenSet`].
#[derive(Clone, Debug)]
pub struct TokenGrant {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Provider-reported lifetime of the access token.
	pub expires_in: Duration,
	/// Scopes echoed by the provider, if any.
	pub scope: Option<ScopeSet>,
}

/// Access/refresh token pair with its validity window.
///
/// `expires_at` already includes [`SAFETY_MARGIN`], so a token is treated as expired five
/// minutes before the provider would reject it. The access token and its expiry are always
/// updated together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
	/// Bearer token attached to API calls.
	pub access_token: TokenSecret,
	/// Refresh token, if one was issued.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Instant the current access token was obtained.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Instant after which the access token must be rotated.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
	/// Scopes granted to the token.
	#[serde(default)]
	pub scope: ScopeSet,
}
impl TokenSet {
	/// Returns a builder for token sets.
	pub fn builder() -> TokenSetBuilder {
		TokenSetBuilder::default()
	}

	/// Builds the first token set from an authorization code grant.
	pub fn from_grant(grant: TokenGrant, issued_at: OffsetDateTime) -> Self {
		Self {
			access_token: grant.access_token,
			refresh_token: grant.refresh_token,
			issued_at,
			expires_at: issued_at + grant.expires_in - SAFETY_MARGIN,
			scope: grant.scope.unwrap_or_default(),
		}
	}

	/// Folds a refresh grant into the set.
	///
	/// The previous refresh token survives when the response omits a new one.
	pub fn apply_refresh(&mut self, grant: TokenGrant, now: OffsetDateTime) {
		self.access_token = grant.access_token;
		self.issued_at = now;
		self.expires_at = now + grant.expires_in - SAFETY_MARGIN;

		if let Some(refresh) = grant.refresh_token {
			self.refresh_token = Some(refresh);
		}
		if let Some(scope) = grant.scope {
			self.scope = scope;
		}
	}

	/// Returns `true` if the access token is past its (margin-adjusted) expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the token is expired and a refresh token is available to rotate it.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime) -> bool {
		self.refresh_token.is_some() && self.is_expired_at(instant)
	}
}

/// Builder for [`TokenSet`].
#[derive(Clone, Debug, Default)]
pub struct TokenSetBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	scope: ScopeSet,
}
impl TokenSetBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant; defaults to the current clock.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant, used verbatim.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the provider lifetime; [`SAFETY_MARGIN`] is subtracted on build.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Sets the granted scopes.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Consumes the builder and produces a [`TokenSet`].
	pub fn build(self) -> Result<TokenSet, TokenSetBuilderError> {
		let access_token = self.access_token.ok_or(TokenSetBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta - SAFETY_MARGIN,
			(None, None) => return Err(TokenSetBuilderError::MissingExpiry),
		};

		Ok(TokenSet {
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
			scope: self.scope,
		})
	}
}
