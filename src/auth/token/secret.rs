//! Redacting wrapper for bearer and refresh token material.

// self
use crate::_prelude::*;

/// Token string that never prints its value through `Debug` or `Display`.
///
/// Serializes transparently so the credential file stores the raw token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Formats the value as an `Authorization` header payload.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl From<oauth2::AccessToken> for TokenSecret {
	fn from(token: oauth2::AccessToken) -> Self {
		Self(token.into_secret())
	}
}
impl From<oauth2::RefreshToken> for TokenSecret {
	fn from(token: oauth2::RefreshToken) -> Self {
		Self(token.into_secret())
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
