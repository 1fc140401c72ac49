//! Credential persistence contract and its built-in implementations.
//!
//! The process holds a single [`TokenSet`]; stores mirror it so a restart resumes with the
//! most recently rotated tokens instead of the (possibly stale) environment bootstrap values.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenSet, error::ConfigError};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable home of the single-tenant token set.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Overwrites the stored credentials wholesale. Persisting the same set twice is a no-op
	/// in effect.
	fn persist<'a>(&'a self, tokens: &'a TokenSet) -> StoreFuture<'a, ()>;

	/// Loads the stored credentials; `None` means nothing has been persisted yet.
	fn load(&self) -> StoreFuture<'_, Option<TokenSet>>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// Stored data could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage medium.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Picks the startup token set: stored credentials win over `bootstrap` (environment tokens),
/// since the store holds the most recent rotation. A malformed or unreadable store is logged
/// and ignored.
pub async fn load_or_bootstrap(
	store: &dyn CredentialStore,
	bootstrap: Option<TokenSet>,
) -> Result<TokenSet> {
	match store.load().await {
		Ok(Some(tokens)) => {
			tracing::info!(expires_at = %tokens.expires_at, "loaded stored credentials");

			return Ok(tokens);
		},
		Ok(None) => tracing::debug!("no stored credentials; using environment tokens"),
		Err(e) => tracing::warn!(error = %e, "stored credentials unusable; using environment tokens"),
	}

	bootstrap.ok_or_else(|| ConfigError::MissingAccessToken.into())
}
