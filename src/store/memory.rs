//! In-process [`CredentialStore`] for tests and ephemeral sessions.

// self
use crate::{
	_prelude::*,
	auth::TokenSet,
	store::{CredentialStore, StoreFuture},
};

/// Keeps the latest token set in memory and counts writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
	current: RwLock<Option<TokenSet>>,
	writes: Mutex<usize>,
}
impl MemoryStore {
	/// Creates a store pre-seeded with `tokens`.
	pub fn with_tokens(tokens: TokenSet) -> Self {
		Self { current: RwLock::new(Some(tokens)), writes: Mutex::new(0) }
	}

	/// Snapshot of the stored token set.
	pub fn snapshot(&self) -> Option<TokenSet> {
		self.current.read().clone()
	}

	/// Number of `persist` calls observed.
	pub fn write_count(&self) -> usize {
		*self.writes.lock()
	}
}
impl CredentialStore for MemoryStore {
	fn persist<'a>(&'a self, tokens: &'a TokenSet) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			*self.current.write() = Some(tokens.clone());
			*self.writes.lock() += 1;

			Ok(())
		})
	}

	fn load(&self) -> StoreFuture<'_, Option<TokenSet>> {
		Box::pin(async move { Ok(self.snapshot()) })
	}
}
