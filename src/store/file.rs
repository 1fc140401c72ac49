//! JSON credential file written atomically on every rotation.

// std
use std::{
	fs::{self, File, OpenOptions},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// crates.io
use serde_json::Map;
// self
use crate::{
	_prelude::*,
	auth::TokenSet,
	store::{CredentialStore, StoreError, StoreFuture},
};

/// Persists the token set to a JSON file.
///
/// Writes are read-modify-write: keys this crate does not own are preserved, the token fields
/// are replaced, and the result lands in a sibling `.tmp` file that is renamed over the
/// original.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	write_lock: Arc<Mutex<()>>,
}
impl FileStore {
	/// Creates a store backed by `path`; nothing is touched until the first operation.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into(), write_lock: Default::default() }
	}

	/// Location of the credential file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_document(&self) -> Result<Option<Map<String, JsonValue>>, StoreError> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", self.path.display()),
				}),
		};

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", self.path.display()),
		})
	}

	fn load_now(&self) -> Result<Option<TokenSet>, StoreError> {
		let Some(document) = self.read_document()? else {
			return Ok(None);
		};

		serde_json::from_value(JsonValue::Object(document)).map(Some).map_err(|e| {
			StoreError::Serialization {
				message: format!("Failed to decode credentials in {}: {e}", self.path.display()),
			}
		})
	}

	fn persist_now(&self, tokens: &TokenSet) -> Result<(), StoreError> {
		let _guard = self.write_lock.lock();
		// A corrupt file is replaced rather than blocking rotation.
		let mut document = self.read_document().ok().flatten().unwrap_or_default();
		let JsonValue::Object(fields) =
			serde_json::to_value(tokens).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credentials: {e}"),
			})?
		else {
			return Err(StoreError::Serialization {
				message: "Credentials did not serialize to a JSON object".into(),
			});
		};

		document.remove("refresh_token");
		document.extend(fields);

		let serialized = serde_json::to_vec_pretty(&JsonValue::Object(document)).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize credentials: {e}") }
		})?;

		self.write_atomically(&serialized)
	}

	fn write_atomically(&self, bytes: &[u8]) -> Result<(), StoreError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create credential directory {}: {e}", parent.display()),
			})?;
		}

		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = create_private(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(bytes).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn persist<'a>(&'a self, tokens: &'a TokenSet) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.persist_now(tokens) })
	}

	fn load(&self) -> StoreFuture<'_, Option<TokenSet>> {
		Box::pin(async move { self.load_now() })
	}
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
	// std
	use std::os::unix::fs::OpenOptionsExt;

	OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
	OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		env,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use super::*;
	use crate::_preludet::test_token_set;

	fn temp_path(label: &str) -> PathBuf {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);

		env::temp_dir().join(format!(
			"x-mcp-{label}-{}-{}/credentials.json",
			std::process::id(),
			COUNTER.fetch_add(1, Ordering::Relaxed)
		))
	}

	#[tokio::test]
	async fn persist_then_load_round_trips_tokens() {
		let store = FileStore::new(temp_path("round-trip"));
		let tokens =
			test_token_set("A1", Some("R1"), Duration::ZERO, Duration::seconds(7_200));

		store.persist(&tokens).await.expect("Persisting credentials should succeed.");

		let loaded = store
			.load()
			.await
			.expect("Loading credentials should succeed.")
			.expect("Persisted credentials should be present.");

		assert_eq!(loaded.access_token.expose(), "A1");
		assert_eq!(loaded.refresh_token.as_ref().map(|t| t.expose()), Some("R1"));
		assert_eq!(loaded.expires_at, tokens.expires_at);
		assert!(!store.path().with_extension("tmp").exists());
	}

	#[tokio::test]
	async fn missing_and_empty_files_load_as_none() {
		let store = FileStore::new(temp_path("empty"));

		assert!(store.load().await.expect("Missing file should not error.").is_none());

		fs::create_dir_all(store.path().parent().expect("Temp path has a parent."))
			.expect("Temp directory should be creatable.");
		fs::write(store.path(), b"\n").expect("Empty credential file should be writable.");

		assert!(store.load().await.expect("Empty file should not error.").is_none());
	}

	#[tokio::test]
	async fn malformed_file_reports_serialization_error() {
		let store = FileStore::new(temp_path("malformed"));

		fs::create_dir_all(store.path().parent().expect("Temp path has a parent."))
			.expect("Temp directory should be creatable.");
		fs::write(store.path(), b"{ not json").expect("Fixture should be writable.");

		let err = store.load().await.expect_err("Malformed file must be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		let tokens = test_token_set("A2", None, Duration::ZERO, Duration::hours(2));

		store.persist(&tokens).await.expect("Rotation should replace a corrupt file.");

		assert!(store.load().await.expect("Replaced file should load.").is_some());
	}

	#[tokio::test]
	async fn persist_preserves_foreign_keys_and_drops_stale_refresh_token() {
		let store = FileStore::new(temp_path("merge"));

		fs::create_dir_all(store.path().parent().expect("Temp path has a parent."))
			.expect("Temp directory should be creatable.");
		fs::write(store.path(), br#"{"note":"keep me","refresh_token":"old"}"#)
			.expect("Fixture should be writable.");

		let tokens = test_token_set("A3", None, Duration::ZERO, Duration::hours(2));

		store.persist(&tokens).await.expect("Persisting credentials should succeed.");

		let raw: JsonValue = serde_json::from_slice(
			&fs::read(store.path()).expect("Credential file should be readable."),
		)
		.expect("Credential file should hold JSON.");

		assert_eq!(raw["note"], "keep me");
		assert_eq!(raw["access_token"], "A3");
		assert!(raw.get("refresh_token").is_none());
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn credential_file_is_owner_only() {
		// std
		use std::os::unix::fs::PermissionsExt;

		let store = FileStore::new(temp_path("mode"));
		let tokens = test_token_set("A4", Some("R4"), Duration::ZERO, Duration::hours(2));

		store.persist(&tokens).await.expect("Persisting credentials should succeed.");

		let mode = fs::metadata(store.path())
			.expect("Credential file should exist.")
			.permissions()
			.mode();

		assert_eq!(mode & 0o777, 0o600);
	}
}
