// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ScopeSet, provider::ProviderDescriptor};

// 32 bytes encode to 43 base64url characters, the RFC 7636 minimum verifier length.
const STATE_BYTES: usize = 32;
const PKCE_VERIFIER_BYTES: usize = 32;

/// Supported PKCE challenge methods surfaced via [`AuthorizationSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Verifier/challenge pair for one authorization attempt.
///
/// The verifier is only ever sent in the code exchange and is never persisted.
#[derive(Clone)]
pub struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Draws a fresh verifier from the thread CSPRNG and derives its S256 challenge.
	pub fn generate() -> Self {
		let verifier = random_token(PKCE_VERIFIER_BYTES);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}

	/// Secret verifier for the token exchange.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// Public challenge placed in the authorization URL.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Challenge method (always `S256`).
	pub fn method(&self) -> PkceCodeChallengeMethod {
		self.method
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

/// Authorization Code + PKCE handshake state for a single attempt.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Requested scope set.
	pub scope: ScopeSet,
	/// Opaque CSRF token that must round-trip via the redirect.
	pub state: String,
	/// Redirect URI registered with the X app.
	pub redirect_uri: Url,
	/// Fully formed authorize URL to send the user to.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl AuthorizationSession {
	/// Generates state + PKCE material and assembles the authorize URL.
	pub fn new(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		redirect_uri: Url,
		scope: ScopeSet,
	) -> Self {
		let state = random_token(STATE_BYTES);
		let pkce = PkcePair::generate();
		let authorize_url =
			build_authorize_url(descriptor, client_id, &redirect_uri, &scope, &state, &pkce);

		Self { scope, state, redirect_uri, authorize_url, pkce }
	}

	/// Secret verifier to present in the code exchange.
	pub fn pkce_verifier(&self) -> &str {
		self.pkce.verifier()
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("scope", &self.scope)
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("pkce", &self.pkce)
			.finish()
	}
}

fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
	scope: &ScopeSet,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();

	url.query_pairs_mut()
		.append_pair("response_type", "code")
		.append_pair("client_id", client_id)
		.append_pair("redirect_uri", redirect_uri.as_str())
		.append_pair("scope", &scope.normalized())
		.append_pair("state", state)
		.append_pair("code_challenge", pkce.challenge())
		.append_pair("code_challenge_method", pkce.method().as_str());

	url
}

fn random_token(bytes: usize) -> String {
	let mut buf = vec![0_u8; bytes];

	rand::rng().fill(buf.as_mut_slice());

	URL_SAFE_NO_PAD.encode(buf)
}

/// `base64url(sha256(verifier))` without padding.
pub fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}
