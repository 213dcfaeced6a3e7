//! Opaque, serializable session state linking successive workflow requests.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, config::Configuration};

pub(crate) const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Resumable session state for one workflow run.
///
/// The context is the only thing a caller must persist to survive a process
/// restart: deserialize it back and hand it to
/// [`IdxClient::with_context`](crate::flow::IdxClient::with_context) to keep
/// walking the same flow.
#[derive(Clone, Serialize, Deserialize)]
pub struct Context {
	interaction_handle: String,
	state_handle: Option<String>,
	state: String,
	pkce: PkcePair,
	configuration: Configuration,
}
impl Context {
	pub(crate) fn new(
		configuration: Configuration,
		interaction_handle: String,
		state: String,
		pkce: PkcePair,
	) -> Self {
		Self { interaction_handle, state_handle: None, state, pkce, configuration }
	}

	/// Interaction handle identifying this workflow run server-side.
	pub fn interaction_handle(&self) -> &str {
		&self.interaction_handle
	}

	/// Most recent state token reported by the server, if any.
	pub fn state_handle(&self) -> Option<&str> {
		self.state_handle.as_deref()
	}

	/// OAuth `state` value round-tripping through the redirect handler.
	pub fn state(&self) -> &str {
		&self.state
	}

	/// Configuration this context was created with.
	pub fn configuration(&self) -> &Configuration {
		&self.configuration
	}

	pub(crate) fn code_verifier(&self) -> &str {
		&self.pkce.verifier
	}

	pub(crate) fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	pub(crate) fn set_state_handle(&mut self, state_handle: Option<String>) {
		if state_handle.is_some() {
			self.state_handle = state_handle;
		}
	}
}
impl Debug for Context {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Context")
			.field("interaction_handle", &"<redacted>")
			.field("state_handle", &self.state_handle.as_ref().map(|_| "<redacted>"))
			.field("state", &self.state)
			.field("configuration", &self.configuration)
			.finish()
	}
}

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
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

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct PkcePair {
	pub(crate) verifier: String,
	pub(crate) challenge: String,
	pub(crate) method: PkceCodeChallengeMethod,
}
impl PkcePair {
	pub(crate) fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(verifier.as_bytes());
	let digest = hasher.finalize();
	URL_SAFE_NO_PAD.encode(digest)
}
