//! Terminal credential bundle and its refresh/revoke lifecycle.
//!
//! A [`Token`] is minted exactly once by the interaction-code exchange and is
//! never mutated afterwards; refreshing yields a brand-new value. The bundle
//! embeds the [`Configuration`] it was minted with so refresh and revocation
//! keep working after the token round-trips through storage.

// crates.io
use http::{Method, header};
// self
use crate::{
	_prelude::*,
	config::Configuration,
	error::OauthErrorBody,
	http::{HttpRequest, HttpResponse, IdxHttpClient},
	media::{self, FORM_URLENCODED},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Redacted secret wrapper keeping token material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Which secret a revocation request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevokeTokenKind {
	/// Revoke the access token.
	AccessToken,
	/// Revoke the refresh token (cascades to the access token server-side).
	RefreshToken,
}
impl RevokeTokenKind {
	/// The `token_type_hint` value sent to the revocation endpoint.
	pub const fn type_hint(self) -> &'static str {
		match self {
			RevokeTokenKind::AccessToken => "access_token",
			RevokeTokenKind::RefreshToken => "refresh_token",
		}
	}
}

/// Credentials minted by a successful interaction-code exchange.
#[derive(Clone, Serialize, Deserialize)]
pub struct Token {
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Token type reported by the server (`Bearer`).
	pub token_type: String,
	/// Validity window relative to [`issued_at`](Self::issued_at).
	pub expires_in: Duration,
	/// Scopes granted, when the server reports them.
	pub scope: Option<String>,
	/// Refresh token secret, if the application is allowed to refresh.
	pub refresh_token: Option<TokenSecret>,
	/// OpenID Connect identity token, when requested.
	pub id_token: Option<TokenSecret>,
	/// Instant this bundle was minted locally.
	pub issued_at: OffsetDateTime,
	/// Configuration the token was minted with.
	pub configuration: Configuration,
}
impl Token {
	pub(crate) fn from_payload(configuration: Configuration, payload: TokenPayload) -> Self {
		Self {
			access_token: TokenSecret::new(payload.access_token),
			token_type: payload.token_type,
			expires_in: Duration::seconds(payload.expires_in as _),
			scope: payload.scope,
			refresh_token: payload.refresh_token.map(TokenSecret::new),
			id_token: payload.id_token.map(TokenSecret::new),
			issued_at: OffsetDateTime::now_utc(),
			configuration,
		}
	}

	/// Instant at which the access token expires.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at + self.expires_in
	}

	/// Whether the access token has expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		OffsetDateTime::now_utc() >= self.expires_at()
	}

	/// Exchanges the refresh token for a brand-new [`Token`].
	///
	/// The original value is left untouched. Non-access fields may differ
	/// from the original depending on server policy; when the server omits a
	/// rotated refresh token, the prior one is carried over.
	pub async fn refresh<C>(&self, http_client: &C) -> Result<Self>
	where
		C: ?Sized + IdxHttpClient,
	{
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let refresh_token =
					self.refresh_token.as_ref().ok_or(Error::MissingRefreshToken)?;
				let configuration = &self.configuration;
				let scope = configuration.scope();
				let mut pairs = vec![
					("grant_type", "refresh_token"),
					("refresh_token", refresh_token.expose()),
					("client_id", configuration.client_id.as_str()),
					("scope", scope.as_str()),
				];

				if let Some(secret) = configuration.client_secret.as_deref() {
					pairs.push(("client_secret", secret));
				}

				let request =
					build_token_request(configuration.token_endpoint(), media::encode_pairs(pairs))?;
				let response = http_client.call(request).await.map_err(Error::internal)?;
				let payload = decode_token_payload(response)?;
				let mut token = Self::from_payload(configuration.clone(), payload);

				if token.refresh_token.is_none() {
					token.refresh_token = self.refresh_token.clone();
				}

				Ok(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Revokes the selected secret; fire-and-forget, no body expected back.
	///
	/// Fails before any request is sent when the selected secret is absent.
	pub async fn revoke<C>(&self, http_client: &C, kind: RevokeTokenKind) -> Result<()>
	where
		C: ?Sized + IdxHttpClient,
	{
		const KIND: FlowKind = FlowKind::Revoke;

		let span = FlowSpan::new(KIND, "revoke");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let secret = match kind {
					RevokeTokenKind::AccessToken if self.access_token.expose().is_empty() =>
						return Err(Error::MissingRequiredParameter { name: "token".into() }),
					RevokeTokenKind::AccessToken => self.access_token.expose(),
					RevokeTokenKind::RefreshToken => self
						.refresh_token
						.as_ref()
						.ok_or(Error::MissingRefreshToken)?
						.expose(),
				};
				let configuration = &self.configuration;
				let mut pairs = vec![
					("token_type_hint", kind.type_hint()),
					("token", secret),
					("client_id", configuration.client_id.as_str()),
				];

				if let Some(client_secret) = configuration.client_secret.as_deref() {
					pairs.push(("client_secret", client_secret));
				}

				let request = build_token_request(
					configuration.revoke_endpoint(),
					media::encode_pairs(pairs),
				)?;
				let response = http_client.call(request).await.map_err(Error::internal)?;

				ensure_oauth_success(response).map(|_| ())
			})
			.await;

		match &result {
			Ok(()) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.finish()
	}
}

/// Raw token-endpoint success payload.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenPayload {
	pub access_token: String,
	pub token_type: String,
	pub expires_in: u64,
	pub scope: Option<String>,
	pub refresh_token: Option<String>,
	pub id_token: Option<String>,
}

/// Builds a form-encoded POST against an OAuth endpoint.
pub(crate) fn build_token_request(endpoint: Url, body: Vec<u8>) -> Result<HttpRequest> {
	http::Request::builder()
		.method(Method::POST)
		.uri(endpoint.as_str())
		.header(header::CONTENT_TYPE, FORM_URLENCODED)
		.header(header::ACCEPT, "application/json")
		.body(body)
		.map_err(Error::cannot_build_request)
}

/// Maps a token-endpoint reply to its body, surfacing typed OAuth errors.
pub(crate) fn ensure_oauth_success(response: HttpResponse) -> Result<Vec<u8>> {
	let status = response.status();
	let body = response.into_body();

	if status.is_success() {
		return Ok(body);
	}
	if let Ok(error) = serde_json::from_slice::<OauthErrorBody>(&body) {
		return Err(error.into());
	}

	Err(Error::InvalidHttpResponse { status: status.as_u16() })
}

/// Decodes a token-endpoint success payload, keeping the failing JSON path.
pub(crate) fn decode_token_payload(response: HttpResponse) -> Result<TokenPayload> {
	let body = ensure_oauth_success(response)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(Error::decode)
}
