//! The workflow state machine driving an Identity Engine session.
//!
//! [`IdxClient`] owns the transport, the configuration, and the active
//! [`Context`]. A session starts with [`start`](IdxClient::start), advances
//! one remediation at a time through [`proceed`](IdxClient::proceed), and
//! ends when a success response is exchanged for a [`Token`]. The client is
//! single-writer with respect to workflow progress: advancing calls
//! serialize on an internal guard, while [`resume`](IdxClient::resume) is an
//! idempotent read.

pub mod context;
pub mod observer;
pub mod redirect;

pub use context::*;
pub use observer::*;
pub use redirect::*;

// std
use std::collections::HashMap;
// self
use crate::{
	_prelude::*,
	config::Configuration,
	http::{HttpRequest, IdxHttpClient},
	media::{self, AcceptType},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	remediation::Remediation,
	response::Response,
	token::{self, RevokeTokenKind, Token},
	value::Value,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

const ION_VERSION: &str = "1.0.0";

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestIdxClient = IdxClient<ReqwestHttpClient>;

/// Caller-tunable options for [`IdxClient::start`].
#[derive(Clone, Debug, Default)]
pub struct StartOptions {
	/// OAuth `state` value; generated randomly when absent.
	pub state: Option<String>,
	/// Extra parameters appended to the interaction-start request.
	pub extra_parameters: Vec<(String, String)>,
}

/// Workflow client coordinating one Identity Engine session at a time.
///
/// The transport is shared read-only and may back any number of clients;
/// context and response chains are never shared between instances. Cloning a
/// client shares its session, so clones observe the same context.
pub struct IdxClient<C>
where
	C: ?Sized + IdxHttpClient,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	configuration: Configuration,
	context: Arc<RwLock<Option<Context>>>,
	observers: Arc<ObserverRegistry>,
	advance_guard: Arc<AsyncMutex<()>>,
}
impl<C> IdxClient<C>
where
	C: ?Sized + IdxHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(configuration: Configuration, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			configuration,
			context: Arc::new(RwLock::new(None)),
			observers: Arc::new(ObserverRegistry::default()),
			advance_guard: Arc::new(AsyncMutex::new(())),
		}
	}

	/// Restores a client around a previously persisted [`Context`].
	///
	/// The context's embedded configuration wins over whatever the caller
	/// persisted separately, so the restored session stays self-consistent.
	pub fn with_context(context: Context, http_client: impl Into<Arc<C>>) -> Self {
		let client = Self::with_http_client(context.configuration().clone(), http_client);

		*client.context.write() = Some(context);

		client
	}

	/// Configuration this client operates with.
	pub fn configuration(&self) -> &Configuration {
		&self.configuration
	}

	/// Snapshot of the current session context, if one is active.
	pub fn context(&self) -> Option<Context> {
		self.context.read().clone()
	}

	/// Consumes the client and hands the active context to the caller, e.g.
	/// for persisting right before shutdown.
	pub fn into_context(self) -> Option<Context> {
		self.context.write().take()
	}

	/// Registers a long-lived observer receiving every workflow outcome.
	pub fn register_observer(&self, observer: Arc<dyn FlowObserver>) {
		self.observers.register(observer);
	}

	/// Starts a fresh workflow: new interaction, new context, first response.
	///
	/// Any previously active session on this client is superseded.
	pub async fn start(&self, options: StartOptions) -> Result<Response> {
		const KIND: FlowKind = FlowKind::Start;

		let span = FlowSpan::new(KIND, "start");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _advance = self.advance_guard.lock().await;
				let pkce = PkcePair::generate();
				let state = options.state.clone().unwrap_or_else(|| random_string(STATE_LEN));
				let interaction_handle = self.interact(&options, &state, &pkce).await?;
				let mut context = Context::new(
					self.configuration.clone(),
					interaction_handle,
					state,
					pkce,
				);
				let response = self.introspect(&context).await?;

				context.set_state_handle(response.state_handle.clone());
				*self.context.write() = Some(context);

				Ok(response)
			})
			.await;

		self.finish_response(KIND, result)
	}

	/// Re-fetches the current workflow state for the active context.
	///
	/// Idempotent read; safe to call concurrently with an advancing call.
	pub async fn resume(&self) -> Result<Response> {
		const KIND: FlowKind = FlowKind::Resume;

		let span = FlowSpan::new(KIND, "resume");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let context = self.context().ok_or(Error::InvalidClient)?;
				let response = self.introspect(&context).await?;

				self.store_state_handle(&response);

				Ok(response)
			})
			.await;

		self.finish_response(KIND, result)
	}

	/// Submits a remediation with the supplied values and returns the next
	/// workflow snapshot.
	///
	/// The new response fully supersedes the one that produced
	/// `remediation`. Calling this twice for the same remediation re-sends
	/// the request; avoiding duplicate side effects is the caller's
	/// responsibility.
	pub async fn proceed(
		&self,
		remediation: &Remediation,
		values: &HashMap<String, Value>,
	) -> Result<Response> {
		const KIND: FlowKind = FlowKind::Proceed;

		let span = FlowSpan::new(KIND, "proceed");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _advance = self.advance_guard.lock().await;

				if self.context().is_none() {
					return Err(Error::InvalidClient);
				}

				let request = remediation.build_request(values)?;
				let reply = self.dispatch(request).await?;
				let response = Response::from_http(reply)?;

				self.store_state_handle(&response);

				Ok(response)
			})
			.await;

		self.finish_response(KIND, result)
	}

	/// Classifies a redirect URL against the configured redirect address.
	///
	/// Pure and synchronous; never mutates the context.
	pub fn evaluate_redirect(&self, url: &Url) -> RedirectResult {
		redirect::evaluate(&self.configuration, url)
	}

	/// Exchanges the interaction code carried by a success response for a
	/// [`Token`], ending the session.
	pub async fn exchange_code(&self, response: &Response) -> Result<Token> {
		const KIND: FlowKind = FlowKind::ExchangeCode;

		let span = FlowSpan::new(KIND, "exchange_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _advance = self.advance_guard.lock().await;
				let context = self.context().ok_or(Error::InvalidClient)?;
				let success =
					response.success_remediation().ok_or(Error::SuccessResponseMissing)?;
				let mut parameters = success.collect(&HashMap::new())?;

				parameters
					.insert("code_verifier".into(), Value::from(context.code_verifier()));

				if let Some(secret) = self.configuration.client_secret.as_deref() {
					parameters.insert("client_secret".into(), Value::from(secret));
				}

				let accepts = success.accepts.clone().ok_or_else(|| {
					Error::cannot_build_request("media type could not be negotiated")
				})?;
				let body = accepts.encode(&parameters)?;
				let request = http::Request::builder()
					.method(success.method.clone())
					.uri(success.href.as_str())
					.header(http::header::CONTENT_TYPE, accepts.as_header())
					.header(http::header::ACCEPT, "application/json")
					.body(body)
					.map_err(Error::cannot_build_request)?;
				let reply = self.dispatch(request).await?;
				let payload = token::decode_token_payload(reply)?;
				let token = Token::from_payload(self.configuration.clone(), payload);

				// The interaction code is single-use; the session is over.
				*self.context.write() = None;

				Ok(token)
			})
			.await;

		self.finish_token(KIND, result)
	}

	/// Exchanges the interaction code carried by a redirect URL, for flows
	/// that complete through the browser.
	pub async fn exchange_code_redirect(&self, url: &Url) -> Result<Token> {
		const KIND: FlowKind = FlowKind::ExchangeCode;

		let span = FlowSpan::new(KIND, "exchange_code_redirect");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _advance = self.advance_guard.lock().await;
				let context = self.context().ok_or(Error::InvalidClient)?;
				let interaction_code = match self.evaluate_redirect(url) {
					RedirectResult::Authenticated { interaction_code, .. } => interaction_code,
					RedirectResult::RemediationRequired => {
						return Err(Error::Oauth {
							summary: Some(
								"The workflow requires further remediation.".into(),
							),
							code: "interaction_required".into(),
							error_id: None,
						});
					},
					RedirectResult::Error { error, description } => {
						return Err(Error::Oauth {
							summary: description,
							code: error,
							error_id: None,
						});
					},
					RedirectResult::Invalid =>
						return Err(Error::InvalidParameter { name: "url".into() }),
				};
				let configuration = &self.configuration;
				let mut pairs = vec![
					("grant_type", "interaction_code"),
					("interaction_code", interaction_code.as_str()),
					("client_id", configuration.client_id.as_str()),
					("code_verifier", context.code_verifier()),
				];

				if let Some(secret) = configuration.client_secret.as_deref() {
					pairs.push(("client_secret", secret));
				}

				let request = token::build_token_request(
					configuration.token_endpoint(),
					media::encode_pairs(pairs),
				)?;
				let reply = self.dispatch(request).await?;
				let payload = token::decode_token_payload(reply)?;
				let token = Token::from_payload(configuration.clone(), payload);

				*self.context.write() = None;

				Ok(token)
			})
			.await;

		self.finish_token(KIND, result)
	}

	/// Refreshes a token through this client's transport.
	pub async fn refresh(&self, token: &Token) -> Result<Token> {
		let result = token.refresh(self.http_client.as_ref()).await;

		self.observers.publish_token(&result);

		result
	}

	/// Revokes one of a token's secrets through this client's transport.
	pub async fn revoke(&self, token: &Token, kind: RevokeTokenKind) -> Result<()> {
		token.revoke(self.http_client.as_ref(), kind).await
	}

	async fn interact(
		&self,
		options: &StartOptions,
		state: &str,
		pkce: &PkcePair,
	) -> Result<String> {
		let configuration = &self.configuration;
		let scope = configuration.scope();
		let mut pairs = vec![
			("client_id", configuration.client_id.as_str()),
			("scope", scope.as_str()),
			("redirect_uri", configuration.redirect_uri.as_str()),
			("code_challenge", pkce.challenge.as_str()),
			("code_challenge_method", pkce.method.as_str()),
			("state", state),
		];

		for (key, value) in &options.extra_parameters {
			pairs.push((key.as_str(), value.as_str()));
		}

		let request = token::build_token_request(
			configuration.interact_endpoint(),
			media::encode_pairs(pairs),
		)?;
		let reply = self.dispatch(request).await?;
		let body = token::ensure_oauth_success(reply)?;
		let mut deserializer = serde_json::Deserializer::from_slice(&body);
		let payload: InteractPayload =
			serde_path_to_error::deserialize(&mut deserializer).map_err(Error::decode)?;

		Ok(payload.interaction_handle)
	}

	async fn introspect(&self, context: &Context) -> Result<Response> {
		let ion = AcceptType::IonJson { version: Some(ION_VERSION.into()) };
		let body = serde_json::to_vec(
			&serde_json::json!({ "interactionHandle": context.interaction_handle() }),
		)
		.map_err(Error::cannot_build_request)?;
		let request = http::Request::builder()
			.method(http::Method::POST)
			.uri(self.configuration.introspect_endpoint().as_str())
			.header(http::header::CONTENT_TYPE, ion.as_header())
			.header(http::header::ACCEPT, ion.as_header())
			.body(body)
			.map_err(Error::cannot_build_request)?;
		let reply = self.dispatch(request).await?;

		Response::from_http(reply)
	}

	async fn dispatch(&self, request: HttpRequest) -> Result<crate::http::HttpResponse> {
		self.http_client.call(request).await.map_err(Error::internal)
	}

	fn store_state_handle(&self, response: &Response) {
		if let Some(context) = self.context.write().as_mut() {
			context.set_state_handle(response.state_handle.clone());
		}
	}

	// Single production point: callers and observers always see the same
	// outcome, exactly once per operation.
	fn finish_response(&self, kind: FlowKind, result: Result<Response>) -> Result<Response> {
		self.observers.publish_response(&result);

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		result
	}

	fn finish_token(&self, kind: FlowKind, result: Result<Token>) -> Result<Token> {
		self.observers.publish_token(&result);

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		result
	}
}
impl<C> Clone for IdxClient<C>
where
	C: ?Sized + IdxHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			configuration: self.configuration.clone(),
			context: self.context.clone(),
			observers: self.observers.clone(),
			advance_guard: self.advance_guard.clone(),
		}
	}
}
impl<C> Debug for IdxClient<C>
where
	C: ?Sized + IdxHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdxClient")
			.field("configuration", &self.configuration)
			.field("context_active", &self.context.read().is_some())
			.finish()
	}
}
#[cfg(feature = "reqwest")]
impl IdxClient<ReqwestHttpClient> {
	/// Creates a client backed by the crate's default reqwest transport.
	pub fn new(configuration: Configuration) -> Self {
		Self::with_http_client(configuration, ReqwestHttpClient::default())
	}
}

impl Remediation {
	/// Submits this step through the provided session handle.
	///
	/// Equivalent to [`IdxClient::proceed`]; a client without a live context
	/// fails with [`Error::InvalidClient`].
	pub async fn proceed<C>(
		&self,
		client: &IdxClient<C>,
		values: &HashMap<String, Value>,
	) -> Result<Response>
	where
		C: ?Sized + IdxHttpClient,
	{
		client.proceed(self, values).await
	}
}

/// Raw interaction-start success payload.
#[derive(Debug, Deserialize)]
struct InteractPayload {
	interaction_handle: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn interact_payload_decodes_the_handle() {
		let payload: InteractPayload =
			serde_json::from_str("{\"interaction_handle\":\"ih-123\"}")
				.expect("Interact payload fixture should deserialize.");

		assert_eq!(payload.interaction_handle, "ih-123");
	}

	#[test]
	fn start_options_default_to_empty() {
		let options = StartOptions::default();

		assert!(options.state.is_none());
		assert!(options.extra_parameters.is_empty());
	}
}
