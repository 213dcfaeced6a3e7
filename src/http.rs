//! Transport primitives for Identity Engine requests.
//!
//! The module exposes [`IdxHttpClient`], the crate's only dependency on an
//! HTTP stack. Callers provide an implementation (typically behind
//! `Arc<T>`) and every flow issues its requests through it. Transport
//! failures are wrapped as internal errors without reinterpretation; status
//! handling and body decoding stay with the protocol layer.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
use crate::_prelude::*;

/// Transport-neutral request currency.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Transport-neutral response currency.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed response future returned by transports.
pub type HttpFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing IDX requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be
/// shared read-only across many client instances, and the returned futures
/// must be `Send` so flow futures can hop executors freely.
pub trait IdxHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes one request and resolves with the raw response.
	///
	/// Implementations must not follow redirects: hypermedia addresses are
	/// followed explicitly by the workflow layer, never by the transport.
	fn call(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one
/// place. The default constructor disables redirect following, matching the
/// protocol's rule that every address is walked explicitly.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	///
	/// Configure the client to disable redirect following; the default
	/// constructor already does.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.build()
			.unwrap_or_else(|_| ReqwestClient::new());

		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl IdxHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn call(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = request.try_into()?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
