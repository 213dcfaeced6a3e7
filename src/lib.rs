//! Rust client for Okta's Identity Engine—walk hypermedia remediation forms,
//! negotiate ION wire formats, and mint interaction-code tokens in one crate
//! built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod flow;
pub mod form;
pub mod http;
pub mod media;
pub mod obs;
pub mod remediation;
pub mod response;
pub mod token;
pub mod value;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{config::Configuration, flow::IdxClient, http::ReqwestHttpClient};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = IdxClient<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs an [`IdxClient`] backed by the reqwest transport used across
	/// integration tests.
	pub fn build_reqwest_test_client(configuration: Configuration) -> ReqwestTestClient {
		IdxClient::with_http_client(configuration, test_reqwest_http_client())
	}

	/// Builds a configuration pointed at a mock server base URL.
	pub fn test_configuration(issuer: &str) -> Configuration {
		Configuration::builder()
			.issuer(Url::parse(issuer).expect("Test issuer URL should parse successfully."))
			.client_id("client-test")
			.scopes(["openid", "profile", "offline_access"])
			.redirect_uri(
				Url::parse("com.example.app:/callback")
					.expect("Test redirect URI should parse successfully."),
			)
			.build()
			.expect("Test configuration should build successfully.")
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _};
