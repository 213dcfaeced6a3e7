//! Pure classification of authorization redirect URLs.

// std
use std::collections::HashMap;
// self
use crate::{_prelude::*, config::Configuration};

/// Outcome of classifying a redirect URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectResult {
	/// The redirect carries an interaction code ready for exchange.
	Authenticated {
		/// Interaction code to exchange for tokens.
		interaction_code: String,
		/// OAuth `state` echoed back by the server, if present.
		state: Option<String>,
	},
	/// The server requires further remediation before issuing a code.
	RemediationRequired,
	/// The URL does not match the configured redirect address or carries no
	/// recognizable parameters.
	Invalid,
	/// The server reported an error through the redirect.
	Error {
		/// OAuth error code.
		error: String,
		/// Human-readable description, when supplied.
		description: Option<String>,
	},
}

/// Classifies `url` against the configuration's redirect address.
///
/// An `error` parameter wins over any code parameter, so a matching address
/// carrying both never classifies as authenticated.
pub(crate) fn evaluate(configuration: &Configuration, url: &Url) -> RedirectResult {
	let expected = &configuration.redirect_uri;

	if url.scheme() != expected.scheme()
		|| url.host_str() != expected.host_str()
		|| url.port() != expected.port()
		|| url.path() != expected.path()
	{
		return RedirectResult::Invalid;
	}

	let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

	if let Some(error) = query.get("error") {
		if error == "interaction_required" {
			return RedirectResult::RemediationRequired;
		}

		return RedirectResult::Error {
			error: error.clone(),
			description: query.get("error_description").cloned(),
		};
	}
	if let Some(code) = query.get("interaction_code").or_else(|| query.get("code")) {
		return RedirectResult::Authenticated {
			interaction_code: code.clone(),
			state: query.get("state").cloned(),
		};
	}

	RedirectResult::Invalid
}
