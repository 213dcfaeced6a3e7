//! Wire-format negotiation between the two encodings the protocol speaks.
//!
//! Remediations declare how their next request must be encoded; this module
//! owns the media-type constants, the header parser, and the parameter
//! encoders. Unrecognized media types parse to a typed absence rather than an
//! error so callers can stop negotiating cleanly.

// std
use std::collections::HashMap;
// crates.io
use serde_json::{Map as JsonMap, Value as Json};
use url::form_urlencoded;
// self
use crate::{_prelude::*, value::Value};

/// Media type for percent-encoded key/value request bodies.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// Media type for the protocol's structured ION JSON bodies.
pub const ION_JSON: &str = "application/ion+json";

const ION_VERSION_MARKER: &str = "okta-version=";

/// Negotiated wire encoding for a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptType {
	/// `application/x-www-form-urlencoded`; parameters restricted to text.
	FormEncoded,
	/// `application/ion+json`, optionally carrying an `okta-version` tag.
	IonJson {
		/// Protocol version captured from the header, if present.
		version: Option<String>,
	},
}
impl AcceptType {
	/// Parses a media-type header value.
	///
	/// Returns `None` for anything that is neither the form-encoded constant
	/// nor an ION JSON value; callers must treat that absence as a hard
	/// negotiation stop.
	pub fn parse(raw: &str) -> Option<Self> {
		let trimmed = raw.trim();

		if trimmed == FORM_URLENCODED {
			return Some(Self::FormEncoded);
		}
		if trimmed.starts_with(ION_JSON) {
			let version = trimmed
				.find(ION_VERSION_MARKER)
				.map(|at| trimmed[at + ION_VERSION_MARKER.len()..].to_owned());

			return Some(Self::IonJson { version });
		}

		None
	}

	/// Renders the header value, re-adding the version tag only when present.
	pub fn as_header(&self) -> String {
		match self {
			Self::FormEncoded => FORM_URLENCODED.to_owned(),
			Self::IonJson { version: None } => ION_JSON.to_owned(),
			Self::IonJson { version: Some(version) } =>
				format!("{ION_JSON}; {ION_VERSION_MARKER}{version}"),
		}
	}

	/// Encodes a parameter mapping into a request body for this media type.
	///
	/// Form encoding rejects any non-text parameter with
	/// [`Error::InvalidRequestData`]. ION encoding produces JSON whose object
	/// keys are sorted lexicographically so request bodies stay deterministic.
	pub fn encode(&self, parameters: &HashMap<String, Value>) -> Result<Vec<u8>> {
		match self {
			Self::FormEncoded => encode_form(parameters),
			Self::IonJson { .. } => encode_ion(parameters),
		}
	}
}
impl Display for AcceptType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.as_header())
	}
}

/// Percent-encodes literal key/value pairs for OAuth endpoint bodies.
pub(crate) fn encode_pairs<'a, I>(pairs: I) -> Vec<u8>
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let mut serializer = form_urlencoded::Serializer::new(String::new());

	for (key, value) in pairs {
		serializer.append_pair(key, value);
	}

	serializer.finish().into_bytes()
}

fn encode_form(parameters: &HashMap<String, Value>) -> Result<Vec<u8>> {
	let mut keys = parameters.keys().collect::<Vec<_>>();

	// Sorted for deterministic bodies; form parameter order is not significant.
	keys.sort();

	let mut serializer = form_urlencoded::Serializer::new(String::new());

	for key in keys {
		let Some(text) = parameters[key.as_str()].as_str() else {
			return Err(Error::InvalidRequestData {
				reason: format!("form-encoded parameter `{key}` must be text"),
			});
		};

		serializer.append_pair(key, text);
	}

	Ok(serializer.finish().into_bytes())
}

fn encode_ion(parameters: &HashMap<String, Value>) -> Result<Vec<u8>> {
	// serde_json's default Map is BTreeMap-backed, so keys serialize sorted.
	let mut body = JsonMap::new();

	for (key, value) in parameters {
		body.insert(key.clone(), value.to_json()?);
	}

	serde_json::to_vec(&Json::Object(body))
		.map_err(|err| Error::InternalMessage(format!("ION body serialization failed: {err}")))
}
