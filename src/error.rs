//! Client-level error types shared across the flow, form, and token layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Configuration(#[from] crate::config::ConfigurationError),

	/// Operation invoked without a live workflow session.
	#[error("No active workflow session is available.")]
	InvalidClient,
	/// The outgoing request could not be assembled.
	#[error("Request could not be constructed: {reason}.")]
	CannotBuildRequest {
		/// Human-readable description of the construction failure.
		reason: String,
	},
	/// Server replied with a status the protocol does not account for.
	#[error("Server returned an unexpected HTTP response: {status}.")]
	InvalidHttpResponse {
		/// HTTP status code of the offending response.
		status: u16,
	},
	/// Server body was well-formed HTTP but could not be decoded.
	#[error("Server response data could not be decoded: {reason}.")]
	InvalidResponseData {
		/// What made the payload undecodable.
		reason: String,
		/// Structured decoding failure, when one is available.
		#[source]
		source: Option<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// Supplied parameters do not match the negotiated wire encoding.
	#[error("Request data does not fit the negotiated encoding: {reason}.")]
	InvalidRequestData {
		/// Which parameter shape was rejected.
		reason: String,
	},
	/// Typed error body returned by the Identity Engine.
	#[error("Server reported an error: {message}.")]
	Server {
		/// Human-readable error text from the server.
		message: String,
		/// Localization key accompanying the message, if any.
		localization_key: Option<String>,
		/// Server-assigned error classification, if any.
		kind: Option<String>,
	},
	/// Transport or platform failure wrapped without reinterpretation.
	#[error("Internal error occurred.")]
	Internal {
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
	/// Internal failure described only by a message.
	#[error("{0}")]
	InternalMessage(String),
	/// OAuth error body returned by the token endpoint.
	#[error("Token endpoint returned an OAuth error: {code}.")]
	Oauth {
		/// Human-readable summary (`error_description`), if supplied.
		summary: Option<String>,
		/// OAuth error code (`error`).
		code: String,
		/// Server-side error identifier, if supplied.
		error_id: Option<String>,
	},

	/// A named parameter does not exist.
	#[error("Unknown parameter: {name}.")]
	InvalidParameter {
		/// Name of the missing parameter.
		name: String,
	},
	/// A named parameter exists but the supplied value has the wrong shape.
	#[error("Parameter `{name}` expects a {expected} value.")]
	InvalidParameterValue {
		/// Name of the offending parameter.
		name: String,
		/// Expected value kind.
		expected: &'static str,
	},
	/// A named parameter cannot be changed by the caller.
	#[error("Parameter `{name}` is immutable.")]
	ParameterImmutable {
		/// Name of the immutable parameter.
		name: String,
	},
	/// A required parameter was not supplied.
	#[error("Missing required parameter: {name}.")]
	MissingRequiredParameter {
		/// Name of the absent parameter.
		name: String,
	},

	/// The response does not offer the requested remediation.
	#[error("Remediation `{name}` is not available in the current response.")]
	MissingRemediationOption {
		/// Requested remediation name.
		name: String,
	},
	/// The supplied value matches none of a field's declared options.
	#[error("Value matches no option of field `{name}`.")]
	UnknownRemediationOption {
		/// Name of the option-bearing field.
		name: String,
	},
	/// Code exchange was attempted before the workflow reached success.
	#[error("Workflow has not produced a success response yet.")]
	SuccessResponseMissing,
	/// Refresh was requested for a token that carries no refresh secret.
	#[error("Token is missing a refresh token.")]
	MissingRefreshToken,
	/// A `relatesTo` reference points at an object the response does not contain.
	#[error("Related object reference cannot be resolved.")]
	MissingRelatedObject,
}
impl Error {
	/// Wraps a transport or platform failure as an internal error.
	pub fn internal(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Internal { source: Box::new(src) }
	}

	/// Builds a request-construction failure from any displayable reason.
	pub(crate) fn cannot_build_request(reason: impl Display) -> Self {
		Self::CannotBuildRequest { reason: reason.to_string() }
	}

	/// Flags a well-formed payload whose shape the protocol does not allow.
	pub(crate) fn invalid_response_data(reason: impl Display) -> Self {
		Self::InvalidResponseData { reason: reason.to_string(), source: None }
	}

	/// Wraps a structured JSON decoding failure, keeping the failing path.
	pub(crate) fn decode(source: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::InvalidResponseData { reason: "malformed JSON body".into(), source: Some(source) }
	}
}

/// Typed IDX error body surfaced as [`Error::Server`].
#[derive(Debug, Deserialize)]
pub(crate) struct ServerErrorBody {
	pub message: String,
	#[serde(rename = "localizationKey")]
	pub localization_key: Option<String>,
	#[serde(rename = "type")]
	pub kind: Option<String>,
}
impl From<ServerErrorBody> for Error {
	fn from(body: ServerErrorBody) -> Self {
		Self::Server {
			message: body.message,
			localization_key: body.localization_key,
			kind: body.kind,
		}
	}
}

/// OAuth error body surfaced as [`Error::Oauth`].
#[derive(Debug, Deserialize)]
pub(crate) struct OauthErrorBody {
	pub error: String,
	pub error_description: Option<String>,
	#[serde(rename = "errorId")]
	pub error_id: Option<String>,
}
impl From<OauthErrorBody> for Error {
	fn from(body: OauthErrorBody) -> Self {
		Self::Oauth { summary: body.error_description, code: body.error, error_id: body.error_id }
	}
}
