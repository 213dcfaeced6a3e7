//! The remediation abstraction: one server-offered next step.
//!
//! A remediation carries the form to fill and everything needed to turn the
//! collected values into the next HTTP request. Instances are owned by the
//! [`Response`](crate::response::Response) that produced them and become
//! stale once a newer response supersedes it; submitting is driven through
//! [`IdxClient::proceed`](crate::flow::IdxClient::proceed).

pub mod capability;
pub use capability::*;

// std
use std::collections::HashMap;
// crates.io
use http::{Method, header};
// self
use crate::{
	_prelude::*,
	form::{Form, FormDescriptor},
	http::HttpRequest,
	media::{self, AcceptType},
	response::Authenticator,
	value::Value,
};

/// Closed enumeration of the remediation names the protocol defines.
///
/// Servers are free to introduce new steps; those decode to
/// [`Unrecognized`](Self::Unrecognized) with the raw name preserved instead
/// of failing the whole response.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RemediationKind {
	/// Submit the user identifier (and optionally credentials).
	Identify,
	/// Identify an account for the recovery branch.
	IdentifyRecovery,
	/// Choose to enroll a new profile.
	SelectEnrollProfile,
	/// Submit new profile attributes.
	EnrollProfile,
	/// Choose which authenticator to verify with.
	SelectAuthenticatorAuthenticate,
	/// Choose which authenticator to enroll.
	SelectAuthenticatorEnroll,
	/// Answer an authenticator challenge.
	ChallengeAuthenticator,
	/// Enroll a new authenticator.
	EnrollAuthenticator,
	/// Re-enroll an expiring authenticator (e.g. password rotation).
	ReenrollAuthenticator,
	/// Reset an authenticator after recovery.
	ResetAuthenticator,
	/// Supply data the authenticator needs before verification.
	AuthenticatorVerificationData,
	/// Supply data the authenticator needs before enrollment.
	AuthenticatorEnrollmentData,
	/// Choose a delivery channel for enrollment.
	SelectEnrollmentChannel,
	/// Supply data for the chosen enrollment channel.
	EnrollmentChannelData,
	/// Poll while a challenge completes out of band.
	ChallengePoll,
	/// Poll while an enrollment completes out of band.
	EnrollPoll,
	/// Re-send the pending challenge.
	Resend,
	/// Start the recovery branch for the current authenticator.
	Recover,
	/// Poll the current authenticator.
	Poll,
	/// Skip the optional step.
	Skip,
	/// Unlock a locked account.
	UnlockAccount,
	/// Hand the user agent to an external identity provider.
	RedirectIdp,
	/// Abort the workflow.
	Cancel,
	/// Terminal step carrying the interaction code.
	SuccessWithInteractionCode,
	/// Any name outside the closed set, raw string preserved.
	Unrecognized(String),
}
impl RemediationKind {
	/// Maps a server-supplied name into the enumeration.
	pub fn from_name(name: &str) -> Self {
		match name {
			"identify" => Self::Identify,
			"identify-recovery" => Self::IdentifyRecovery,
			"select-enroll-profile" => Self::SelectEnrollProfile,
			"enroll-profile" => Self::EnrollProfile,
			"select-authenticator-authenticate" => Self::SelectAuthenticatorAuthenticate,
			"select-authenticator-enroll" => Self::SelectAuthenticatorEnroll,
			"challenge-authenticator" => Self::ChallengeAuthenticator,
			"enroll-authenticator" => Self::EnrollAuthenticator,
			"reenroll-authenticator" => Self::ReenrollAuthenticator,
			"reset-authenticator" => Self::ResetAuthenticator,
			"authenticator-verification-data" => Self::AuthenticatorVerificationData,
			"authenticator-enrollment-data" => Self::AuthenticatorEnrollmentData,
			"select-enrollment-channel" => Self::SelectEnrollmentChannel,
			"enrollment-channel-data" => Self::EnrollmentChannelData,
			"challenge-poll" => Self::ChallengePoll,
			"enroll-poll" => Self::EnrollPoll,
			"resend" => Self::Resend,
			"recover" => Self::Recover,
			"poll" => Self::Poll,
			"skip" => Self::Skip,
			"unlock-account" => Self::UnlockAccount,
			"redirect-idp" => Self::RedirectIdp,
			"cancel" => Self::Cancel,
			"successWithInteractionCode" => Self::SuccessWithInteractionCode,
			other => Self::Unrecognized(other.to_owned()),
		}
	}

	/// Returns the wire name of the kind.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Identify => "identify",
			Self::IdentifyRecovery => "identify-recovery",
			Self::SelectEnrollProfile => "select-enroll-profile",
			Self::EnrollProfile => "enroll-profile",
			Self::SelectAuthenticatorAuthenticate => "select-authenticator-authenticate",
			Self::SelectAuthenticatorEnroll => "select-authenticator-enroll",
			Self::ChallengeAuthenticator => "challenge-authenticator",
			Self::EnrollAuthenticator => "enroll-authenticator",
			Self::ReenrollAuthenticator => "reenroll-authenticator",
			Self::ResetAuthenticator => "reset-authenticator",
			Self::AuthenticatorVerificationData => "authenticator-verification-data",
			Self::AuthenticatorEnrollmentData => "authenticator-enrollment-data",
			Self::SelectEnrollmentChannel => "select-enrollment-channel",
			Self::EnrollmentChannelData => "enrollment-channel-data",
			Self::ChallengePoll => "challenge-poll",
			Self::EnrollPoll => "enroll-poll",
			Self::Resend => "resend",
			Self::Recover => "recover",
			Self::Poll => "poll",
			Self::Skip => "skip",
			Self::UnlockAccount => "unlock-account",
			Self::RedirectIdp => "redirect-idp",
			Self::Cancel => "cancel",
			Self::SuccessWithInteractionCode => "successWithInteractionCode",
			Self::Unrecognized(raw) => raw,
		}
	}
}
impl Display for RemediationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One available next step of the workflow.
#[derive(Clone, Debug)]
pub struct Remediation {
	/// Typed kind mapped from the raw name.
	pub kind: RemediationKind,
	/// Raw server-supplied name.
	pub name: String,
	/// HTTP method for the next request.
	pub method: Method,
	/// Target address for the next request.
	pub href: Url,
	/// Negotiated encoding for the next request; `None` when the server
	/// declared a media type this client cannot negotiate.
	pub accepts: Option<AcceptType>,
	form: Form,
	/// Authenticators resolved from the `relatesTo` references.
	pub authenticators: Vec<Authenticator>,
	capabilities: Vec<Capability>,
	/// Poll interval, present only for polling-style remediations.
	pub refresh: Option<Duration>,
	/// Raw related-object references, kept for diagnostics.
	pub relates_to: Vec<String>,
}
impl Remediation {
	pub(crate) fn from_descriptor(descriptor: RemediationDescriptor) -> Result<Self> {
		let RemediationDescriptor { name, method, href, accepts, value, refresh, relates_to, idp } =
			descriptor;
		let kind = RemediationKind::from_name(&name);
		let method = Method::from_bytes(method.as_bytes())
			.map_err(|_| Error::invalid_response_data(format!("invalid HTTP method `{method}`")))?;
		let href = Url::parse(&href)
			.map_err(|err| Error::invalid_response_data(format!("invalid href `{href}`: {err}")))?;
		let accepts = accepts.as_deref().and_then(AcceptType::parse);
		let form = Form::from_descriptor(FormDescriptor { value })?;
		let refresh = refresh.map(|millis| Duration::milliseconds(millis as _));
		let mut capabilities = Vec::new();

		if let Some(interval) = refresh {
			capabilities.push(Capability::Poll { interval });
		}
		if let Some(idp) = idp {
			capabilities.push(Capability::SocialIdp { id: idp.id, service: idp.name });
		}
		if kind == RemediationKind::RedirectIdp {
			capabilities.push(Capability::Redirect { url: href.clone() });
		}

		Ok(Self {
			kind,
			name,
			method,
			href,
			accepts,
			form,
			authenticators: Vec::new(),
			capabilities,
			refresh,
			relates_to: relates_to.unwrap_or_default(),
		})
	}

	/// The form describing the input this step expects.
	pub fn form(&self) -> &Form {
		&self.form
	}

	/// All capabilities advertised for this step.
	pub fn capabilities(&self) -> &[Capability] {
		&self.capabilities
	}

	/// Looks a capability up by tag.
	///
	/// A remediation should not declare the same tag twice; when it does, the
	/// first match wins. This mirrors the upstream protocol's documented
	/// behavior rather than an intended design.
	pub fn capability(&self, tag: CapabilityTag) -> Option<&Capability> {
		self.capabilities.iter().find(|capability| capability.tag() == tag)
	}

	pub(crate) fn attach_capability(&mut self, capability: Capability) {
		self.capabilities.push(capability);
	}

	pub(crate) fn attach_authenticator(&mut self, authenticator: Authenticator) {
		self.authenticators.push(authenticator);
	}

	/// Merges caller values into a copy of the form and collects the
	/// submission parameters.
	///
	/// The remediation itself is a frozen snapshot; neither a failed merge
	/// nor a successful submission mutates it.
	pub fn collect(&self, values: &HashMap<String, Value>) -> Result<HashMap<String, Value>> {
		let mut form = self.form.clone();

		form.merge(values)?;

		Ok(form.collect())
	}

	/// Builds the next HTTP request from the merged form values.
	pub(crate) fn build_request(&self, values: &HashMap<String, Value>) -> Result<HttpRequest> {
		let accepts = self
			.accepts
			.as_ref()
			.ok_or_else(|| Error::cannot_build_request("media type could not be negotiated"))?;
		let parameters = self.collect(values)?;
		let body = accepts.encode(&parameters)?;
		// Replies are ION regardless of how the request body is encoded.
		let accept_header = match accepts {
			AcceptType::IonJson { .. } => accepts.as_header(),
			AcceptType::FormEncoded => media::ION_JSON.to_owned(),
		};

		http::Request::builder()
			.method(self.method.clone())
			.uri(self.href.as_str())
			.header(header::CONTENT_TYPE, accepts.as_header())
			.header(header::ACCEPT, accept_header)
			.body(body)
			.map_err(Error::cannot_build_request)
	}
}

/// Raw wire shape of a remediation descriptor.
#[derive(Debug, Deserialize)]
pub(crate) struct RemediationDescriptor {
	pub name: String,
	pub method: String,
	pub href: String,
	pub accepts: Option<String>,
	#[serde(default)]
	pub value: Vec<crate::form::FieldDescriptor>,
	pub refresh: Option<u64>,
	#[serde(rename = "relatesTo")]
	pub relates_to: Option<Vec<String>>,
	pub idp: Option<IdpDescriptor>,
}

/// Raw wire shape of an external identity-provider reference.
#[derive(Debug, Deserialize)]
pub(crate) struct IdpDescriptor {
	pub id: String,
	pub name: String,
}
