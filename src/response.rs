//! Decoded Identity Engine replies.
//!
//! A [`Response`] is an immutable snapshot of the workflow state: the ordered
//! remediation collection, server messages, and the success flag. Each new
//! reply fully supersedes the previous one; nothing is merged.

// crates.io
use serde_json::Value as Json;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	error::ServerErrorBody,
	http::HttpResponse,
	remediation::{Capability, Remediation, RemediationDescriptor, RemediationKind},
};

/// Immutable snapshot of one server reply.
#[derive(Debug)]
pub struct Response {
	remediations: Vec<Remediation>,
	success: Option<Remediation>,
	cancel: Option<Remediation>,
	messages: Vec<Message>,
	authenticators: Vec<Authenticator>,
	/// Resumable state token carried by this snapshot.
	pub state_handle: Option<String>,
	/// Instant at which the server will expire this workflow state.
	pub expires_at: Option<OffsetDateTime>,
	/// Server-declared intent of the workflow (e.g. `LOGIN`).
	pub intent: Option<String>,
}
impl Response {
	/// Maps a transport reply to a decoded snapshot.
	///
	/// Non-success statuses surface the typed IDX error body when one is
	/// present and fall back to [`Error::InvalidHttpResponse`] otherwise.
	pub(crate) fn from_http(response: HttpResponse) -> Result<Self> {
		let status = response.status();
		let body = response.into_body();

		if !status.is_success() {
			if let Ok(error) = serde_json::from_slice::<ServerErrorBody>(&body) {
				return Err(error.into());
			}

			return Err(Error::InvalidHttpResponse { status: status.as_u16() });
		}

		Self::from_slice(&body)
	}

	/// Decodes a raw reply body, preserving the JSON path on malformed
	/// payloads.
	pub fn from_slice(body: &[u8]) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_slice(body);
		let descriptor: ResponseDescriptor =
			serde_path_to_error::deserialize(&mut deserializer).map_err(Error::decode)?;

		Self::from_descriptor(descriptor)
	}

	fn from_descriptor(descriptor: ResponseDescriptor) -> Result<Self> {
		let authenticators = collect_authenticators(&descriptor);
		let mut remediations = Vec::new();

		for raw in descriptor.remediation.map(|c| c.value).unwrap_or_default() {
			let mut remediation = Remediation::from_descriptor(raw)?;

			link_authenticators(&mut remediation, &authenticators);
			remediations.push(remediation);
		}

		// Authenticator-embedded sub-forms are offered as first-class steps.
		for current in [&descriptor.current_authenticator, &descriptor.current_authenticator_enrollment]
		{
			let Some(current) = current else { continue };

			for (raw, capability) in current.value.embedded_remediations() {
				let mut lifted = Remediation::from_descriptor(raw)?;

				if lifted.capability(capability.tag()).is_none() {
					lifted.attach_capability(capability);
				}

				link_authenticators(&mut lifted, &authenticators);
				remediations.push(lifted);
			}
		}

		let success =
			descriptor.success_with_interaction_code.map(Remediation::from_descriptor).transpose()?;
		let cancel = descriptor.cancel.map(Remediation::from_descriptor).transpose()?;
		let messages = descriptor.messages.map(|m| m.into_messages()).unwrap_or_default();
		let expires_at = descriptor
			.expires_at
			.as_deref()
			.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok());

		Ok(Self {
			remediations,
			success,
			cancel,
			messages,
			authenticators: authenticators.into_iter().map(|(_, authenticator)| authenticator).collect(),
			state_handle: descriptor.state_handle,
			expires_at,
			intent: descriptor.intent,
		})
	}

	/// Remediations in server-declared order, embedded sub-forms last.
	pub fn remediations(&self) -> &[Remediation] {
		&self.remediations
	}

	/// Looks a remediation up by kind; first match wins.
	pub fn remediation(&self, kind: &RemediationKind) -> Option<&Remediation> {
		self.remediations.iter().find(|remediation| &remediation.kind == kind)
	}

	/// Looks a remediation up by raw server name.
	pub fn remediation_named(&self, name: &str) -> Option<&Remediation> {
		self.remediations.iter().find(|remediation| remediation.name == name)
	}

	/// Returns the remediation for a kind or the missing-option error.
	pub fn require_remediation(&self, kind: &RemediationKind) -> Result<&Remediation> {
		self.remediation(kind)
			.ok_or_else(|| Error::MissingRemediationOption { name: kind.as_str().to_owned() })
	}

	/// `true` once the workflow reached its terminal success state.
	pub fn is_success(&self) -> bool {
		self.success.is_some()
	}

	/// Terminal remediation carrying the interaction code, when present.
	pub fn success_remediation(&self) -> Option<&Remediation> {
		self.success.as_ref()
	}

	/// The remediation that aborts the workflow, when offered.
	pub fn cancel_remediation(&self) -> Option<&Remediation> {
		self.cancel.as_ref()
	}

	/// Top-level server messages; field-scoped messages live on their fields.
	pub fn messages(&self) -> &[Message] {
		&self.messages
	}

	/// All authenticators the reply describes.
	pub fn authenticators(&self) -> &[Authenticator] {
		&self.authenticators
	}

	/// Resolves the first authenticator a remediation relates to.
	pub fn related_authenticator<'a>(
		&self,
		remediation: &'a Remediation,
	) -> Result<&'a Authenticator> {
		remediation.authenticators.first().ok_or(Error::MissingRelatedObject)
	}
}

fn collect_authenticators(descriptor: &ResponseDescriptor) -> Vec<(String, Authenticator)> {
	let mut collected = Vec::new();

	if let Some(current) = &descriptor.current_authenticator {
		collected.push((
			"$.currentAuthenticator".to_owned(),
			current.value.authenticator.clone().into_authenticator(),
		));
	}
	if let Some(current) = &descriptor.current_authenticator_enrollment {
		collected.push((
			"$.currentAuthenticatorEnrollment".to_owned(),
			current.value.authenticator.clone().into_authenticator(),
		));
	}

	for (key, collection) in [
		("authenticators", &descriptor.authenticators),
		("authenticatorEnrollments", &descriptor.authenticator_enrollments),
	] {
		let Some(collection) = collection else { continue };

		for (index, raw) in collection.value.iter().enumerate() {
			collected
				.push((format!("$.{key}.value[{index}]"), raw.clone().into_authenticator()));
		}
	}

	collected
}

fn link_authenticators(remediation: &mut Remediation, resolved: &[(String, Authenticator)]) {
	for reference in remediation.relates_to.clone() {
		if let Some((_, authenticator)) =
			resolved.iter().find(|(candidate, _)| candidate == &reference)
		{
			remediation.attach_authenticator(authenticator.clone());
		}
	}
}

/// A verification method associated with one or more remediations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authenticator {
	/// Server-assigned identifier, absent until enrollment.
	pub id: Option<String>,
	/// Authenticator type (`email`, `password`, ...).
	pub kind: String,
	/// Stable product key (`okta_email`, ...).
	pub key: Option<String>,
	/// Human-readable name for display.
	pub display_name: Option<String>,
	/// Method types the authenticator supports.
	pub methods: Vec<String>,
}

/// Server message attached to a response or a specific field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
	/// Human-readable message text.
	pub text: String,
	/// Localization key for translating the text.
	pub localization_key: Option<String>,
	/// Severity class of the message.
	pub class: MessageClass,
}

/// Severity classes the protocol emits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageClass {
	/// Blocking problem the user must address.
	Error,
	/// Informational notice.
	Info,
	/// Any class outside the known set, raw string preserved.
	Unrecognized(String),
}
impl MessageClass {
	fn from_raw(raw: Option<String>) -> Self {
		match raw.as_deref() {
			Some("ERROR") => Self::Error,
			None | Some("INFO") => Self::Info,
			Some(other) => Self::Unrecognized(other.to_owned()),
		}
	}
}

/// Raw wire shape of the top-level reply.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseDescriptor {
	#[serde(rename = "stateHandle")]
	pub state_handle: Option<String>,
	#[serde(rename = "expiresAt")]
	pub expires_at: Option<String>,
	pub intent: Option<String>,
	pub remediation: Option<CollectionDescriptor<RemediationDescriptor>>,
	pub messages: Option<MessagesDescriptor>,
	pub authenticators: Option<CollectionDescriptor<AuthenticatorDescriptor>>,
	#[serde(rename = "authenticatorEnrollments")]
	pub authenticator_enrollments: Option<CollectionDescriptor<AuthenticatorDescriptor>>,
	#[serde(rename = "currentAuthenticator")]
	pub current_authenticator: Option<CurrentAuthenticatorDescriptor>,
	#[serde(rename = "currentAuthenticatorEnrollment")]
	pub current_authenticator_enrollment: Option<CurrentAuthenticatorDescriptor>,
	#[serde(rename = "successWithInteractionCode")]
	pub success_with_interaction_code: Option<RemediationDescriptor>,
	pub cancel: Option<RemediationDescriptor>,
}

/// Generic `{"type": "array", "value": [...]}` wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct CollectionDescriptor<T> {
	#[serde(default = "Vec::new")]
	pub value: Vec<T>,
}

/// Raw wire shape of an authenticator.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct AuthenticatorDescriptor {
	pub id: Option<String>,
	#[serde(rename = "type")]
	pub kind: String,
	pub key: Option<String>,
	#[serde(rename = "displayName")]
	pub display_name: Option<String>,
	#[serde(default)]
	pub methods: Vec<MethodDescriptor>,
}
impl AuthenticatorDescriptor {
	fn into_authenticator(self) -> Authenticator {
		Authenticator {
			id: self.id,
			kind: self.kind,
			key: self.key,
			display_name: self.display_name,
			methods: self.methods.into_iter().map(|method| method.kind).collect(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MethodDescriptor {
	#[serde(rename = "type")]
	pub kind: String,
}

/// `currentAuthenticator`-style wrapper carrying embedded sub-forms.
#[derive(Debug, Deserialize)]
pub(crate) struct CurrentAuthenticatorDescriptor {
	pub value: EmbeddedAuthenticatorDescriptor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddedAuthenticatorDescriptor {
	#[serde(flatten)]
	pub authenticator: AuthenticatorDescriptor,
	pub resend: Option<Json>,
	pub recover: Option<Json>,
	pub poll: Option<Json>,
}
impl EmbeddedAuthenticatorDescriptor {
	/// Yields the embedded sub-forms together with the capability they imply.
	fn embedded_remediations(&self) -> Vec<(RemediationDescriptor, Capability)> {
		let mut lifted = Vec::new();

		if let Some(descriptor) = decode_embedded(&self.resend) {
			lifted.push((descriptor, Capability::Resend));
		}
		if let Some(descriptor) = decode_embedded(&self.recover) {
			lifted.push((descriptor, Capability::Recover));
		}
		if let Some(descriptor) = decode_embedded(&self.poll) {
			let interval = Duration::milliseconds(descriptor.refresh.unwrap_or(4000) as _);

			lifted.push((descriptor, Capability::Poll { interval }));
		}

		lifted
	}
}

fn decode_embedded(raw: &Option<Json>) -> Option<RemediationDescriptor> {
	raw.as_ref().and_then(|json| serde_json::from_value(json.clone()).ok())
}

/// Raw wire shape of a message collection.
#[derive(Debug, Deserialize)]
pub(crate) struct MessagesDescriptor {
	#[serde(default = "Vec::new")]
	pub value: Vec<MessageDescriptor>,
}
impl MessagesDescriptor {
	pub(crate) fn into_messages(self) -> Vec<Message> {
		self.value
			.into_iter()
			.map(|raw| Message {
				text: raw.message,
				localization_key: raw.i18n.map(|i18n| i18n.key),
				class: MessageClass::from_raw(raw.class),
			})
			.collect()
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageDescriptor {
	pub message: String,
	pub i18n: Option<I18nDescriptor>,
	pub class: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct I18nDescriptor {
	pub key: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::remediation::CapabilityTag;

	fn response(json: Json) -> Response {
		Response::from_slice(&serde_json::to_vec(&json).expect("Fixture should serialize."))
			.expect("Response fixture should decode.")
	}

	#[test]
	fn remediation_lookup_by_kind_and_name() {
		let response = response(serde_json::json!({
			"stateHandle": "02state",
			"remediation": {"type": "array", "value": [
				{"name": "identify", "method": "POST",
					"href": "https://example.okta.com/idp/idx/identify",
					"accepts": "application/ion+json; okta-version=1.0.0",
					"value": [{"name": "identifier"}]},
				{"name": "future-step", "method": "POST",
					"href": "https://example.okta.com/idp/idx/future",
					"accepts": "application/ion+json; okta-version=1.0.0",
					"value": []},
			]},
		}));

		assert!(!response.is_success());
		assert_eq!(response.remediations().len(), 2);
		assert!(response.remediation(&RemediationKind::Identify).is_some());
		assert!(response.remediation_named("future-step").is_some());
		assert!(matches!(
			response
				.require_remediation(&RemediationKind::Cancel)
				.expect_err("Missing kinds must surface the missing-option error."),
			Error::MissingRemediationOption { ref name } if name == "cancel",
		));
	}

	#[test]
	fn success_reply_sets_the_terminal_flag() {
		let response = response(serde_json::json!({
			"stateHandle": "02state",
			"successWithInteractionCode": {
				"name": "successWithInteractionCode",
				"method": "POST",
				"href": "https://example.okta.com/oauth2/v1/token",
				"accepts": "application/x-www-form-urlencoded",
				"value": [
					{"name": "grant_type", "required": true, "value": "interaction_code"},
					{"name": "interaction_code", "required": true, "value": "the-code", "mutable": false},
					{"name": "client_id", "required": true, "value": "client-123"},
				],
			},
		}));

		assert!(response.is_success());

		let success =
			response.success_remediation().expect("Success remediation should be retained.");

		assert_eq!(success.kind, RemediationKind::SuccessWithInteractionCode);
	}

	#[test]
	fn relates_to_references_resolve_to_authenticators() {
		let response = response(serde_json::json!({
			"stateHandle": "02state",
			"remediation": {"type": "array", "value": [
				{"name": "challenge-authenticator", "method": "POST",
					"href": "https://example.okta.com/idp/idx/challenge/answer",
					"accepts": "application/ion+json; okta-version=1.0.0",
					"relatesTo": ["$.currentAuthenticatorEnrollment"],
					"value": []},
			]},
			"currentAuthenticatorEnrollment": {"type": "object", "value": {
				"type": "email",
				"key": "okta_email",
				"id": "aut-email",
				"displayName": "Email",
				"methods": [{"type": "email"}],
			}},
		}));
		let challenge = response
			.remediation(&RemediationKind::ChallengeAuthenticator)
			.expect("Challenge remediation should decode.");
		let authenticator = response
			.related_authenticator(challenge)
			.expect("relatesTo reference should resolve.");

		assert_eq!(authenticator.kind, "email");
		assert_eq!(authenticator.display_name.as_deref(), Some("Email"));
	}

	#[test]
	fn dangling_relates_to_surfaces_on_lookup_only() {
		let response = response(serde_json::json!({
			"stateHandle": "02state",
			"remediation": {"type": "array", "value": [
				{"name": "challenge-authenticator", "method": "POST",
					"href": "https://example.okta.com/idp/idx/challenge/answer",
					"accepts": "application/ion+json; okta-version=1.0.0",
					"relatesTo": ["$.authenticators.value[9]"],
					"value": []},
			]},
		}));
		let challenge = response
			.remediation(&RemediationKind::ChallengeAuthenticator)
			.expect("Decode should tolerate dangling references.");
		let err = response
			.related_authenticator(challenge)
			.expect_err("Dangling references must fail on lookup.");

		assert!(matches!(err, Error::MissingRelatedObject));
	}

	#[test]
	fn embedded_resend_forms_are_lifted_with_their_capability() {
		let response = response(serde_json::json!({
			"stateHandle": "02state",
			"remediation": {"type": "array", "value": []},
			"currentAuthenticatorEnrollment": {"type": "object", "value": {
				"type": "email",
				"id": "aut-email",
				"resend": {
					"name": "resend",
					"method": "POST",
					"href": "https://example.okta.com/idp/idx/challenge/resend",
					"accepts": "application/ion+json; okta-version=1.0.0",
					"value": [],
				},
			}},
		}));
		let resend = response
			.remediation(&RemediationKind::Resend)
			.expect("Embedded resend form should be lifted into the remediation list.");

		assert_eq!(resend.capability(CapabilityTag::Resend), Some(&Capability::Resend));
	}

	#[test]
	fn messages_decode_with_class_and_key() {
		let response = response(serde_json::json!({
			"stateHandle": "02state",
			"messages": {"type": "array", "value": [
				{"message": "Authentication failed", "class": "ERROR",
					"i18n": {"key": "errors.E0000004"}},
				{"message": "Check your email", "class": "INFO"},
			]},
		}));

		assert_eq!(response.messages().len(), 2);
		assert_eq!(response.messages()[0].class, MessageClass::Error);
		assert_eq!(
			response.messages()[0].localization_key.as_deref(),
			Some("errors.E0000004"),
		);
		assert_eq!(response.messages()[1].class, MessageClass::Info);
	}
}
