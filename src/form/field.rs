//! Field model plus the raw wire descriptors it decodes from.

// crates.io
use serde_json::Value as Json;
// self
use crate::{_prelude::*, form::Form, response::Message, value::Value};

/// One expected input inside a [`Form`].
#[derive(Clone, Debug)]
pub struct Field {
	name: String,
	label: Option<String>,
	kind: Option<String>,
	required: bool,
	mutable: bool,
	secret: bool,
	visible: bool,
	value: Option<Value>,
	form: Option<Form>,
	options: Vec<FieldOption>,
	selected: Option<usize>,
	messages: Vec<Message>,
}
impl Field {
	pub(crate) fn from_descriptor(descriptor: FieldDescriptor) -> Result<Self> {
		let FieldDescriptor {
			name,
			label,
			kind,
			required,
			mutable,
			secret,
			visible,
			value,
			form,
			options,
			messages,
		} = descriptor;
		let name =
			name.ok_or_else(|| Error::invalid_response_data("form field is missing a name"))?;
		// `value` may itself be a composite carrying a `form` key.
		let (value, embedded_form) = match value {
			Some(Json::Object(mut map)) if map.contains_key("form") => {
				let nested = map
					.remove("form")
					.map(serde_json::from_value::<FormDescriptor>)
					.transpose()
					.map_err(Error::invalid_response_data)?
					.map(Form::from_descriptor)
					.transpose()?;

				(None, nested)
			},
			Some(json) => (Some(Value::from_json(json)), None),
			None => (None, None),
		};
		let form = match form {
			Some(descriptor) => Some(Form::from_descriptor(descriptor)?),
			None => embedded_form,
		};
		let options = options
			.unwrap_or_default()
			.into_iter()
			.map(FieldOption::from_descriptor)
			.collect::<Result<Vec<_>>>()?;

		Ok(Self {
			name,
			label,
			kind,
			required: required.unwrap_or(false),
			mutable: mutable.unwrap_or(true),
			secret: secret.unwrap_or(false),
			visible: visible.unwrap_or(true),
			value,
			form,
			options,
			selected: None,
			messages: messages.map(|m| m.into_messages()).unwrap_or_default(),
		})
	}

	/// Field name, unique within the owning form.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Display label, when the server supplies one.
	pub fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	/// Declared value kind (`string`, `object`, ...), when supplied.
	pub fn kind(&self) -> Option<&str> {
		self.kind.as_deref()
	}

	/// Whether the server marked the field required.
	pub fn is_required(&self) -> bool {
		self.required
	}

	/// Whether the caller may overwrite the field's value.
	pub fn is_mutable(&self) -> bool {
		self.mutable
	}

	/// Whether the value should be masked in UIs.
	pub fn is_secret(&self) -> bool {
		self.secret
	}

	/// Whether the field is meant to be rendered.
	pub fn is_visible(&self) -> bool {
		self.visible
	}

	/// Current value, either server-preset or caller-written.
	pub fn value(&self) -> Option<&Value> {
		self.value.as_ref()
	}

	/// Nested form carrying this field's composite value.
	pub fn form(&self) -> Option<&Form> {
		self.form.as_ref()
	}

	pub(crate) fn form_mut(&mut self) -> Option<&mut Form> {
		self.form.as_mut()
	}

	/// Declared options for discriminated choices.
	pub fn options(&self) -> &[FieldOption] {
		&self.options
	}

	/// Currently selected option, if any.
	pub fn selected_option(&self) -> Option<&FieldOption> {
		self.selected.and_then(|index| self.options.get(index))
	}

	/// Server messages attached to this specific field.
	pub fn messages(&self) -> &[Message] {
		&self.messages
	}

	pub(crate) fn set_value(&mut self, value: Value) {
		self.value = Some(value);
	}

	/// Selects the option whose label or scalar value matches `choice`.
	pub(crate) fn select(&mut self, choice: &str) -> Result<()> {
		let index = self
			.options
			.iter()
			.position(|option| {
				option.label() == choice
					|| option.scalar().and_then(Value::as_str) == Some(choice)
			})
			.ok_or_else(|| Error::UnknownRemediationOption { name: self.name.clone() })?;

		self.selected = Some(index);

		Ok(())
	}

	/// The entry this field contributes to the submission payload, if any.
	///
	/// A selected option contributes in place of the field's own value; a
	/// nested form contributes its own collection under this field's name.
	pub(crate) fn contribution(&self) -> Option<(String, Value)> {
		if let Some(option) = self.selected_option() {
			return Some((self.name.clone(), option.contribution()));
		}
		if let Some(form) = &self.form {
			let nested = form.collect();

			if nested.is_empty() {
				return None;
			}

			return Some((self.name.clone(), Value::Map(nested)));
		}

		self.value.clone().map(|value| (self.name.clone(), value))
	}
}

/// One alternative of a discriminated-choice field.
#[derive(Clone, Debug)]
pub struct FieldOption {
	label: String,
	value: OptionValue,
}
impl FieldOption {
	fn from_descriptor(descriptor: OptionDescriptor) -> Result<Self> {
		let value = match descriptor.value {
			Some(Json::Object(mut map)) if map.contains_key("form") => {
				let form = map
					.remove("form")
					.map(serde_json::from_value::<FormDescriptor>)
					.transpose()
					.map_err(Error::invalid_response_data)?
					.map(Form::from_descriptor)
					.transpose()?
					.unwrap_or_default();

				OptionValue::Form(form)
			},
			Some(json) => OptionValue::Scalar(Value::from_json(json)),
			None => OptionValue::Scalar(Value::Null),
		};

		Ok(Self { label: descriptor.label, value })
	}

	/// Display label identifying the choice.
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Alternative nested form, for composite options.
	pub fn form(&self) -> Option<&Form> {
		match &self.value {
			OptionValue::Form(form) => Some(form),
			OptionValue::Scalar(_) => None,
		}
	}

	fn scalar(&self) -> Option<&Value> {
		match &self.value {
			OptionValue::Scalar(value) => Some(value),
			OptionValue::Form(_) => None,
		}
	}

	/// The payload this option contributes once selected.
	pub(crate) fn contribution(&self) -> Value {
		match &self.value {
			OptionValue::Form(form) => Value::Map(form.collect()),
			OptionValue::Scalar(value) => value.clone(),
		}
	}
}

#[derive(Clone, Debug)]
enum OptionValue {
	Scalar(Value),
	Form(Form),
}

/// Raw wire shape of a form (`{"value": [fields...]}`).
#[derive(Debug, Deserialize)]
pub(crate) struct FormDescriptor {
	#[serde(default)]
	pub value: Vec<FieldDescriptor>,
}

/// Raw wire shape of a single field.
#[derive(Debug, Deserialize)]
pub(crate) struct FieldDescriptor {
	pub name: Option<String>,
	pub label: Option<String>,
	#[serde(rename = "type")]
	pub kind: Option<String>,
	pub required: Option<bool>,
	pub mutable: Option<bool>,
	pub secret: Option<bool>,
	pub visible: Option<bool>,
	pub value: Option<Json>,
	pub form: Option<FormDescriptor>,
	pub options: Option<Vec<OptionDescriptor>>,
	pub messages: Option<crate::response::MessagesDescriptor>,
}

/// Raw wire shape of a field option.
#[derive(Debug, Deserialize)]
pub(crate) struct OptionDescriptor {
	pub label: String,
	pub value: Option<Json>,
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	fn authenticator_field() -> Field {
		let descriptor: FieldDescriptor = serde_json::from_value(serde_json::json!({
			"name": "authenticator",
			"type": "object",
			"options": [
				{"label": "Email", "value": {"form": {"value": [
					{"name": "id", "required": true, "value": "aut-email", "mutable": false},
					{"name": "methodType", "required": false, "value": "email"},
				]}}},
				{"label": "Password", "value": {"form": {"value": [
					{"name": "id", "required": true, "value": "aut-password", "mutable": false},
				]}}},
			],
		}))
		.expect("Field descriptor fixture should deserialize.");

		Field::from_descriptor(descriptor).expect("Option field fixture should build.")
	}

	#[test]
	fn selecting_an_option_contributes_its_sub_fields() {
		let mut field = authenticator_field();

		field.select("Email").expect("Known labels should select.");

		let (name, value) =
			field.contribution().expect("Selected option should contribute a value.");

		assert_eq!(name, "authenticator");

		let entries = value.as_map().expect("Option contribution should be a map.");

		assert_eq!(entries["id"], Value::from("aut-email"));
		assert_eq!(entries["methodType"], Value::from("email"));
	}

	#[test]
	fn unknown_option_labels_fail() {
		let mut field = authenticator_field();
		let err = field.select("Fingerprint").expect_err("Unknown labels must fail.");

		assert!(matches!(
			err,
			Error::UnknownRemediationOption { ref name } if name == "authenticator",
		));
	}

	#[test]
	fn scalar_options_select_by_value() {
		let descriptor: FieldDescriptor = serde_json::from_value(serde_json::json!({
			"name": "methodType",
			"options": [
				{"label": "Email", "value": "email"},
				{"label": "SMS", "value": "sms"},
			],
		}))
		.expect("Scalar option fixture should deserialize.");
		let mut field =
			Field::from_descriptor(descriptor).expect("Scalar option field should build.");

		field.select("sms").expect("Scalar option values should select.");

		let (_, value) = field.contribution().expect("Selection should contribute.");

		assert_eq!(value, Value::from("sms"));
	}

	#[test]
	fn composite_value_objects_become_nested_forms() {
		let descriptor: FieldDescriptor = serde_json::from_value(serde_json::json!({
			"name": "credentials",
			"value": {"form": {"value": [{"name": "passcode", "secret": true}]}},
		}))
		.expect("Composite value fixture should deserialize.");
		let field = Field::from_descriptor(descriptor).expect("Composite field should build.");
		let form = field.form().expect("Embedded form key should become a nested form.");

		assert_eq!(form.fields().len(), 1);
		assert!(field.value().is_none());
	}

	#[test]
	fn unselected_option_fields_contribute_nothing() {
		let field = authenticator_field();
		let collected: HashMap<_, _> = field.contribution().into_iter().collect();

		assert!(collected.is_empty());
	}
}
