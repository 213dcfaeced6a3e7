//! Recursive description of the input a remediation expects.
//!
//! A [`Form`] is an ordered set of [`Field`]s; a field may own a nested form
//! (composite value) or a set of selectable options (discriminated choice).
//! Dotted paths address nested fields, so `"credentials.passcode"` resolves
//! `passcode` inside the form owned by `credentials`.

pub mod field;
pub use field::*;

// std
use std::collections::{HashMap, HashSet};
// self
use crate::{_prelude::*, value::Value};

/// Ordered collection of fields describing one remediation's expected input.
#[derive(Clone, Debug, Default)]
pub struct Form {
	fields: Vec<Field>,
}
impl Form {
	/// Builds a form, enforcing that no two sibling fields share a name.
	pub(crate) fn from_fields(fields: Vec<Field>) -> Result<Self> {
		let mut seen = HashSet::new();

		for field in &fields {
			if !seen.insert(field.name().to_owned()) {
				return Err(Error::invalid_response_data(format!(
					"duplicate form field `{}`",
					field.name()
				)));
			}
		}

		Ok(Self { fields })
	}

	pub(crate) fn from_descriptor(descriptor: FormDescriptor) -> Result<Self> {
		let mut fields = Vec::with_capacity(descriptor.value.len());

		for raw in descriptor.value {
			fields.push(Field::from_descriptor(raw)?);
		}

		Self::from_fields(fields)
	}

	/// Returns the fields in server-declared order.
	pub fn fields(&self) -> &[Field] {
		&self.fields
	}

	/// Returns `true` when the form declares no fields.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Resolves a dotted path to the field it names.
	///
	/// Each non-terminal segment must name a field owning a nested form;
	/// descending through anything else fails with
	/// [`Error::InvalidParameterValue`], and an unknown segment with
	/// [`Error::InvalidParameter`].
	pub fn field(&self, path: &str) -> Result<&Field> {
		let (head, rest) = split_path(path);
		let field = self
			.fields
			.iter()
			.find(|field| field.name() == head)
			.ok_or_else(|| Error::InvalidParameter { name: head.to_owned() })?;

		match rest {
			None => Ok(field),
			Some(rest) => field
				.form()
				.ok_or_else(|| Error::InvalidParameterValue {
					name: head.to_owned(),
					expected: "object",
				})?
				.field(rest),
		}
	}

	fn field_mut(&mut self, path: &str) -> Result<&mut Field> {
		let (head, rest) = split_path(path);
		let field = self
			.fields
			.iter_mut()
			.find(|field| field.name() == head)
			.ok_or_else(|| Error::InvalidParameter { name: head.to_owned() })?;

		match rest {
			None => Ok(field),
			Some(rest) => field
				.form_mut()
				.ok_or_else(|| Error::InvalidParameterValue {
					name: head.to_owned(),
					expected: "object",
				})?
				.field_mut(rest),
		}
	}

	/// Writes a value into the field a dotted path names.
	///
	/// Immutable fields reject the write with [`Error::ParameterImmutable`].
	pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
		let field = self.field_mut(path)?;

		if !field.is_mutable() {
			return Err(Error::ParameterImmutable { name: field.name().to_owned() });
		}

		field.set_value(value);

		Ok(())
	}

	/// Selects one of a field's declared options by label or scalar value.
	///
	/// A value matching no option fails with
	/// [`Error::UnknownRemediationOption`].
	pub fn select(&mut self, path: &str, choice: &str) -> Result<()> {
		let field = self.field_mut(path)?;

		if field.options().is_empty() {
			return Err(Error::InvalidParameterValue {
				name: field.name().to_owned(),
				expected: "option",
			});
		}

		field.select(choice)
	}

	/// Merges caller-supplied values keyed by field name.
	///
	/// Nested maps descend into nested forms; text against an option-bearing
	/// field selects by label.
	pub(crate) fn merge(&mut self, values: &HashMap<String, Value>) -> Result<()> {
		for (name, value) in values {
			let field = self
				.fields
				.iter_mut()
				.find(|field| field.name() == name.as_str())
				.ok_or_else(|| Error::InvalidParameter { name: name.clone() })?;

			if !field.options().is_empty() {
				let Some(choice) = value.as_str() else {
					return Err(Error::InvalidParameterValue {
						name: name.clone(),
						expected: "text",
					});
				};

				field.select(choice)?;

				continue;
			}

			if let (Some(nested), Some(form)) = (value.as_map(), field.form_mut()) {
				form.merge(nested)?;

				continue;
			}
			if !field.is_mutable() {
				return Err(Error::ParameterImmutable { name: name.clone() });
			}

			field.set_value(value.clone());
		}

		Ok(())
	}

	/// Collects the current values into the parameter mapping to submit.
	///
	/// Required-but-unset fields are simply absent; required-ness is enforced
	/// by the server, which reports per-field messages instead.
	pub fn collect(&self) -> HashMap<String, Value> {
		let mut parameters = HashMap::new();

		for field in &self.fields {
			if let Some((name, value)) = field.contribution() {
				parameters.insert(name, value);
			}
		}

		parameters
	}
}

fn split_path(path: &str) -> (&str, Option<&str>) {
	match path.split_once('.') {
		Some((head, rest)) => (head, Some(rest)),
		None => (path, None),
	}
}
