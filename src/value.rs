//! Recursive value model carried by every dynamically-shaped IDX payload.
//!
//! [`Value`] mirrors the JSON the Identity Engine speaks, with one extra
//! variant: [`Value::Object`] wraps a native handle for in-process use only.
//! Decoding server data never produces it and encoding a tree containing it
//! fails, so the wire surface stays pure JSON.

// std
use std::{any::Any, collections::HashMap};
// crates.io
use serde::{Deserializer, Serializer, ser::Error as SerError};
use serde_json::{Map as JsonMap, Number, Value as Json};
// self
use crate::_prelude::*;

/// Tagged union over the value shapes an IDX form or response can carry.
#[derive(Clone, PartialEq)]
pub enum Value {
	/// Textual value. A JSON string stays text even when it looks numeric.
	Text(String),
	/// Numeric value, integral or floating.
	Number(Number),
	/// Boolean value.
	Bool(bool),
	/// Ordered sequence of values.
	List(Vec<Value>),
	/// String-keyed mapping; key order carries no meaning.
	Map(HashMap<String, Value>),
	/// Opaque native handle, never decoded from and never encoded to the wire.
	Object(ObjectHandle),
	/// Explicit null.
	Null,
}
impl Value {
	/// Decodes arbitrary server JSON into the union.
	///
	/// The JSON token kind decides the variant, so `"123"` decodes as
	/// [`Value::Text`] and `123` as [`Value::Number`].
	pub fn from_json(json: Json) -> Self {
		match json {
			Json::String(text) => Self::Text(text),
			Json::Number(number) => Self::Number(number),
			Json::Bool(flag) => Self::Bool(flag),
			Json::Object(map) =>
				Self::Map(map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect()),
			Json::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
			Json::Null => Self::Null,
		}
	}

	/// Encodes the value back into JSON, the structural inverse of
	/// [`from_json`](Self::from_json).
	///
	/// Trees containing [`Value::Object`] cannot cross the wire and fail with
	/// the internal error kind.
	pub fn to_json(&self) -> Result<Json> {
		match self {
			Self::Text(text) => Ok(Json::String(text.clone())),
			Self::Number(number) => Ok(Json::Number(number.clone())),
			Self::Bool(flag) => Ok(Json::Bool(*flag)),
			Self::List(items) => {
				let mut encoded = Vec::with_capacity(items.len());

				for item in items {
					encoded.push(item.to_json()?);
				}

				Ok(Json::Array(encoded))
			},
			Self::Map(entries) => {
				let mut encoded = JsonMap::new();

				for (key, value) in entries {
					encoded.insert(key.clone(), value.to_json()?);
				}

				Ok(Json::Object(encoded))
			},
			Self::Object(_) =>
				Err(Error::InternalMessage("Opaque object values cannot be encoded.".into())),
			Self::Null => Ok(Json::Null),
		}
	}

	/// Returns the text content, if this is a text value.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	/// Returns the numeric content, if this is a number value.
	pub fn as_number(&self) -> Option<&Number> {
		match self {
			Self::Number(number) => Some(number),
			_ => None,
		}
	}

	/// Returns the boolean content, if this is a boolean value.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(flag) => Some(*flag),
			_ => None,
		}
	}

	/// Returns the item slice, if this is a list value.
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Self::List(items) => Some(items),
			_ => None,
		}
	}

	/// Returns the entry map, if this is a map value.
	pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
		match self {
			Self::Map(entries) => Some(entries),
			_ => None,
		}
	}

	/// Returns `true` for the explicit null variant.
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}
}
impl Debug for Value {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Text(text) => write!(f, "Text({text:?})"),
			Self::Number(number) => write!(f, "Number({number})"),
			Self::Bool(flag) => write!(f, "Bool({flag})"),
			Self::List(items) => f.debug_tuple("List").field(items).finish(),
			Self::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
			Self::Object(handle) => Debug::fmt(handle, f),
			Self::Null => f.write_str("Null"),
		}
	}
}
impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Self::Number(value.into())
	}
}
impl From<Vec<Value>> for Value {
	fn from(value: Vec<Value>) -> Self {
		Self::List(value)
	}
}
impl From<HashMap<String, Value>> for Value {
	fn from(value: HashMap<String, Value>) -> Self {
		Self::Map(value)
	}
}
impl Serialize for Value {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.to_json().map_err(S::Error::custom)?.serialize(serializer)
	}
}
impl<'de> Deserialize<'de> for Value {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Json::deserialize(deserializer).map(Self::from_json)
	}
}

/// Behavior required from natively wrapped objects.
///
/// Implementations decide how their values render and compare; the defaults
/// give a generic placeholder and never-equal semantics.
pub trait OpaqueObject
where
	Self: 'static + Send + Sync,
{
	/// Type-erased view used for cross-handle comparison.
	fn as_any(&self) -> &dyn Any;

	/// Debug rendering of the wrapped value, when one exists.
	fn render(&self) -> Option<String> {
		None
	}

	/// Compares against another wrapped value. Handles are equal only when
	/// both sides consider the other comparable and equal.
	fn eq_object(&self, _other: &dyn Any) -> bool {
		false
	}
}

/// Shared handle around a natively wrapped object.
#[derive(Clone)]
pub struct ObjectHandle(Arc<dyn OpaqueObject>);
impl ObjectHandle {
	/// Wraps a comparable, debuggable native value.
	pub fn new<T>(value: T) -> Self
	where
		T: 'static + Send + Sync + Debug + PartialEq,
	{
		Self(Arc::new(ComparableObject(value)))
	}

	/// Wraps a custom [`OpaqueObject`] implementation.
	pub fn from_object(object: impl OpaqueObject) -> Self {
		Self(Arc::new(object))
	}

	/// Downcasts the wrapped value back to a concrete type.
	pub fn downcast_ref<T>(&self) -> Option<&T>
	where
		T: 'static,
	{
		self.0.as_any().downcast_ref()
	}
}
impl PartialEq for ObjectHandle {
	fn eq(&self, other: &Self) -> bool {
		self.0.eq_object(other.0.as_any())
	}
}
impl Debug for ObjectHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self.0.render() {
			Some(rendered) => write!(f, "Object({rendered})"),
			None => f.write_str("Object(<opaque>)"),
		}
	}
}

struct ComparableObject<T>(T);
impl<T> OpaqueObject for ComparableObject<T>
where
	T: 'static + Send + Sync + Debug + PartialEq,
{
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn render(&self) -> Option<String> {
		Some(format!("{:?}", self.0))
	}

	fn eq_object(&self, other: &dyn Any) -> bool {
		other.downcast_ref::<Self>().is_some_and(|other| self.0 == other.0)
	}
}
