//! Attribute-derived configuration values.

use crate::kind::{AttributeRule, Kind};
use core::fmt::{self, Debug, Formatter};
use serde_json::Value;
use std::{collections::BTreeMap, rc::Rc};
use tracing::{instrument, trace, warn};

/// Props are always replaced wholesale, never merged.
pub type Props = BTreeMap<String, PropValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
	Str(String),
	Bool(bool),
	Json(Value),
	Callback(Callback),
}

impl PropValue {
	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			PropValue::Str(string) => Some(string),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_bool(&self) -> Option<bool> {
		match *self {
			PropValue::Bool(value) => Some(value),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_json(&self) -> Option<&Value> {
		match self {
			PropValue::Json(value) => Some(value),
			_ => None,
		}
	}

	/// A JSON rendition for opaque forwarding (e.g. into a `data-*` attribute).
	///
	/// Callbacks have none.
	#[must_use]
	pub fn to_json(&self) -> Option<Value> {
		match self {
			PropValue::Str(string) => Some(Value::String(string.clone())),
			PropValue::Bool(value) => Some(Value::Bool(*value)),
			PropValue::Json(value) => Some(value.clone()),
			PropValue::Callback(_) => None,
		}
	}
}

impl From<&str> for PropValue {
	fn from(string: &str) -> Self {
		PropValue::Str(string.to_owned())
	}
}

impl From<String> for PropValue {
	fn from(string: String) -> Self {
		PropValue::Str(string)
	}
}

impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		PropValue::Bool(value)
	}
}

impl From<Value> for PropValue {
	fn from(value: Value) -> Self {
		PropValue::Json(value)
	}
}

impl From<Callback> for PropValue {
	fn from(callback: Callback) -> Self {
		PropValue::Callback(callback)
	}
}

/// A callable prop. Equality is identity.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(Value)>);

impl Callback {
	pub fn new(f: impl Fn(Value) + 'static) -> Self {
		Self(Rc::new(f))
	}

	pub fn call(&self, payload: Value) {
		(self.0)(payload)
	}
}

impl PartialEq for Callback {
	fn eq(&self, other: &Self) -> bool {
		Rc::as_ptr(&self.0).cast::<()>() == Rc::as_ptr(&other.0).cast::<()>()
	}
}

impl Debug for Callback {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Callback").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}

/// Calls the callback prop `key` with `payload`.
///
/// Returns whether a callback ran. A present but non-callable prop is logged and skipped.
pub fn invoke(props: &Props, key: &str, payload: Value) -> bool {
	match props.get(key) {
		Some(PropValue::Callback(callback)) => {
			callback.call(payload);
			true
		}
		Some(other) => {
			warn!("Prop `{}` is not callable: {:?}", key, other);
			false
		}
		None => {
			trace!("No `{}` callback.", key);
			false
		}
	}
}

/// Boolean-ish attribute values: present-but-empty and `"true"` are `true`.
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
	raw.is_empty() || raw.eq_ignore_ascii_case("true")
}

/// The attribute whose (URI-decoded) value carries a provider theme as JSON.
pub const THEME_ATTRIBUTE: &str = "data-theme";

/// Derives a kind's props from its element's attributes.
///
/// `previous` is consulted only for JSON props that fail to parse, which keep their prior value
/// (or become `null` if there was none).
/// [`THEME_ATTRIBUTE`] values must already be URI-decoded.
#[instrument(skip(attributes, previous))]
pub fn derive_props(kind: Kind, attributes: &[(String, String)], previous: Option<&Props>) -> Props {
	let mut props = Props::new();
	for (name, value) in attributes {
		let name = name.to_ascii_lowercase();
		if kind == Kind::Provider {
			if name == THEME_ATTRIBUTE {
				props.insert("theme".to_owned(), parse_json_prop("theme", value, previous));
			} else if !name.starts_with("data-") && name != "id" && name != "theme" {
				props.insert(camel_case(&name), PropValue::Str(value.clone()));
			}
			continue;
		}

		match kind.attribute_rule(&name) {
			Some(AttributeRule::Plain(key)) => {
				props.insert(key.to_owned(), PropValue::Str(value.clone()));
			}
			Some(AttributeRule::Flag(key)) => {
				props.insert(key.to_owned(), PropValue::Bool(parse_flag(value)));
			}
			Some(AttributeRule::Json(key)) => {
				props.insert(key.to_owned(), parse_json_prop(key, value, previous));
			}
			None => trace!(%name, "Ignored attribute."),
		}
	}
	props
}

fn parse_json_prop(key: &str, raw: &str, previous: Option<&Props>) -> PropValue {
	match serde_json::from_str::<Value>(raw) {
		Ok(value) => PropValue::Json(value),
		Err(error) => {
			if cfg!(feature = "dangerous-logging") {
				warn!("Malformed JSON in `{}` ({:?}): {}", key, raw, error);
			} else {
				warn!("Malformed JSON in `{}`: {}", key, error);
			}
			previous
				.and_then(|previous| previous.get(key))
				.cloned()
				.unwrap_or(PropValue::Json(Value::Null))
		}
	}
}

const CAMEL_CASE_NAMES: &[(&str, &str)] = &[
	("bordercolor", "borderColor"),
	("borderwidth", "borderWidth"),
	("borderradius", "borderRadius"),
	("backgroundcolor", "backgroundColor"),
	("textcolor", "textColor"),
	("fontsize", "fontSize"),
	("fontweight", "fontWeight"),
];

/// Recovers the camel-cased prop name from a (necessarily lowercase) attribute name.
#[must_use]
pub fn camel_case(name: &str) -> String {
	let name = name.to_ascii_lowercase();
	if let Some(&(_, known)) = CAMEL_CASE_NAMES.iter().find(|(attribute, _)| *attribute == name) {
		return known.to_owned();
	}

	let mut camel = String::with_capacity(name.len());
	for (i, word) in name.split(|c: char| c == '-' || c == '_').filter(|word| !word.is_empty()).enumerate() {
		if i == 0 {
			camel.push_str(word);
		} else {
			let mut chars = word.chars();
			if let Some(first) = chars.next() {
				camel.extend(first.to_uppercase());
				camel.push_str(chars.as_str());
			}
		}
	}
	camel
}

/// Text content as adapters derive it: the explicit override if non-empty, otherwise the trimmed element text.
///
/// Empty results are [`None`].
#[must_use]
pub fn derive_text(text_attribute: Option<&str>, element_text: &str) -> Option<String> {
	let text = match text_attribute {
		Some(text) if !text.is_empty() => text,
		_ => element_text.trim(),
	};
	if text.is_empty() {
		None
	} else {
		Some(text.to_owned())
	}
}
