//! Lowering of render descriptions into concrete markup.
//!
//! The design system proper is an external collaborator plugged in through [`Presenter`].
//! [`HtmlPresenter`] maps every [`Construct`] onto plain semantic HTML.
//!
//! Listeners receive [`web_sys::Event`]s, so this module depends on `web-sys` types,
//! but nothing in here touches a live document.

use crate::{
	build::{Construct, RenderNode},
	props::{self, PropValue, Props},
};
use core::fmt::{self, Debug, Formatter};
use serde_json::json;
use std::rc::Rc;
use wasm_bindgen::JsCast;

pub type Handler = Rc<dyn Fn(&web_sys::Event)>;

#[derive(Clone)]
pub struct Listener {
	pub event: &'static str,
	pub handler: Handler,
}

impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener").field("event", &self.event).finish_non_exhaustive()
	}
}

#[derive(Debug, Clone)]
pub struct Tag {
	/// Lowercase element name.
	pub name: &'static str,
	pub attributes: Vec<(String, String)>,
	pub children: Vec<Html>,
	pub listeners: Vec<Listener>,
}

impl Tag {
	#[must_use]
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			attributes: Vec::new(),
			children: Vec::new(),
			listeners: Vec::new(),
		}
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str())
	}
}

/// Owned markup, ready to be diffed into the DOM.
#[derive(Debug, Clone)]
pub enum Html {
	Element(Tag),
	Text(String),
}

impl Html {
	#[must_use]
	pub fn as_tag(&self) -> Option<&Tag> {
		match self {
			Html::Element(tag) => Some(tag),
			Html::Text(_) => None,
		}
	}
}

pub trait Presenter {
	/// Lowers `node` into zero or more sibling nodes.
	fn present(&self, node: &RenderNode) -> Vec<Html>;
}

/// Props that become inline style instead of `data-*` attributes, as `(prop, CSS property)`.
const LAYOUT_STYLES: &[(&str, &str)] = &[
	("display", "display"),
	("maxWidth", "max-width"),
	("overflowX", "overflow-x"),
	("overflowY", "overflow-y"),
	("whiteSpace", "white-space"),
];

const BOX_STYLES: &[(&str, &str)] = &[
	("borderColor", "border-color"),
	("borderWidth", "border-width"),
	("borderStyle", "border-style"),
	("borderRadius", "border-radius"),
	("padding", "padding"),
	("margin", "margin"),
	("backgroundColor", "background-color"),
	("textColor", "color"),
	("fontSize", "font-size"),
	("fontWeight", "font-weight"),
];

/// Semantic HTML with `data-*` attributes for everything a stylesheet may want to select on.
///
/// Forms are a bare `<form>` with a submit button. Submitting calls `onSubmit` with the current `formData`.
/// `onChange` and `onError` are left to presenters with an actual form component.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlPresenter;

impl Presenter for HtmlPresenter {
	fn present(&self, node: &RenderNode) -> Vec<Html> {
		match node {
			RenderNode::Empty => Vec::new(),
			RenderNode::Text(text) => vec![Html::Text(text.clone())],
			RenderNode::Construct { construct, props, children } => {
				let children = children.iter().flat_map(|child| self.present(child)).collect();
				vec![Html::Element(self.construct(*construct, props, children))]
			}
		}
	}
}

impl HtmlPresenter {
	fn construct(self, construct: Construct, props: &Props, mut children: Vec<Html>) -> Tag {
		let (name, class) = match construct {
			Construct::TableContainer => ("div", Some("table-container")),
			Construct::Table => ("table", None),
			Construct::TableHead => ("thead", None),
			Construct::TableBody => ("tbody", None),
			Construct::TableFooter => ("tfoot", None),
			Construct::TableRow => ("tr", None),
			Construct::ColumnHeader => ("th", None),
			Construct::Cell => ("td", None),
			Construct::Caption => ("caption", None),
			Construct::Badge => ("span", Some("badge")),
			Construct::Code => ("code", None),
			Construct::Card => ("div", Some("card")),
			Construct::CardHeader => ("div", Some("card-header")),
			Construct::CardBody => ("div", Some("card-body")),
			Construct::CardFooter => ("div", Some("card-footer")),
			Construct::ThemeScope => ("div", Some("theme-scope")),
			Construct::Form => ("form", Some("json-form")),
		};

		let mut tag = Tag::new(name);
		if let Some(class) = class {
			tag.attributes.push(("class".to_owned(), class.to_owned()));
		}

		let styled: &[(&str, &str)] = match construct {
			Construct::TableContainer => LAYOUT_STYLES,
			Construct::ThemeScope => BOX_STYLES,
			_ => &[],
		};
		let mut style: Vec<String> = styled
			.iter()
			.filter_map(|&(prop, property)| props.get(prop).and_then(PropValue::as_str).map(|value| format!("{}: {}", property, value)))
			.collect();
		if matches!(construct, Construct::ColumnHeader | Construct::Cell) && props.get("isNumeric").and_then(PropValue::as_bool) == Some(true) {
			style.push("text-align: end".to_owned());
		}
		if !style.is_empty() {
			tag.attributes.push(("style".to_owned(), style.join("; ")));
		}

		for (key, value) in props {
			if styled.iter().any(|&(prop, _)| prop == key) {
				continue;
			}
			let value = match value {
				PropValue::Str(string) => string.clone(),
				PropValue::Bool(true) => String::new(),
				PropValue::Bool(false) | PropValue::Callback(_) => continue,
				PropValue::Json(value) => value.to_string(),
			};
			tag.attributes.push((format!("data-{}", kebab_case(key)), value));
		}

		match construct {
			Construct::Card if props.contains_key("onContextMenuEvent") => {
				let props = props.clone();
				tag.listeners.push(Listener {
					event: "contextmenu",
					handler: Rc::new(move |event| {
						let position = match event.dyn_ref::<web_sys::MouseEvent>() {
							Some(mouse) => json!({ "pageX": mouse.page_x(), "pageY": mouse.page_y() }),
							None => json!({ "pageX": 0, "pageY": 0 }),
						};
						if matches!(props.get("onContextMenuEvent"), Some(PropValue::Callback(_))) {
							event.prevent_default();
						}
						props::invoke(&props, "onContextMenuEvent", position);
					}),
				});
			}
			Construct::Form => {
				let props = props.clone();
				tag.listeners.push(Listener {
					event: "submit",
					handler: Rc::new(move |event| {
						event.prevent_default();
						let data = props.get("formData").and_then(PropValue::to_json).unwrap_or_else(|| json!({}));
						props::invoke(&props, "onSubmit", data);
					}),
				});
				let mut submit = Tag::new("button");
				submit.attributes.push(("type".to_owned(), "submit".to_owned()));
				submit.children.push(Html::Text("Submit".to_owned()));
				children.push(Html::Element(submit));
			}
			_ => (),
		}

		tag.children = children;
		tag
	}
}

/// `colorScheme` → `color-scheme`
#[must_use]
pub fn kebab_case(name: &str) -> String {
	let mut kebab = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			if !kebab.is_empty() {
				kebab.push('-');
			}
			kebab.push(c.to_ascii_lowercase());
		} else {
			kebab.push(c);
		}
	}
	kebab
}
