use super::diff::{SLOT_ATTRIBUTE, SLOT_SELECTOR};
use crate::{adapter::ElementNode, props::THEME_ATTRIBUTE, registry::NodeId};
use serde_json::Value;
use tracing::{error, warn};
use wasm_bindgen::{JsCast, JsValue};

/// Own JS property an element's adapter id is stored in.
const ADAPTER_ID_PROPERTY: &str = "__portalNodeId";

/// A custom element instance in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomNode(web_sys::HtmlElement);

impl DomNode {
	#[must_use]
	pub fn new(element: web_sys::HtmlElement) -> Self {
		Self(element)
	}

	#[must_use]
	pub fn element(&self) -> &web_sys::HtmlElement {
		&self.0
	}
}

impl ElementNode for DomNode {
	fn attributes(&self) -> Vec<(String, String)> {
		let attributes = self.0.attributes();
		(0..attributes.length())
			.filter_map(|i| attributes.item(i))
			.map(|attribute| {
				let name = attribute.name().to_ascii_lowercase();
				let value = if name == THEME_ATTRIBUTE {
					decode(&attribute.value())
				} else {
					attribute.value()
				};
				(name, value)
			})
			.collect()
	}

	fn attribute(&self, name: &str) -> Option<String> {
		self.0.get_attribute(name)
	}

	fn text(&self) -> String {
		let mut text = String::new();
		collect_text(&self.0, &mut text);
		text
	}

	fn set_style(&self, property: &str, value: &str) {
		if let Err(error) = self.0.style().set_property(property, value) {
			error!("Failed to set style {:?}: {:?}", property, error)
		}
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn adapter_id(&self) -> Option<NodeId> {
		js_sys::Reflect::get(&self.0, &JsValue::from_str(ADAPTER_ID_PROPERTY))
			.ok()
			.and_then(|id| id.as_f64())
			.map(|id| NodeId::from_raw(id as u64))
	}

	#[allow(clippy::cast_precision_loss)]
	fn set_adapter_id(&self, id: NodeId) {
		if let Err(error) = js_sys::Reflect::set(&self.0, &JsValue::from_str(ADAPTER_ID_PROPERTY), &JsValue::from_f64(id.get() as f64)) {
			error!("Failed to store adapter id {}: {:?}", id, error)
		}
	}

	fn parent(&self) -> Option<Self> {
		let mut ancestor = self.0.parent_element();
		while let Some(element) = ancestor {
			match element.dyn_into::<web_sys::HtmlElement>() {
				Ok(html_element) => return Some(Self(html_element)),
				Err(element) => ancestor = element.parent_element(),
			}
		}
		None
	}

	fn dispatch(&self, event: &str, detail: Value) {
		let detail = match js_sys::JSON::parse(&detail.to_string()) {
			Ok(detail) => detail,
			Err(error) => {
				error!("Failed to convert event detail: {:?}", error);
				JsValue::NULL
			}
		};

		let init = web_sys::CustomEventInit::new();
		init.set_bubbles(true);
		init.set_detail(&detail);
		let event = match web_sys::CustomEvent::new_with_event_init_dict(event, &init) {
			Ok(event) => event,
			Err(error) => return error!("Failed to create {:?} event: {:?}", event, error),
		};
		if let Err(error) = self.0.dispatch_event(&event) {
			error!("Failed to dispatch {:?} event: {:?}", event.type_(), error)
		}
	}
}

fn decode(raw: &str) -> String {
	match js_sys::decode_uri_component(raw) {
		Ok(decoded) => decoded.into(),
		Err(error) => {
			warn!("Failed to URI-decode {:?}: {:?}", THEME_ATTRIBUTE, error);
			raw.to_owned()
		}
	}
}

/// Like ***textContent***, but skipping portal slots.
fn collect_text(node: &web_sys::Node, text: &mut String) {
	let child_nodes = node.child_nodes();
	for child in (0..child_nodes.length()).filter_map(|i| child_nodes.item(i)) {
		if let Some(text_node) = child.dyn_ref::<web_sys::Text>() {
			text.push_str(&text_node.data());
		} else if let Some(element) = child.dyn_ref::<web_sys::Element>() {
			if !element.has_attribute(SLOT_ATTRIBUTE) {
				collect_text(element, text)
			}
		}
	}
}

/// Whether `record` only describes changes made by projection, i.e. inside or of portal slots.
#[must_use]
pub fn is_projection_record(record: &web_sys::MutationRecord) -> bool {
	let target = record.target().and_then(|target| match target.dyn_into::<web_sys::Element>() {
		Ok(element) => Some(element),
		Err(node) => node.parent_element(),
	});
	if target.map_or(false, |target| matches!(target.closest(SLOT_SELECTOR), Ok(Some(_)))) {
		return true;
	}

	record.type_() == "childList" && only_slots(&record.added_nodes()) && only_slots(&record.removed_nodes())
}

fn only_slots(nodes: &web_sys::NodeList) -> bool {
	(0..nodes.length())
		.filter_map(|i| nodes.item(i))
		.all(|node| node.dyn_ref::<web_sys::Element>().map_or(false, |element| element.has_attribute(SLOT_ATTRIBUTE)))
}
