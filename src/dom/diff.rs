use crate::{
	build::DEFAULT_DEPTH_LIMIT,
	present::{Handler, Html, Tag},
};
use core::{cell::RefCell, mem};
use hashbrown::HashSet;
use std::rc::Rc;
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// Marks the element each portal's output is projected into.
pub const SLOT_ATTRIBUTE: &str = "data-portal-slot";
pub(crate) const SLOT_SELECTOR: &str = "[data-portal-slot]";

/// Space-separated `event:index` pairs into the differ's handler table.
pub const HANDLERS_ATTRIBUTE: &str = "data-portal-handlers";

/// Owns one portal slot inside a container element and keeps its ***childNodes*** in sync with successive [`Html`] lists.
///
/// Listeners aren't bound per element.
/// Instead, each element with listeners is tagged with [`HANDLERS_ATTRIBUTE`],
/// and a single delegated listener per event type on the slot dispatches into the current handler table.
///
/// Dropping the differ removes the slot and its listeners.
pub struct DomDiffer {
	document: web_sys::Document,
	slot: web_sys::HtmlElement,
	previous: Vec<Html>,
	handlers: Rc<RefCell<Vec<Handler>>>,
	common_handler: Closure<dyn Fn(web_sys::Event)>,
	bound_events: HashSet<&'static str>,
	depth_limit: usize,
}

impl DomDiffer {
	/// Appends a new, empty slot to `container`.
	///
	/// # Errors
	///
	/// Iff the slot can't be created or inserted.
	#[instrument]
	pub fn new_in(container: &web_sys::Element) -> Result<Self, JsValue> {
		let document = container.owner_document().ok_or_else(|| JsValue::from_str("No owner document found for portal container."))?;
		let slot = document.create_element("div")?.dyn_into::<web_sys::HtmlElement>().map_err(JsValue::from)?;
		slot.set_attribute(SLOT_ATTRIBUTE, "")?;
		slot.style().set_property("display", "contents")?;
		container.append_child(&slot)?;

		let handlers: Rc<RefCell<Vec<Handler>>> = Rc::default();
		let common_handler = Closure::wrap(Box::new({
			let handlers = Rc::clone(&handlers);
			let slot = slot.clone();
			move |event: web_sys::Event| {
				let event_type = event.type_();
				let span = trace_span!("common_handler", event = %event_type);
				let _enter = span.enter();

				let mut target = event.target().and_then(|target| target.dyn_into::<web_sys::Element>().ok());
				while let Some(element) = target {
					if slot.is_same_node(Some(element.as_ref())) {
						break;
					}
					if let Some(bound) = element.get_attribute(HANDLERS_ATTRIBUTE) {
						for index in handler_indices(&bound, &event_type) {
							// Cloned out so that handlers may cause re-entrant updates.
							let handler = handlers.borrow().get(index).cloned();
							match handler {
								Some(handler) => handler(&event),
								None => error!("Stale handler index {} for {:?}.", index, event_type),
							}
						}
					}
					target = element.parent_element();
				}
			}
		}) as Box<dyn Fn(web_sys::Event)>);

		Ok(Self {
			document,
			slot,
			previous: Vec::new(),
			handlers,
			common_handler,
			bound_events: HashSet::new(),
			depth_limit: DEFAULT_DEPTH_LIMIT,
		})
	}

	#[must_use]
	pub fn slot(&self) -> &web_sys::HtmlElement {
		&self.slot
	}

	/// Replaces the slot's content with `next`, reusing DOM nodes where they still fit.
	#[instrument(skip(self, next), fields(len = next.len()))]
	pub fn update(&mut self, mut next: Vec<Html>) {
		let mut handlers = Vec::new();
		for node in &mut next {
			self.bind(node, &mut handlers);
		}
		trace!("Bound {} handler(s).", handlers.len());
		*self.handlers.borrow_mut() = handlers;

		let previous = mem::take(&mut self.previous);
		let mut i = 0;
		self.diff_splice_node_list(&previous, &next, &self.slot, &self.slot.child_nodes(), &mut i, self.depth_limit);
		debug_assert_eq!(i, self.slot.child_nodes().length());
		self.previous = next;
	}

	/// Moves listeners out of `node` into `handlers` and tags their elements accordingly.
	fn bind(&mut self, node: &mut Html, handlers: &mut Vec<Handler>) {
		let tag = match node {
			Html::Element(tag) => tag,
			Html::Text(_) => return,
		};

		if !tag.listeners.is_empty() {
			let mut bound = Vec::with_capacity(tag.listeners.len());
			for listener in tag.listeners.drain(..) {
				bound.push(format!("{}:{}", listener.event, handlers.len()));
				handlers.push(listener.handler);
				if self.bound_events.insert(listener.event) {
					if let Err(error) = self.slot.add_event_listener_with_callback(listener.event, self.common_handler.as_ref().unchecked_ref()) {
						error!("Failed to add delegated {:?} listener: {:?}", listener.event, error)
					}
				}
			}
			tag.attributes.push((HANDLERS_ATTRIBUTE.to_owned(), bound.join(" ")));
		}

		for child in &mut tag.children {
			self.bind(child, handlers);
		}
	}

	/// Diffs `vdom_a` (what was rendered into `dom_slice` starting at `*i`) into `vdom_b`, advancing `*i` past the result.
	#[allow(clippy::too_many_lines)]
	#[instrument(skip(self, vdom_a, vdom_b, parent, dom_slice))]
	fn diff_splice_node_list(&self, mut vdom_a: &[Html], mut vdom_b: &[Html], parent: &web_sys::Node, dom_slice: &web_sys::NodeList, i: &mut u32, depth_limit: usize) {
		if depth_limit == 0 {
			return error!("Depth limit reached");
		}

		#[allow(clippy::never_loop)] // Inner `loop`.
		while !vdom_a.is_empty() && !vdom_b.is_empty() {
			*i += 'vdom_item: loop {
				break 'vdom_item match (&vdom_a[0], &vdom_b[0]) {
					(Html::Text(t_1), Html::Text(t_2)) => {
						let span = trace_span!("Diffing text node", len_1 = t_1.len(), len_2 = t_2.len());
						let _enter = span.enter();
						let node = match dom_slice.get(*i) {
							Some(node) => node,
							None => {
								error!("Expected text beyond end of `web_sys::NodeList`. Switching to insertions.");
								return self.diff_splice_node_list(&[], vdom_b, parent, dom_slice, i, depth_limit);
							}
						};

						let text = match node.dyn_ref::<web_sys::Text>() {
							Some(text) => text,
							None => {
								error!("Expected to update `web_sys::Text` but found {:?}; Recreating the node.", node);
								self.diff_splice_node_list(&vdom_a[..1], &[], parent, dom_slice, i, depth_limit);
								self.diff_splice_node_list(&[], &vdom_b[..1], parent, dom_slice, i, depth_limit);
								break 'vdom_item 0;
							}
						};

						if &text.data() != t_1 {
							if cfg!(feature = "dangerous-logging") {
								error!("Unexpected text data: Expected {:?} but found {:?}. Overwriting.", t_1, text.data());
							} else {
								error!("Unexpected text data. Overwriting.");
							}
							text.set_data(t_2)
						} else if t_1 != t_2 {
							text.set_data(t_2)
						}
						1
					}

					(Html::Element(e_1), Html::Element(e_2)) if e_1.name == e_2.name => {
						let span = trace_span!("Diffing element", tag = e_1.name);
						let _enter = span.enter();
						let node = match dom_slice.get(*i) {
							Some(node) => node,
							None => {
								error!("Expected <{}> beyond end of `web_sys::NodeList`. Switching to insertions.", e_1.name);
								return self.diff_splice_node_list(&[], vdom_b, parent, dom_slice, i, depth_limit);
							}
						};

						let element = match node.dyn_ref::<web_sys::Element>() {
							Some(element) if element.tag_name().eq_ignore_ascii_case(e_1.name) => element,
							_ => {
								error!("Expected to update <{}> but found {:?}; Recreating the node.", e_1.name, node);
								self.diff_splice_node_list(&vdom_a[..1], &[], parent, dom_slice, i, depth_limit);
								self.diff_splice_node_list(&[], &vdom_b[..1], parent, dom_slice, i, depth_limit);
								break 'vdom_item 0;
							}
						};

						self.update_element(e_1, e_2, element, depth_limit);
						1
					}

					// Mismatching nodes: Destroy and rebuild.
					_ => {
						let span = trace_span!("Replace mismatching");
						let _enter = span.enter();
						self.diff_splice_node_list(&vdom_a[..1], &[], parent, dom_slice, i, depth_limit);
						self.diff_splice_node_list(&[], &vdom_b[..1], parent, dom_slice, i, depth_limit);
						0
					}
				};
			};

			vdom_a = &vdom_a[1..];
			vdom_b = &vdom_b[1..];
		}

		for removed in vdom_a {
			let span = trace_span!("Removing", node = %describe(removed));
			let _enter = span.enter();
			let node = match dom_slice.get(*i) {
				Some(node) => node,
				None => {
					error!("Expected to remove {} beyond end of `web_sys::NodeList`. Skipping further deletions here.", describe(removed));
					break;
				}
			};

			let expected = match removed {
				Html::Text(_) => node.dyn_ref::<web_sys::Text>().is_some(),
				Html::Element(tag) => node.dyn_ref::<web_sys::Element>().map_or(false, |element| element.tag_name().eq_ignore_ascii_case(tag.name)),
			};
			if !expected {
				error!("Expected to remove {} but found {:?}; Removing it anyway.", describe(removed), node);
			}

			// `dom_slice` is live, so the next node moves up into `*i`.
			if let Err(error) = parent.remove_child(&node) {
				error!("Failed to remove the node: {:?}", error);
				*i += 1;
			}
		}

		let next_sibling = dom_slice.get(*i);
		let next_sibling = next_sibling.as_ref();
		for new_node in vdom_b {
			*i += match new_node {
				Html::Text(text) => {
					let span = trace_span!("Creating text node", len = text.len());
					let _enter = span.enter();
					let dom_text = self.document.create_text_node(text);
					if let Err(error) = parent.insert_before(&dom_text, next_sibling) {
						error!("Failed to insert text node: {:?}", error);
						continue;
					}
					1
				}

				Html::Element(tag) => {
					let span = trace_span!("Creating element", tag = tag.name);
					let _enter = span.enter();
					let element = match self.document.create_element(tag.name) {
						Ok(element) => element,
						Err(error) => {
							error!("Failed to create element: {:?}", error);
							continue;
						}
					};

					if let Err(error) = parent.insert_before(&element, next_sibling) {
						error!("Failed to insert element: {:?}", error);
						continue;
					}

					self.update_element(&Tag::new(tag.name), tag, &element, depth_limit);
					1
				}
			};
		}
	}

	#[allow(clippy::similar_names)]
	#[instrument(skip(self, e_1, e_2, element), fields(tag = e_1.name))]
	fn update_element(&self, e_1: &Tag, e_2: &Tag, element: &web_sys::Element, depth_limit: usize) {
		debug_assert_eq!(e_1.name, e_2.name);

		let (mut a_1, mut a_2) = (&e_1.attributes[..], &e_2.attributes[..]);
		while !a_1.is_empty() && a_1.first() == a_2.first() {
			a_1 = &a_1[1..];
			a_2 = &a_2[1..];
		}
		while !a_1.is_empty() && a_1.last() == a_2.last() {
			a_1 = &a_1[..a_1.len() - 1];
			a_2 = &a_2[..a_2.len() - 1];
		}
		if !a_1.is_empty() || !a_2.is_empty() {
			let attributes = element.attributes();
			for removed in a_1 {
				remove_attribute(&attributes, removed)
			}
			for added in a_2 {
				self.add_attribute(&attributes, added)
			}
		}

		self.diff_splice_node_list(&e_1.children, &e_2.children, element, &element.child_nodes(), &mut 0, depth_limit - 1);
	}

	#[instrument(skip(self, attributes, attribute), fields(name = %attribute.0))]
	fn add_attribute(&self, attributes: &web_sys::NamedNodeMap, attribute: &(String, String)) {
		let (name, value) = attribute;
		let attribute = match self.document.create_attribute(name) {
			Ok(attribute) => attribute,
			Err(error) => return error!("Could not create attribute {:?}: {:?}", name, error),
		};
		if !value.is_empty() {
			attribute.set_value(value)
		}
		match attributes.set_named_item(&attribute) {
			Ok(None) => (),
			Err(error) => error!("Could not add attribute {:?}: {:?}", name, error),
			Ok(Some(_)) => error!("Attribute collision. Added attribute {:?} was present before.", name),
		}
	}
}

#[instrument(skip(attributes, attribute), fields(name = %attribute.0))]
fn remove_attribute(attributes: &web_sys::NamedNodeMap, attribute: &(String, String)) {
	let (name, value) = attribute;
	match attributes.remove_named_item(name) {
		Err(error) => warn!("Could not remove attribute {:?}: {:?}", name, error),
		Ok(removed) => {
			if STATIC_MAX_LEVEL >= Level::WARN && &removed.value() != value {
				warn!("Unexpected value of removed attribute {:?}.", name);
			}
		}
	}
}

fn describe(node: &Html) -> String {
	match node {
		Html::Text(_) => "text".to_owned(),
		Html::Element(tag) => format!("<{}>", tag.name),
	}
}

/// The handler table indices [`HANDLERS_ATTRIBUTE`] value `bound` lists for `event_type`.
pub(crate) fn handler_indices<'a>(bound: &'a str, event_type: &'a str) -> impl 'a + Iterator<Item = usize> {
	bound.split_ascii_whitespace().filter_map(move |pair| {
		let mut parts = pair.rsplitn(2, ':');
		let index = parts.next()?;
		let event = parts.next()?;
		if event == event_type {
			index.parse().ok()
		} else {
			None
		}
	})
}

impl Drop for DomDiffer {
	fn drop(&mut self) {
		for event in self.bound_events.drain() {
			if let Err(error) = self.slot.remove_event_listener_with_callback(event, self.common_handler.as_ref().unchecked_ref()) {
				error!("Failed to remove delegated {:?} listener: {:?}", event, error)
			}
		}
		self.slot.remove()
	}
}
