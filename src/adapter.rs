//! Binds one external element's attach/detach lifecycle to [`Registry`] operations.
//!
//! The platform (see [`crate::dom`]) provides the element through [`ElementNode`] and reports its lifecycle and mutations.
//! Everything in here is just "on change, push the new state into the registry".

use crate::{
	kind::{ContentMode, Kind, TEXT_ATTRIBUTE},
	props::{self, Callback, PropValue, Props},
	registry::{NodeEntry, NodeId, Registry},
};
use serde_json::Value;
use std::rc::Rc;
use tracing::{instrument, trace, trace_span};

/// What an adapter needs from the external element it represents.
pub trait ElementNode: Clone + 'static {
	/// Every attribute as `(lowercase name, value)`, in document order.
	fn attributes(&self) -> Vec<(String, String)>;

	fn attribute(&self, name: &str) -> Option<String>;

	/// The text of the element's subtree, excluding anything projected into it.
	fn text(&self) -> String;

	fn set_style(&self, property: &str, value: &str);

	/// The identity of the adapter currently attached to this element, if any.
	fn adapter_id(&self) -> Option<NodeId>;

	fn set_adapter_id(&self, id: NodeId);

	/// The parent element, if there is one.
	fn parent(&self) -> Option<Self>;

	/// Emits a (bubbling) event named `event` from this element.
	fn dispatch(&self, event: &str, detail: Value);
}

/// Deferred execution on the host's single thread.
pub trait Schedule {
	/// Runs `task` once the current synchronous work (and any earlier microtasks) completed.
	fn microtask(&self, task: Box<dyn FnOnce()>);

	/// Runs `task` after roughly `delay_ms` milliseconds.
	fn timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>);
}

/// Shared by all adapters of one bridge.
pub struct Context<N> {
	pub registry: Rc<Registry<N>>,
	pub schedule: Rc<dyn Schedule>,
	/// Delay before kinds with [`deferred_recheck`](`crate::kind::KindBehavior::deferred_recheck`) derive their state again.
	pub recheck_delay_ms: u32,
}

impl<N> Clone for Context<N> {
	fn clone(&self) -> Self {
		Self {
			registry: Rc::clone(&self.registry),
			schedule: Rc::clone(&self.schedule),
			recheck_delay_ms: self.recheck_delay_ms,
		}
	}
}

/// Box props a provider applies to its own element as inline style on attach.
const PROVIDER_BOX_STYLES: &[(&str, &str)] = &[
	("borderColor", "border-color"),
	("borderWidth", "border-width"),
	("borderRadius", "border-radius"),
	("padding", "padding"),
	("margin", "margin"),
	("backgroundColor", "background-color"),
];

/// A registered element.
///
/// Holds only its entry's id and the element itself, never a reference into the registry's entries.
pub struct Adapter<N: ElementNode> {
	id: NodeId,
	kind: Kind,
	node: N,
	registry: Rc<Registry<N>>,
}

impl<N: ElementNode> Clone for Adapter<N> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			kind: self.kind,
			node: self.node.clone(),
			registry: Rc::clone(&self.registry),
		}
	}
}

impl<N: ElementNode> Adapter<N> {
	/// Starts attaching `node` as `kind`.
	///
	/// The new identity and presentation defaults are applied immediately.
	/// Registration itself waits for the next microtask, so that ancestors attached in the same batch are registered first,
	/// after which `registered` receives the adapter to start observing the element.
	///
	/// Detaching before that microtask runs does not cancel the registration.
	#[instrument(skip(context, node, registered))]
	pub fn attach(context: &Context<N>, kind: Kind, node: N, registered: impl FnOnce(Adapter<N>) + 'static) -> NodeId {
		let id = NodeId::fresh();
		node.set_adapter_id(id);
		apply_presentation_defaults(kind, &node);

		let continuation = {
			let context = context.clone();
			move || {
				let span = trace_span!("deferred registration", %id, %kind);
				let _enter = span.enter();

				let adapter = Adapter {
					id,
					kind,
					node,
					registry: Rc::clone(&context.registry),
				};
				adapter.register();

				if kind.behavior().deferred_recheck {
					let later = adapter.clone();
					context.schedule.timeout(context.recheck_delay_ms, Box::new(move || later.recheck()));
				}
				registered(adapter)
			}
		};
		context.schedule.microtask(Box::new(continuation));
		id
	}

	#[must_use]
	pub fn id(&self) -> NodeId {
		self.id
	}

	#[must_use]
	pub fn kind(&self) -> Kind {
		self.kind
	}

	#[must_use]
	pub fn node(&self) -> &N {
		&self.node
	}

	fn register(&self) {
		let parent_id = self.find_parent_id();
		trace!(parent_id = ?parent_id.map(|id| id.to_string()));

		let entry = NodeEntry::new(self.id, self.kind, self.node.clone())
			.with_parent(parent_id)
			.with_props(self.derive_props())
			.with_text(self.derive_text());
		self.registry.upsert(entry);
		// Descendants may be upgraded, and so registered, before this element.
		self.registry.adopt_children(self.id);

		if let Some(parent_id) = parent_id {
			self.registry.add_child(parent_id, self.id);
		}
	}

	/// The nearest ancestor that's attached as adapter, if any.
	fn find_parent_id(&self) -> Option<NodeId> {
		let mut ancestor = self.node.parent();
		while let Some(node) = ancestor {
			if let Some(id) = node.adapter_id() {
				return Some(id);
			}
			ancestor = node.parent();
		}
		None
	}

	fn derive_props(&self) -> Props {
		let previous = self.registry.props_of(self.id);
		let mut props = props::derive_props(self.kind, &self.node.attributes(), previous.as_ref());
		for event_prop in self.kind.behavior().events {
			let node = self.node.clone();
			let event = event_prop.event;
			props.insert(
				event_prop.prop.to_owned(),
				PropValue::Callback(Callback::new(move |detail| node.dispatch(event, detail))),
			);
		}
		props
	}

	fn derive_text(&self) -> Option<String> {
		if self.kind.behavior().content == ContentMode::None {
			return None;
		}
		let text = props::derive_text(self.node.attribute(TEXT_ATTRIBUTE).as_deref(), &self.node.text());
		if cfg!(feature = "dangerous-logging") {
			trace!(text = ?text);
		} else {
			trace!(text_len = text.as_ref().map_or(0, String::len));
		}
		text
	}

	/// Re-derives props after attribute mutations, and text too if the override changed.
	#[instrument(skip(self), fields(id = %self.id))]
	pub fn on_attributes_changed(&self, names: &[String]) {
		self.registry.update_props(self.id, self.derive_props());
		if names.iter().any(|name| name.eq_ignore_ascii_case(TEXT_ATTRIBUTE)) {
			self.registry.update_text_content(self.id, self.derive_text());
		}
	}

	/// Re-derives text after subtree content mutations. Props are left alone.
	#[instrument(skip(self), fields(id = %self.id))]
	pub fn on_content_changed(&self) {
		self.registry.update_text_content(self.id, self.derive_text());
	}

	#[instrument(skip(self), fields(id = %self.id))]
	fn recheck(&self) {
		self.registry.update_props(self.id, self.derive_props());
		self.registry.update_text_content(self.id, self.derive_text());
	}

	/// Removes this adapter's entry. Observation must be stopped by the caller beforehand.
	#[instrument(skip(self), fields(id = %self.id))]
	pub fn detach(self) {
		self.registry.remove(self.id);
	}
}

fn apply_presentation_defaults<N: ElementNode>(kind: Kind, node: &N) {
	if kind == Kind::Provider {
		let props = props::derive_props(kind, &node.attributes(), None);
		for &(prop, property) in PROVIDER_BOX_STYLES {
			if let Some(value) = props.get(prop).and_then(PropValue::as_str).filter(|value| !value.is_empty()) {
				node.set_style(property, value);
			}
		}
	}
	if let Some(display) = kind.behavior().display {
		node.set_style("display", display);
	}
}
