use super::{
	mount::DomMount,
	node::{self, DomNode},
	schedule::BrowserSchedule,
};
use crate::{
	adapter::{Adapter, Context, ElementNode, Schedule},
	config::BridgeConfig,
	host::PortalHost,
	kind::Kind,
	present::{HtmlPresenter, Presenter},
	registry::{NodeId, Registry},
};
use core::cell::RefCell;
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{error, info, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, prelude::*, JsCast};

#[wasm_bindgen(inline_js = "
export function define_portal_element(tag, connected, disconnected) {
	if (customElements.get(tag) !== undefined) {
		return false;
	}
	customElements.define(tag, class extends HTMLElement {
		connectedCallback() { connected(this); }
		disconnectedCallback() { disconnected(this); }
	});
	return true;
}
")]
extern "C" {
	#[wasm_bindgen(catch)]
	fn define_portal_element(tag: &str, connected: &js_sys::Function, disconnected: &js_sys::Function) -> Result<bool, JsValue>;
}

type ElementCallback = Closure<dyn Fn(web_sys::HtmlElement)>;
type ObserverCallback = Closure<dyn Fn(js_sys::Array, web_sys::MutationObserver)>;

thread_local! {
	static BRIDGE: RefCell<Option<Rc<Bridge>>> = RefCell::new(None);
}

/// A registered element's mutation observers. Dropping this stops observation.
struct Observed {
	adapter: Adapter<DomNode>,
	attributes: web_sys::MutationObserver,
	content: web_sys::MutationObserver,
	_callbacks: [ObserverCallback; 2],
}

impl Drop for Observed {
	fn drop(&mut self) {
		self.attributes.disconnect();
		self.content.disconnect();
	}
}

/// The page's single custom element bridge: registry, render root and element definitions.
pub struct Bridge {
	config: BridgeConfig,
	context: Context<DomNode>,
	mount_point: web_sys::HtmlElement,
	host: PortalHost<DomNode, DomMount>,
	observed: RefCell<HashMap<NodeId, Observed>>,
	definitions: RefCell<Vec<ElementCallback>>,
}

/// Sets up the bridge with [`HtmlPresenter`]. See [`init_host_with_presenter`].
///
/// # Errors
///
/// See [`init_host_with_presenter`].
pub fn init_host(config: BridgeConfig) -> Result<(), JsValue> {
	init_host_with_presenter(config, Box::new(HtmlPresenter))
}

/// Creates the hidden mount point, the registry and the render root, then defines every custom element.
///
/// Only the first call per page has an effect. Tags that are already defined are skipped.
///
/// # Errors
///
/// Iff `config` is invalid, there is no document body, or a definition fails.
#[instrument(skip(presenter))]
pub fn init_host_with_presenter(config: BridgeConfig, presenter: Box<dyn Presenter>) -> Result<(), JsValue> {
	if BRIDGE.with(|bridge| bridge.borrow().is_some()) {
		return Ok(info!("Portal host already initialized."));
	}
	config.validate().map_err(|error| JsValue::from_str(&error.to_string()))?;

	let document = web_sys::window()
		.and_then(|window| window.document())
		.ok_or_else(|| JsValue::from_str("No document found."))?;
	let body = document.body().ok_or_else(|| JsValue::from_str("No document body found."))?;

	let mount_point = match document.get_element_by_id(&config.host_id) {
		Some(existing) => existing.dyn_into::<web_sys::HtmlElement>().map_err(JsValue::from)?,
		None => {
			let mount_point = document.create_element("div")?.dyn_into::<web_sys::HtmlElement>().map_err(JsValue::from)?;
			mount_point.set_id(&config.host_id);
			mount_point.style().set_property("display", "none")?;
			body.append_child(&mount_point)?;
			mount_point
		}
	};

	let registry = Registry::new();
	let schedule: Rc<dyn Schedule> = Rc::new(BrowserSchedule);
	let context = Context {
		registry: Rc::clone(&registry),
		schedule: Rc::clone(&schedule),
		recheck_delay_ms: config.recheck_delay_ms,
	};
	let bridge = Rc::new(Bridge {
		host: PortalHost::new(registry, DomMount::new(presenter), schedule),
		config,
		context,
		mount_point,
		observed: RefCell::default(),
		definitions: RefCell::default(),
	});

	BRIDGE.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&bridge)));
	Bridge::define_elements(&bridge)
}

/// The page's bridge, iff [`init_host`] succeeded.
#[must_use]
pub fn bridge() -> Option<Rc<Bridge>> {
	BRIDGE.with(|bridge| bridge.borrow().clone())
}

impl Bridge {
	#[must_use]
	pub fn config(&self) -> &BridgeConfig {
		&self.config
	}

	#[must_use]
	pub fn registry(&self) -> &Rc<Registry<DomNode>> {
		&self.context.registry
	}

	#[must_use]
	pub fn mount_point(&self) -> &web_sys::HtmlElement {
		&self.mount_point
	}

	#[must_use]
	pub fn host(&self) -> &PortalHost<DomNode, DomMount> {
		&self.host
	}

	fn define_elements(this: &Rc<Self>) -> Result<(), JsValue> {
		let disconnected: ElementCallback = Closure::wrap(Box::new({
			let bridge = Rc::downgrade(this);
			move |element: web_sys::HtmlElement| {
				if let Some(bridge) = bridge.upgrade() {
					bridge.disconnected(&DomNode::new(element))
				}
			}
		}) as Box<dyn Fn(web_sys::HtmlElement)>);

		for kind in Kind::ALL.iter().copied() {
			let connected: ElementCallback = Closure::wrap(Box::new({
				let bridge = Rc::downgrade(this);
				move |element: web_sys::HtmlElement| {
					if let Some(bridge) = bridge.upgrade() {
						Bridge::connected(&bridge, kind, DomNode::new(element))
					}
				}
			}) as Box<dyn Fn(web_sys::HtmlElement)>);

			let tag = kind.tag_name(&this.config.tag_prefix);
			let defined = define_portal_element(&tag, connected.as_ref().unchecked_ref(), disconnected.as_ref().unchecked_ref());
			this.definitions.borrow_mut().push(connected);
			if defined? {
				trace!(%tag, "Defined custom element.");
			} else {
				warn!(%tag, "Custom element already defined. Skipping.");
			}
		}

		this.definitions.borrow_mut().push(disconnected);
		Ok(())
	}

	#[instrument(skip(this, node))]
	fn connected(this: &Rc<Self>, kind: Kind, node: DomNode) {
		let bridge: Weak<Self> = Rc::downgrade(this);
		let id = Adapter::attach(&this.context, kind, node, move |adapter| {
			if let Some(bridge) = bridge.upgrade() {
				bridge.observe(adapter)
			}
		});
		trace!(%id, "Attached.");
	}

	#[instrument(skip(self, node))]
	fn disconnected(&self, node: &DomNode) {
		let id = match node.adapter_id() {
			Some(id) => id,
			None => return warn!("Disconnected element without adapter."),
		};

		let observed = self.observed.borrow_mut().remove(&id);
		match observed {
			Some(observed) => {
				let adapter = observed.adapter.clone();
				drop(observed);
				adapter.detach()
			}
			// Not registered yet. The pending registration still runs.
			None => self.context.registry.remove(id),
		}
	}

	#[instrument(skip(self, adapter), fields(id = %adapter.id()))]
	fn observe(&self, adapter: Adapter<DomNode>) {
		let element = adapter.node().element().clone();
		if !element.is_connected() || adapter.node().adapter_id() != Some(adapter.id()) {
			return trace!("Element moved on before registration. Not observing.");
		}

		let attribute_callback: ObserverCallback = Closure::wrap(Box::new({
			let adapter = adapter.clone();
			move |records: js_sys::Array, _: web_sys::MutationObserver| {
				let names: Vec<String> = records
					.iter()
					.filter_map(|record| record.dyn_into::<web_sys::MutationRecord>().ok())
					.filter_map(|record| record.attribute_name())
					.collect();
				if !names.is_empty() {
					adapter.on_attributes_changed(&names)
				}
			}
		}) as Box<dyn Fn(js_sys::Array, web_sys::MutationObserver)>);

		let content_callback: ObserverCallback = Closure::wrap(Box::new({
			let adapter = adapter.clone();
			move |records: js_sys::Array, _: web_sys::MutationObserver| {
				let relevant = records
					.iter()
					.filter_map(|record| record.dyn_into::<web_sys::MutationRecord>().ok())
					.any(|record| !node::is_projection_record(&record));
				if relevant {
					adapter.on_content_changed()
				} else {
					trace!("Ignored projection mutations.")
				}
			}
		}) as Box<dyn Fn(js_sys::Array, web_sys::MutationObserver)>);

		let observers = (|| -> Result<_, JsValue> {
			let attributes = web_sys::MutationObserver::new(attribute_callback.as_ref().unchecked_ref())?;
			let attribute_options = web_sys::MutationObserverInit::new();
			attribute_options.set_attributes(true);
			attributes.observe_with_options(&element, &attribute_options)?;

			let content = web_sys::MutationObserver::new(content_callback.as_ref().unchecked_ref())?;
			let content_options = web_sys::MutationObserverInit::new();
			content_options.set_child_list(true);
			content_options.set_character_data(true);
			content_options.set_subtree(true);
			content.observe_with_options(&element, &content_options)?;
			Ok((attributes, content))
		})();

		match observers {
			Ok((attributes, content)) => {
				self.observed.borrow_mut().insert(
					adapter.id(),
					Observed {
						adapter,
						attributes,
						content,
						_callbacks: [attribute_callback, content_callback],
					},
				);
			}
			Err(error) => error!("Failed to observe element: {:?}", error),
		}
	}
}
