#![cfg(target_arch = "wasm32")]

use portal_elements::{
	dom::{self, SLOT_ATTRIBUTE},
	BridgeConfig, ElementNode, Kind,
};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn init() {
	thread_local!(static LOG_INITIALIZED: RefCell<bool> = RefCell::new(false));
	LOG_INITIALIZED.with(|initialized| {
		if !initialized.replace(true) {
			tracing_wasm::set_as_global_default();
		}
	});
	dom::init_host(BridgeConfig::default()).unwrap();
}

/// Resolves after pending microtasks and `delay_ms`.
async fn settle(delay_ms: i32) {
	let promise = js_sys::Promise::new(&mut |resolve, _| {
		window()
			.unwrap()
			.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, delay_ms)
			.unwrap();
	});
	JsFuture::from(promise).await.unwrap();
}

fn fixture(html: &str) -> HtmlElement {
	let document = window().unwrap().document().unwrap();
	let fixture: HtmlElement = document.create_element("section").unwrap().dyn_into().unwrap();
	fixture.set_inner_html(html);
	document.body().unwrap().append_child(&fixture).unwrap();
	fixture
}

fn select(root: &HtmlElement, selector: &str) -> HtmlElement {
	root.query_selector(selector).unwrap().unwrap().dyn_into().unwrap()
}

fn slot_of(element: &HtmlElement) -> Option<web_sys::Element> {
	element.query_selector(&format!(":scope > [{}]", SLOT_ATTRIBUTE)).unwrap()
}

#[wasm_bindgen_test]
async fn initialization_is_idempotent() {
	init();
	assert!(dom::init_host(BridgeConfig::default().with_host_id("other")).is_ok());

	let bridge = dom::bridge().unwrap();
	assert_eq!(bridge.config().host_id, "chakra-wc-portal-host");
	assert_eq!(bridge.mount_point().id(), "chakra-wc-portal-host");
	assert_eq!(bridge.mount_point().style().get_property_value("display").unwrap(), "none");
	let is_defined = js_sys::Function::new_with_args("tag", "return customElements.get(tag) !== undefined;");
	for kind in Kind::ALL.iter() {
		let tag = kind.tag_name("chakra");
		assert_eq!(is_defined.call1(&JsValue::NULL, &JsValue::from_str(&tag)).unwrap(), JsValue::TRUE, "{}", tag);
	}
}

#[wasm_bindgen_test]
async fn simple_table_is_projected_into_its_container() {
	init();
	let page = fixture(
		r#"<chakra-table-container overflow="auto hidden">
			<chakra-table><chakra-tbody><chakra-tr>
				<chakra-td text="Total"></chakra-td>
				<chakra-td isnumeric>42</chakra-td>
			</chakra-tr></chakra-tbody></chakra-table>
		</chakra-table-container>"#,
	);
	settle(0).await;

	let container = select(&page, "chakra-table-container");
	let registry = Rc::clone(dom::bridge().unwrap().registry());
	let container_id = dom::DomNode::new(container.clone()).adapter_id().unwrap();
	assert!(registry.roots().contains(&container_id));

	let slot = slot_of(&container).expect("container has a portal slot");
	let wrapper: HtmlElement = slot.first_element_child().unwrap().dyn_into().unwrap();
	assert_eq!(wrapper.class_name(), "table-container");
	assert_eq!(wrapper.style().get_property_value("overflow-x").unwrap(), "auto");
	assert_eq!(wrapper.style().get_property_value("overflow-y").unwrap(), "hidden");

	let cells = slot.query_selector_all("td").unwrap();
	assert_eq!(cells.length(), 2);
	assert_eq!(cells.get(0).unwrap().text_content().unwrap(), "Total");
	assert_eq!(cells.get(1).unwrap().text_content().unwrap(), "42");
	assert!(cells.get(1).unwrap().dyn_into::<web_sys::Element>().unwrap().has_attribute("data-is-numeric"));

	// Nested elements aren't portaled themselves.
	assert!(slot_of(&select(&page, "chakra-tr")).is_none());
	page.remove();
}

#[wasm_bindgen_test]
async fn mutations_rerender_and_removal_releases() {
	init();
	let page = fixture(r#"<chakra-badge colorscheme="red">New</chakra-badge>"#);
	settle(0).await;
	let badge = select(&page, "chakra-badge");
	let rendered = || slot_of(&badge).and_then(|slot| slot.first_element_child());

	let span = rendered().unwrap();
	assert_eq!(span.get_attribute("data-color-scheme").as_deref(), Some("red"));
	assert_eq!(span.text_content().unwrap(), "New");

	badge.set_attribute("colorscheme", "green").unwrap();
	badge.set_attribute("text", "Old").unwrap();
	settle(0).await;
	let span = rendered().unwrap();
	assert_eq!(span.get_attribute("data-color-scheme").as_deref(), Some("green"));
	assert_eq!(span.text_content().unwrap(), "Old");

	let id = dom::DomNode::new(badge.clone()).adapter_id().unwrap();
	page.remove();
	settle(0).await;
	assert!(!dom::bridge().unwrap().registry().contains(id));
	assert!(slot_of(&badge).is_none());
}

#[wasm_bindgen_test]
async fn projection_does_not_feed_back_into_text() {
	init();
	let page = fixture("<chakra-code>let x = 1;</chakra-code>");
	settle(0).await;
	let code = select(&page, "chakra-code");
	let id = dom::DomNode::new(code.clone()).adapter_id().unwrap();
	let registry = Rc::clone(dom::bridge().unwrap().registry());

	let tick = dom::bridge().unwrap().host().tick();
	settle(80).await;
	assert_eq!(registry.get(id).unwrap().text_content.as_deref(), Some("let x = 1;"));
	// Only the deferred recheck notified, projection did not.
	assert_eq!(dom::bridge().unwrap().host().tick(), tick + 2);
	page.remove();
}

#[wasm_bindgen_test]
async fn card_context_menu_dispatches_custom_event() {
	init();
	let page = fixture("<chakra-card><chakra-card-body>Body</chakra-card-body></chakra-card>");
	settle(0).await;
	let card = select(&page, "chakra-card");

	let details = Rc::new(RefCell::new(Vec::new()));
	let listener = Closure::wrap(Box::new({
		let details = Rc::clone(&details);
		move |event: web_sys::CustomEvent| details.borrow_mut().push(String::from(js_sys::JSON::stringify(&event.detail()).unwrap()))
	}) as Box<dyn Fn(web_sys::CustomEvent)>);
	page.add_event_listener_with_callback("contextmenuevent", listener.as_ref().unchecked_ref()).unwrap();

	let rendered: HtmlElement = slot_of(&card).unwrap().query_selector(".card-body").unwrap().unwrap().dyn_into().unwrap();
	let init = web_sys::MouseEventInit::new();
	init.set_bubbles(true);
	init.set_cancelable(true);
	let event = web_sys::MouseEvent::new_with_mouse_event_init_dict("contextmenu", &init).unwrap();
	let not_prevented = rendered.dispatch_event(&event).unwrap();

	assert!(!not_prevented);
	assert_eq!(details.borrow().len(), 1);
	assert!(details.borrow()[0].contains("pageX"));
	page.remove();
}

#[cfg(feature = "auto-init")]
#[wasm_bindgen_test]
async fn auto_init_after_loading_initializes_directly() {
	assert_ne!(window().unwrap().document().unwrap().ready_state(), "loading");
	dom::auto_init().unwrap();
	assert!(dom::bridge().is_some());
}
