#![cfg(target_arch = "wasm32")]

use portal_elements::{
	dom::{DomDiffer, SLOT_ATTRIBUTE},
	present::{Html, Listener, Tag},
};
use std::{cell::Cell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn container() -> web_sys::Element {
	let document = window().unwrap().document().unwrap();
	let container = document.create_element("div").unwrap();
	document.body().unwrap().append_child(&container).unwrap();
	container
}

fn tag(name: &'static str, attributes: &[(&str, &str)], children: Vec<Html>) -> Html {
	let mut tag = Tag::new(name);
	tag.attributes = attributes.iter().map(|&(name, value)| (name.to_owned(), value.to_owned())).collect();
	tag.children = children;
	Html::Element(tag)
}

fn text(text: &str) -> Html {
	Html::Text(text.to_owned())
}

#[wasm_bindgen_test]
fn creates_slot_and_content() {
	let container = container();
	let mut differ = DomDiffer::new_in(&container).unwrap();
	assert!(differ.slot().has_attribute(SLOT_ATTRIBUTE));
	assert_eq!(differ.slot().style().get_property_value("display").unwrap(), "contents");

	differ.update(vec![tag("span", &[("class", "badge"), ("data-size", "sm")], vec![text("New")])]);
	assert_eq!(differ.slot().inner_html(), r#"<span class="badge" data-size="sm">New</span>"#);
}

#[wasm_bindgen_test]
fn reuses_matching_nodes() {
	let container = container();
	let mut differ = DomDiffer::new_in(&container).unwrap();
	differ.update(vec![tag("td", &[("data-is-numeric", "")], vec![text("1")])]);
	let cell = differ.slot().first_element_child().unwrap();

	differ.update(vec![tag("td", &[], vec![text("2")])]);
	let updated = differ.slot().first_element_child().unwrap();
	assert!(cell.is_same_node(Some(updated.as_ref())));
	assert!(!updated.has_attribute("data-is-numeric"));
	assert_eq!(updated.text_content().unwrap(), "2");
}

#[wasm_bindgen_test]
fn replaces_mismatching_nodes() {
	let container = container();
	let mut differ = DomDiffer::new_in(&container).unwrap();
	differ.update(vec![tag("th", &[], vec![]), text("tail")]);
	differ.update(vec![tag("td", &[], vec![]), tag("td", &[], vec![])]);
	assert_eq!(differ.slot().inner_html(), "<td></td><td></td>");

	differ.update(Vec::new());
	assert_eq!(differ.slot().child_nodes().length(), 0);
}

#[wasm_bindgen_test]
fn delegates_events() {
	let container = container();
	let mut differ = DomDiffer::new_in(&container).unwrap();
	let clicks = Rc::new(Cell::new(0));

	let render = |differ: &mut DomDiffer| {
		let mut button = Tag::new("button");
		button.children.push(text("Go"));
		button.listeners.push(Listener {
			event: "click",
			handler: Rc::new({
				let clicks = Rc::clone(&clicks);
				move |_| clicks.set(clicks.get() + 1)
			}),
		});
		let mut card = Tag::new("div");
		card.children.push(Html::Element(button));
		differ.update(vec![Html::Element(card)]);
	};

	render(&mut differ);
	render(&mut differ);
	let button: HtmlElement = differ.slot().query_selector("button").unwrap().unwrap().dyn_into().unwrap();
	button.click();
	assert_eq!(clicks.get(), 1);

	differ.update(Vec::new());
	assert_eq!(clicks.get(), 1);
}

#[wasm_bindgen_test]
fn dropping_removes_the_slot() {
	let container = container();
	let differ = DomDiffer::new_in(&container).unwrap();
	assert_eq!(container.child_element_count(), 1);
	drop(differ);
	assert_eq!(container.child_element_count(), 0);
}
