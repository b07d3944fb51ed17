use crate::{
	adapter::{ElementNode, Schedule},
	registry::NodeId,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use serde_json::Value;
use std::{collections::VecDeque, rc::Rc};

#[derive(Default)]
struct FakeElement {
	tag: String,
	attributes: RefCell<Vec<(String, String)>>,
	text: RefCell<String>,
	styles: RefCell<Vec<(String, String)>>,
	adapter_id: Cell<Option<NodeId>>,
	parent: RefCell<Option<FakeNode>>,
	dispatched: RefCell<Vec<(String, Value)>>,
}

/// An in-memory element: attributes, flat text and a parent link.
#[derive(Clone)]
pub struct FakeNode(Rc<FakeElement>);

impl FakeNode {
	pub fn new(tag: &str) -> Self {
		Self(Rc::new(FakeElement {
			tag: tag.to_owned(),
			..FakeElement::default()
		}))
	}

	pub fn with_parent(self, parent: &FakeNode) -> Self {
		*self.0.parent.borrow_mut() = Some(parent.clone());
		self
	}

	pub fn with_attribute(self, name: &str, value: &str) -> Self {
		self.set_attribute(name, value);
		self
	}

	pub fn with_text(self, text: &str) -> Self {
		self.set_text(text);
		self
	}

	pub fn set_attribute(&self, name: &str, value: &str) {
		let mut attributes = self.0.attributes.borrow_mut();
		match attributes.iter_mut().find(|(existing, _)| existing == name) {
			Some((_, existing)) => *existing = value.to_owned(),
			None => attributes.push((name.to_owned(), value.to_owned())),
		}
	}

	pub fn set_text(&self, text: &str) {
		*self.0.text.borrow_mut() = text.to_owned();
	}

	pub fn style(&self, property: &str) -> Option<String> {
		self.0.styles.borrow().iter().find(|(name, _)| name == property).map(|(_, value)| value.clone())
	}

	pub fn dispatched(&self) -> Vec<(String, Value)> {
		self.0.dispatched.borrow().clone()
	}
}

impl PartialEq for FakeNode {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for FakeNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "<{}>", self.0.tag)
	}
}

impl ElementNode for FakeNode {
	fn attributes(&self) -> Vec<(String, String)> {
		self.0.attributes.borrow().clone()
	}

	fn attribute(&self, name: &str) -> Option<String> {
		self.0.attributes.borrow().iter().find(|(existing, _)| existing == name).map(|(_, value)| value.clone())
	}

	fn text(&self) -> String {
		self.0.text.borrow().clone()
	}

	fn set_style(&self, property: &str, value: &str) {
		self.0.styles.borrow_mut().push((property.to_owned(), value.to_owned()));
	}

	fn adapter_id(&self) -> Option<NodeId> {
		self.0.adapter_id.get()
	}

	fn set_adapter_id(&self, id: NodeId) {
		self.0.adapter_id.set(Some(id));
	}

	fn parent(&self) -> Option<Self> {
		self.0.parent.borrow().clone()
	}

	fn dispatch(&self, event: &str, detail: Value) {
		self.0.dispatched.borrow_mut().push((event.to_owned(), detail));
	}
}

/// Runs deferred work only when told to.
#[derive(Default)]
pub struct ManualSchedule {
	microtasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
	timeouts: RefCell<VecDeque<(u32, Box<dyn FnOnce()>)>>,
}

impl ManualSchedule {
	/// Runs microtasks until none are left, including ones queued meanwhile. Returns how many ran.
	pub fn run_microtasks(&self) -> usize {
		let mut count = 0;
		loop {
			let task = self.microtasks.borrow_mut().pop_front();
			match task {
				Some(task) => task(),
				None => return count,
			}
			count += 1;
		}
	}

	/// Runs the currently queued timeouts (and then microtasks). Returns their delays.
	pub fn run_timeouts(&self) -> Vec<u32> {
		let timeouts: Vec<_> = self.timeouts.borrow_mut().drain(..).collect();
		let mut delays = Vec::new();
		for (delay, task) in timeouts {
			task();
			delays.push(delay);
		}
		self.run_microtasks();
		delays
	}

	pub fn pending_microtasks(&self) -> usize {
		self.microtasks.borrow().len()
	}
}

impl Schedule for ManualSchedule {
	fn microtask(&self, task: Box<dyn FnOnce()>) {
		self.microtasks.borrow_mut().push_back(task);
	}

	fn timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) {
		self.timeouts.borrow_mut().push_back((delay_ms, task));
	}
}
