use super::{diff::DomDiffer, node::DomNode};
use crate::{
	host::{Mount, Portal},
	present::Presenter,
	registry::NodeId,
};
use hashbrown::{hash_map::Entry, HashMap};
use tracing::{error, trace};

/// Projects portals into their containers, one [`DomDiffer`] per root.
pub struct DomMount {
	presenter: Box<dyn Presenter>,
	differs: HashMap<NodeId, DomDiffer>,
}

impl DomMount {
	#[must_use]
	pub fn new(presenter: Box<dyn Presenter>) -> Self {
		Self {
			presenter,
			differs: HashMap::new(),
		}
	}

	/// The slot `key` is currently projected into.
	#[must_use]
	pub fn slot(&self, key: NodeId) -> Option<&web_sys::HtmlElement> {
		self.differs.get(&key).map(DomDiffer::slot)
	}
}

impl Mount<DomNode> for DomMount {
	fn project(&mut self, portal: &Portal<DomNode>) {
		let html = self.presenter.present(&portal.content);
		let differ = match self.differs.entry(portal.key) {
			Entry::Occupied(occupied) => occupied.into_mut(),
			Entry::Vacant(vacant) => match DomDiffer::new_in(portal.target.element()) {
				Ok(differ) => vacant.insert(differ),
				Err(error) => return error!("Failed to create portal slot: {:?}", error),
			},
		};
		differ.update(html);
	}

	fn release(&mut self, key: NodeId) {
		if self.differs.remove(&key).is_some() {
			trace!(%key, "Removed portal slot.");
		}
	}
}
