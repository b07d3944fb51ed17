//! The shadow tree: one [`NodeEntry`] per live adapter, plus change notification.

use crate::{kind::Kind, props::Props};
use core::{
	cell::{Ref, RefCell},
	fmt::{self, Display, Formatter},
	sync::atomic::{AtomicU64, Ordering},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{instrument, trace};

/// Opaque node identity.
///
/// Identities are unique per process and never reused, even across separate [`Registry`] instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
	/// Allocates a new identity.
	#[must_use]
	pub fn fresh() -> Self {
		Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
	}

	#[must_use]
	pub fn get(self) -> u64 {
		self.0
	}

	/// Reconstructs an identity previously obtained through [`NodeId::get`].
	#[must_use]
	pub fn from_raw(raw: u64) -> Self {
		Self(raw)
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "node-{}", self.0)
	}
}

/// The registry's record for one node.
///
/// `C` is the handle of the external element this entry represents.
/// It is used only as portal target and never mutated here.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry<C> {
	pub id: NodeId,
	pub parent_id: Option<NodeId>,
	pub container: C,
	pub kind: Kind,
	pub props: Props,
	/// Authoritative rendering order of this node's children.
	pub children_order: Vec<NodeId>,
	pub text_content: Option<String>,
}

impl<C> NodeEntry<C> {
	#[must_use]
	pub fn new(id: NodeId, kind: Kind, container: C) -> Self {
		Self {
			id,
			parent_id: None,
			container,
			kind,
			props: Props::new(),
			children_order: Vec::new(),
			text_content: None,
		}
	}

	#[must_use]
	pub fn with_parent(mut self, parent_id: Option<NodeId>) -> Self {
		self.parent_id = parent_id;
		self
	}

	#[must_use]
	pub fn with_props(mut self, props: Props) -> Self {
		self.props = props;
		self
	}

	#[must_use]
	pub fn with_text(mut self, text_content: impl Into<Option<String>>) -> Self {
		self.text_content = text_content.into();
		self
	}

	#[must_use]
	pub fn is_root(&self) -> bool {
		self.parent_id.is_none()
	}
}

pub type Entries<C> = HashMap<NodeId, NodeEntry<C>>;

type Listener = Rc<dyn Fn()>;

#[derive(Default)]
struct Listeners {
	next_key: u64,
	slots: Vec<(u64, Listener)>,
}

/// Owns every [`NodeEntry`] and the set of change listeners.
///
/// All operations complete synchronously. Mutating calls notify all listeners exactly once
/// when they change something, after releasing the internal borrow,
/// so listeners are free to read the registry again.
pub struct Registry<C> {
	entries: RefCell<Entries<C>>,
	listeners: Rc<RefCell<Listeners>>,
}

impl<C> fmt::Debug for Registry<C> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registry")
			.field("entries", &self.entries.borrow().len())
			.field("listeners", &self.listeners.borrow().slots.len())
			.finish()
	}
}

impl<C: Clone> Registry<C> {
	#[must_use]
	#[allow(clippy::new_ret_no_self)]
	pub fn new() -> Rc<Self> {
		Rc::new(Self {
			entries: RefCell::default(),
			listeners: Rc::default(),
		})
	}

	/// Inserts `entry` or replaces the entry with the same id wholesale. Last writer wins.
	#[instrument(skip(self, entry), fields(id = %entry.id, kind = ?entry.kind))]
	pub fn upsert(&self, entry: NodeEntry<C>) {
		let replaced = self.entries.borrow_mut().insert(entry.id, entry).is_some();
		trace!(replaced);
		self.notify();
	}

	/// Deletes the entry and unlinks it from its parent, if that parent still exists.
	///
	/// Children are **not** removed. They stay in the map, unreachable from any root, until their own adapters remove them.
	#[instrument(skip(self))]
	pub fn remove(&self, id: NodeId) {
		{
			let mut entries = self.entries.borrow_mut();
			let entry = match entries.remove(&id) {
				Some(entry) => entry,
				None => return trace!("Not registered."),
			};
			if let Some(parent_id) = entry.parent_id {
				match entries.get_mut(&parent_id) {
					Some(parent) => parent.children_order.retain(|&child| child != id),
					None => trace!(%parent_id, "Parent already gone."),
				}
			}
		}
		self.notify();
	}

	/// Appends `child_id` to the parent's children unless it's already listed.
	///
	/// Silently does nothing if the parent is missing.
	#[instrument(skip(self))]
	pub fn add_child(&self, parent_id: NodeId, child_id: NodeId) {
		{
			let mut entries = self.entries.borrow_mut();
			let parent = match entries.get_mut(&parent_id) {
				Some(parent) => parent,
				None => return trace!("Parent missing."),
			};
			if parent.children_order.contains(&child_id) {
				return trace!("Already a child.");
			}
			parent.children_order.push(child_id);
		}
		self.notify();
	}

	/// Appends every entry that names `parent_id` as parent but isn't listed in its `children_order` yet,
	/// in creation order.
	///
	/// Notifies once if anything was adopted. Silently does nothing if the parent is missing.
	#[instrument(skip(self))]
	pub fn adopt_children(&self, parent_id: NodeId) {
		{
			let mut entries = self.entries.borrow_mut();
			let listed = match entries.get(&parent_id) {
				Some(parent) => &parent.children_order,
				None => return trace!("Parent missing."),
			};
			let mut waiting: Vec<NodeId> = entries
				.values()
				.filter(|entry| entry.parent_id == Some(parent_id) && !listed.contains(&entry.id))
				.map(|entry| entry.id)
				.collect();
			if waiting.is_empty() {
				return;
			}
			waiting.sort_unstable();
			trace!(adopted = waiting.len());
			if let Some(parent) = entries.get_mut(&parent_id) {
				parent.children_order.extend(waiting);
			}
		}
		self.notify();
	}

	#[instrument(skip(self, props))]
	pub fn update_props(&self, id: NodeId, props: Props) {
		match self.entries.borrow_mut().get_mut(&id) {
			Some(entry) => entry.props = props,
			None => return trace!("Not registered."),
		}
		self.notify();
	}

	#[instrument(skip(self, text_content))]
	pub fn update_text_content(&self, id: NodeId, text_content: Option<String>) {
		match self.entries.borrow_mut().get_mut(&id) {
			Some(entry) => entry.text_content = text_content,
			None => return trace!("Not registered."),
		}
		self.notify();
	}

	/// Registers a change listener, which stays active until the returned [`Subscription`] is dropped.
	pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
		let mut listeners = self.listeners.borrow_mut();
		let key = listeners.next_key;
		listeners.next_key += 1;
		listeners.slots.push((key, Rc::new(listener)));
		Subscription {
			listeners: Rc::downgrade(&self.listeners),
			key,
		}
	}

	#[must_use]
	pub fn get(&self, id: NodeId) -> Option<NodeEntry<C>> {
		self.entries.borrow().get(&id).cloned()
	}

	#[must_use]
	pub fn contains(&self, id: NodeId) -> bool {
		self.entries.borrow().contains_key(&id)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}

	/// The current `children_order` of `id`, or [`None`] if it isn't registered.
	#[must_use]
	pub fn children_of(&self, id: NodeId) -> Option<Vec<NodeId>> {
		self.entries.borrow().get(&id).map(|entry| entry.children_order.clone())
	}

	/// The current props of `id`, or [`None`] if it isn't registered.
	#[must_use]
	pub fn props_of(&self, id: NodeId) -> Option<Props> {
		self.entries.borrow().get(&id).map(|entry| entry.props.clone())
	}

	/// Every entry without a parent, in creation order.
	#[must_use]
	pub fn roots(&self) -> Vec<NodeId> {
		roots(&self.entries.borrow())
	}

	/// Read access to all entries.
	///
	/// # Panics
	///
	/// Iff the returned [`Ref`] is still held while the registry is mutated.
	pub fn snapshot(&self) -> Ref<'_, Entries<C>> {
		self.entries.borrow()
	}

	fn notify(&self) {
		let listeners: Vec<Listener> = self.listeners.borrow().slots.iter().map(|(_, listener)| Rc::clone(listener)).collect();
		trace!("Notifying {} listener(s).", listeners.len());
		for listener in listeners {
			listener();
		}
	}
}

/// Every entry of `entries` without a parent, in creation order.
#[must_use]
pub fn roots<C>(entries: &Entries<C>) -> Vec<NodeId> {
	let mut roots: Vec<NodeId> = entries.values().filter(|entry| entry.is_root()).map(|entry| entry.id).collect();
	roots.sort_unstable();
	roots
}

/// Keeps a [`Registry`] listener alive.
#[must_use = "The listener is removed when the subscription is dropped."]
pub struct Subscription {
	listeners: Weak<RefCell<Listeners>>,
	key: u64,
}

impl Subscription {
	pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(listeners) = self.listeners.upgrade() {
			listeners.borrow_mut().slots.retain(|(key, _)| *key != self.key);
		}
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("key", &self.key).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::props::PropValue;
	use core::cell::Cell;

	fn counting(registry: &Registry<&'static str>) -> (Rc<Cell<usize>>, Subscription) {
		let count = Rc::new(Cell::new(0));
		let subscription = registry.subscribe({
			let count = Rc::clone(&count);
			move || count.set(count.get() + 1)
		});
		(count, subscription)
	}

	#[test]
	fn upsert_twice_is_idempotent() {
		let registry = Registry::new();
		let id = NodeId::fresh();
		let entry = NodeEntry::new(id, Kind::Badge, "badge").with_text(Some("New".to_owned()));

		registry.upsert(entry.clone());
		let once = registry.get(id);
		registry.upsert(entry);

		assert_eq!(registry.get(id), once);
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn upsert_notifies_once_per_call() {
		let registry = Registry::new();
		let (count, _subscription) = counting(&registry);
		registry.upsert(NodeEntry::new(NodeId::fresh(), Kind::Table, "table"));
		assert_eq!(count.get(), 1);
	}

	#[test]
	fn add_child_is_idempotent() {
		let registry = Registry::new();
		let (parent, child) = (NodeId::fresh(), NodeId::fresh());
		registry.upsert(NodeEntry::new(parent, Kind::Tr, "tr"));
		registry.upsert(NodeEntry::new(child, Kind::Td, "td").with_parent(Some(parent)));

		let (count, _subscription) = counting(&registry);
		registry.add_child(parent, child);
		registry.add_child(parent, child);

		assert_eq!(registry.children_of(parent), Some(vec![child]));
		assert_eq!(count.get(), 1);
	}

	#[test]
	fn add_child_to_missing_parent_is_silent() {
		let registry = Registry::new();
		let (count, _subscription) = counting(&registry);
		registry.add_child(NodeId::fresh(), NodeId::fresh());
		assert_eq!(count.get(), 0);
		assert!(registry.is_empty());
	}

	#[test]
	fn remove_unlinks_from_parent_without_cascading() {
		let registry = Registry::new();
		let (parent, child, grandchild) = (NodeId::fresh(), NodeId::fresh(), NodeId::fresh());
		registry.upsert(NodeEntry::new(parent, Kind::Tbody, "tbody"));
		registry.upsert(NodeEntry::new(child, Kind::Tr, "tr").with_parent(Some(parent)));
		registry.add_child(parent, child);
		registry.upsert(NodeEntry::new(grandchild, Kind::Td, "td").with_parent(Some(child)));
		registry.add_child(child, grandchild);

		registry.remove(child);
		assert_eq!(registry.children_of(parent), Some(vec![]));
		assert!(registry.contains(grandchild));

		registry.remove(parent);
		assert!(!registry.contains(parent));
		assert!(registry.contains(grandchild));
		// Still pointing at its removed parent, so not a root either.
		assert!(registry.roots().is_empty());
	}

	#[test]
	fn adopt_children_picks_up_entries_registered_first() {
		let registry = Registry::new();
		let (card, header, body) = (NodeId::fresh(), NodeId::fresh(), NodeId::fresh());
		registry.upsert(NodeEntry::new(body, Kind::CardBody, "body").with_parent(Some(card)));
		registry.upsert(NodeEntry::new(header, Kind::CardHeader, "header").with_parent(Some(card)));
		registry.add_child(card, header);
		assert!(registry.roots().is_empty());

		registry.upsert(NodeEntry::new(card, Kind::Card, "card"));
		let (count, _subscription) = counting(&registry);
		registry.adopt_children(card);
		assert_eq!(registry.children_of(card), Some(vec![header, body]));
		assert_eq!(count.get(), 1);

		registry.adopt_children(card);
		registry.adopt_children(NodeId::fresh());
		assert_eq!(count.get(), 1);
	}

	#[test]
	fn remove_of_unknown_id_does_not_notify() {
		let registry = Registry::<&str>::new();
		let (count, _subscription) = counting(&registry);
		registry.remove(NodeId::fresh());
		assert_eq!(count.get(), 0);
	}

	#[test]
	fn updates_replace_wholesale_and_skip_missing_entries() {
		let registry = Registry::new();
		let id = NodeId::fresh();
		let mut first = Props::new();
		first.insert("size".to_owned(), PropValue::from("sm"));
		first.insert("variant".to_owned(), PropValue::from("solid"));
		registry.upsert(NodeEntry::new(id, Kind::Badge, "badge").with_props(first));

		let mut second = Props::new();
		second.insert("colorScheme".to_owned(), PropValue::from("red"));
		registry.update_props(id, second.clone());
		assert_eq!(registry.props_of(id), Some(second));

		registry.update_text_content(id, Some("Done".to_owned()));
		assert_eq!(registry.get(id).and_then(|entry| entry.text_content), Some("Done".to_owned()));

		let (count, _subscription) = counting(&registry);
		let missing = NodeId::fresh();
		registry.update_props(missing, Props::new());
		registry.update_text_content(missing, None);
		assert_eq!(count.get(), 0);
	}

	#[test]
	fn dropped_subscription_stops_notifications() {
		let registry = Registry::new();
		let (count, subscription) = counting(&registry);
		registry.upsert(NodeEntry::new(NodeId::fresh(), Kind::Card, "card"));
		subscription.unsubscribe();
		registry.upsert(NodeEntry::new(NodeId::fresh(), Kind::Card, "card"));
		assert_eq!(count.get(), 1);
	}

	#[test]
	fn listeners_may_read_during_notification() {
		let registry = Registry::new();
		let seen = Rc::new(Cell::new(0));
		let _subscription = registry.subscribe({
			let registry = Rc::downgrade(&registry);
			let seen = Rc::clone(&seen);
			move || seen.set(registry.upgrade().map_or(0, |registry| registry.len()))
		});
		registry.upsert(NodeEntry::new(NodeId::fresh(), Kind::Code, "code"));
		assert_eq!(seen.get(), 1);
	}

	#[test]
	fn roots_are_in_creation_order() {
		let registry = Registry::new();
		let ids: Vec<NodeId> = (0..4).map(|_| NodeId::fresh()).collect();
		for &id in ids.iter().rev() {
			registry.upsert(NodeEntry::new(id, Kind::Badge, "badge"));
		}
		assert_eq!(registry.roots(), ids);
	}
}
