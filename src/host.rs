//! The single long-lived render root.

use crate::{
	adapter::Schedule,
	build::{build, RenderNode},
	registry::{roots, Entries, NodeId, Registry, Subscription},
};
use core::cell::{Cell, RefCell};
use hashbrown::HashSet;
use std::rc::{Rc, Weak};
use tracing::{instrument, trace, trace_span};

/// A root subtree together with where it has to be projected.
#[derive(Debug, Clone, PartialEq)]
pub struct Portal<C> {
	/// The root entry's id. Stable for as long as the root exists.
	pub key: NodeId,
	pub target: C,
	pub content: RenderNode,
}

/// Places portal content at its target.
pub trait Mount<C> {
	/// Shows `portal.content` inside `portal.target`, replacing what was projected for `portal.key` before.
	fn project(&mut self, portal: &Portal<C>);

	/// Removes everything projected for `key`.
	fn release(&mut self, key: NodeId);
}

/// One portal per current root entry, in creation order.
///
/// The root set is recomputed from `entries` on every call.
#[must_use]
pub fn portals<C: Clone>(entries: &Entries<C>) -> Vec<Portal<C>> {
	roots(entries)
		.into_iter()
		.filter_map(|key| {
			entries.get(&key).map(|entry| Portal {
				key,
				target: entry.container.clone(),
				content: build(key, entries),
			})
		})
		.collect()
}

struct HostState<C, M> {
	registry: Rc<Registry<C>>,
	schedule: Rc<dyn Schedule>,
	mount: RefCell<M>,
	/// Bumped on every registry notification. Carries no other meaning.
	tick: Cell<u64>,
	rendered_tick: Cell<u64>,
	render_pending: Cell<bool>,
	projected: RefCell<HashSet<NodeId>>,
}

/// Keeps every root entry's subtree projected into that entry's container.
///
/// Renders once on creation, then once per batch of registry notifications (on the next microtask).
pub struct PortalHost<C, M> {
	state: Rc<HostState<C, M>>,
	_subscription: Subscription,
}

impl<C, M> PortalHost<C, M>
where
	C: Clone + 'static,
	M: Mount<C> + 'static,
{
	pub fn new(registry: Rc<Registry<C>>, mount: M, schedule: Rc<dyn Schedule>) -> Self {
		let state = Rc::new(HostState {
			registry: Rc::clone(&registry),
			schedule,
			mount: RefCell::new(mount),
			tick: Cell::new(0),
			rendered_tick: Cell::new(0),
			render_pending: Cell::new(false),
			projected: RefCell::default(),
		});

		let subscription = registry.subscribe({
			let state = Rc::downgrade(&state);
			move || {
				if let Some(state) = state.upgrade() {
					HostState::invalidate(&state)
				}
			}
		});

		state.render();
		Self {
			state,
			_subscription: subscription,
		}
	}

	#[must_use]
	pub fn tick(&self) -> u64 {
		self.state.tick.get()
	}

	/// Whether the last render pass already saw the latest notification.
	#[must_use]
	pub fn is_current(&self) -> bool {
		self.state.rendered_tick.get() == self.state.tick.get()
	}

	/// Renders immediately, regardless of any pending scheduled render.
	pub fn render(&self) {
		self.state.render()
	}

	/// The keys that currently have a projection, in ascending order.
	#[must_use]
	pub fn projected(&self) -> Vec<NodeId> {
		let mut projected: Vec<NodeId> = self.state.projected.borrow().iter().copied().collect();
		projected.sort_unstable();
		projected
	}

	/// Inspects the mount.
	///
	/// # Panics
	///
	/// Iff called from within [`Mount::project`] or [`Mount::release`].
	pub fn with_mount<R>(&self, f: impl FnOnce(&M) -> R) -> R {
		f(&self.state.mount.borrow())
	}
}

impl<C, M> HostState<C, M>
where
	C: Clone + 'static,
	M: Mount<C> + 'static,
{
	fn invalidate(this: &Rc<Self>) {
		this.tick.set(this.tick.get() + 1);
		if this.render_pending.replace(true) {
			return trace!("Render already pending.");
		}

		let state: Weak<Self> = Rc::downgrade(this);
		this.schedule.microtask(Box::new(move || {
			if let Some(state) = state.upgrade() {
				state.render_pending.set(false);
				state.render()
			}
		}));
	}

	#[instrument(skip(self), fields(tick = self.tick.get()))]
	fn render(&self) {
		let portals = portals(&self.registry.snapshot());
		let live: HashSet<NodeId> = portals.iter().map(|portal| portal.key).collect();

		let mut mount = self.mount.borrow_mut();
		let mut projected = self.projected.borrow_mut();
		for &key in projected.difference(&live) {
			let span = trace_span!("release", %key);
			let _enter = span.enter();
			mount.release(key);
		}
		for portal in &portals {
			let span = trace_span!("project", key = %portal.key);
			let _enter = span.enter();
			mount.project(portal);
		}
		trace!("Projected {} portal(s).", portals.len());

		*projected = live;
		self.rendered_tick.set(self.tick.get());
	}
}
