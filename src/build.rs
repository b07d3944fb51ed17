//! Reconstructs render trees from a registry snapshot.
//!
//! [`build`] is pure. Given the same snapshot it always produces the same [`RenderNode`],
//! so it can run on every notification without changing the observable output for unchanged input.

use crate::{
	kind::{ContentMode, Kind},
	props::{PropValue, Props},
	registry::{Entries, NodeEntry, NodeId},
};
use tracing::{error, instrument, warn};

/// Guards against cyclic `children_order` links, which adapters never create but [`Registry::upsert`](`crate::registry::Registry::upsert`) can't rule out.
pub const DEFAULT_DEPTH_LIMIT: usize = 256;

/// The presentational constructs a design system has to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
	TableContainer,
	Table,
	TableHead,
	TableBody,
	TableFooter,
	TableRow,
	ColumnHeader,
	Cell,
	Caption,
	Badge,
	Code,
	Card,
	CardHeader,
	CardBody,
	CardFooter,
	/// Scopes a theme to its children.
	ThemeScope,
	/// A schema-driven form.
	Form,
}

impl From<Kind> for Construct {
	fn from(kind: Kind) -> Self {
		match kind {
			Kind::TableContainer => Construct::TableContainer,
			Kind::Table => Construct::Table,
			Kind::Thead => Construct::TableHead,
			Kind::Tbody => Construct::TableBody,
			Kind::Tfoot => Construct::TableFooter,
			Kind::Tr => Construct::TableRow,
			Kind::Th => Construct::ColumnHeader,
			Kind::Td => Construct::Cell,
			Kind::TableCaption => Construct::Caption,
			Kind::Badge => Construct::Badge,
			Kind::Code => Construct::Code,
			Kind::Card => Construct::Card,
			Kind::CardHeader => Construct::CardHeader,
			Kind::CardBody => Construct::CardBody,
			Kind::CardFooter => Construct::CardFooter,
			Kind::Provider => Construct::ThemeScope,
			Kind::JsonForm => Construct::Form,
		}
	}
}

/// An abstract render description. Where it ends up is decided by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
	/// Renders nothing.
	Empty,
	Text(String),
	Construct {
		construct: Construct,
		props: Props,
		children: Vec<RenderNode>,
	},
}

impl RenderNode {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		matches!(self, RenderNode::Empty)
	}

	#[must_use]
	pub fn props(&self) -> Option<&Props> {
		match self {
			RenderNode::Construct { props, .. } => Some(props),
			_ => None,
		}
	}

	#[must_use]
	pub fn children(&self) -> &[RenderNode] {
		match self {
			RenderNode::Construct { children, .. } => children,
			_ => &[],
		}
	}

	/// All text in this subtree, concatenated in order.
	#[must_use]
	pub fn text(&self) -> String {
		let mut text = String::new();
		self.collect_text(&mut text);
		text
	}

	fn collect_text(&self, text: &mut String) {
		match self {
			RenderNode::Empty => (),
			RenderNode::Text(t) => text.push_str(t),
			RenderNode::Construct { children, .. } => {
				for child in children {
					child.collect_text(text)
				}
			}
		}
	}
}

/// Builds the subtree rooted at `id`.
///
/// Missing entries render as [`RenderNode::Empty`] and are logged, the rest of the tree is unaffected.
#[must_use]
pub fn build<C>(id: NodeId, entries: &Entries<C>) -> RenderNode {
	build_with_depth_limit(id, entries, DEFAULT_DEPTH_LIMIT)
}

#[must_use]
#[instrument(skip(entries))]
pub fn build_with_depth_limit<C>(id: NodeId, entries: &Entries<C>, depth_limit: usize) -> RenderNode {
	if depth_limit == 0 {
		error!("Depth limit reached");
		return RenderNode::Empty;
	}

	let entry = match entries.get(&id) {
		Some(entry) => entry,
		None => {
			warn!("Entry {} not found; Rendering nothing in its place.", id);
			return RenderNode::Empty;
		}
	};

	let children: Vec<RenderNode> = entry
		.children_order
		.iter()
		.map(|&child| build_with_depth_limit(child, entries, depth_limit - 1))
		.collect();

	let content = match entry.kind.behavior().content {
		ContentMode::Children => children,
		ContentMode::ChildrenOrText if !children.is_empty() => children,
		ContentMode::ChildrenOrText => entry.text_content.iter().cloned().map(RenderNode::Text).collect(),
		ContentMode::None => Vec::new(),
	};

	construct(entry, content)
}

fn construct<C>(entry: &NodeEntry<C>, content: Vec<RenderNode>) -> RenderNode {
	let (props, children) = match entry.kind {
		Kind::TableContainer => (container_layout(&entry.props), content),
		Kind::Code => {
			let mut props = entry.props.clone();
			match props.remove("children") {
				Some(PropValue::Str(code)) if !code.is_empty() => (props, vec![RenderNode::Text(code)]),
				_ => (props, content),
			}
		}
		Kind::JsonForm => (form_props(entry), content),
		_ => (entry.props.clone(), content),
	};
	RenderNode::Construct {
		construct: entry.kind.into(),
		props,
		children,
	}
}

const LAYOUT_RENAMES: &[(&str, &str)] = &[
	("maxwidth", "maxWidth"),
	("overflowx", "overflowX"),
	("overflowy", "overflowY"),
	("whitespace", "whiteSpace"),
];

/// Turns a container's lowercase attribute props into structured layout props.
///
/// A compound `overflow` ("x y", or one value for both axes) fills whichever axis isn't set explicitly.
fn container_layout(props: &Props) -> Props {
	let mut layout = props.clone();
	for &(attribute, prop) in LAYOUT_RENAMES {
		if let Some(value) = layout.remove(attribute) {
			layout.insert(prop.to_owned(), value);
		}
	}

	if let Some(overflow) = layout.remove("overflow") {
		let overflow = overflow.as_str().unwrap_or_default().to_owned();
		let mut axes = overflow.split_ascii_whitespace();
		if let Some(x) = axes.next() {
			let y = axes.next().unwrap_or(x);
			layout.entry("overflowX".to_owned()).or_insert_with(|| PropValue::from(x));
			layout.entry("overflowY".to_owned()).or_insert_with(|| PropValue::from(y));
		}
	}
	layout
}

const FORM_PROPS: &[&str] = &["schema", "uischema", "formData", "onChange", "onSubmit", "onError"];

fn form_props<C>(entry: &NodeEntry<C>) -> Props {
	let props: Props = FORM_PROPS
		.iter()
		.filter_map(|&key| entry.props.get(key).map(|value| (key.to_owned(), value.clone())))
		.collect();
	if props.get("schema").and_then(PropValue::as_json).map_or(true, serde_json::Value::is_null) {
		error!("Form {} has no schema.", entry.id);
	}
	props
}
