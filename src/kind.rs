//! The closed set of presentational roles and their per-kind behaviour.

use core::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
	TableContainer,
	Table,
	Thead,
	Tbody,
	Tfoot,
	Tr,
	Th,
	Td,
	TableCaption,
	Badge,
	Code,
	Card,
	CardHeader,
	CardBody,
	CardFooter,
	Provider,
	JsonForm,
}

/// How a kind's computed content reaches its construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
	/// Only built children; text is ignored.
	Children,
	/// Built children if there are any, text otherwise.
	ChildrenOrText,
	/// Neither. Everything comes in through props.
	None,
}

/// How an accepted attribute becomes a prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeRule {
	/// Copied as string.
	Plain(&'static str),
	/// `""` and `"true"` mean `true`, anything else `false`.
	Flag(&'static str),
	/// Parsed as JSON.
	Json(&'static str),
}

impl AttributeRule {
	#[must_use]
	pub fn key(self) -> &'static str {
		match self {
			AttributeRule::Plain(key) | AttributeRule::Flag(key) | AttributeRule::Json(key) => key,
		}
	}
}

/// An adapter-supplied callback prop that dispatches a DOM event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventProp {
	pub prop: &'static str,
	pub event: &'static str,
}

/// Everything that differs between kinds, looked up instead of subclassing.
#[derive(Debug, Clone, Copy)]
pub struct KindBehavior {
	pub tag_suffix: &'static str,
	/// Forced onto the element's `display` style on attach.
	pub display: Option<&'static str>,
	/// Accepted attributes (by lowercase name) in addition to [`COMMON_ATTRIBUTES`].
	pub attributes: &'static [(&'static str, AttributeRule)],
	pub content: ContentMode,
	pub events: &'static [EventProp],
	/// Whether props and text are derived once more after a short delay.
	pub deferred_recheck: bool,
}

/// Accepted by every kind except [`Kind::Provider`], which copies all attributes instead.
pub const COMMON_ATTRIBUTES: &[(&str, AttributeRule)] = &[
	("variant", AttributeRule::Plain("variant")),
	("size", AttributeRule::Plain("size")),
	("colorscheme", AttributeRule::Plain("colorScheme")),
	("text", AttributeRule::Plain("text")),
];

/// The attribute that overrides derived text content.
pub const TEXT_ATTRIBUTE: &str = "text";

const NOTHING: &[(&str, AttributeRule)] = &[];
const NO_EVENTS: &[EventProp] = &[];

const CONTAINER_ATTRIBUTES: &[(&str, AttributeRule)] = &[
	("display", AttributeRule::Plain("display")),
	("maxwidth", AttributeRule::Plain("maxwidth")),
	("overflowx", AttributeRule::Plain("overflowx")),
	("overflowy", AttributeRule::Plain("overflowy")),
	("whitespace", AttributeRule::Plain("whitespace")),
	("overflow", AttributeRule::Plain("overflow")),
];

const CELL_ATTRIBUTES: &[(&str, AttributeRule)] = &[("isnumeric", AttributeRule::Flag("isNumeric"))];

const CODE_ATTRIBUTES: &[(&str, AttributeRule)] = &[("children", AttributeRule::Plain("children"))];

const CARD_ATTRIBUTES: &[(&str, AttributeRule)] = &[
	("align", AttributeRule::Plain("align")),
	("direction", AttributeRule::Plain("direction")),
	("justify", AttributeRule::Plain("justify")),
];

const CARD_EVENTS: &[EventProp] = &[EventProp {
	prop: "onContextMenuEvent",
	event: "contextmenuevent",
}];

const FORM_ATTRIBUTES: &[(&str, AttributeRule)] = &[
	("schema", AttributeRule::Json("schema")),
	("uischema", AttributeRule::Json("uischema")),
	("formdata", AttributeRule::Json("formData")),
];

/// Callbacks handed to whichever [`Presenter`](`crate::present::Presenter`) renders the form.
///
/// [`HtmlPresenter`](`crate::present::HtmlPresenter`) has no validation or field editing, so only `onSubmit` is ever called there.
/// `formchange` and `formerror` need a presenter that plugs in a real form component.
const FORM_EVENTS: &[EventProp] = &[
	EventProp { prop: "onChange", event: "formchange" },
	EventProp { prop: "onSubmit", event: "formsubmit" },
	EventProp { prop: "onError", event: "formerror" },
];

const fn plain(tag_suffix: &'static str, display: Option<&'static str>, content: ContentMode) -> KindBehavior {
	KindBehavior {
		tag_suffix,
		display,
		attributes: NOTHING,
		content,
		events: NO_EVENTS,
		deferred_recheck: false,
	}
}

impl Kind {
	/// Every kind, containers before anything they may contain.
	///
	/// Elements already in the page are upgraded one definition at a time, so this is also the definition order.
	pub const ALL: [Kind; 17] = [
		Kind::Provider,
		Kind::Card,
		Kind::CardHeader,
		Kind::CardBody,
		Kind::CardFooter,
		Kind::TableContainer,
		Kind::Table,
		Kind::Thead,
		Kind::Tbody,
		Kind::Tfoot,
		Kind::Tr,
		Kind::Th,
		Kind::Td,
		Kind::TableCaption,
		Kind::Badge,
		Kind::Code,
		Kind::JsonForm,
	];

	#[must_use]
	pub fn behavior(self) -> KindBehavior {
		match self {
			Kind::TableContainer => KindBehavior {
				attributes: CONTAINER_ATTRIBUTES,
				..plain("table-container", Some("block"), ContentMode::Children)
			},
			Kind::Table => plain("table", Some("table"), ContentMode::Children),
			Kind::Thead => plain("thead", Some("table-header-group"), ContentMode::Children),
			Kind::Tbody => plain("tbody", Some("table-row-group"), ContentMode::Children),
			Kind::Tfoot => plain("tfoot", Some("table-footer-group"), ContentMode::Children),
			Kind::Tr => plain("tr", Some("table-row"), ContentMode::Children),
			Kind::Th => KindBehavior {
				attributes: CELL_ATTRIBUTES,
				..plain("th", Some("table-cell"), ContentMode::ChildrenOrText)
			},
			Kind::Td => KindBehavior {
				attributes: CELL_ATTRIBUTES,
				..plain("td", Some("table-cell"), ContentMode::ChildrenOrText)
			},
			Kind::TableCaption => plain("table-caption", None, ContentMode::ChildrenOrText),
			Kind::Badge => plain("badge", None, ContentMode::ChildrenOrText),
			Kind::Code => KindBehavior {
				attributes: CODE_ATTRIBUTES,
				deferred_recheck: true,
				..plain("code", None, ContentMode::ChildrenOrText)
			},
			Kind::Card => KindBehavior {
				attributes: CARD_ATTRIBUTES,
				events: CARD_EVENTS,
				..plain("card", None, ContentMode::Children)
			},
			Kind::CardHeader => plain("card-header", None, ContentMode::Children),
			Kind::CardBody => plain("card-body", None, ContentMode::Children),
			Kind::CardFooter => plain("card-footer", None, ContentMode::Children),
			Kind::Provider => plain("provider", Some("block"), ContentMode::Children),
			Kind::JsonForm => KindBehavior {
				attributes: FORM_ATTRIBUTES,
				events: FORM_EVENTS,
				..plain("jsonform", None, ContentMode::None)
			},
		}
	}

	#[must_use]
	pub fn tag_suffix(self) -> &'static str {
		self.behavior().tag_suffix
	}

	/// The custom element name for this kind under `prefix`.
	#[must_use]
	pub fn tag_name(self, prefix: &str) -> String {
		format!("{}-{}", prefix, self.tag_suffix())
	}

	/// The reverse of [`Kind::tag_name`], case-insensitively.
	#[must_use]
	pub fn from_tag_name(prefix: &str, tag_name: &str) -> Option<Self> {
		let tag_name = tag_name.to_ascii_lowercase();
		let suffix = tag_name.strip_prefix(&prefix.to_ascii_lowercase())?.strip_prefix('-')?;
		Kind::ALL.iter().copied().find(|kind| kind.tag_suffix() == suffix)
	}

	/// Looks up the rule for attribute `name` (lowercase).
	#[must_use]
	pub fn attribute_rule(self, name: &str) -> Option<AttributeRule> {
		COMMON_ATTRIBUTES
			.iter()
			.chain(self.behavior().attributes)
			.find(|(attribute, _)| *attribute == name)
			.map(|&(_, rule)| rule)
	}
}

impl Display for Kind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag_suffix())
	}
}
