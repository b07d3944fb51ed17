//! Mirrors trees of custom elements into a registry, rebuilds one render tree per root
//! and projects each back into the page through a portal.
//!
//! The core ([`registry`], [`adapter`], [`build`], [`host`]) is platform-independent.
//! [`present`] lowers render trees into markup descriptions whose listeners take `web-sys` events without needing a document,
//! and [`dom`] binds everything to the browser.

#![doc(html_root_url = "https://docs.rs/portal-elements/0.0.1")]
#![warn(clippy::pedantic)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod adapter;
pub mod build;
pub mod config;
pub mod dom;
pub mod host;
pub mod kind;
pub mod present;
pub mod props;
pub mod registry;

#[cfg(test)]
mod test_util;

pub use adapter::{Adapter, Context, ElementNode, Schedule};
pub use build::{build, Construct, RenderNode};
pub use config::BridgeConfig;
pub use host::{Mount, Portal, PortalHost};
pub use kind::Kind;
pub use present::{Html, HtmlPresenter, Presenter};
pub use props::{Callback, PropValue, Props};
pub use registry::{NodeEntry, NodeId, Registry, Subscription};
