//! Browser glue: custom element definitions, mutation observers and projection into the page.

mod diff;
mod elements;
mod mount;
mod node;
mod schedule;

pub use diff::{DomDiffer, HANDLERS_ATTRIBUTE, SLOT_ATTRIBUTE};
pub use elements::{bridge, init_host, init_host_with_presenter, Bridge};
pub use mount::DomMount;
pub use node::{is_projection_record, DomNode};
pub use schedule::BrowserSchedule;

use crate::config::BridgeConfig;
use wasm_bindgen::prelude::*;

/// Reads `tagPrefix`, `hostId` and `recheckDelay` from a JS options object.
///
/// Missing or mistyped options keep their defaults.
#[must_use]
pub fn config_from_js(options: &JsValue) -> BridgeConfig {
	let mut config = BridgeConfig::default();
	if !options.is_object() {
		return config;
	}

	let get = |key: &str| js_sys::Reflect::get(options, &JsValue::from_str(key)).ok();
	if let Some(tag_prefix) = get("tagPrefix").and_then(|value| value.as_string()) {
		config = config.with_tag_prefix(&tag_prefix);
	}
	if let Some(host_id) = get("hostId").and_then(|value| value.as_string()) {
		config = config.with_host_id(&host_id);
	}
	if let Some(delay) = get("recheckDelay").and_then(|value| value.as_f64()).filter(|delay| delay.is_finite() && *delay >= 0.) {
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		let delay = delay.min(f64::from(u32::MAX)) as u32;
		config = config.with_recheck_delay_ms(delay);
	}
	config
}

/// `initPortalHost({ tagPrefix?, hostId?, recheckDelay? })`
///
/// # Errors
///
/// See [`init_host`].
#[wasm_bindgen(js_name = initPortalHost)]
pub fn init_portal_host(options: JsValue) -> Result<(), JsValue> {
	init_host(config_from_js(&options))
}

/// Initializes with the default configuration, once the document finished loading.
///
/// # Errors
///
/// Iff there is no document or the `DOMContentLoaded` listener can't be added.
#[cfg(feature = "auto-init")]
#[wasm_bindgen(start)]
pub fn auto_init() -> Result<(), JsValue> {
	let document = web_sys::window()
		.and_then(|window| window.document())
		.ok_or_else(|| JsValue::from_str("No document found."))?;

	if document.ready_state() == "loading" {
		let init = Closure::once_into_js(|| {
			if let Err(error) = init_host(BridgeConfig::default()) {
				tracing::error!("Failed to initialize portal host: {:?}", error)
			}
		});
		document.add_event_listener_with_callback("DOMContentLoaded", init.unchecked_ref())
	} else {
		init_host(BridgeConfig::default())
	}
}
