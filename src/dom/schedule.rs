use crate::adapter::Schedule;
use tracing::trace;
use wasm_bindgen::{closure::Closure, prelude::*};

// Global bindings, so that no `Window` has to be fetched per task.
#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(js_name = "queueMicrotask")]
	fn queue_microtask(callback: &JsValue);

	#[wasm_bindgen(js_name = "setTimeout")]
	fn set_timeout(callback: &JsValue, delay_ms: u32) -> i32;
}

/// [`Schedule`] on the browser's microtask queue and timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserSchedule;

impl Schedule for BrowserSchedule {
	fn microtask(&self, task: Box<dyn FnOnce()>) {
		queue_microtask(&Closure::once_into_js(task));
	}

	fn timeout(&self, delay_ms: u32, task: Box<dyn FnOnce()>) {
		let handle = set_timeout(&Closure::once_into_js(task), delay_ms);
		trace!(handle, delay_ms, "Scheduled timeout.");
	}
}
