//! Notification sink backed by the browser console

use overlay_core::{Level, NotificationSink};

/// Writes notifications to the devtools console.
///
/// Outside wasm32 (native unit tests) messages go to `tracing` instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    #[cfg(target_arch = "wasm32")]
    fn notify(&mut self, level: Level, message: &str) {
        let line = wasm_bindgen::JsValue::from_str(&format!("[{}] {}", level, message));
        match level {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warning => web_sys::console::warn_1(&line),
            Level::Info | Level::Success => web_sys::console::log_1(&line),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn notify(&mut self, level: Level, message: &str) {
        tracing::info!(%level, "{}", message);
    }
}
