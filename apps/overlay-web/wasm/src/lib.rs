//! WASM bindings for the PDF text overlay editor
//!
//! All element state lives in Rust. JavaScript renders pages, draws the
//! interactive overlay and forwards pointer events.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { OverlaySession } from './pkg/overlay_wasm.js';
//!
//! await init();
//!
//! const session = new OverlaySession();
//! session.loadDocument("contract.pdf", bytes);
//! const rect = pageElement.getBoundingClientRect();
//! const id = session.dropText(1, event.clientX, event.clientY, rect.left, rect.top, session.displayScale, "Approved");
//! session.updateElement(id, JSON.stringify({ fontSize: 18 }));
//! const preview = session.preview();
//! session.exitPreview();
//! downloadBlob(session.download(), session.suggestedFilename);
//! ```

pub mod console_sink;
pub mod edit_session;

use wasm_bindgen::prelude::*;

pub use console_sink::ConsoleSink;
pub use edit_session::OverlaySession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get page count from PDF bytes (convenience function)
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    overlay_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        let version = get_version();
        assert!(!version.is_empty());
    }
}
