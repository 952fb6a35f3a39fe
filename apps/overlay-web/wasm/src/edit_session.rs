//! Overlay editing session for the browser
//!
//! Thin wrapper over `overlay_core::EditorSession`. Coordinates passed in
//! are either screen pixels (pointer events, bounding rects) or stored page
//! units, as named by each method.

use overlay_core::coords::{page_to_screen, screen_to_page};
use overlay_core::{suggested_filename, EditorConfig, EditorSession, PagePoint, ScreenPoint};
use wasm_bindgen::prelude::*;

use crate::console_sink::ConsoleSink;

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn origin(x: Option<f64>, y: Option<f64>) -> Option<ScreenPoint> {
    Some(ScreenPoint::new(x?, y?))
}

/// Session for overlaying text on a single PDF document
#[wasm_bindgen]
pub struct OverlaySession {
    inner: EditorSession<ConsoleSink>,
}

impl Default for OverlaySession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl OverlaySession {
    /// Create a session with the default configuration
    #[wasm_bindgen(constructor)]
    pub fn new() -> OverlaySession {
        OverlaySession {
            inner: EditorSession::new(EditorConfig::default(), ConsoleSink),
        }
    }

    /// Create a session from a TOML configuration
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_toml: &str) -> Result<OverlaySession, JsValue> {
        let config = EditorConfig::from_toml_str(config_toml).map_err(to_js_error)?;
        Ok(OverlaySession {
            inner: EditorSession::new(config, ConsoleSink),
        })
    }

    /// Load a PDF, discarding all existing elements. Returns the page count.
    #[wasm_bindgen(js_name = loadDocument)]
    pub fn load_document(&mut self, name: &str, bytes: &[u8]) -> Result<u32, JsValue> {
        self.inner
            .load_document(name, bytes.to_vec())
            .map_err(to_js_error)
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.inner.page_count()
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> Option<String> {
        self.inner.document_name().map(str::to_string)
    }

    /// Get the unmodified document bytes for the page renderer
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> Option<js_sys::Uint8Array> {
        let bytes = self.inner.source_bytes()?;
        let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
        array.copy_from(bytes);
        Some(array)
    }

    /// Native page size: `{ origin_x, origin_y, width, height }`
    #[wasm_bindgen(js_name = getPageGeometry)]
    pub fn get_page_geometry(&self, page: u32) -> Result<JsValue, JsValue> {
        let geometry = self
            .inner
            .page_geometry(page)
            .ok_or_else(|| JsValue::from_str(&format!("Page {} not found", page)))?;
        serde_wasm_bindgen::to_value(&geometry).map_err(to_js_error)
    }

    /// Default zoom for rendering pages
    #[wasm_bindgen(getter, js_name = displayScale)]
    pub fn display_scale(&self) -> f64 {
        self.inner.calibration().display_scale
    }

    /// Padding the overlay draws around text, in screen pixels at `scale`
    #[wasm_bindgen(js_name = overlayPadding)]
    pub fn overlay_padding(&self, scale: f64) -> f64 {
        self.inner.calibration().overlay_padding_px(scale)
    }

    /// Labels for the predefined text picker, as a JSON array
    #[wasm_bindgen(js_name = getPredefinedTexts)]
    pub fn get_predefined_texts(&self) -> String {
        serde_json::to_string(&self.inner.config().predefined_texts)
            .unwrap_or_else(|_| "[]".to_string())
    }

    /// Pointer position to stored page units: `[x, y]`
    #[wasm_bindgen(js_name = screenToPage)]
    pub fn screen_to_page(
        &self,
        screen_x: f64,
        screen_y: f64,
        origin_x: Option<f64>,
        origin_y: Option<f64>,
        scale: f64,
    ) -> Vec<f64> {
        let p = screen_to_page(
            ScreenPoint::new(screen_x, screen_y),
            origin(origin_x, origin_y),
            scale,
        );
        vec![p.x, p.y]
    }

    /// Stored page units to an offset from the page's top-left in pixels: `[x, y]`
    #[wasm_bindgen(js_name = pageToScreen)]
    pub fn page_to_screen(&self, x: f64, y: f64, scale: f64) -> Vec<f64> {
        let s = page_to_screen(PagePoint::new(x, y), scale);
        vec![s.x, s.y]
    }

    /// Add default text at a stored position. Returns the new element id.
    #[wasm_bindgen(js_name = addText)]
    pub fn add_text(&mut self, page: u32, x: f64, y: f64) -> Result<String, JsValue> {
        self.inner
            .add_text(page, PagePoint::new(x, y))
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = addPredefinedText)]
    pub fn add_predefined_text(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        content: &str,
    ) -> Result<String, JsValue> {
        self.inner
            .add_predefined_text(page, PagePoint::new(x, y), content)
            .map_err(to_js_error)
    }

    /// Place text where a drag-and-drop ended, snapping to nearby text.
    ///
    /// `origin_x`/`origin_y` are the page's bounding rect; leave them
    /// undefined when the page is not on screen.
    #[wasm_bindgen(js_name = dropText)]
    #[allow(clippy::too_many_arguments)]
    pub fn drop_text(
        &mut self,
        page: u32,
        screen_x: f64,
        screen_y: f64,
        origin_x: Option<f64>,
        origin_y: Option<f64>,
        scale: f64,
        content: Option<String>,
    ) -> Result<String, JsValue> {
        self.inner
            .drop_text(
                page,
                ScreenPoint::new(screen_x, screen_y),
                origin(origin_x, origin_y),
                scale,
                content.as_deref(),
            )
            .map_err(to_js_error)
    }

    /// Apply a camelCase JSON patch, e.g. `{"fontSize": 18, "bold": true}`
    #[wasm_bindgen(js_name = updateElement)]
    pub fn update_element(&mut self, id: &str, patch_json: &str) -> Result<bool, JsValue> {
        self.inner.update_json(id, patch_json).map_err(to_js_error)
    }

    /// Move an element by a pointer delta measured from the drag start
    #[wasm_bindgen(js_name = dragElement)]
    pub fn drag_element(
        &mut self,
        id: &str,
        start_x: f64,
        start_y: f64,
        delta_x: f64,
        delta_y: f64,
        scale: f64,
    ) -> bool {
        self.inner.drag_element(
            id,
            PagePoint::new(start_x, start_y),
            ScreenPoint::new(delta_x, delta_y),
            scale,
        )
    }

    #[wasm_bindgen(js_name = deleteElement)]
    pub fn delete_element(&mut self, id: &str) -> bool {
        self.inner.delete(id)
    }

    pub fn select(&mut self, id: Option<String>) {
        self.inner.select(id.as_deref());
    }

    #[wasm_bindgen(getter, js_name = selectedId)]
    pub fn selected_id(&self) -> Option<String> {
        self.inner.selected().map(|el| el.id.clone())
    }

    /// Elements on one page as a JSON array, in drawing order
    #[wasm_bindgen(js_name = getElementsForPage)]
    pub fn get_elements_for_page(&self, page: u32) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.elements_for_page(page)).map_err(to_js_error)
    }

    /// Alignment guides for placing text of `font_size` on `page`
    #[wasm_bindgen(js_name = getSnapCandidates)]
    pub fn get_snap_candidates(&self, page: u32, font_size: f64) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.snap_candidates(page, font_size))
            .map_err(to_js_error)
    }

    /// Compose the overlay and switch to read-only preview
    pub fn preview(&mut self) -> Result<Vec<u8>, JsValue> {
        self.inner
            .preview()
            .map(<[u8]>::to_vec)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = exitPreview)]
    pub fn exit_preview(&mut self) {
        self.inner.exit_preview();
    }

    #[wasm_bindgen(getter, js_name = isPreviewing)]
    pub fn is_previewing(&self) -> bool {
        self.inner.is_previewing()
    }

    /// Compose the overlay for saving
    pub fn download(&mut self) -> Result<Vec<u8>, JsValue> {
        self.inner
            .download()
            .map(|download| download.bytes)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(getter, js_name = suggestedFilename)]
    pub fn suggested_filename(&self) -> Option<String> {
        self.inner.document_name().map(suggested_filename)
    }
}


// Bindings that hand JS objects back need a browser to run
#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::tests::create_test_pdf;
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn field(value: &JsValue, name: &str) -> Option<f64> {
        js_sys::Reflect::get(value, &JsValue::from_str(name))
            .ok()?
            .as_f64()
    }

    #[wasm_bindgen_test]
    fn test_document_bytes_copy() {
        let pdf = create_test_pdf();
        let mut session = OverlaySession::new();
        assert!(session.get_document_bytes().is_none());

        session.load_document("invoice.pdf", &pdf).unwrap();
        let array = session.get_document_bytes().unwrap();
        assert_eq!(array.length() as usize, pdf.len());
        assert_eq!(array.to_vec(), pdf);
    }

    #[wasm_bindgen_test]
    fn test_page_geometry_object() {
        let mut session = OverlaySession::new();
        session.load_document("invoice.pdf", &create_test_pdf()).unwrap();

        let geometry = session.get_page_geometry(1).unwrap();
        assert_eq!(field(&geometry, "width"), Some(612.0));
        assert_eq!(field(&geometry, "height"), Some(792.0));
        assert_eq!(field(&geometry, "origin_x"), Some(0.0));
        assert!(session.get_page_geometry(2).is_err());
    }

    #[wasm_bindgen_test]
    fn test_snap_candidates_for_existing_element() {
        let mut session = OverlaySession::new();
        session.load_document("invoice.pdf", &create_test_pdf()).unwrap();
        session.add_text(1, 100.0, 200.0).unwrap();

        let candidates = session.get_snap_candidates(1, 12.0).unwrap();
        assert!(js_sys::Array::is_array(&candidates));
        assert_eq!(js_sys::Array::from(&candidates).length(), 1);
    }
}
