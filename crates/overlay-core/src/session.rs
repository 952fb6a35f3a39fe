//! Editor session
//!
//! Ties a loaded source document to the element store, the coordinate
//! converter and the compositor. One session edits one document at a time;
//! loading another document starts over with an empty store.

use crate::calibration::{Calibration, EditorConfig};
use crate::compose::{compose_with_report, ComposeReport};
use crate::coords::{
    clamp_to_page, drag_position, place_new_element, snap_candidates, PagePoint, ScreenPoint,
    SnapCandidate,
};
use crate::element::{new_element_id, TextElement, TextElementPatch};
use crate::error::OverlayError;
use crate::notify::{Level, NotificationSink, TracingSink};
use crate::pages::{self, GlyphAnchor, PageGeometry};
use crate::store::TextElementStore;

/// The composed PDF plus the name the browser should save it under.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

struct SourceDocument {
    name: String,
    bytes: Vec<u8>,
    pages: Vec<PageGeometry>,
    anchors: Vec<Vec<GlyphAnchor>>,
}

pub struct EditorSession<S: NotificationSink = TracingSink> {
    config: EditorConfig,
    sink: S,
    document: Option<SourceDocument>,
    store: TextElementStore,
    preview: Option<Vec<u8>>,
}

impl Default for EditorSession<TracingSink> {
    fn default() -> Self {
        Self::new(EditorConfig::default(), TracingSink)
    }
}

impl<S: NotificationSink> EditorSession<S> {
    pub fn new(config: EditorConfig, sink: S) -> Self {
        Self {
            config,
            sink,
            document: None,
            store: TextElementStore::new(),
            preview: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn calibration(&self) -> &Calibration {
        &self.config.calibration
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn store(&self) -> &TextElementStore {
        &self.store
    }

    /// Load a new source document. Any existing elements are discarded.
    ///
    /// Returns the page count.
    pub fn load_document(&mut self, name: &str, bytes: Vec<u8>) -> Result<u32, OverlayError> {
        let doc = match pages::load_document(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                self.sink
                    .notify(Level::Error, &format!("Could not open {}: {}", name, e));
                return Err(e);
            }
        };

        let geometries = pages::all_page_geometries(&doc);
        let anchors = (1..=geometries.len() as u32)
            .map(|page| pages::glyph_anchors(&doc, page))
            .collect();
        let page_count = geometries.len() as u32;

        self.store.clear();
        self.exit_preview();
        self.document = Some(SourceDocument {
            name: name.to_string(),
            bytes,
            pages: geometries,
            anchors,
        });

        tracing::info!(name, page_count, "document loaded");
        self.sink
            .notify(Level::Success, &format!("Loaded {} ({} pages)", name, page_count));
        Ok(page_count)
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|doc| doc.name.as_str())
    }

    /// The document as loaded, without any overlay.
    pub fn source_bytes(&self) -> Option<&[u8]> {
        self.document.as_ref().map(|doc| doc.bytes.as_slice())
    }

    pub fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map_or(0, |doc| doc.pages.len() as u32)
    }

    /// Native size of a 1-based page.
    pub fn page_geometry(&self, page: u32) -> Option<PageGeometry> {
        let doc = self.document.as_ref()?;
        page.checked_sub(1)
            .and_then(|i| doc.pages.get(i as usize))
            .copied()
    }

    pub fn glyph_anchors(&self, page: u32) -> &[GlyphAnchor] {
        self.document
            .as_ref()
            .and_then(|doc| page.checked_sub(1).and_then(|i| doc.anchors.get(i as usize)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Alignment targets for placing an element of `font_size` on `page`.
    pub fn snap_candidates(&self, page: u32, font_size: f64) -> Vec<SnapCandidate> {
        let Some(geometry) = self.page_geometry(page) else {
            return Vec::new();
        };
        snap_candidates(
            &self.store.by_page(page),
            self.glyph_anchors(page),
            &geometry,
            font_size,
            &self.config.calibration,
        )
    }

    fn editable_page(&self, page: u32) -> Result<PageGeometry, OverlayError> {
        if self.document.is_none() {
            return Err(OverlayError::NoDocument);
        }
        if self.is_previewing() {
            return Err(OverlayError::ReadOnly);
        }
        self.page_geometry(page).ok_or_else(|| {
            OverlayError::OperationError(format!(
                "Page {} not found (document has {} pages)",
                page,
                self.page_count()
            ))
        })
    }

    fn insert(&mut self, element: TextElement) -> Result<String, OverlayError> {
        let id = element.id.clone();
        let page = element.page_number;
        if !self.store.add(element) {
            return Err(OverlayError::OperationError(format!(
                "Duplicate element id {}",
                id
            )));
        }
        tracing::debug!(id = %id, page, "element created");
        Ok(id)
    }

    /// "Add text": a default element at `position`, clamped to the page.
    pub fn add_text(&mut self, page: u32, position: PagePoint) -> Result<String, OverlayError> {
        let geometry = self.editable_page(page)?;
        let at = clamp_to_page(position, &geometry);
        let element = TextElement::new(
            new_element_id(),
            page,
            at.x,
            at.y,
            self.config.defaults.content.clone(),
            &self.config.defaults,
        );
        self.insert(element)
    }

    /// "Add predefined text": like [`add_text`](Self::add_text) with fixed content.
    pub fn add_predefined_text(
        &mut self,
        page: u32,
        position: PagePoint,
        content: &str,
    ) -> Result<String, OverlayError> {
        let geometry = self.editable_page(page)?;
        let at = clamp_to_page(position, &geometry);
        let element = TextElement::new(
            new_element_id(),
            page,
            at.x,
            at.y,
            content,
            &self.config.defaults,
        )
        .predefined();
        self.insert(element)
    }

    /// "Drop text": place an element where the pointer was released.
    ///
    /// The drop point snaps to nearby elements and glyphs. With `content`
    /// the element is a predefined label, otherwise it gets default content.
    pub fn drop_text(
        &mut self,
        page: u32,
        screen: ScreenPoint,
        page_origin: Option<ScreenPoint>,
        scale: f64,
        content: Option<&str>,
    ) -> Result<String, OverlayError> {
        let geometry = self.editable_page(page)?;
        let candidates = self.snap_candidates(page, self.config.defaults.font_size);
        let at = place_new_element(
            screen,
            page_origin,
            scale,
            &candidates,
            &geometry,
            &self.config.calibration,
        );

        let defaults = &self.config.defaults;
        let element = match content {
            Some(content) => {
                TextElement::new(new_element_id(), page, at.x, at.y, content, defaults).predefined()
            }
            None => TextElement::new(
                new_element_id(),
                page,
                at.x,
                at.y,
                defaults.content.clone(),
                defaults,
            ),
        };
        self.insert(element)
    }

    /// Merge a partial update into an element.
    ///
    /// Positions are clamped to the (possibly new) page. Content of a
    /// predefined element is fixed and any content change is dropped.
    /// Returns false when nothing was updated.
    pub fn update(&mut self, id: &str, patch: &TextElementPatch) -> bool {
        let Some(current) = self.store.get(id) else {
            return false;
        };

        let mut patch = patch.clone();
        // The predefined flag is set at creation only.
        if patch.is_predefined.take().is_some() {
            tracing::debug!(id, "ignoring predefined flag in patch");
        }
        if current.is_predefined && patch.content.is_some() {
            tracing::debug!(id, "content of predefined text is fixed");
            patch.content = None;
        }

        if patch.moves() {
            let page = patch.page_number.unwrap_or(current.page_number);
            let Some(geometry) = self.page_geometry(page) else {
                tracing::warn!(id, page, "update targets a missing page");
                return false;
            };
            let target = PagePoint::new(
                patch.x.unwrap_or(current.x),
                patch.y.unwrap_or(current.y),
            );
            let clamped = clamp_to_page(target, &geometry);
            patch.x = Some(clamped.x);
            patch.y = Some(clamped.y);
        }

        self.store.update(id, &patch)
    }

    /// [`update`](Self::update) with a JSON (camelCase) patch from the host.
    pub fn update_json(&mut self, id: &str, patch_json: &str) -> Result<bool, OverlayError> {
        let patch: TextElementPatch = serde_json::from_str(patch_json)?;
        Ok(self.update(id, &patch))
    }

    /// Move an element by a screen-space drag measured from `start`.
    pub fn drag_element(
        &mut self,
        id: &str,
        start: PagePoint,
        delta: ScreenPoint,
        scale: f64,
    ) -> bool {
        let Some(page) = self.store.get(id).map(|el| el.page_number) else {
            return false;
        };
        let Some(geometry) = self.page_geometry(page) else {
            return false;
        };
        let to = drag_position(start, delta, scale, &geometry, &self.config.calibration);
        self.store.update(id, &TextElementPatch::position(to.x, to.y))
    }

    pub fn delete(&mut self, id: &str) -> bool {
        if self.is_previewing() {
            return false;
        }
        self.store.delete(id)
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.store.select(id);
    }

    pub fn selected(&self) -> Option<&TextElement> {
        self.store.selected()
    }

    pub fn elements_for_page(&self, page: u32) -> Vec<&TextElement> {
        self.store.by_page(page)
    }

    pub fn elements(&self) -> &[TextElement] {
        self.store.elements()
    }

    fn compose_current(&self) -> Result<ComposeReport, OverlayError> {
        let doc = self.document.as_ref().ok_or(OverlayError::NoDocument)?;
        let snapshot = self.store.elements().to_vec();
        compose_with_report(&doc.bytes, &snapshot, &self.config.calibration)
    }

    /// Compose the current elements and enter read-only preview mode.
    pub fn preview(&mut self) -> Result<&[u8], OverlayError> {
        match self.compose_current() {
            Ok(report) => {
                self.store.set_read_only(true);
                self.sink.notify(Level::Info, "Preview ready");
                Ok(self.preview.insert(report.bytes).as_slice())
            }
            Err(e) => {
                self.sink
                    .notify(Level::Error, &format!("Could not generate preview: {}", e));
                Err(e)
            }
        }
    }

    pub fn preview_bytes(&self) -> Option<&[u8]> {
        self.preview.as_deref()
    }

    pub fn is_previewing(&self) -> bool {
        self.preview.is_some()
    }

    /// Leave preview mode; the elements become editable again.
    pub fn exit_preview(&mut self) {
        self.preview = None;
        self.store.set_read_only(false);
    }

    /// Compose the current elements for saving.
    pub fn download(&mut self) -> Result<Download, OverlayError> {
        let result = self.compose_current().and_then(|report| {
            let name = self.document_name().ok_or(OverlayError::NoDocument)?;
            Ok(Download {
                filename: suggested_filename(name),
                bytes: report.bytes,
            })
        });
        match result {
            Ok(download) => {
                self.sink
                    .notify(Level::Success, &format!("Saved {}", download.filename));
                Ok(download)
            }
            Err(e) => {
                self.sink
                    .notify(Level::Error, &format!("Could not generate PDF: {}", e));
                Err(e)
            }
        }
    }
}

/// `report.pdf` becomes `report_annotated.pdf`.
pub fn suggested_filename(source_name: &str) -> String {
    let stem = match source_name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("pdf") => stem,
        _ => source_name,
    };
    let stem = if stem.trim().is_empty() { "document" } else { stem };
    format!("{}_annotated.pdf", stem)
}
