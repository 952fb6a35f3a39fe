//! PDF text overlay editing
//!
//! Positioned text labels are kept in page space, edited through an
//! [`EditorSession`], and burned into the page content with lopdf.
//!
//! - `coords`: screen ↔ page conversion, snapping and clamping
//! - `store` / `element`: the text element model
//! - `typography`: font resolution, text transforms and layout
//! - `compose`: writes elements into a PDF

pub mod calibration;
pub mod color;
pub mod compose;
pub mod coords;
pub mod element;
pub mod error;
pub mod notify;
pub mod pages;
pub mod session;
pub mod store;
pub mod typography;

pub use calibration::{Calibration, EditorConfig, ElementDefaults};
pub use compose::{compose, compose_with_report, ComposeReport, SkippedElement};
pub use coords::{PagePoint, ScreenPoint, SnapCandidate, SnapResult};
pub use element::{TextElement, TextElementPatch};
pub use error::{ElementError, OverlayError};
pub use notify::{Level, MemorySink, NotificationSink, TracingSink};
pub use pages::{GlyphAnchor, PageGeometry};
pub use session::{suggested_filename, Download, EditorSession};
pub use store::TextElementStore;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, OverlayError> {
    let doc = pages::load_document(bytes)?;
    Ok(pages::page_count(&doc))
}
