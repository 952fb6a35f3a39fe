//! Text element store
//!
//! The authoritative, ordered collection of text elements for a whole
//! document. Every operation is total: unknown ids turn into no-ops.

use crate::element::{TextElement, TextElementPatch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextElementStore {
    elements: Vec<TextElement>,
    #[serde(skip)]
    selected: Option<String>,
    #[serde(skip)]
    read_only: bool,
}

impl TextElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element and make it the selection.
    ///
    /// Returns false (and changes nothing) if the id is already present.
    pub fn add(&mut self, element: TextElement) -> bool {
        if self.get(&element.id).is_some() {
            tracing::warn!(id = %element.id, "duplicate element id rejected");
            return false;
        }
        self.selected = Some(element.id.clone());
        self.elements.push(element);
        true
    }

    /// Merge `patch` into the element with `id`.
    ///
    /// Returns false when the id is unknown or the store is read-only.
    pub fn update(&mut self, id: &str, patch: &TextElementPatch) -> bool {
        if self.read_only {
            tracing::debug!(id, "update ignored in read-only mode");
            return false;
        }
        match self.elements.iter_mut().find(|el| el.id == id) {
            Some(element) => {
                element.apply_patch(patch);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(pos) = self.elements.iter().position(|el| el.id == id) else {
            return false;
        };
        self.elements.remove(pos);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<&TextElement> {
        self.elements.iter().find(|el| el.id == id)
    }

    /// Elements on `page_number`, in insertion order.
    pub fn by_page(&self, page_number: u32) -> Vec<&TextElement> {
        self.elements
            .iter()
            .filter(|el| el.page_number == page_number)
            .collect()
    }

    pub fn elements(&self) -> &[TextElement] {
        &self.elements
    }

    /// Select an element. An unknown id (or `None`) clears the selection.
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id
            .filter(|id| self.get(id).is_some())
            .map(str::to_string);
    }

    pub fn selected(&self) -> Option<&TextElement> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.selected = None;
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
