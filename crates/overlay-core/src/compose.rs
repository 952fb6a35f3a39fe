//! Burn text elements into a PDF
//!
//! The same routine serves preview and download. Text is written straight
//! into each page's content stream (not as annotations) so every viewer
//! renders it identically. Only a document that cannot be parsed fails the
//! whole call; a bad element is logged and left out.

use crate::calibration::Calibration;
use crate::color::{parse_hex_color, Rgb};
use crate::element::TextElement;
use crate::error::{ElementError, OverlayError};
use crate::pages::{load_document, page_geometry_by_id, PageGeometry};
use crate::typography::{decoration_offset, ResolvedText, StandardFont};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap};

/// An element that was not drawn, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedElement {
    pub id: String,
    pub reason: ElementError,
}

#[derive(Debug, Clone)]
pub struct ComposeReport {
    pub bytes: Vec<u8>,
    pub drawn: usize,
    pub skipped: Vec<SkippedElement>,
}

/// Compose `elements` onto `source` and return the new PDF bytes.
pub fn compose(
    source: &[u8],
    elements: &[TextElement],
    calibration: &Calibration,
) -> Result<Vec<u8>, OverlayError> {
    compose_with_report(source, elements, calibration).map(|report| report.bytes)
}

/// Like [`compose`], but also reports which elements were drawn or skipped.
pub fn compose_with_report(
    source: &[u8],
    elements: &[TextElement],
    calibration: &Calibration,
) -> Result<ComposeReport, OverlayError> {
    let mut doc = load_document(source)?;

    if elements.is_empty() {
        return Ok(ComposeReport {
            bytes: source.to_vec(),
            drawn: 0,
            skipped: Vec::new(),
        });
    }

    let pages = doc.get_pages();
    let page_count = pages.len() as u32;
    let mut skipped = Vec::new();
    let mut drawn = 0;

    // Partition by page, keeping insertion order within each page.
    let mut by_page: BTreeMap<u32, Vec<&TextElement>> = BTreeMap::new();
    for element in elements {
        match element.validate() {
            Ok(()) => by_page.entry(element.page_number).or_default().push(element),
            Err(reason) => skip(&mut skipped, element, reason),
        }
    }

    for (page_num, page_elements) in by_page {
        let Some(page_id) = pages.get(&page_num).copied() else {
            tracing::warn!(
                page = page_num,
                page_count,
                "skipping {} element(s) on missing page",
                page_elements.len()
            );
            for element in page_elements {
                skip(
                    &mut skipped,
                    element,
                    ElementError::PageOutOfRange {
                        page: page_num,
                        page_count,
                    },
                );
            }
            continue;
        };

        match compose_page(&mut doc, page_id, &page_elements, calibration) {
            Ok(outcome) => {
                drawn += outcome.drawn;
                skipped.extend(outcome.skipped);
            }
            Err(e) => {
                tracing::warn!(page = page_num, "could not write page: {}", e);
                for element in page_elements {
                    skip(&mut skipped, element, ElementError::Draw(e.to_string()));
                }
            }
        }
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| OverlayError::OperationError(e.to_string()))?;

    tracing::info!(drawn, skipped = skipped.len(), "composed text overlay");

    Ok(ComposeReport {
        bytes,
        drawn,
        skipped,
    })
}

fn skip(skipped: &mut Vec<SkippedElement>, element: &TextElement, reason: ElementError) {
    tracing::warn!(id = %element.id, "skipping element: {}", reason);
    skipped.push(SkippedElement {
        id: element.id.clone(),
        reason,
    });
}

struct PageOutcome {
    drawn: usize,
    skipped: Vec<SkippedElement>,
}

fn compose_page(
    doc: &mut Document,
    page_id: ObjectId,
    elements: &[&TextElement],
    calibration: &Calibration,
) -> Result<PageOutcome, OverlayError> {
    let geometry = page_geometry_by_id(doc, page_id)?;
    let resources_id = ensure_indirect_resources(doc, page_id)?;
    let mut writer = PageWriter::new(resources_id);
    let mut outcome = PageOutcome {
        drawn: 0,
        skipped: Vec::new(),
    };

    for element in elements {
        match writer.draw_element(doc, element, &geometry, calibration) {
            Ok(()) => outcome.drawn += 1,
            Err(reason) => skip(&mut outcome.skipped, element, reason),
        }
    }

    if !writer.operations.is_empty() {
        append_overlay_content(doc, page_id, writer.operations)?;
    }
    Ok(outcome)
}

/// Where the first glyph of an element is drawn, in PDF user space.
///
/// The y axis is flipped from the stored top-left convention, then moved
/// down from the stored top edge to the baseline.
pub fn draw_origin(
    element: &TextElement,
    geometry: &PageGeometry,
    calibration: &Calibration,
) -> (f64, f64) {
    let x = (element.x + calibration.x_offset).max(0.0);
    let y = (geometry.height - element.y - element.font_size * calibration.baseline_multiplier
        + calibration.y_offset)
        .max(0.0);
    (x + geometry.origin_x, y + geometry.origin_y)
}

/// Collects drawing operations for one page and the resources they use.
struct PageWriter {
    resources_id: ObjectId,
    fonts: HashMap<StandardFont, Vec<u8>>,
    graphics_states: HashMap<u32, Vec<u8>>,
    operations: Vec<Operation>,
}

impl PageWriter {
    fn new(resources_id: ObjectId) -> Self {
        Self {
            resources_id,
            fonts: HashMap::new(),
            graphics_states: HashMap::new(),
            operations: Vec::new(),
        }
    }

    fn draw_element(
        &mut self,
        doc: &mut Document,
        element: &TextElement,
        geometry: &PageGeometry,
        calibration: &Calibration,
    ) -> Result<(), ElementError> {
        let resolved = ResolvedText::resolve(element);
        if resolved.layout.runs.is_empty() {
            tracing::debug!(id = %element.id, "empty content, nothing to draw");
            return Ok(());
        }

        let font_name = match self.font(doc, resolved.font) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(
                    id = %element.id,
                    font = resolved.font.base_font(),
                    "font unavailable, using fallback: {}",
                    e
                );
                self.font(doc, StandardFont::FALLBACK)
                    .map_err(|e| ElementError::Draw(e.to_string()))?
            }
        };

        let opacity = element.opacity();
        let graphics_state = if opacity < 1.0 {
            Some(
                self.graphics_state(doc, opacity)
                    .map_err(|e| ElementError::Draw(e.to_string()))?,
            )
        } else {
            None
        };

        let color = parse_hex_color(&element.color);
        let (x, y) = draw_origin(element, geometry, calibration);
        let size = element.font_size;

        // Build into a local list so a failure never leaves half an element.
        let mut ops = vec![Operation::new("q", vec![])];
        if let Some(name) = graphics_state {
            ops.push(Operation::new("gs", vec![Object::Name(name)]));
        }
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font_name), real(size)],
        ));
        ops.push(fill_color(color));
        for run in &resolved.layout.runs {
            ops.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    real(x + run.dx),
                    real(y),
                ],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&run.text), StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));

        if let Some(offset) = decoration_offset(resolved.decoration, size) {
            let line_y = y + offset;
            ops.push(stroke_color(color));
            ops.push(Operation::new(
                "w",
                vec![real(calibration.decoration_thickness)],
            ));
            ops.push(Operation::new("m", vec![real(x), real(line_y)]));
            ops.push(Operation::new(
                "l",
                vec![real(x + resolved.layout.width), real(line_y)],
            ));
            ops.push(Operation::new("S", vec![]));
        }
        ops.push(Operation::new("Q", vec![]));

        self.operations.extend(ops);
        Ok(())
    }

    /// Resource name for `font`, registering it on first use.
    fn font(&mut self, doc: &mut Document, font: StandardFont) -> Result<Vec<u8>, OverlayError> {
        if let Some(name) = self.fonts.get(&font) {
            return Ok(name.clone());
        }

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        let name = add_resource(doc, self.resources_id, b"Font", "OvF", font_id)?;
        self.fonts.insert(font, name.clone());
        Ok(name)
    }

    /// Resource name for an ExtGState with the given fill/stroke alpha.
    fn graphics_state(&mut self, doc: &mut Document, opacity: f64) -> Result<Vec<u8>, OverlayError> {
        let key = (opacity * 1000.0).round() as u32;
        if let Some(name) = self.graphics_states.get(&key) {
            return Ok(name.clone());
        }

        let alpha = key as f32 / 1000.0;
        let gs_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(alpha),
            "CA" => Object::Real(alpha),
        });
        let name = add_resource(doc, self.resources_id, b"ExtGState", "OvGS", gs_id)?;
        self.graphics_states.insert(key, name.clone());
        Ok(name)
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn fill_color(color: Rgb) -> Operation {
    Operation::new(
        "rg",
        vec![
            Object::Real(color.r),
            Object::Real(color.g),
            Object::Real(color.b),
        ],
    )
}

fn stroke_color(color: Rgb) -> Operation {
    Operation::new(
        "RG",
        vec![
            Object::Real(color.r),
            Object::Real(color.g),
            Object::Real(color.b),
        ],
    )
}

/// Encode for a WinAnsiEncoding standard font. Unmappable characters become '?'.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            c if (c as u32) < 0x20 => b' ',
            c if (0x20..0x80).contains(&(c as u32)) || (0xA0..=0xFF).contains(&(c as u32)) => {
                c as u32 as u8
            }
            _ => b'?',
        })
        .collect()
}

/// Make sure the page has its own indirect Resources dictionary and return its id.
///
/// Inline resources are moved into an object; inherited ones are copied so
/// the additions stay local to this page.
fn ensure_indirect_resources(doc: &mut Document, page_id: ObjectId) -> Result<ObjectId, OverlayError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| OverlayError::OperationError(e.to_string()))?;

    let existing = match page.get(b"Resources") {
        Ok(Object::Reference(id)) => return Ok(*id),
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => inherited_resources(doc, page).unwrap_or_default(),
    };

    let resources_id = doc.add_object(Object::Dictionary(existing));
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| OverlayError::OperationError(e.to_string()))?
        .set("Resources", Object::Reference(resources_id));
    Ok(resources_id)
}

fn inherited_resources(doc: &Document, page: &Dictionary) -> Option<Dictionary> {
    let mut current = page;
    for _ in 0..32 {
        let parent = current
            .get(b"Parent")
            .ok()?
            .as_reference()
            .ok()
            .and_then(|id| doc.get_object(id).ok())?
            .as_dict()
            .ok()?;
        match parent.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => return Some(dict.clone()),
            Ok(Object::Reference(id)) => {
                return doc.get_object(*id).ok()?.as_dict().ok().cloned();
            }
            _ => current = parent,
        }
    }
    None
}

/// Register `object_id` under a fresh name in the `category` sub-dictionary
/// (Font, ExtGState, ...) of a resources dictionary.
fn add_resource(
    doc: &mut Document,
    resources_id: ObjectId,
    category: &[u8],
    prefix: &str,
    object_id: ObjectId,
) -> Result<Vec<u8>, OverlayError> {
    let resources = doc
        .get_object(resources_id)
        .and_then(Object::as_dict)
        .map_err(|e| OverlayError::OperationError(e.to_string()))?;

    // The category may live inline or behind a reference.
    let category_ref = match resources.get(category) {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    let category_dict = match category_ref {
        Some(id) => doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| OverlayError::OperationError(e.to_string()))?,
        None => {
            let resources = doc
                .get_object_mut(resources_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| OverlayError::OperationError(e.to_string()))?;
            if !matches!(resources.get(category), Ok(Object::Dictionary(_))) {
                resources.set(category.to_vec(), Object::Dictionary(Dictionary::new()));
            }
            resources
                .get_mut(category)
                .and_then(Object::as_dict_mut)
                .map_err(|e| OverlayError::OperationError(e.to_string()))?
        }
    };

    let name = (1..)
        .map(|n| format!("{}{}", prefix, n).into_bytes())
        .find(|candidate| !category_dict.has(candidate))
        .unwrap_or_else(|| prefix.as_bytes().to_vec());
    category_dict.set(name.clone(), Object::Reference(object_id));
    Ok(name)
}

/// Append overlay operations after the page's existing content.
///
/// The existing content is wrapped in `q`/`Q` so any graphics state it
/// leaves behind (CTM, colors) cannot move or recolor the overlay.
fn append_overlay_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), OverlayError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| OverlayError::OperationError(e.to_string()))?;

    // An indirect /Contents may itself point at an array of streams.
    let existing: Vec<Object> = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    let mut overlay_ops = Vec::with_capacity(operations.len() + 1);
    if !existing.is_empty() {
        let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
        overlay_ops.push(Operation::new("Q", vec![]));
    }
    overlay_ops.extend(operations);

    // Streams are concatenated when read back, so keep a separator in front.
    let mut encoded = b"\n".to_vec();
    encoded.extend(
        Content {
            operations: overlay_ops,
        }
        .encode()
        .map_err(|e| OverlayError::OperationError(e.to_string()))?,
    );
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
    contents.push(Object::Reference(overlay_id));

    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| OverlayError::OperationError(e.to_string()))?
        .set("Contents", Object::Array(contents));
    Ok(())
}
