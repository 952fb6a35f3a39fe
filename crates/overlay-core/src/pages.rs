//! Page geometry and glyph anchors
//!
//! Reads the two things the editor needs from a page: its native size in
//! PDF user-space units, and the positions where the page's own text runs
//! start (used as snapping targets for new elements).

use crate::error::OverlayError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

/// Native, unscaled page box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    /// Lower-left corner of the MediaBox
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            width,
            height,
        }
    }

    /// US Letter, the size used when nothing better is known.
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }
}

/// Where a text-showing operator starts drawing on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphAnchor {
    /// Baseline start in PDF user space (bottom-left origin)
    pub x: f64,
    pub y: f64,
    /// Effective font size after text and CTM scaling
    pub font_size: f64,
    /// Shown bytes decoded as Latin-1, for diagnostics
    pub text: String,
}

/// Parse PDF bytes, rejecting encrypted documents.
pub fn load_document(bytes: &[u8]) -> Result<Document, OverlayError> {
    let doc = Document::load_mem(bytes).map_err(|e| OverlayError::ParseError(e.to_string()))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(OverlayError::Encrypted);
    }
    Ok(doc)
}

pub fn page_count(doc: &Document) -> u32 {
    doc.get_pages().len() as u32
}

/// Geometry of every page, in page order.
pub fn all_page_geometries(doc: &Document) -> Vec<PageGeometry> {
    doc.get_pages()
        .values()
        .map(|page_id| {
            page_geometry_by_id(doc, *page_id).unwrap_or_else(|e| {
                tracing::warn!("falling back to Letter size: {}", e);
                PageGeometry::letter()
            })
        })
        .collect()
}

/// Geometry of the 1-based `page_num`.
pub fn page_geometry(doc: &Document, page_num: u32) -> Result<PageGeometry, OverlayError> {
    let page_id = *doc
        .get_pages()
        .get(&page_num)
        .ok_or_else(|| OverlayError::OperationError(format!("Page {} not found", page_num)))?;
    page_geometry_by_id(doc, page_id)
}

pub(crate) fn page_geometry_by_id(
    doc: &Document,
    page_id: ObjectId,
) -> Result<PageGeometry, OverlayError> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| OverlayError::OperationError(format!("Page is not a dictionary: {}", e)))?;

    let media_box = find_media_box(doc, page_dict)?;
    let (x1, x2) = min_max(media_box[0], media_box[2]);
    let (y1, y2) = min_max(media_box[1], media_box[3]);

    Ok(PageGeometry {
        origin_x: x1,
        origin_y: y1,
        width: x2 - x1,
        height: y2 - y1,
    })
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// MediaBox is inheritable, so walk up the page tree until one is found.
fn find_media_box(doc: &Document, page_dict: &Dictionary) -> Result<[f64; 4], OverlayError> {
    let mut current = page_dict;
    // Bounded walk; malformed files can have parent cycles.
    for _ in 0..32 {
        if let Ok(media_box) = current.get(b"MediaBox") {
            let media_box = resolve(doc, media_box);
            if let Ok(array) = media_box.as_array() {
                return parse_box_array(doc, array);
            }
        }

        let Some(parent) = current
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|id| doc.get_object(id).ok())
            .and_then(|obj| obj.as_dict().ok())
        else {
            break;
        };
        current = parent;
    }

    Err(OverlayError::OperationError(
        "Page has no MediaBox".to_string(),
    ))
}

fn parse_box_array(doc: &Document, array: &[Object]) -> Result<[f64; 4], OverlayError> {
    if array.len() != 4 {
        return Err(OverlayError::OperationError(format!(
            "MediaBox has {} entries, expected 4",
            array.len()
        )));
    }
    let mut out = [0.0; 4];
    for (slot, obj) in out.iter_mut().zip(array) {
        *slot = number(resolve(doc, obj)).ok_or_else(|| {
            OverlayError::OperationError("MediaBox entry is not a number".to_string())
        })?;
    }
    Ok(out)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(*v as f64),
        _ => None,
    }
}

/// Start positions of the text runs drawn by the page's content stream.
///
/// Unreadable content yields an empty list; anchors are a convenience for
/// snapping and never a reason to fail.
pub fn glyph_anchors(doc: &Document, page_num: u32) -> Vec<GlyphAnchor> {
    let Some(page_id) = doc.get_pages().get(&page_num).copied() else {
        return Vec::new();
    };
    let content = match doc
        .get_page_content(page_id)
        .map_err(|e| e.to_string())
        .and_then(|bytes| Content::decode(&bytes).map_err(|e| e.to_string()))
    {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(page = page_num, "could not read page content: {}", e);
            return Vec::new();
        }
    };
    anchors_from_content(&content)
}

/// 2D affine matrix `[a b c d e f]` as used by PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`
    fn then(self, other: Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn vertical_scale(self) -> f64 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }
}

fn operands<const N: usize>(operands: &[Object]) -> Option<[f64; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, obj) in out.iter_mut().zip(operands) {
        *slot = number(obj)?;
    }
    Some(out)
}

fn shown_text(operands: &[Object]) -> String {
    let mut text = String::new();
    for obj in operands {
        match obj {
            Object::String(bytes, _) => text.extend(bytes.iter().map(|&b| b as char)),
            Object::Array(items) => text.push_str(&shown_text(items)),
            _ => {}
        }
    }
    text
}

fn anchors_from_content(content: &Content) -> Vec<GlyphAnchor> {
    let mut anchors = Vec::new();
    let mut ctm = Matrix::IDENTITY;
    let mut ctm_stack = Vec::new();
    let mut text_matrix = Matrix::IDENTITY;
    let mut line_matrix = Matrix::IDENTITY;
    let mut font_size = 0.0;
    let mut leading = 0.0;

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => ctm = ctm_stack.pop().unwrap_or(Matrix::IDENTITY),
            "cm" => {
                if let Some(m) = operands::<6>(&op.operands) {
                    ctm = Matrix(m).then(ctm);
                }
            }
            "BT" => {
                text_matrix = Matrix::IDENTITY;
                line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(number) {
                    font_size = size;
                }
            }
            "TL" => {
                if let Some([l]) = operands::<1>(&op.operands) {
                    leading = l;
                }
            }
            "Td" | "TD" => {
                if let Some([tx, ty]) = operands::<2>(&op.operands) {
                    if op.operator == "TD" {
                        leading = -ty;
                    }
                    line_matrix = Matrix::translate(tx, ty).then(line_matrix);
                    text_matrix = line_matrix;
                }
            }
            "Tm" => {
                if let Some(m) = operands::<6>(&op.operands) {
                    line_matrix = Matrix(m);
                    text_matrix = line_matrix;
                }
            }
            "T*" | "'" | "\"" => {
                line_matrix = Matrix::translate(0.0, -leading).then(line_matrix);
                text_matrix = line_matrix;
                if op.operator != "T*" {
                    push_anchor(&mut anchors, text_matrix, ctm, font_size, &op.operands);
                }
            }
            "Tj" | "TJ" => push_anchor(&mut anchors, text_matrix, ctm, font_size, &op.operands),
            _ => {}
        }
    }

    anchors
}

fn push_anchor(
    anchors: &mut Vec<GlyphAnchor>,
    text_matrix: Matrix,
    ctm: Matrix,
    font_size: f64,
    operands: &[Object],
) {
    let text = shown_text(operands);
    if text.trim().is_empty() {
        return;
    }
    let m = text_matrix.then(ctm);
    let [_, _, _, _, x, y] = m.0;
    anchors.push(GlyphAnchor {
        x,
        y,
        font_size: font_size * m.vertical_scale(),
        text,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream};

    fn content_pdf(operations: Vec<Operation>, media_box: Vec<Object>) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => media_box,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn text_ops() -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("Invoice")]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("T*", vec![]),
            Operation::new("Tj", vec![Object::string_literal("Total")]),
            Operation::new("ET", vec![]),
        ]
    }

    #[test]
    fn test_inherited_media_box() {
        let pdf = content_pdf(text_ops(), vec![0.into(), 0.into(), 595.into(), 842.into()]);
        let doc = load_document(&pdf).unwrap();
        let geometry = page_geometry(&doc, 1).unwrap();
        assert_eq!(geometry, PageGeometry::new(595.0, 842.0));
        assert_eq!(all_page_geometries(&doc), vec![geometry]);
    }

    #[test]
    fn test_offset_media_box() {
        let pdf = content_pdf(
            text_ops(),
            vec![10.into(), 20.into(), 622.into(), 812.into()],
        );
        let doc = load_document(&pdf).unwrap();
        let geometry = page_geometry(&doc, 1).unwrap();
        assert_eq!(geometry.origin_x, 10.0);
        assert_eq!(geometry.origin_y, 20.0);
        assert_eq!(geometry.width, 612.0);
        assert_eq!(geometry.height, 792.0);
    }

    #[test]
    fn test_missing_page() {
        let pdf = content_pdf(text_ops(), vec![0.into(), 0.into(), 612.into(), 792.into()]);
        let doc = load_document(&pdf).unwrap();
        assert!(page_geometry(&doc, 2).is_err());
        assert!(glyph_anchors(&doc, 2).is_empty());
    }

    #[test]
    fn test_glyph_anchors_follow_text_positioning() {
        let pdf = content_pdf(text_ops(), vec![0.into(), 0.into(), 612.into(), 792.into()]);
        let doc = load_document(&pdf).unwrap();
        let anchors = glyph_anchors(&doc, 1);
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].text, "Invoice");
        assert!((anchors[0].x - 72.0).abs() < 1e-6);
        assert!((anchors[0].y - 700.0).abs() < 1e-6);
        assert!((anchors[0].font_size - 12.0).abs() < 1e-6);
        assert!((anchors[1].y - 686.0).abs() < 1e-6);
    }

    #[test]
    fn test_glyph_anchors_apply_ctm() {
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![2.into(), 0.into(), 0.into(), 2.into(), 10.into(), 10.into()],
            ),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 10.into()]),
            Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), 5.into(), 5.into()],
            ),
            Operation::new("Tj", vec![Object::string_literal("Scaled")]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ];
        let pdf = content_pdf(ops, vec![0.into(), 0.into(), 612.into(), 792.into()]);
        let doc = load_document(&pdf).unwrap();
        let anchors = glyph_anchors(&doc, 1);
        assert_eq!(anchors.len(), 1);
        assert!((anchors[0].x - 20.0).abs() < 1e-6);
        assert!((anchors[0].y - 20.0).abs() < 1e-6);
        assert!((anchors[0].font_size - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_whitespace_runs_are_not_anchors() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
            Operation::new("Tj", vec![Object::string_literal("   ")]),
            Operation::new("ET", vec![]),
        ];
        let pdf = content_pdf(ops, vec![0.into(), 0.into(), 612.into(), 792.into()]);
        let doc = load_document(&pdf).unwrap();
        assert!(glyph_anchors(&doc, 1).is_empty());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = load_document(b"not a pdf").unwrap_err();
        assert!(matches!(err, OverlayError::ParseError(_)));
    }

    #[test]
    fn test_matrix_composition() {
        let m = Matrix::translate(5.0, 5.0).then(Matrix([2.0, 0.0, 0.0, 2.0, 10.0, 10.0]));
        assert_eq!(m.0, [2.0, 0.0, 0.0, 2.0, 20.0, 20.0]);
    }
}
