//! Coordinate transformation between screen and page space
//!
//! Three spaces are involved:
//! - screen: pixels, top-left origin, includes the current zoom
//! - stored page space: unscaled page units, top-left origin (what elements keep)
//! - PDF user space: unscaled, bottom-left origin (only the compositor uses it)
//!
//! Everything here is a pure function of its inputs. Page layout can change
//! between calls (zoom, navigation, resize) so nothing is cached.

use crate::calibration::Calibration;
use crate::element::TextElement;
use crate::pages::{GlyphAnchor, PageGeometry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl PagePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Convert a pointer position to stored page coordinates.
///
/// `page_origin` is the top-left of the page's *rendered* bounding box in
/// screen space, which already accounts for borders and margins around the
/// page. `None` means the page is not mounted yet and yields the origin.
/// `scale` must be positive.
pub fn screen_to_page(screen: ScreenPoint, page_origin: Option<ScreenPoint>, scale: f64) -> PagePoint {
    let Some(origin) = page_origin else {
        return PagePoint::default();
    };
    PagePoint {
        x: (screen.x - origin.x) / scale,
        y: (screen.y - origin.y) / scale,
    }
}

/// Offset of a stored point from the page's rendered top-left, in screen pixels.
pub fn page_to_screen(page: PagePoint, scale: f64) -> ScreenPoint {
    ScreenPoint {
        x: page.x * scale,
        y: page.y * scale,
    }
}

/// Convert a pointer delta (pixels) into a stored-space delta.
pub fn screen_delta_to_page(dx: f64, dy: f64, scale: f64) -> (f64, f64) {
    (dx / scale, dy / scale)
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, max.max(0.0))
}

/// Clamp into `[0, width] × [0, height]`.
pub fn clamp_to_page(point: PagePoint, geometry: &PageGeometry) -> PagePoint {
    PagePoint {
        x: clamp_axis(point.x, geometry.width),
        y: clamp_axis(point.y, geometry.height),
    }
}

/// Clamp for drags, keeping a grabbable margin at the right and bottom edges.
pub fn clamp_for_drag(point: PagePoint, geometry: &PageGeometry, margin: f64) -> PagePoint {
    PagePoint {
        x: clamp_axis(point.x, geometry.width - margin),
        y: clamp_axis(point.y, geometry.height - margin),
    }
}

/// New position of an element dragged from `start` by a screen-space delta.
pub fn drag_position(
    start: PagePoint,
    delta: ScreenPoint,
    scale: f64,
    geometry: &PageGeometry,
    calibration: &Calibration,
) -> PagePoint {
    let (dx, dy) = screen_delta_to_page(delta.x, delta.y, scale);
    clamp_for_drag(
        PagePoint::new(start.x + dx, start.y + dy),
        geometry,
        calibration.drag_margin,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapSource {
    Element,
    Glyph,
}

/// A position a new element may align with, in stored page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapCandidate {
    pub x: f64,
    pub y: f64,
    pub source: SnapSource,
}

impl SnapCandidate {
    /// Map a glyph anchor into stored space.
    ///
    /// This is the inverse of the compositor's placement: an element of
    /// `font_size` stored at the returned point is drawn with its baseline
    /// starting exactly on the glyph anchor, minus `snap_padding`.
    pub fn from_glyph(
        anchor: &GlyphAnchor,
        geometry: &PageGeometry,
        font_size: f64,
        calibration: &Calibration,
    ) -> Self {
        let pdf_x = anchor.x - geometry.origin_x;
        let pdf_y = anchor.y - geometry.origin_y;
        Self {
            x: pdf_x - calibration.x_offset - calibration.snap_padding,
            y: geometry.height - pdf_y - font_size * calibration.baseline_multiplier
                + calibration.y_offset
                - calibration.snap_padding,
            source: SnapSource::Glyph,
        }
    }

    pub fn from_element(element: &TextElement) -> Self {
        Self {
            x: element.x,
            y: element.y,
            source: SnapSource::Element,
        }
    }
}

/// Build the candidate set for placing an element of `font_size`:
/// existing elements first, then glyph anchors, each in their given order.
pub fn snap_candidates(
    elements: &[&TextElement],
    anchors: &[GlyphAnchor],
    geometry: &PageGeometry,
    font_size: f64,
    calibration: &Calibration,
) -> Vec<SnapCandidate> {
    elements
        .iter()
        .map(|el| SnapCandidate::from_element(el))
        .chain(
            anchors
                .iter()
                .map(|a| SnapCandidate::from_glyph(a, geometry, font_size, calibration)),
        )
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    pub point: PagePoint,
    /// Index of the candidate the x axis snapped to
    pub x_target: Option<usize>,
    /// Index of the candidate the y axis snapped to
    pub y_target: Option<usize>,
}

/// Nearest candidate on one axis. Ties go to the first candidate encountered.
fn nearest(raw: f64, values: impl Iterator<Item = f64>) -> Option<(usize, f64, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for (i, value) in values.enumerate() {
        let distance = (value - raw).abs();
        if !distance.is_finite() {
            continue;
        }
        if best.map_or(true, |(_, _, d)| distance < d) {
            best = Some((i, value, distance));
        }
    }
    best
}

/// Snap each axis independently to the nearest candidate within `threshold`.
pub fn snap(raw: PagePoint, candidates: &[SnapCandidate], threshold: f64) -> SnapResult {
    let mut result = SnapResult {
        point: raw,
        x_target: None,
        y_target: None,
    };

    if let Some((i, value, distance)) = nearest(raw.x, candidates.iter().map(|c| c.x)) {
        if distance <= threshold {
            result.point.x = value;
            result.x_target = Some(i);
        }
    }
    if let Some((i, value, distance)) = nearest(raw.y, candidates.iter().map(|c| c.y)) {
        if distance <= threshold {
            result.point.y = value;
            result.y_target = Some(i);
        }
    }

    result
}

/// Full placement pipeline for a new element: convert, snap, clamp.
pub fn place_new_element(
    screen: ScreenPoint,
    page_origin: Option<ScreenPoint>,
    scale: f64,
    candidates: &[SnapCandidate],
    geometry: &PageGeometry,
    calibration: &Calibration,
) -> PagePoint {
    if page_origin.is_none() {
        return PagePoint::default();
    }
    let raw = screen_to_page(screen, page_origin, scale);
    let snapped = snap(raw, candidates, calibration.snap_threshold);
    clamp_to_page(snapped.point, geometry)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn scale() -> impl Strategy<Value = f64> {
        0.1f64..5.0
    }

    proptest! {
        /// Property: any pointer, however far outside the page, lands inside it
        #[test]
        fn placement_always_inside_page(
            w in dimension(),
            h in dimension(),
            s in scale(),
            sx in -10_000.0f64..10_000.0,
            sy in -10_000.0f64..10_000.0,
            ox in -500.0f64..500.0,
            oy in -500.0f64..500.0,
        ) {
            let geometry = PageGeometry::new(w, h);
            let p = place_new_element(
                ScreenPoint::new(sx, sy),
                Some(ScreenPoint::new(ox, oy)),
                s,
                &[],
                &geometry,
                &Calibration::default(),
            );
            prop_assert!(p.x >= 0.0 && p.x <= w, "x {} outside [0, {}]", p.x, w);
            prop_assert!(p.y >= 0.0 && p.y <= h, "y {} outside [0, {}]", p.y, h);
        }

        /// Property: snapping to candidates anywhere still yields an in-page point
        #[test]
        fn snapped_placement_inside_page(
            w in dimension(),
            h in dimension(),
            cx in -100.0f64..3000.0,
            cy in -100.0f64..3000.0,
            sx in -100.0f64..3000.0,
            sy in -100.0f64..3000.0,
        ) {
            let geometry = PageGeometry::new(w, h);
            let candidates = [SnapCandidate { x: cx, y: cy, source: SnapSource::Glyph }];
            let p = place_new_element(
                ScreenPoint::new(sx, sy),
                Some(ScreenPoint::default()),
                1.0,
                &candidates,
                &geometry,
                &Calibration::default(),
            );
            prop_assert!(p.x >= 0.0 && p.x <= w);
            prop_assert!(p.y >= 0.0 && p.y <= h);
        }

        /// Property: snapping is deterministic for identical input
        #[test]
        fn snap_is_deterministic(
            raw_x in 0.0f64..600.0,
            raw_y in 0.0f64..800.0,
            xs in proptest::collection::vec(0.0f64..600.0, 0..8),
        ) {
            let candidates: Vec<SnapCandidate> = xs
                .iter()
                .map(|&x| SnapCandidate { x, y: x, source: SnapSource::Element })
                .collect();
            let a = snap(PagePoint::new(raw_x, raw_y), &candidates, 10.0);
            let b = snap(PagePoint::new(raw_x, raw_y), &candidates, 10.0);
            prop_assert_eq!(a, b);
        }

        /// Property: screen -> page -> screen roundtrip
        #[test]
        fn roundtrip_page_screen(
            x in 0.0f64..2000.0,
            y in 0.0f64..2000.0,
            s in scale(),
        ) {
            let screen = page_to_screen(PagePoint::new(x, y), s);
            let back = screen_to_page(screen, Some(ScreenPoint::default()), s);
            prop_assert!((back.x - x).abs() < 1e-6);
            prop_assert!((back.y - y).abs() < 1e-6);
        }
    }
}
