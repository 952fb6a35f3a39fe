//! Text element data model
//!
//! A [`TextElement`] is one positioned label on one page. Positions are kept
//! in unscaled page units with a top-left origin (y grows downward), which is
//! the convention the overlay works in. The flip into PDF's bottom-left
//! space happens only in the compositor.

use crate::calibration::ElementDefaults;
use crate::error::ElementError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    Overline,
    LineThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,
    pub content: String,
    pub x: f64,
    pub y: f64,
    pub page_number: u32,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub is_predefined: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_spacing: Option<f64>,
    /// Recorded for the overlay; PDF output is single-line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    /// Recorded for the overlay; PDF output always left-aligns at `x`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_transform: Option<TextTransform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<TextDecoration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl TextElement {
    /// The one construction path for elements. Every "add", "add predefined"
    /// and "drop" goes through here so new elements start from the same defaults.
    pub fn new(
        id: impl Into<String>,
        page_number: u32,
        x: f64,
        y: f64,
        content: impl Into<String>,
        defaults: &ElementDefaults,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            x,
            y,
            page_number,
            font_size: defaults.font_size,
            font_family: defaults.font_family.clone(),
            color: defaults.color.clone(),
            bold: false,
            italic: false,
            underline: false,
            is_predefined: false,
            letter_spacing: None,
            word_spacing: None,
            line_height: None,
            text_align: None,
            text_transform: None,
            text_decoration: None,
            font_weight: None,
            font_style: None,
            opacity: None,
        }
    }

    pub fn predefined(mut self) -> Self {
        self.is_predefined = true;
        self
    }

    /// Check the invariants the compositor relies on.
    pub fn validate(&self) -> Result<(), ElementError> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(ElementError::InvalidFontSize(self.font_size));
        }
        if !(self.x.is_finite() && self.y.is_finite() && self.x >= 0.0 && self.y >= 0.0) {
            return Err(ElementError::InvalidPosition {
                x: self.x,
                y: self.y,
            });
        }
        if self.page_number < 1 {
            return Err(ElementError::InvalidPage);
        }
        Ok(())
    }

    pub fn letter_spacing(&self) -> f64 {
        finite_or_zero(self.letter_spacing)
    }

    pub fn word_spacing(&self) -> f64 {
        finite_or_zero(self.word_spacing)
    }

    /// Opacity clamped into `0.0..=1.0`; absent or NaN means opaque.
    pub fn opacity(&self) -> f64 {
        match self.opacity {
            Some(o) if o.is_finite() => o.clamp(0.0, 1.0),
            _ => 1.0,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.bold || self.font_weight.is_some_and(|w| w >= 600)
    }

    pub fn is_italic(&self) -> bool {
        self.italic || matches!(self.font_style, Some(FontStyle::Italic | FontStyle::Oblique))
    }

    /// Explicit `text_decoration` wins over the legacy `underline` flag.
    pub fn decoration(&self) -> TextDecoration {
        match self.text_decoration {
            Some(decoration) => decoration,
            None if self.underline => TextDecoration::Underline,
            None => TextDecoration::None,
        }
    }

    pub fn transform(&self) -> TextTransform {
        self.text_transform.unwrap_or_default()
    }

    /// Merge a partial update. Fields that are `None` in the patch stay as they are.
    pub fn apply_patch(&mut self, patch: &TextElementPatch) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &patch.$field {
                    self.$field = value.clone();
                })*
            };
        }
        macro_rules! merge_optional {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &patch.$field {
                    self.$field = Some(value.clone());
                })*
            };
        }

        merge!(
            content,
            x,
            y,
            page_number,
            font_size,
            font_family,
            color,
            bold,
            italic,
            underline,
            is_predefined,
        );
        merge_optional!(
            letter_spacing,
            word_spacing,
            line_height,
            text_align,
            text_transform,
            text_decoration,
            font_weight,
            font_style,
            opacity,
        );
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// A partial update to a [`TextElement`]. The id is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextElementPatch {
    pub content: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub page_number: Option<u32>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub is_predefined: Option<bool>,
    pub letter_spacing: Option<f64>,
    pub word_spacing: Option<f64>,
    pub line_height: Option<f64>,
    pub text_align: Option<TextAlign>,
    pub text_transform: Option<TextTransform>,
    pub text_decoration: Option<TextDecoration>,
    pub font_weight: Option<u16>,
    pub font_style: Option<FontStyle>,
    pub opacity: Option<f64>,
}

impl TextElementPatch {
    pub fn is_empty(&self) -> bool {
        *self == TextElementPatch::default()
    }

    pub fn moves(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.page_number.is_some()
    }

    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// Generate an element id: millisecond timestamp plus a random suffix.
pub fn new_element_id() -> String {
    let millis = now_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", millis, &suffix[..9])
}

// std's clock is unavailable on wasm32-unknown-unknown.
#[cfg(target_arch = "wasm32")]
fn now_millis() -> u128 {
    js_sys::Date::now() as u128
}

#[cfg(not(target_arch = "wasm32"))]
fn now_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element() -> TextElement {
        TextElement::new("a", 1, 100.0, 100.0, "Hello", &ElementDefaults::default())
    }

    #[test]
    fn test_new_uses_defaults() {
        let el = element();
        assert_eq!(el.font_size, 16.0);
        assert_eq!(el.font_family, "Arial");
        assert_eq!(el.color, "#000000");
        assert!(!el.is_predefined);
        assert!(el.predefined().is_predefined);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut el = element();
        assert!(el.validate().is_ok());

        el.font_size = -12.0;
        assert_eq!(el.validate(), Err(ElementError::InvalidFontSize(-12.0)));

        let mut el = element();
        el.x = f64::NAN;
        assert!(matches!(
            el.validate(),
            Err(ElementError::InvalidPosition { .. })
        ));

        let mut el = element();
        el.page_number = 0;
        assert_eq!(el.validate(), Err(ElementError::InvalidPage));
    }

    #[test]
    fn test_boldness_from_weight_or_legacy_flag() {
        let mut el = element();
        assert!(!el.is_bold());
        el.font_weight = Some(500);
        assert!(!el.is_bold());
        el.font_weight = Some(600);
        assert!(el.is_bold());
        el.font_weight = Some(400);
        el.bold = true;
        assert!(el.is_bold());
    }

    #[test]
    fn test_italic_from_style_or_legacy_flag() {
        let mut el = element();
        el.font_style = Some(FontStyle::Oblique);
        assert!(el.is_italic());
        el.font_style = Some(FontStyle::Normal);
        assert!(!el.is_italic());
        el.italic = true;
        assert!(el.is_italic());
    }

    #[test]
    fn test_explicit_decoration_wins_over_legacy_underline() {
        let mut el = element();
        el.underline = true;
        assert_eq!(el.decoration(), TextDecoration::Underline);
        el.text_decoration = Some(TextDecoration::LineThrough);
        assert_eq!(el.decoration(), TextDecoration::LineThrough);
        el.text_decoration = Some(TextDecoration::None);
        assert_eq!(el.decoration(), TextDecoration::None);
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut el = element();
        let before = el.clone();
        el.apply_patch(&TextElementPatch::default());
        assert_eq!(el, before);
    }

    #[test]
    fn test_patch_merges_fields() {
        let mut el = element();
        el.apply_patch(&TextElementPatch {
            content: Some("Bye".to_string()),
            font_weight: Some(700),
            opacity: Some(0.5),
            ..Default::default()
        });
        assert_eq!(el.content, "Bye");
        assert_eq!(el.font_weight, Some(700));
        assert_eq!(el.opacity(), 0.5);
        assert_eq!(el.id, "a");
        assert_eq!(el.x, 100.0);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut el = element();
        assert_eq!(el.opacity(), 1.0);
        el.opacity = Some(3.0);
        assert_eq!(el.opacity(), 1.0);
        el.opacity = Some(-1.0);
        assert_eq!(el.opacity(), 0.0);
    }

    #[test]
    fn test_json_uses_camel_case() {
        let mut el = element();
        el.text_decoration = Some(TextDecoration::LineThrough);
        let json = serde_json::to_string(&el).unwrap();
        assert!(json.contains("\"pageNumber\":1"));
        assert!(json.contains("\"textDecoration\":\"line-through\""));
        assert!(!json.contains("letterSpacing"));
    }

    #[test]
    fn test_patch_from_json() {
        let patch: TextElementPatch =
            serde_json::from_str(r#"{"fontSize":20,"textTransform":"uppercase"}"#).unwrap();
        assert_eq!(patch.font_size, Some(20.0));
        assert_eq!(patch.text_transform, Some(TextTransform::Uppercase));
        assert!(!patch.moves());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = new_element_id();
        let b = new_element_id();
        assert_ne!(a, b);
        assert!(a.contains('-'));
    }
}
