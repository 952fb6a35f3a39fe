//! Typography resolution
//!
//! Turns an element's declarative style (family, weight, style, transform,
//! spacing, decoration) into what the compositor needs: a PDF standard font,
//! the literal string to draw, run positions and decoration lines.
//!
//! Exact glyph metrics are not available for the standard fonts without
//! shipping AFM tables, so widths come from [`measure`]. Every place that
//! needs a width uses that one function, otherwise decorations drift away
//! from the glyphs they decorate.

use crate::element::{TextDecoration, TextElement, TextTransform};

/// Canonical font families the editor maps free-text family names onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Sans,
    Serif,
    Mono,
}

impl FontFamily {
    /// Case-insensitive substring match. Unknown names are sans.
    pub fn resolve(name: &str) -> Self {
        let lower = name.to_lowercase();

        // "sans-serif" contains "serif"
        if lower.contains("sans") {
            return FontFamily::Sans;
        }
        if lower.contains("times")
            || lower.contains("serif")
            || lower.contains("georgia")
            || lower.contains("garamond")
        {
            return FontFamily::Serif;
        }
        if lower.contains("courier")
            || lower.contains("mono")
            || lower.contains("consolas")
            || lower.contains("monaco")
        {
            return FontFamily::Mono;
        }
        FontFamily::Sans
    }

    /// Advance width of `c` as a fraction of the font size.
    fn char_ratio(self, c: char) -> f64 {
        match self {
            FontFamily::Mono => 0.6,
            FontFamily::Sans => match c {
                ' ' => 0.28,
                'i' | 'l' | 't' | 'f' => 0.28,
                'm' | 'w' | 'M' | 'W' => 0.83,
                _ => 0.55,
            },
            FontFamily::Serif => match c {
                ' ' => 0.25,
                'i' | 'l' | 't' | 'f' => 0.28,
                'm' | 'w' | 'M' | 'W' => 0.75,
                _ => 0.5,
            },
        }
    }
}

/// The twelve Latin standard fonts every PDF reader ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// Used whenever anything goes wrong with the requested font.
    pub const FALLBACK: StandardFont = StandardFont::Helvetica;

    pub fn select(family: FontFamily, bold: bool, italic: bool) -> Self {
        match family {
            FontFamily::Serif => match (bold, italic) {
                (true, true) => StandardFont::TimesBoldItalic,
                (true, false) => StandardFont::TimesBold,
                (false, true) => StandardFont::TimesItalic,
                (false, false) => StandardFont::TimesRoman,
            },
            FontFamily::Sans => match (bold, italic) {
                (true, true) => StandardFont::HelveticaBoldOblique,
                (true, false) => StandardFont::HelveticaBold,
                (false, true) => StandardFont::HelveticaOblique,
                (false, false) => StandardFont::Helvetica,
            },
            FontFamily::Mono => match (bold, italic) {
                (true, true) => StandardFont::CourierBoldOblique,
                (true, false) => StandardFont::CourierBold,
                (false, true) => StandardFont::CourierOblique,
                (false, false) => StandardFont::Courier,
            },
        }
    }

    /// The `/BaseFont` name.
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }
}

/// Apply a CSS-style text transform.
pub fn apply_transform(content: &str, transform: TextTransform) -> String {
    match transform {
        TextTransform::None => content.to_string(),
        TextTransform::Uppercase => content.to_uppercase(),
        TextTransform::Lowercase => content.to_lowercase(),
        TextTransform::Capitalize => content
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Estimated advance width of `text` at `font_size`.
pub fn measure(text: &str, font_size: f64, family: FontFamily) -> f64 {
    text.chars().map(|c| family.char_ratio(c)).sum::<f64>() * font_size
}

/// A piece of text drawn at `dx` from the element's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub dx: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub runs: Vec<TextRun>,
    /// Total advance, including configured spacing
    pub width: f64,
}

/// Lay out `text` as draw runs.
///
/// Without spacing the whole string is one run. With word spacing each word
/// is a run; with letter spacing each character is.
pub fn layout_runs(
    text: &str,
    font_size: f64,
    family: FontFamily,
    letter_spacing: f64,
    word_spacing: f64,
) -> TextLayout {
    if text.is_empty() {
        return TextLayout {
            runs: Vec::new(),
            width: 0.0,
        };
    }

    if letter_spacing == 0.0 && word_spacing == 0.0 {
        return TextLayout {
            runs: vec![TextRun {
                text: text.to_string(),
                dx: 0.0,
            }],
            width: measure(text, font_size, family),
        };
    }

    let words: Vec<&str> = text.split(' ').collect();
    let space = measure(" ", font_size, family);
    let mut runs = Vec::new();
    let mut cursor = 0.0;

    for (i, word) in words.iter().enumerate() {
        let last_word = i + 1 == words.len();
        if letter_spacing != 0.0 {
            let mut chars = word.chars().peekable();
            while let Some(c) = chars.next() {
                runs.push(TextRun {
                    text: c.to_string(),
                    dx: cursor,
                });
                cursor += family.char_ratio(c) * font_size;
                // no trailing spacing after the final glyph
                if !(last_word && chars.peek().is_none()) {
                    cursor += letter_spacing;
                }
            }
        } else if !word.is_empty() {
            runs.push(TextRun {
                text: word.to_string(),
                dx: cursor,
            });
            cursor += measure(word, font_size, family);
        }

        if !last_word {
            cursor += space + word_spacing;
        }
    }

    TextLayout {
        runs,
        width: cursor,
    }
}

/// Vertical position of a decoration line relative to the baseline.
pub fn decoration_offset(decoration: TextDecoration, font_size: f64) -> Option<f64> {
    match decoration {
        TextDecoration::None => None,
        TextDecoration::Underline => Some(-2.0),
        TextDecoration::LineThrough => Some(font_size * 0.3),
        TextDecoration::Overline => Some(font_size),
    }
}

/// Everything the compositor needs to draw one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedText {
    pub family: FontFamily,
    pub font: StandardFont,
    /// Content after the text transform
    pub text: String,
    pub layout: TextLayout,
    pub decoration: TextDecoration,
}

impl ResolvedText {
    pub fn resolve(element: &TextElement) -> Self {
        let family = FontFamily::resolve(&element.font_family);
        let font = StandardFont::select(family, element.is_bold(), element.is_italic());
        let text = apply_transform(&element.content, element.transform());
        let layout = layout_runs(
            &text,
            element.font_size,
            family,
            element.letter_spacing(),
            element.word_spacing(),
        );
        Self {
            family,
            font,
            text,
            layout,
            decoration: element.decoration(),
        }
    }

    pub fn is_single_run(&self) -> bool {
        self.layout.runs.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::ElementDefaults;
    use crate::element::FontStyle;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_family_resolution() {
        assert_eq!(FontFamily::resolve("Arial"), FontFamily::Sans);
        assert_eq!(FontFamily::resolve("Times New Roman"), FontFamily::Serif);
        assert_eq!(FontFamily::resolve("Courier New"), FontFamily::Mono);
        assert_eq!(FontFamily::resolve("serif"), FontFamily::Serif);
        assert_eq!(FontFamily::resolve("sans-serif"), FontFamily::Sans);
        assert_eq!(FontFamily::resolve("MONOSPACE"), FontFamily::Mono);
        assert_eq!(FontFamily::resolve("Comic Whatever"), FontFamily::Sans);
        assert_eq!(FontFamily::resolve(""), FontFamily::Sans);
    }

    #[test]
    fn test_font_variants() {
        assert_eq!(
            StandardFont::select(FontFamily::Serif, true, true).base_font(),
            "Times-BoldItalic"
        );
        assert_eq!(
            StandardFont::select(FontFamily::Sans, false, true).base_font(),
            "Helvetica-Oblique"
        );
        assert_eq!(
            StandardFont::select(FontFamily::Mono, true, false).base_font(),
            "Courier-Bold"
        );
        assert_eq!(StandardFont::FALLBACK.base_font(), "Helvetica");
    }

    #[test]
    fn test_resolve_uses_weight_and_style() {
        let mut el = TextElement::new("a", 1, 0.0, 0.0, "x", &ElementDefaults::default());
        el.font_family = "Times New Roman".to_string();
        el.font_weight = Some(700);
        el.font_style = Some(FontStyle::Italic);
        assert_eq!(ResolvedText::resolve(&el).font, StandardFont::TimesBoldItalic);
    }

    #[test]
    fn test_transforms() {
        assert_eq!(
            apply_transform("hello world", TextTransform::Capitalize),
            "Hello World"
        );
        assert_eq!(apply_transform("Hello", TextTransform::Uppercase), "HELLO");
        assert_eq!(apply_transform("Hello", TextTransform::Lowercase), "hello");
        assert_eq!(apply_transform("hello", TextTransform::None), "hello");
        assert_eq!(
            apply_transform("two  spaces", TextTransform::Capitalize),
            "Two  Spaces"
        );
        assert_eq!(apply_transform("", TextTransform::Capitalize), "");
    }

    #[test]
    fn test_measure_refines_narrow_and_wide() {
        let narrow = measure("iiii", 10.0, FontFamily::Sans);
        let normal = measure("aaaa", 10.0, FontFamily::Sans);
        let wide = measure("mmmm", 10.0, FontFamily::Sans);
        assert!(narrow < normal && normal < wide);

        // monospace ignores glyph shape
        assert_eq!(
            measure("iiii", 10.0, FontFamily::Mono),
            measure("mmmm", 10.0, FontFamily::Mono)
        );
        assert!((measure("abc", 10.0, FontFamily::Mono) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_run_without_spacing() {
        let layout = layout_runs("Hello World", 12.0, FontFamily::Sans, 0.0, 0.0);
        assert_eq!(layout.runs.len(), 1);
        assert_eq!(layout.runs[0].text, "Hello World");
        assert_eq!(layout.width, measure("Hello World", 12.0, FontFamily::Sans));
    }

    #[test]
    fn test_word_spacing_runs() {
        let layout = layout_runs("ab cd", 10.0, FontFamily::Mono, 0.0, 5.0);
        assert_eq!(layout.runs.len(), 2);
        assert_eq!(layout.runs[0].dx, 0.0);
        // "ab" = 12, space = 6, spacing = 5
        assert!((layout.runs[1].dx - 23.0).abs() < 1e-9);
        assert!((layout.width - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_letter_spacing_runs() {
        let layout = layout_runs("ab c", 10.0, FontFamily::Mono, 1.0, 0.0);
        let texts: Vec<&str> = layout.runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert!((layout.runs[1].dx - 7.0).abs() < 1e-9);
        // a(6+1) b(6+1) space(6) c(6)
        assert!((layout.runs[2].dx - 20.0).abs() < 1e-9);
        assert!((layout.width - 26.0).abs() < 1e-9);
    }

    #[test]
    fn test_letter_spacing_width_ends_at_last_glyph() {
        let layout = layout_runs("ab", 10.0, FontFamily::Sans, 2.0, 0.0);
        let expected = measure("ab", 10.0, FontFamily::Sans) + 2.0;
        assert!((layout.width - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_spacing_width_matches_multi_run_sum() {
        // one run and many runs advance the same when spacing is zero
        let single = layout_runs("a b", 10.0, FontFamily::Serif, 0.0, 0.0);
        let multi = layout_runs("a b", 10.0, FontFamily::Serif, 0.0, 1e-12);
        assert!((single.width - multi.width).abs() < 1e-6);
    }

    #[test]
    fn test_empty_text_has_no_runs() {
        let layout = layout_runs("", 12.0, FontFamily::Sans, 2.0, 2.0);
        assert!(layout.runs.is_empty());
        assert_eq!(layout.width, 0.0);
    }

    #[test]
    fn test_decoration_offsets() {
        assert_eq!(decoration_offset(TextDecoration::None, 10.0), None);
        assert_eq!(decoration_offset(TextDecoration::Underline, 10.0), Some(-2.0));
        let strike = decoration_offset(TextDecoration::LineThrough, 10.0).unwrap();
        assert!((strike - 3.0).abs() < 1e-9);
        assert_eq!(decoration_offset(TextDecoration::Overline, 10.0), Some(10.0));
    }
}
