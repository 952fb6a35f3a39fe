//! Visual anchor calibration and editor configuration
//!
//! The overlay draws each text box with a little padding and at a fixed
//! display scale. The compositor has to undo exactly that padding when it
//! burns text into the page, and the snapping code has to map PDF glyphs
//! back into the overlay's convention. All of those numbers live in one
//! [`Calibration`] so the overlay styling and the PDF math are driven by the
//! same values.
//!
//! Configuration can be supplied as TOML:
//!
//! ```
//! use overlay_core::calibration::EditorConfig;
//!
//! let config = EditorConfig::from_toml_str(r#"
//!     [calibration]
//!     snap_threshold = 6.0
//!
//!     [defaults]
//!     font_size = 14.0
//! "#).unwrap();
//! assert_eq!(config.calibration.snap_threshold, 6.0);
//! assert_eq!(config.calibration.y_offset, -4.0);
//! ```

use crate::error::OverlayError;
use serde::{Deserialize, Serialize};

/// Constants coupling the on-screen overlay to PDF placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Zoom the constants below were tuned against
    pub display_scale: f64,
    /// Added to the stored x when drawing into the PDF
    pub x_offset: f64,
    /// Added to the flipped baseline y when drawing into the PDF
    pub y_offset: f64,
    /// Fraction of the font size between the stored top-left anchor and the baseline
    pub baseline_multiplier: f64,
    /// Maximum distance (page units) at which a new element snaps to a candidate
    pub snap_threshold: f64,
    /// Offset subtracted from glyph anchors so the overlay box padding lines up with the glyph
    pub snap_padding: f64,
    /// Margin kept free at the right and bottom page edges while dragging
    pub drag_margin: f64,
    /// Padding the overlay renders around each text box (page units)
    pub overlay_padding: f64,
    /// Stroke width of underline / overline / line-through
    pub decoration_thickness: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            display_scale: 1.2,
            x_offset: -0.4,
            y_offset: -4.0,
            baseline_multiplier: 0.85,
            snap_threshold: 10.0,
            snap_padding: 2.0,
            drag_margin: 20.0,
            overlay_padding: 4.0,
            decoration_thickness: 0.75,
        }
    }
}

impl Calibration {
    pub fn validate(&self) -> Result<(), OverlayError> {
        let finite = [
            ("display_scale", self.display_scale),
            ("x_offset", self.x_offset),
            ("y_offset", self.y_offset),
            ("baseline_multiplier", self.baseline_multiplier),
            ("snap_threshold", self.snap_threshold),
            ("snap_padding", self.snap_padding),
            ("drag_margin", self.drag_margin),
            ("overlay_padding", self.overlay_padding),
            ("decoration_thickness", self.decoration_thickness),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(OverlayError::ConfigError(format!(
                    "{} must be finite",
                    name
                )));
            }
        }
        if self.display_scale <= 0.0 {
            return Err(OverlayError::ConfigError(
                "display_scale must be positive".to_string(),
            ));
        }
        if self.snap_threshold < 0.0 || self.drag_margin < 0.0 {
            return Err(OverlayError::ConfigError(
                "snap_threshold and drag_margin must not be negative".to_string(),
            ));
        }
        if self.decoration_thickness <= 0.0 {
            return Err(OverlayError::ConfigError(
                "decoration_thickness must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Overlay padding in screen pixels at the given zoom, for the host's CSS.
    pub fn overlay_padding_px(&self, scale: f64) -> f64 {
        self.overlay_padding * scale
    }
}

/// Initial values for newly created text elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementDefaults {
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    /// Content given to elements created with "add text"
    pub content: String,
}

impl Default for ElementDefaults {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            font_family: "Arial".to_string(),
            color: "#000000".to_string(),
            content: "New Text".to_string(),
        }
    }
}

/// Everything an [`EditorSession`](crate::session::EditorSession) is configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub calibration: Calibration,
    pub defaults: ElementDefaults,
    /// Labels offered in the "predefined text" picker
    pub predefined_texts: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            calibration: Calibration::default(),
            defaults: ElementDefaults::default(),
            predefined_texts: ["Approved", "Reviewed", "Confidential", "Date:", "Signature:"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EditorConfig {
    /// Parse and validate a TOML configuration. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, OverlayError> {
        let config: EditorConfig =
            toml::from_str(s).map_err(|e| OverlayError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OverlayError> {
        self.calibration.validate()?;
        if !(self.defaults.font_size.is_finite() && self.defaults.font_size > 0.0) {
            return Err(OverlayError::ConfigError(
                "defaults.font_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
