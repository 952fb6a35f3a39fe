//! Hex color parsing

/// An RGB color with each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn as_tuple(&self) -> (f32, f32, f32) {
        (self.r, self.g, self.b)
    }
}

/// Parse a hex color string ("#fff", "#ffffff", "FF0000") into RGB floats.
///
/// Anything that is not a 3- or 6-digit hex string resolves to black.
pub fn parse_hex_color(color: &str) -> Rgb {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Rgb::BLACK;
    }

    let channels = match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (slot, c) in out.iter_mut().zip(hex.chars()) {
                // digit was validated above
                let v = c.to_digit(16).unwrap_or(0) as u8;
                *slot = v * 16 + v;
            }
            out
        }
        6 => {
            let mut out = [0u8; 3];
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).unwrap_or(0);
            }
            out
        }
        _ => return Rgb::BLACK,
    };

    Rgb {
        r: channels[0] as f32 / 255.0,
        g: channels[1] as f32 / 255.0,
        b: channels[2] as f32 / 255.0,
    }
}
