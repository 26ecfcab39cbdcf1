use image::Rgba;
use serde::{Deserialize, Serialize};

use super::StyleError;

/// Images are normalized against a 1000x1000 reference so one style reads
/// the same on a thumbnail and on a full-resolution product shot.
pub const REFERENCE_WIDTH: f64 = 1000.0;
pub const REFERENCE_HEIGHT: f64 = 1000.0;

const HORIZONTAL_GLYPH_UNITS: f64 = 4.0;
const VERTICAL_GLYPH_UNITS: f64 = 3.0;
const SPACING_MULTIPLIER: f64 = 2.5;

/// Caller-supplied watermark parameters, fixed for a whole batch.
///
/// Field names on the wire match the query parameters of the batch endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatermarkStyle {
    pub text: String,
    #[serde(rename = "angle")]
    pub angle_degrees: f32,
    #[serde(rename = "color")]
    pub color_hex: String,
    #[serde(rename = "opacity")]
    pub max_opacity: f32,
    #[serde(rename = "cutoff")]
    pub cutoff_radius_px: u32,
    #[serde(rename = "fontSize")]
    pub base_font_size_px: u32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            text: "WATERMARK".to_string(),
            angle_degrees: -30.0,
            color_hex: "#000000".to_string(),
            max_opacity: 0.2,
            cutoff_radius_px: 100,
            base_font_size_px: 12,
        }
    }
}

impl WatermarkStyle {
    pub fn validate(&self) -> Result<(), StyleError> {
        if self.text.trim().is_empty() {
            return Err(StyleError::EmptyText);
        }
        if !self.max_opacity.is_finite() || !(0.0..=1.0).contains(&self.max_opacity) {
            return Err(StyleError::InvalidOpacity(self.max_opacity));
        }
        if self.base_font_size_px == 0 {
            return Err(StyleError::InvalidFontSize);
        }
        if !self.angle_degrees.is_finite() {
            return Err(StyleError::InvalidParameter {
                name: "angle",
                value: self.angle_degrees.to_string(),
            });
        }
        self.color()?;
        Ok(())
    }

    /// Parsed fill color, fully opaque. Tile opacity is applied separately.
    pub fn color(&self) -> Result<Rgba<u8>, StyleError> {
        parse_hex_color(&self.color_hex)
    }

    pub fn scaled_for(&self, width: u32, height: u32) -> ScaledStyle {
        ScaledStyle::derive(width, height, self)
    }
}

/// Accepts `#rgb` and `#rrggbb`, with or without the leading `#`.
pub fn parse_hex_color(input: &str) -> Result<Rgba<u8>, StyleError> {
    let hex = input.trim().trim_start_matches('#');
    let invalid = || StyleError::InvalidColor(input.to_string());

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

    match hex.len() {
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
            Ok(Rgba([expand(0)?, expand(1)?, expand(2)?, 255]))
        }
        6 => Ok(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        ])),
        _ => Err(invalid()),
    }
}

/// Per-image geometry derived from a [`WatermarkStyle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledStyle {
    pub scale_factor: f64,
    pub font_size: u32,
    pub cutoff_radius: u32,
    pub spacing_x: u32,
    pub spacing_y: u32,
}

impl ScaledStyle {
    /// Callers must reject zero dimensions first; a zero side yields a zero
    /// scale factor and therefore an invisible watermark.
    pub fn derive(width: u32, height: u32, style: &WatermarkStyle) -> Self {
        let scale_factor =
            (width as f64 / REFERENCE_WIDTH).min(height as f64 / REFERENCE_HEIGHT);

        let font_size = round_px(style.base_font_size_px as f64 * scale_factor);
        let cutoff_radius = round_px(style.cutoff_radius_px as f64 * scale_factor);
        let spacing_x = round_px(font_size as f64 * HORIZONTAL_GLYPH_UNITS * SPACING_MULTIPLIER);
        let spacing_y = round_px(font_size as f64 * VERTICAL_GLYPH_UNITS * SPACING_MULTIPLIER);

        Self {
            scale_factor,
            font_size,
            cutoff_radius,
            spacing_x,
            spacing_y,
        }
    }
}

fn round_px(value: f64) -> u32 {
    value.round().max(0.0) as u32
}
