use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;
use tracing::debug;

use super::FontError;

/// Coverage mask for one line of text. `baseline` is the row, counted from
/// the top of the mask, that the text sits on.
#[derive(Debug, Clone)]
pub struct GlyphMask {
    pub coverage: GrayImage,
    pub baseline: u32,
}

/// Rasterizes watermark text into a coverage mask.
pub trait GlyphSource: Send + Sync {
    /// Returns `None` when the text produces no visible pixels at `px`.
    fn rasterize(&self, text: &str, px: f32) -> Option<GlyphMask>;
}

/// TrueType/OpenType glyphs loaded from disk once at startup.
pub struct FontGlyphs {
    font: FontVec,
}

impl FontGlyphs {
    pub fn from_file(path: &Path) -> Result<Self, FontError> {
        let font_data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(font_data).map_err(|_| FontError::InvalidFont)?;
        debug!("Loaded watermark font from {:?}", path);
        Ok(Self { font })
    }
}

impl GlyphSource for FontGlyphs {
    fn rasterize(&self, text: &str, px: f32) -> Option<GlyphMask> {
        if px < 1.0 || text.is_empty() {
            return None;
        }

        let scale = PxScale::from(px);
        let (text_width, _) = text_size(scale, &self.font, text);
        let scaled = self.font.as_scaled(scale);
        let ascent = scaled.ascent().ceil().max(0.0) as u32;
        let descent = (-scaled.descent()).ceil().max(0.0) as u32;
        let height = ascent + descent;

        if text_width == 0 || height == 0 {
            return None;
        }

        // imageproc lays glyphs out with the baseline at y + ascent
        let mut coverage = GrayImage::new(text_width + 1, height + 1);
        draw_text_mut(&mut coverage, Luma([255u8]), 0, 0, scale, &self.font, text);

        if coverage.pixels().all(|p| p[0] == 0) {
            return None;
        }

        Some(GlyphMask {
            coverage,
            baseline: ascent,
        })
    }
}
