use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage, codecs::jpeg::JpegEncoder};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::sync::Arc;
use tracing::debug;

use super::{GlyphMask, GlyphSource, RenderError, ScaledStyle, WatermarkStyle};

/// One tiled text element: its anchor (left end of the baseline) and opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub x: u32,
    pub y: u32,
    pub opacity: f32,
}

/// Opacity of a tile anchored at `(x, y)`.
///
/// Zero inside `cutoff` of the image center, then a quadratic ease-out that
/// reaches `max_opacity` at the corners.
pub fn tile_opacity(x: f64, y: f64, width: u32, height: u32, cutoff: f64, max_opacity: f32) -> f32 {
    let center_x = width as f64 / 2.0;
    let center_y = height as f64 / 2.0;
    let max_distance = (center_x * center_x + center_y * center_y).sqrt();

    if max_distance <= cutoff {
        return 0.0;
    }

    let distance = ((x - center_x).powi(2) + (y - center_y).powi(2)).sqrt();
    let normalized = ((distance - cutoff) / (max_distance - cutoff)).clamp(0.0, 1.0);

    ((1.0 - (1.0 - normalized).powi(2)) * max_opacity as f64) as f32
}

/// Grid of tile anchors covering the image, stepping from the top-left corner.
pub fn layout_tiles(
    width: u32,
    height: u32,
    scaled: &ScaledStyle,
    max_opacity: f32,
) -> Vec<TilePlacement> {
    let step_x = scaled.spacing_x.max(1) as usize;
    let step_y = scaled.spacing_y.max(1) as usize;
    let cutoff = scaled.cutoff_radius as f64;

    let mut tiles = Vec::new();
    for y in (0..height).step_by(step_y) {
        for x in (0..width).step_by(step_x) {
            let opacity = tile_opacity(x as f64, y as f64, width, height, cutoff, max_opacity);
            tiles.push(TilePlacement { x, y, opacity });
        }
    }
    tiles
}

/// Rotated, colored text ready to be stamped at each tile anchor.
#[derive(Debug, Clone)]
pub struct Stamp {
    pub image: RgbaImage,
    pub anchor_x: i64,
    pub anchor_y: i64,
}

impl Stamp {
    /// Places the mask's baseline anchor at the center of a square canvas large
    /// enough for any rotation, rotates about that point, then crops to the
    /// visible pixels.
    ///
    /// No tile can show more than the image diagonal away from its anchor, so
    /// the mask is clipped to that radius first. Long text on a small image
    /// stays bounded by the image, not by the text.
    pub fn new(
        mask: &GlyphMask,
        color: Rgba<u8>,
        angle_degrees: f32,
        image_width: u32,
        image_height: u32,
    ) -> Option<Self> {
        let (mask_w, mask_h) = mask.coverage.dimensions();
        let radius = diagonal(mask_w, mask_h).min(diagonal(image_width, image_height));
        let side = 2 * radius + 2;
        let center = side / 2;

        let transparent = Rgba([color[0], color[1], color[2], 0]);
        let mut canvas = RgbaImage::from_pixel(side, side, transparent);

        let origin_y = center as i64 - mask.baseline as i64;
        for (mx, my, coverage) in mask.coverage.enumerate_pixels() {
            let rise = (my as i64 - mask.baseline as i64).unsigned_abs();
            if coverage[0] == 0 || mx > radius || rise > radius as u64 {
                continue;
            }
            let cx = center + mx;
            let cy = origin_y + my as i64;
            if cx < side && cy >= 0 && (cy as u32) < side {
                canvas.put_pixel(cx, cy as u32, Rgba([color[0], color[1], color[2], coverage[0]]));
            }
        }

        let rotated = if angle_degrees.rem_euclid(360.0) == 0.0 {
            canvas
        } else {
            rotate_about_center(
                &canvas,
                angle_degrees.to_radians(),
                Interpolation::Bilinear,
                transparent,
            )
        };

        let (min_x, min_y, max_x, max_y) = visible_bounds(&rotated)?;
        let image = image::imageops::crop_imm(
            &rotated,
            min_x,
            min_y,
            max_x - min_x + 1,
            max_y - min_y + 1,
        )
        .to_image();

        Some(Self {
            image,
            anchor_x: center as i64 - min_x as i64,
            anchor_y: center as i64 - min_y as i64,
        })
    }
}

fn diagonal(width: u32, height: u32) -> u32 {
    ((width as f64).powi(2) + (height as f64).powi(2)).sqrt().ceil() as u32
}

fn visible_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }
    bounds
}

/// Builds a transparent overlay with the stamp drawn at every visible tile.
pub fn draw_overlay(width: u32, height: u32, stamp: &Stamp, tiles: &[TilePlacement]) -> RgbaImage {
    let mut overlay = RgbaImage::new(width, height);
    let (stamp_w, stamp_h) = stamp.image.dimensions();

    for tile in tiles.iter().filter(|t| t.opacity > 0.0) {
        let left = tile.x as i64 - stamp.anchor_x;
        let top = tile.y as i64 - stamp.anchor_y;

        for sy in 0..stamp_h {
            let ty = top + sy as i64;
            if ty < 0 || ty >= height as i64 {
                continue;
            }
            for sx in 0..stamp_w {
                let tx = left + sx as i64;
                if tx < 0 || tx >= width as i64 {
                    continue;
                }
                let source = stamp.image.get_pixel(sx, sy);
                if source[3] == 0 {
                    continue;
                }
                let alpha = source[3] as f32 / 255.0 * tile.opacity;
                let target = overlay.get_pixel_mut(tx as u32, ty as u32);
                *target = blend_over(*target, *source, alpha);
            }
        }
    }

    overlay
}

/// Straight-alpha "over": `source` with coverage `alpha` on top of `dest`.
fn blend_over(dest: Rgba<u8>, source: Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let dest_alpha = dest[3] as f32 / 255.0;
    let out_alpha = alpha + dest_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| {
        let value =
            (source[i] as f32 * alpha + dest[i] as f32 * dest_alpha * (1.0 - alpha)) / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Composites `overlay` over `base`, leaving the base alpha channel as it was.
pub fn composite_over(base: &mut RgbaImage, overlay: &RgbaImage) {
    for (base_pixel, over_pixel) in base.pixels_mut().zip(overlay.pixels()) {
        let alpha = over_pixel[3] as f32 / 255.0;
        if alpha <= 0.0 {
            continue;
        }
        for i in 0..3 {
            let value = over_pixel[i] as f32 * alpha + base_pixel[i] as f32 * (1.0 - alpha);
            base_pixel[i] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
}

pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    // JPEG doesn't support alpha channel, so convert to RGB
    let rgb_image = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}

#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub scaled: ScaledStyle,
}

/// Decodes source bytes, draws the tiled watermark and re-encodes as JPEG.
#[derive(Clone)]
pub struct WatermarkRenderer {
    glyphs: Arc<dyn GlyphSource>,
    jpeg_quality: u8,
}

impl WatermarkRenderer {
    pub fn new(glyphs: Arc<dyn GlyphSource>, jpeg_quality: u8) -> Self {
        Self {
            glyphs,
            jpeg_quality,
        }
    }

    pub fn render(&self, source: &[u8], style: &WatermarkStyle) -> Result<RenderedImage, RenderError> {
        let decoded = image::load_from_memory(source)?;
        let mut canvas = decoded.to_rgba8();
        let (width, height) = canvas.dimensions();

        let scaled = self.apply(&mut canvas, style)?;
        let bytes = encode_jpeg(&canvas, self.jpeg_quality)?;

        Ok(RenderedImage {
            bytes,
            width,
            height,
            scaled,
        })
    }

    /// Draws the watermark in place.
    pub fn apply(&self, canvas: &mut RgbaImage, style: &WatermarkStyle) -> Result<ScaledStyle, RenderError> {
        let (width, height) = canvas.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }

        let scaled = style.scaled_for(width, height);
        let color = style.color()?;

        let Some(mask) = self.glyphs.rasterize(&style.text, scaled.font_size as f32) else {
            debug!(
                "Watermark text not visible at {}px for {}x{} image",
                scaled.font_size, width, height
            );
            return Ok(scaled);
        };
        let Some(stamp) = Stamp::new(&mask, color, style.angle_degrees, width, height) else {
            return Ok(scaled);
        };

        let tiles = layout_tiles(width, height, &scaled, style.max_opacity);
        debug!(
            "Rendering {} tiles ({}px font, {}x{} spacing, {}px cutoff) on {}x{} image",
            tiles.len(),
            scaled.font_size,
            scaled.spacing_x,
            scaled.spacing_y,
            scaled.cutoff_radius,
            width,
            height
        );

        let overlay = draw_overlay(width, height, &stamp, &tiles);
        composite_over(canvas, &overlay);
        Ok(scaled)
    }
}
