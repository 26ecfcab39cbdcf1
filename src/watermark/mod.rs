// Watermark module - tiled text overlay with radial fade
mod error;
mod glyphs;
mod render;
mod style;

pub use error::{FontError, RenderError, StyleError};
pub use glyphs::{FontGlyphs, GlyphMask, GlyphSource};
pub use render::{
    RenderedImage, Stamp, TilePlacement, WatermarkRenderer, composite_over, draw_overlay,
    encode_jpeg, layout_tiles, tile_opacity,
};
pub use style::{REFERENCE_HEIGHT, REFERENCE_WIDTH, ScaledStyle, WatermarkStyle, parse_hex_color};
