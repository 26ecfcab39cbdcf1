use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Render task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Style(#[from] StyleError),
}

#[derive(Debug, Error, PartialEq)]
pub enum StyleError {
    #[error("Watermark text must not be empty")]
    EmptyText,

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Opacity must be between 0 and 1, got {0}")]
    InvalidOpacity(f32),

    #[error("Font size must be greater than zero")]
    InvalidFontSize,

    #[error("Invalid value for '{name}': {value}")]
    InvalidParameter { name: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum FontError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse font file")]
    InvalidFont,
}
