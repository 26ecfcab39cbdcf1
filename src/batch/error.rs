use serde::Serialize;
use thiserror::Error;

use crate::shopify::PlatformError;
use crate::watermark::StyleError;

/// The catalog page could not be fetched or understood.
#[derive(Debug, Error)]
#[error("Catalog query failed: {0}")]
pub struct QueryError(#[from] pub PlatformError);

/// One step of the staged upload sequence failed.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("staged upload target request failed: {0}")]
    StagedTarget(PlatformError),

    #[error("upload to staged target failed: {0}")]
    Post(PlatformError),

    #[error("media association failed: {0}")]
    CreateMedia(PlatformError),
}

/// Superseded media could not be removed. Logged, never escalated.
#[derive(Debug, Error)]
#[error("Failed to delete superseded media: {0}")]
pub struct DeleteError(#[from] pub PlatformError);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFailure {
    pub index: usize,
    pub media_id: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Failed to watermark {} of {total} images: {}", .failures.len(), describe_failures(.failures))]
    Render {
        total: usize,
        failures: Vec<ImageFailure>,
    },

    #[error(
        "Failed to upload watermarked image {index} ({completed} already uploaded, originals kept): {source}"
    )]
    Upload {
        index: usize,
        completed: usize,
        source: UploadError,
    },

    #[error("Product not found: {0}")]
    NotFound(String),
}

impl ProductError {
    pub fn image_failures(&self) -> &[ImageFailure] {
        match self {
            ProductError::Render { failures, .. } => failures,
            _ => &[],
        }
    }
}

fn describe_failures(failures: &[ImageFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("image {}: {}", f.index, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures that stop a batch step before any product is touched.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Invalid watermark parameters: {0}")]
    Style(#[from] StyleError),

    #[error("Catalog reported more products after cursor {0:?} but returned no end cursor")]
    MissingCursor(Option<String>),
}
