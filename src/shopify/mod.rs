// Shopify module - the commerce platform seen through one trait
mod client;
mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod graphql;
mod types;

pub use client::AdminClient;
pub use error::{ExternalApiError, PlatformError};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Everything the batch pipeline needs from the remote platform.
///
/// `AdminClient` talks to the Admin GraphQL API; tests substitute in-memory
/// fakes.
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    async fn fetch_products(&self, request: &PageRequest) -> Result<ProductPage, PlatformError>;

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, PlatformError>;

    async fn list_collections(&self, first: u32) -> Result<Vec<Collection>, PlatformError>;

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, PlatformError>;

    async fn create_staged_upload(
        &self,
        request: &StagedUploadRequest,
    ) -> Result<StagedTarget, PlatformError>;

    /// Multipart POST of `bytes` to a staged target.
    async fn upload_staged(
        &self,
        target: &StagedTarget,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PlatformError>;

    /// Returns the id of the created media.
    async fn create_media(
        &self,
        product_id: &str,
        media: &CreateMediaRequest,
    ) -> Result<String, PlatformError>;

    /// Returns the ids the platform reports as deleted.
    async fn delete_media(
        &self,
        product_id: &str,
        media_ids: &[String],
    ) -> Result<Vec<String>, PlatformError>;

    fn name(&self) -> &str;
}

pub type DynMediaPlatform = Arc<dyn MediaPlatform>;
