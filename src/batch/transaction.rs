use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{DeleteError, ImageFailure, ProductError, UploadError};
use crate::shopify::{
    CreateMediaRequest, DynMediaPlatform, Product, ProductMediaRef, StagedUploadRequest,
};
use crate::watermark::{RenderError, WatermarkRenderer, WatermarkStyle};

const UPLOAD_MIME_TYPE: &str = "image/jpeg";

/// Result of processing one image, stored in a slot indexed by position.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Success(Vec<u8>),
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReport {
    pub product_id: String,
    pub title: String,
    pub uploaded: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub new_media_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_warning: Option<String>,
}

impl ProductReport {
    fn empty(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            title: product.title.clone(),
            uploaded: 0,
            skipped: 0,
            deleted: 0,
            new_media_ids: Vec::new(),
            delete_warning: None,
        }
    }
}

/// Replaces a product's images with watermarked copies.
///
/// Uploads always complete before anything is deleted, so an interrupted run
/// leaves extra media behind rather than a product with no images.
#[derive(Clone)]
pub struct MediaReplacer {
    platform: DynMediaPlatform,
    renderer: WatermarkRenderer,
    marker: String,
}

impl MediaReplacer {
    pub fn new(platform: DynMediaPlatform, renderer: WatermarkRenderer, marker: impl Into<String>) -> Self {
        Self {
            platform,
            renderer,
            marker: marker.into(),
        }
    }

    pub fn is_marked(&self, url: &str) -> bool {
        !self.marker.is_empty() && url.contains(&self.marker)
    }

    pub async fn process_image(&self, image: &ProductMediaRef, style: &WatermarkStyle) -> ImageOutcome {
        if self.is_marked(&image.image_url) {
            debug!("Skipping {} as it appears already watermarked", image.media_id);
            return ImageOutcome::Skipped(format!("image URL contains '{}'", self.marker));
        }

        let bytes = match self.platform.fetch_image(&image.image_url).await {
            Ok(bytes) => bytes,
            Err(e) => return ImageOutcome::Failed(RenderError::Fetch(e.to_string()).to_string()),
        };

        let renderer = self.renderer.clone();
        let style = style.clone();
        match tokio::task::spawn_blocking(move || renderer.render(&bytes, &style)).await {
            Ok(Ok(rendered)) => {
                debug!(
                    "Watermarked {} ({}x{}, {} bytes)",
                    image.media_id,
                    rendered.width,
                    rendered.height,
                    rendered.bytes.len()
                );
                ImageOutcome::Success(rendered.bytes)
            }
            Ok(Err(e)) => ImageOutcome::Failed(e.to_string()),
            Err(e) => ImageOutcome::Failed(RenderError::Task(e.to_string()).to_string()),
        }
    }

    pub async fn replace(&self, product: &Product, style: &WatermarkStyle) -> Result<ProductReport, ProductError> {
        let images = product.image_refs();
        let mut report = ProductReport::empty(product);

        if images.is_empty() {
            info!("No images found for product {} ({})", product.title, product.id);
            return Ok(report);
        }

        // Every image is rendered before any upload decision is made
        let outcomes = join_all(images.iter().map(|image| self.process_image(image, style))).await;

        let failures: Vec<ImageFailure> = images
            .iter()
            .zip(&outcomes)
            .enumerate()
            .filter_map(|(index, (image, outcome))| match outcome {
                ImageOutcome::Failed(reason) => Some(ImageFailure {
                    index,
                    media_id: image.media_id.clone(),
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect();

        if !failures.is_empty() {
            for failure in &failures {
                warn!("Failed to watermark image {}: {}", failure.index, failure.reason);
            }
            return Err(ProductError::Render {
                total: images.len(),
                failures,
            });
        }

        let mut superseded = Vec::new();
        let mut rendered = Vec::new();
        for (index, (image, outcome)) in images.iter().zip(outcomes).enumerate() {
            match outcome {
                ImageOutcome::Success(bytes) => {
                    superseded.push(image.media_id.clone());
                    rendered.push((index, bytes));
                }
                ImageOutcome::Skipped(_) => report.skipped += 1,
                ImageOutcome::Failed(_) => {}
            }
        }

        for (position, (index, bytes)) in rendered.into_iter().enumerate() {
            let media_id = self
                .upload_image(product, position, bytes)
                .await
                .map_err(|source| {
                    error!(
                        "Failed to upload watermarked image {} for {}: {}",
                        index, product.id, source
                    );
                    ProductError::Upload {
                        index,
                        completed: report.new_media_ids.len(),
                        source,
                    }
                })?;
            info!("Uploaded watermarked image {} for {}", index, product.title);
            report.new_media_ids.push(media_id);
        }
        report.uploaded = report.new_media_ids.len();

        if !superseded.is_empty() && report.uploaded > 0 {
            match self.platform.delete_media(&product.id, &superseded).await {
                Ok(deleted) => {
                    info!("Deleted {} old media items", deleted.len());
                    report.deleted = deleted.len();
                }
                Err(e) => {
                    let warning = DeleteError(e);
                    error!("Product {}: {}", product.id, warning);
                    report.delete_warning = Some(warning.to_string());
                }
            }
        }

        Ok(report)
    }

    async fn upload_image(
        &self,
        product: &Product,
        position: usize,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let filename = upload_filename(&self.marker, &product.id, position);
        let request = StagedUploadRequest::image(&filename, UPLOAD_MIME_TYPE, bytes.len());

        let target = self
            .platform
            .create_staged_upload(&request)
            .await
            .map_err(UploadError::StagedTarget)?;

        self.platform
            .upload_staged(&target, &filename, UPLOAD_MIME_TYPE, bytes)
            .await
            .map_err(UploadError::Post)?;

        let media = CreateMediaRequest::image(
            target.resource_url.clone(),
            format!("{} - Watermarked", product.title),
        );
        self.platform
            .create_media(&product.id, &media)
            .await
            .map_err(UploadError::CreateMedia)
    }
}

/// The filename carries the dedup marker so replaced images are skipped later.
pub fn upload_filename(marker: &str, product_id: &str, position: usize) -> String {
    format!("{}_{}_{}.jpg", marker, product_id.replace('/', "_"), position)
}
