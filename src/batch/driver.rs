use serde::Serialize;
use tracing::{error, info, warn};
use url::form_urlencoded;

use super::{BatchError, CatalogPaginator, ImageFailure, MediaReplacer, ProductReport};
use crate::watermark::WatermarkStyle;

pub const DEFAULT_STEP_PATH: &str = "/api/watermark";

/// One invocation of the batch endpoint: where to resume and what to draw.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchRequest {
    pub cursor: Option<String>,
    pub processed_count: u64,
    pub collection_ids: Vec<String>,
    pub style: WatermarkStyle,
}

impl BatchRequest {
    /// Query string resuming after `cursor` with `processed_count` products done.
    pub fn to_query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(cursor) = &self.cursor {
            query.append_pair("cursor", cursor);
        }
        query.append_pair("processedCount", &self.processed_count.to_string());
        for id in &self.collection_ids {
            query.append_pair("collectionIds", id);
        }
        query
            .append_pair("text", &self.style.text)
            .append_pair("angle", &self.style.angle_degrees.to_string())
            .append_pair("color", &self.style.color_hex)
            .append_pair("opacity", &self.style.max_opacity.to_string())
            .append_pair("cutoff", &self.style.cutoff_radius_px.to_string())
            .append_pair("fontSize", &self.style.base_font_size_px.to_string());
        query.finish()
    }

    pub fn next_url(&self, path: &str, cursor: Option<String>, processed_count: u64) -> String {
        let next = BatchRequest {
            cursor,
            processed_count,
            collection_ids: self.collection_ids.clone(),
            style: self.style.clone(),
        };
        format!("{}?{}", path, next.to_query_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFailure {
    pub product_id: String,
    pub title: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub status: BatchStatus,
    pub message: String,
    pub processed_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_next_page: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProductFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductReport>,
}

impl BatchResponse {
    pub fn error(message: impl Into<String>, processed_count: u64) -> Self {
        Self {
            status: BatchStatus::Error,
            message: message.into(),
            processed_count,
            next: None,
            has_next_page: None,
            failures: Vec::new(),
            products: Vec::new(),
        }
    }

    fn completed(processed_count: u64) -> Self {
        Self {
            status: BatchStatus::Completed,
            message: format!("Finished processing {processed_count} products"),
            ..Self::error(String::new(), processed_count)
        }
    }
}

/// Processes the catalog one page per call, resuming from a cursor.
#[derive(Clone)]
pub struct BatchDriver {
    paginator: CatalogPaginator,
    replacer: MediaReplacer,
}

impl BatchDriver {
    pub fn new(paginator: CatalogPaginator, replacer: MediaReplacer) -> Self {
        Self {
            paginator,
            replacer,
        }
    }

    pub fn replacer(&self) -> &MediaReplacer {
        &self.replacer
    }

    pub async fn step(&self, request: &BatchRequest) -> BatchResponse {
        let page = match self
            .paginator
            .fetch_page(request.cursor.as_deref(), &request.collection_ids)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                let e = BatchError::from(e);
                error!("Batch step failed at cursor {:?}: {}", request.cursor, e);
                return BatchResponse::error(e.to_string(), request.processed_count);
            }
        };

        if page.products.is_empty() {
            info!(
                "No more products, batch finished with {} processed",
                request.processed_count
            );
            return BatchResponse::completed(request.processed_count);
        }

        let mut processed_count = request.processed_count;
        let mut failures = Vec::new();
        let mut reports = Vec::new();

        for product in &page.products {
            info!("Processing product {} ({})", product.title, product.id);
            match self.replacer.replace(product, &request.style).await {
                Ok(report) => {
                    processed_count += 1;
                    reports.push(report);
                }
                Err(e) => {
                    warn!("Failed to process product {}: {}", product.id, e);
                    failures.push(ProductFailure {
                        product_id: product.id.clone(),
                        title: product.title.clone(),
                        reason: e.to_string(),
                        images: e.image_failures().to_vec(),
                    });
                }
            }
        }

        let has_next_page = page.has_next_page;
        // Failed pages still carry `next`, so a poller may skip past them
        let next = match (has_next_page, page.end_cursor.clone()) {
            (false, _) => Ok(None),
            (true, Some(cursor)) => Ok(Some(request.next_url(
                DEFAULT_STEP_PATH,
                Some(cursor),
                processed_count,
            ))),
            (true, None) => Err(BatchError::MissingCursor(request.cursor.clone())),
        };

        let (status, message, next) = match next {
            Err(e) => {
                error!("{}", e);
                (
                    BatchStatus::Error,
                    format!("{e}; processed {processed_count} products so far"),
                    None,
                )
            }
            Ok(next) if !failures.is_empty() => (
                BatchStatus::Error,
                format!(
                    "{} of {} products in this page failed; processed {} products so far",
                    failures.len(),
                    page.products.len(),
                    processed_count
                ),
                next,
            ),
            Ok(next) if has_next_page => (
                BatchStatus::InProgress,
                format!("Processed {processed_count} products so far"),
                next,
            ),
            Ok(next) => (
                BatchStatus::Completed,
                format!("Finished processing {processed_count} products"),
                next,
            ),
        };

        info!("{}", message);
        BatchResponse {
            status,
            message,
            processed_count,
            next,
            has_next_page: Some(has_next_page),
            failures,
            products: reports,
        }
    }
}
