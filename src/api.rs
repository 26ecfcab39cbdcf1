use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::batch::{BatchError, BatchRequest, BatchResponse, ProductError, ProductReport};
use crate::shopify::Collection;
use crate::watermark::WatermarkStyle;

#[derive(Serialize)]
pub struct CollectionsResponse {
    collections: Vec<Collection>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    success: bool,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyWatermarkRequest {
    pub product_id: String,
    #[serde(flatten)]
    pub style: WatermarkStyle,
}

#[derive(Serialize)]
pub struct ApplyWatermarkResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ProductReport>,
}

fn error_json(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message,
        }),
    )
        .into_response()
}

/// Runs one page of the batch. Batch failures still answer 200 so a poller
/// can read `status`; only malformed parameters are a 400.
pub async fn watermark_step_handler(
    State(app_state): State<crate::AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.as_deref().unwrap_or_default();
    let request = match BatchRequest::from_query(query) {
        Ok(request) => request,
        Err(e) => {
            let e = BatchError::from(e);
            tracing::warn!("Rejected batch request: {}", e);
            let processed_count = BatchRequest::processed_count_from_query(query);
            return (
                StatusCode::BAD_REQUEST,
                Json(BatchResponse::error(e.to_string(), processed_count)),
            )
                .into_response();
        }
    };

    Json(app_state.driver.step(&request).await).into_response()
}

pub async fn collections_handler(State(app_state): State<crate::AppState>) -> Response {
    let limit = app_state.config.watermark.collections_limit;
    match app_state.platform.list_collections(limit).await {
        Ok(collections) => {
            tracing::debug!("Listed {} collections", collections.len());
            Json(CollectionsResponse { collections }).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list collections: {}", e);
            error_json(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

pub async fn apply_product_handler(
    State(app_state): State<crate::AppState>,
    Json(payload): Json<ApplyWatermarkRequest>,
) -> Response {
    if let Err(e) = payload.style.validate() {
        return error_json(StatusCode::BAD_REQUEST, BatchError::from(e).to_string());
    }

    let product = match app_state.platform.fetch_product(&payload.product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            let e = ProductError::NotFound(payload.product_id);
            return error_json(StatusCode::NOT_FOUND, e.to_string());
        }
        Err(e) => {
            tracing::error!("Failed to fetch product {}: {}", payload.product_id, e);
            return error_json(StatusCode::BAD_GATEWAY, e.to_string());
        }
    };

    match app_state.driver.replacer().replace(&product, &payload.style).await {
        Ok(report) => {
            tracing::info!(
                "Watermarked {} image(s) on {} ({} skipped)",
                report.uploaded,
                product.id,
                report.skipped
            );
            Json(ApplyWatermarkResponse {
                success: true,
                message: format!("Watermarked {} image(s)", report.uploaded),
                report: Some(report),
            })
            .into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to watermark product {}: {}", product.id, e);
            Json(ApplyWatermarkResponse {
                success: false,
                message: e.to_string(),
                report: None,
            })
            .into_response()
        }
    }
}
