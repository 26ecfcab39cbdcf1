use crate::Config;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Watermark font not found: {0}")]
    FontMissing(String),

    #[error("Shop domain is not configured")]
    ShopDomainMissing,

    #[error("Shop access token is not configured")]
    AccessTokenMissing,

    #[error("JPEG quality must be between 1 and 100, got {0}")]
    InvalidJpegQuality(u8),

    #[error("Watermark marker is empty; already watermarked images cannot be detected")]
    MarkerEmpty,
}

impl StartupCheckError {
    /// Checks that leave the service unable to do any useful work.
    pub fn is_critical(&self) -> bool {
        !matches!(self, StartupCheckError::MarkerEmpty)
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let font_path = &config.watermark.font_path;
    if tokio::fs::metadata(font_path).await.is_ok() {
        info!("Watermark font found: {:?}", font_path);
    } else {
        error!("Watermark font missing: {:?}", font_path);
        errors.push(StartupCheckError::FontMissing(
            font_path.display().to_string(),
        ));
    }

    // An explicit endpoint stands in for the domain
    if config.shop.domain.trim().is_empty() && config.shop.endpoint.is_none() {
        error!("No shop domain configured");
        errors.push(StartupCheckError::ShopDomainMissing);
    } else {
        info!("GraphQL endpoint: {}", config.shop.graphql_endpoint());
    }

    if config.shop.access_token.trim().is_empty() {
        error!("No shop access token configured");
        errors.push(StartupCheckError::AccessTokenMissing);
    }

    let quality = config.watermark.jpeg_quality;
    if !(1..=100).contains(&quality) {
        errors.push(StartupCheckError::InvalidJpegQuality(quality));
    }

    if config.watermark.marker.is_empty() {
        warn!("Watermark marker is empty, reruns will watermark images twice");
        errors.push(StartupCheckError::MarkerEmpty);
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
