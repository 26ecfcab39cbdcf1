use axum::Router;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod batch;
pub mod shopify;
pub mod startup_checks;
pub mod watermark;

use batch::{BatchDriver, CatalogPaginator, MediaReplacer};
use shopify::{AdminClient, DynMediaPlatform, PlatformError};
use watermark::{FontError, FontGlyphs, GlyphSource, WatermarkRenderer};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub shop: ShopConfig,
    pub watermark: WatermarkConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShopConfig {
    /// e.g. `my-store.myshopify.com`
    pub domain: String,
    pub access_token: String,
    pub api_version: String,
    /// Full GraphQL endpoint, replacing the one derived from `domain`.
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub font_path: PathBuf,
    pub jpeg_quality: u8,
    /// Substring identifying images this service already produced.
    pub marker: String,
    pub page_size: u32,
    pub media_per_product: u32,
    pub collections_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            access_token: String::new(),
            api_version: "2024-10".to_string(),
            endpoint: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("static/DejaVuSans.ttf"),
            jpeg_quality: 85,
            marker: "watermarked".to_string(),
            page_size: 1,
            media_per_product: 10,
            collections_limit: 50,
        }
    }
}

impl ShopConfig {
    pub fn graphql_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "https://{}/admin/api/{}/graphql.json",
                self.domain.trim_end_matches('/'),
                self.api_version
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml_edit::de::Error),
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml_edit::de::from_str::<Config>(&content)?)
    }
}

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("Failed to load watermark font: {0}")]
    Font(#[from] FontError),

    #[error("Failed to create platform client: {0}")]
    Platform(#[from] PlatformError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub platform: DynMediaPlatform,
    pub driver: Arc<BatchDriver>,
}

impl AppState {
    /// Wires the batch pipeline around an existing platform and glyph source.
    pub fn new(config: Config, platform: DynMediaPlatform, glyphs: Arc<dyn GlyphSource>) -> Self {
        let renderer = WatermarkRenderer::new(glyphs, config.watermark.jpeg_quality);
        let paginator = CatalogPaginator::new(platform.clone(), config.watermark.page_size);
        let replacer = MediaReplacer::new(platform.clone(), renderer, config.watermark.marker.clone());
        let driver = Arc::new(BatchDriver::new(paginator, replacer));
        tracing::info!(
            "Batch pipeline ready on {} ({} product(s) per step)",
            platform.name(),
            config.watermark.page_size
        );

        Self {
            config,
            platform,
            driver,
        }
    }

    pub fn from_config(config: Config) -> Result<Self, AppInitError> {
        let glyphs = FontGlyphs::from_file(&config.watermark.font_path)?;
        let client = AdminClient::new(&config.shop, config.watermark.media_per_product)?;
        Ok(Self::new(config, Arc::new(client), Arc::new(glyphs)))
    }
}

pub fn create_app(config: Config) -> Result<Router, AppInitError> {
    Ok(create_app_with(AppState::from_config(config)?))
}

pub fn create_app_with(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/api/watermark",
            axum::routing::get(api::watermark_step_handler),
        )
        .route(
            "/api/collections",
            axum::routing::get(api::collections_handler),
        )
        .route(
            "/api/products/watermark",
            axum::routing::post(api::apply_product_handler),
        )
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &axum::http::Request<_>| {
                        let matched_path = request
                            .extensions()
                            .get::<axum::extract::MatchedPath>()
                            .map(|matched_path| matched_path.as_str());

                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            matched_path,
                        )
                    })
                    .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                        let user_agent = request
                            .headers()
                            .get("user-agent")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            method = %request.method(),
                            path = %request.uri().path(),
                            query = ?request.uri().query(),
                            user_agent = %user_agent,
                            "request"
                        );
                    })
                    .on_response(
                        |response: &axum::http::Response<_>,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::info!(
                                target: "access_log",
                                status = %response.status(),
                                latency_ms = %latency.as_millis(),
                                "response"
                            );
                        },
                    ),
            ),
        )
        .with_state(app_state)
}
