use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::graphql::{self, decode_envelope};
use super::{
    Collection, CreateMediaRequest, MediaPlatform, PageRequest, PlatformError, Product,
    ProductPage, StagedTarget, StagedUploadRequest,
};
use crate::ShopConfig;

const ERROR_BODY_LIMIT: usize = 500;

/// Admin GraphQL API client. Created once at startup and shared.
pub struct AdminClient {
    http: Client,
    endpoint: String,
    access_token: String,
    media_per_product: u32,
}

impl AdminClient {
    pub fn new(config: &ShopConfig, media_per_product: u32) -> Result<Self, PlatformError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.graphql_endpoint(),
            access_token: config.access_token.clone(),
            media_per_product,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, PlatformError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            warn!("GraphQL request failed with status {}", status);
            return Err(PlatformError::Status {
                status: status.as_u16(),
                body: truncated(&body),
            });
        }

        decode_envelope(&body)
    }
}

fn truncated(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(ERROR_BODY_LIMIT)
        .collect()
}

#[async_trait]
impl MediaPlatform for AdminClient {
    async fn fetch_products(&self, request: &PageRequest) -> Result<ProductPage, PlatformError> {
        let mut variables = json!({
            "cursor": request.cursor,
            "batchSize": request.page_size,
            "mediaCount": self.media_per_product,
        });

        match &request.collection_id {
            Some(collection_id) => {
                variables["collectionId"] = json!(collection_id);
                let query = graphql::with_product_fragment(graphql::COLLECTION_PRODUCTS_QUERY);
                let data: graphql::CollectionProductsData = self.graphql(&query, variables).await?;
                let collection = data
                    .collection
                    .ok_or_else(|| PlatformError::NotFound(format!("collection {}", collection_id)))?;
                Ok(collection.products.into())
            }
            None => {
                let query = graphql::with_product_fragment(graphql::PRODUCTS_QUERY);
                let data: graphql::ProductsData = self.graphql(&query, variables).await?;
                Ok(data.products.into())
            }
        }
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, PlatformError> {
        let query = graphql::with_product_fragment(graphql::PRODUCT_QUERY);
        let data: graphql::ProductData = self
            .graphql(
                &query,
                json!({ "productId": product_id, "mediaCount": self.media_per_product }),
            )
            .await?;
        Ok(data.product.map(Product::from))
    }

    async fn list_collections(&self, first: u32) -> Result<Vec<Collection>, PlatformError> {
        let data: graphql::CollectionsData = self
            .graphql(graphql::COLLECTIONS_QUERY, json!({ "first": first }))
            .await?;
        Ok(data
            .collections
            .edges
            .into_iter()
            .map(|edge| edge.node)
            .collect())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, PlatformError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::Status {
                status: status.as_u16(),
                body: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }
        let bytes = response.bytes().await?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    async fn create_staged_upload(
        &self,
        request: &StagedUploadRequest,
    ) -> Result<StagedTarget, PlatformError> {
        let data: graphql::StagedUploadsData = self
            .graphql(graphql::STAGED_UPLOADS_MUTATION, json!({ "input": [request] }))
            .await?;

        let payload = data.staged_uploads_create.ok_or_else(|| {
            PlatformError::Decode("stagedUploadsCreate returned no payload".to_string())
        })?;
        graphql::check_user_errors(payload.user_errors)?;

        payload
            .staged_targets
            .into_iter()
            .next()
            .map(StagedTarget::from)
            .ok_or_else(|| PlatformError::Decode("no staged upload target returned".to_string()))
    }

    async fn upload_staged(
        &self,
        target: &StagedTarget,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PlatformError> {
        let mut form = Form::new();
        for parameter in &target.parameters {
            form = form.text(parameter.name.clone(), parameter.value.clone());
        }
        let file = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        form = form.part("file", file);

        let response = self
            .http
            .post(&target.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(PlatformError::Status {
                status: status.as_u16(),
                body: truncated(&body),
            });
        }
        Ok(())
    }

    async fn create_media(
        &self,
        product_id: &str,
        media: &CreateMediaRequest,
    ) -> Result<String, PlatformError> {
        let data: graphql::CreateMediaData = self
            .graphql(
                graphql::CREATE_MEDIA_MUTATION,
                json!({ "productId": product_id, "media": [media] }),
            )
            .await?;

        let payload = data.product_create_media.ok_or_else(|| {
            PlatformError::Decode("productCreateMedia returned no payload".to_string())
        })?;
        graphql::check_user_errors(payload.user_errors)?;

        payload
            .media
            .into_iter()
            .find_map(|node| node.id)
            .ok_or_else(|| PlatformError::Decode("no media id returned".to_string()))
    }

    async fn delete_media(
        &self,
        product_id: &str,
        media_ids: &[String],
    ) -> Result<Vec<String>, PlatformError> {
        let data: graphql::DeleteMediaData = self
            .graphql(
                graphql::DELETE_MEDIA_MUTATION,
                json!({ "productId": product_id, "mediaIds": media_ids }),
            )
            .await?;

        let payload = data.product_delete_media.ok_or_else(|| {
            PlatformError::Decode("productDeleteMedia returned no payload".to_string())
        })?;
        graphql::check_user_errors(payload.media_user_errors)?;

        Ok(payload.deleted_media_ids.unwrap_or_default())
    }

    fn name(&self) -> &str {
        "Shopify Admin GraphQL"
    }
}
