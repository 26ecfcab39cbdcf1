//! Admin GraphQL documents and the response shapes they decode into.
//!
//! Everything leaving this module is already normalized: GraphQL `errors`,
//! `userErrors` and `mediaUserErrors` all become [`ExternalApiError`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Collection, ExternalApiError, PlatformError, Product, ProductMedia, ProductPage, StagedTarget};

pub const PRODUCTS_QUERY: &str = r#"
query GetProducts($cursor: String, $batchSize: Int!, $mediaCount: Int!) {
  products(first: $batchSize, after: $cursor) {
    edges {
      cursor
      node { ...ProductMediaFields }
    }
    pageInfo { hasNextPage endCursor }
  }
}
"#;

pub const COLLECTION_PRODUCTS_QUERY: &str = r#"
query ProductsByCollection($cursor: String, $batchSize: Int!, $mediaCount: Int!, $collectionId: ID!) {
  collection(id: $collectionId) {
    id
    title
    products(first: $batchSize, after: $cursor) {
      edges {
        cursor
        node { ...ProductMediaFields }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#;

pub const PRODUCT_QUERY: &str = r#"
query GetProduct($productId: ID!, $mediaCount: Int!) {
  product(id: $productId) { ...ProductMediaFields }
}
"#;

pub const PRODUCT_MEDIA_FRAGMENT: &str = r#"
fragment ProductMediaFields on Product {
  id
  title
  media(first: $mediaCount) {
    edges {
      node {
        ... on MediaImage {
          id
          image { url }
        }
      }
    }
  }
}
"#;

pub const COLLECTIONS_QUERY: &str = r#"
query GetCollections($first: Int!) {
  collections(first: $first) {
    edges { node { id title } }
  }
}
"#;

pub const STAGED_UPLOADS_MUTATION: &str = r#"
mutation generateStagedUploads($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}
"#;

pub const CREATE_MEDIA_MUTATION: &str = r#"
mutation productCreateMedia($productId: ID!, $media: [CreateMediaInput!]!) {
  productCreateMedia(productId: $productId, media: $media) {
    media {
      ... on MediaImage { id }
    }
    userErrors { field message }
  }
}
"#;

pub const DELETE_MEDIA_MUTATION: &str = r#"
mutation productDeleteMedia($productId: ID!, $mediaIds: [ID!]!) {
  productDeleteMedia(productId: $productId, mediaIds: $mediaIds) {
    deletedMediaIds
    mediaUserErrors { field message }
  }
}
"#;

/// Appends the shared product fragment to a query that spreads it.
pub fn with_product_fragment(query: &str) -> String {
    format!("{}\n{}", query.trim(), PRODUCT_MEDIA_FRAGMENT.trim())
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Value>,
    #[serde(default)]
    pub path: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl From<GraphqlError> for ExternalApiError {
    fn from(error: GraphqlError) -> Self {
        let code = error
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(|code| code.as_str())
            .unwrap_or("GRAPHQL_ERROR");
        let mut normalized = ExternalApiError::new(code, error.message);
        if let Some(path) = error.path.filter(|p| !p.is_empty()) {
            let joined = path
                .iter()
                .map(|segment| match segment {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(".");
            normalized = normalized.with_field(joined);
        }
        normalized
    }
}

impl From<UserError> for ExternalApiError {
    fn from(error: UserError) -> Self {
        let code = error.code.unwrap_or_else(|| "USER_ERROR".to_string());
        let mut normalized = ExternalApiError::new(code, error.message);
        if let Some(field) = error.field.filter(|f| !f.is_empty()) {
            normalized = normalized.with_field(field.join("."));
        }
        normalized
    }
}

/// Decodes a GraphQL response body, failing on any top-level error.
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, PlatformError> {
    let envelope: Envelope<T> =
        serde_json::from_slice(body).map_err(|e| PlatformError::Decode(e.to_string()))?;

    if !envelope.errors.is_empty() {
        return Err(PlatformError::Api(
            envelope.errors.into_iter().map(ExternalApiError::from).collect(),
        ));
    }

    envelope
        .data
        .ok_or_else(|| PlatformError::Decode("response contained no data".to_string()))
}

pub fn check_user_errors(errors: Vec<UserError>) -> Result<(), PlatformError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PlatformError::Api(
            errors.into_iter().map(ExternalApiError::from).collect(),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConnection {
    pub edges: Vec<ProductEdge>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct ProductEdge {
    pub node: ProductNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductNode {
    pub id: String,
    pub title: String,
    pub media: MediaConnection,
}

#[derive(Debug, Deserialize)]
pub struct MediaConnection {
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Deserialize)]
pub struct MediaEdge {
    pub node: MediaNode,
}

/// Non-image media match no fragment and arrive as `{}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MediaNode {
    pub id: Option<String>,
    pub image: Option<ImageNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageNode {
    pub url: Option<String>,
}

impl From<ProductNode> for Product {
    fn from(node: ProductNode) -> Self {
        let media = node
            .media
            .edges
            .into_iter()
            .filter_map(|edge| {
                let id = edge.node.id?;
                Some(ProductMedia {
                    id,
                    image_url: edge.node.image.and_then(|image| image.url),
                })
            })
            .collect();

        Product {
            id: node.id,
            title: node.title,
            media,
        }
    }
}

impl From<ProductConnection> for ProductPage {
    fn from(connection: ProductConnection) -> Self {
        ProductPage {
            products: connection
                .edges
                .into_iter()
                .map(|edge| Product::from(edge.node))
                .collect(),
            end_cursor: connection.page_info.end_cursor,
            has_next_page: connection.page_info.has_next_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: ProductConnection,
}

#[derive(Debug, Deserialize)]
pub struct CollectionProductsData {
    pub collection: Option<CollectionProducts>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionProducts {
    pub products: ProductConnection,
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionsData {
    pub collections: CollectionConnection,
}

#[derive(Debug, Deserialize)]
pub struct CollectionConnection {
    pub edges: Vec<CollectionEdge>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionEdge {
    pub node: Collection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadsData {
    pub staged_uploads_create: Option<StagedUploadsPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadsPayload {
    #[serde(default)]
    pub staged_targets: Vec<StagedTargetNode>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedTargetNode {
    pub url: String,
    pub resource_url: String,
    #[serde(default)]
    pub parameters: Vec<super::FormParameter>,
}

impl From<StagedTargetNode> for StagedTarget {
    fn from(node: StagedTargetNode) -> Self {
        StagedTarget {
            upload_url: node.url,
            resource_url: node.resource_url,
            parameters: node.parameters,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaData {
    pub product_create_media: Option<CreateMediaPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaPayload {
    #[serde(default)]
    pub media: Vec<MediaNode>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMediaData {
    pub product_delete_media: Option<DeleteMediaPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMediaPayload {
    #[serde(default)]
    pub deleted_media_ids: Option<Vec<String>>,
    #[serde(default)]
    pub media_user_errors: Vec<UserError>,
}
