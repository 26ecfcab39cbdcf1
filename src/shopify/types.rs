use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMedia {
    pub id: String,
    /// `None` for media without a raster image (video, 3D models).
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub media: Vec<ProductMedia>,
}

/// An image-bearing media item of a product, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMediaRef {
    pub product_id: String,
    pub title: String,
    pub media_id: String,
    pub image_url: String,
}

impl Product {
    pub fn image_refs(&self) -> Vec<ProductMediaRef> {
        self.media
            .iter()
            .filter_map(|media| {
                let url = media.image_url.as_ref()?;
                Some(ProductMediaRef {
                    product_id: self.id.clone(),
                    title: self.title.clone(),
                    media_id: media.id.clone(),
                    image_url: url.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub page_size: u32,
    pub collection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadRequest {
    pub filename: String,
    pub mime_type: String,
    pub http_method: String,
    pub resource: String,
    /// Sent as a string, as the Admin API expects.
    pub file_size: String,
}

impl StagedUploadRequest {
    pub fn image(filename: impl Into<String>, mime_type: impl Into<String>, size: usize) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            http_method: "POST".to_string(),
            resource: "IMAGE".to_string(),
            file_size: size.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormParameter {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagedTarget {
    pub upload_url: String,
    pub resource_url: String,
    pub parameters: Vec<FormParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaRequest {
    pub original_source: String,
    pub alt: String,
    pub media_content_type: String,
}

impl CreateMediaRequest {
    pub fn image(original_source: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            original_source: original_source.into(),
            alt: alt.into(),
            media_content_type: "IMAGE".to_string(),
        }
    }
}
