#![allow(dead_code)]

use async_trait::async_trait;
use image::{GrayImage, ImageBuffer, Luma, Rgb};
use shopmark::{
    AppState, Config,
    shopify::{
        Collection, CreateMediaRequest, MediaPlatform, PageRequest, PlatformError, Product,
        ProductMedia, ProductPage, StagedTarget, StagedUploadRequest,
    },
    watermark::{GlyphMask, GlyphSource},
};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Fixed rectangle in place of real text.
pub struct BoxGlyphs;

impl GlyphSource for BoxGlyphs {
    fn rasterize(&self, _text: &str, px: f32) -> Option<GlyphMask> {
        let height = px.max(1.0) as u32;
        Some(GlyphMask {
            coverage: GrayImage::from_pixel(height * 4, height, Luma([255])),
            baseline: height.saturating_sub(1),
        })
    }
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = ImageBuffer::from_pixel(width, height, Rgb([200u8, 210, 220]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

pub fn product(id: u32, urls: &[&str]) -> Product {
    Product {
        id: format!("gid://shopify/Product/{id}"),
        title: format!("Poster {id}"),
        media: urls
            .iter()
            .enumerate()
            .map(|(i, url)| ProductMedia {
                id: format!("gid://shopify/MediaImage/{id}0{i}"),
                image_url: Some(url.to_string()),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Page(Option<String>),
    Fetch(String),
    Stage(String),
    Upload(String),
    Create { product_id: String, alt: String },
    Delete { product_id: String, media_ids: Vec<String> },
}

/// Catalog kept in memory; cursors are product offsets. Every call is
/// recorded so tests can assert on ordering.
#[derive(Default)]
pub struct RecordingPlatform {
    pub products: Vec<Product>,
    pub images: HashMap<String, Vec<u8>>,
    pub collections: Vec<(Collection, Vec<String>)>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingPlatform {
    pub fn new(products: Vec<Product>) -> Self {
        let images = products
            .iter()
            .flat_map(|p| p.image_refs())
            .map(|media| (media.image_url, jpeg(120, 90)))
            .collect();
        Self {
            products,
            images,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MediaPlatform for RecordingPlatform {
    async fn fetch_products(&self, request: &PageRequest) -> Result<ProductPage, PlatformError> {
        self.record(Call::Page(request.cursor.clone()));

        let scoped: Vec<&Product> = match &request.collection_id {
            Some(id) => {
                let Some((_, members)) = self.collections.iter().find(|(c, _)| &c.id == id) else {
                    return Err(PlatformError::NotFound(format!("collection {id}")));
                };
                self.products.iter().filter(|p| members.contains(&p.id)).collect()
            }
            None => self.products.iter().collect(),
        };

        let start = match &request.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| PlatformError::Decode(format!("bad cursor {cursor}")))?,
            None => 0,
        };
        let end = (start + request.page_size as usize).min(scoped.len());
        let products: Vec<Product> = scoped
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|p| (*p).clone())
            .collect();

        Ok(ProductPage {
            end_cursor: Some(end.to_string()),
            has_next_page: end < scoped.len(),
            products,
        })
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, PlatformError> {
        Ok(self.products.iter().find(|p| p.id == product_id).cloned())
    }

    async fn list_collections(&self, first: u32) -> Result<Vec<Collection>, PlatformError> {
        Ok(self
            .collections
            .iter()
            .take(first as usize)
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, PlatformError> {
        self.record(Call::Fetch(url.to_string()));
        self.images.get(url).cloned().ok_or(PlatformError::Status {
            status: 404,
            body: "Not Found".to_string(),
        })
    }

    async fn create_staged_upload(
        &self,
        request: &StagedUploadRequest,
    ) -> Result<StagedTarget, PlatformError> {
        self.record(Call::Stage(request.filename.clone()));
        Ok(StagedTarget {
            upload_url: "https://staging.example.com/upload".to_string(),
            resource_url: format!("https://staging.example.com/{}", request.filename),
            parameters: Vec::new(),
        })
    }

    async fn upload_staged(
        &self,
        _target: &StagedTarget,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PlatformError> {
        assert_eq!(mime_type, "image/jpeg");
        assert!(image::load_from_memory(&bytes).is_ok());
        self.record(Call::Upload(filename.to_string()));
        Ok(())
    }

    async fn create_media(
        &self,
        product_id: &str,
        media: &CreateMediaRequest,
    ) -> Result<String, PlatformError> {
        self.record(Call::Create {
            product_id: product_id.to_string(),
            alt: media.alt.clone(),
        });
        Ok(format!("gid://shopify/MediaImage/new{}", self.calls().len()))
    }

    async fn delete_media(
        &self,
        product_id: &str,
        media_ids: &[String],
    ) -> Result<Vec<String>, PlatformError> {
        self.record(Call::Delete {
            product_id: product_id.to_string(),
            media_ids: media_ids.to_vec(),
        });
        Ok(media_ids.to_vec())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn app_state(platform: Arc<RecordingPlatform>) -> AppState {
    AppState::new(Config::default(), platform, Arc::new(BoxGlyphs))
}
