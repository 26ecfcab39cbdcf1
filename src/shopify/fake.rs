//! In-memory platform used by unit tests.

use async_trait::async_trait;
use image::{ImageBuffer, Rgb};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Mutex;

use super::*;

pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    let image = ImageBuffer::from_pixel(width, height, Rgb([240u8, 240, 240]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .expect("fixture encodes");
    out.into_inner()
}

pub fn product(id: u32, urls: &[&str]) -> Product {
    Product {
        id: format!("gid://shopify/Product/{id}"),
        title: format!("Product {id}"),
        media: urls
            .iter()
            .enumerate()
            .map(|(i, url)| ProductMedia {
                id: format!("gid://shopify/MediaImage/{id}{i}"),
                image_url: Some(url.to_string()),
            })
            .collect(),
    }
}

/// Catalog cursors are the index of the next product, as a string.
#[derive(Default)]
pub struct FakePlatform {
    pub products: Vec<Product>,
    pub collections: HashMap<String, Vec<String>>,
    pub images: HashMap<String, Vec<u8>>,
    pub fail_page: bool,
    /// Report `has_next_page` without an end cursor.
    pub drop_cursor: bool,
    /// Fail the n-th (zero based) staged upload POST.
    pub fail_upload_at: Option<usize>,
    pub fail_delete: bool,
    pub calls: Mutex<Vec<String>>,
    uploads: Mutex<usize>,
}

impl FakePlatform {
    pub fn with_products(products: Vec<Product>) -> Self {
        let mut images = HashMap::new();
        for product in &products {
            for media in product.image_refs() {
                images.insert(media.image_url.clone(), jpeg_fixture(40, 30));
            }
        }
        Self {
            products,
            images,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl MediaPlatform for FakePlatform {
    async fn fetch_products(&self, request: &PageRequest) -> Result<ProductPage, PlatformError> {
        self.record(format!("page:{}", request.cursor.as_deref().unwrap_or("")));
        if self.fail_page {
            return Err(PlatformError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let scope: Option<HashSet<&String>> = request
            .collection_id
            .as_ref()
            .map(|id| self.collections.get(id).map(|ids| ids.iter().collect()).unwrap_or_default());
        let products: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| scope.as_ref().is_none_or(|ids| ids.contains(&p.id)))
            .collect();

        let start: usize = request
            .cursor
            .as_deref()
            .map(|c| c.parse().unwrap_or(0))
            .unwrap_or(0);
        let end = (start + request.page_size as usize).min(products.len());
        let page: Vec<Product> = products[start.min(end)..end].iter().map(|p| (*p).clone()).collect();

        Ok(ProductPage {
            end_cursor: (!page.is_empty() && !self.drop_cursor).then(|| end.to_string()),
            has_next_page: end < products.len(),
            products: page,
        })
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, PlatformError> {
        Ok(self.products.iter().find(|p| p.id == product_id).cloned())
    }

    async fn list_collections(&self, first: u32) -> Result<Vec<Collection>, PlatformError> {
        let mut ids: Vec<&String> = self.collections.keys().collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .take(first as usize)
            .map(|id| Collection {
                id: id.clone(),
                title: id.rsplit('/').next().unwrap_or_default().to_string(),
            })
            .collect())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, PlatformError> {
        self.record(format!("fetch:{url}"));
        self.images.get(url).cloned().ok_or_else(|| PlatformError::Status {
            status: 404,
            body: url.to_string(),
        })
    }

    async fn create_staged_upload(
        &self,
        request: &StagedUploadRequest,
    ) -> Result<StagedTarget, PlatformError> {
        self.record(format!("stage:{}", request.filename));
        Ok(StagedTarget {
            upload_url: "https://uploads.example.com/".to_string(),
            resource_url: format!("https://uploads.example.com/{}", request.filename),
            parameters: Vec::new(),
        })
    }

    async fn upload_staged(
        &self,
        _target: &StagedTarget,
        filename: &str,
        _mime_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<(), PlatformError> {
        let attempt = {
            let mut uploads = self.uploads.lock().expect("uploads lock");
            let attempt = *uploads;
            *uploads += 1;
            attempt
        };
        self.record(format!("upload:{filename}"));
        if self.fail_upload_at == Some(attempt) {
            return Err(PlatformError::Status {
                status: 403,
                body: "Forbidden".to_string(),
            });
        }
        Ok(())
    }

    async fn create_media(
        &self,
        product_id: &str,
        media: &CreateMediaRequest,
    ) -> Result<String, PlatformError> {
        self.record(format!("create:{product_id}:{}", media.alt));
        let name = media.original_source.rsplit('/').next().unwrap_or_default();
        Ok(format!("gid://shopify/MediaImage/new-{name}"))
    }

    async fn delete_media(
        &self,
        product_id: &str,
        media_ids: &[String],
    ) -> Result<Vec<String>, PlatformError> {
        self.record(format!("delete:{product_id}:{}", media_ids.join(",")));
        if self.fail_delete {
            return Err(PlatformError::api(ExternalApiError::new(
                "INTERNAL",
                "media is locked",
            )));
        }
        Ok(media_ids.to_vec())
    }

    fn name(&self) -> &str {
        "fake"
    }
}
