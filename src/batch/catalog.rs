use tracing::{debug, warn};

use super::QueryError;
use crate::shopify::{DynMediaPlatform, PageRequest, ProductPage};

/// Walks the catalog one bounded page at a time.
#[derive(Clone)]
pub struct CatalogPaginator {
    platform: DynMediaPlatform,
    page_size: u32,
}

impl CatalogPaginator {
    pub fn new(platform: DynMediaPlatform, page_size: u32) -> Self {
        Self {
            platform,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// `cursor = None` starts at the beginning of the catalog (or collection).
    pub async fn fetch_page(
        &self,
        cursor: Option<&str>,
        collection_ids: &[String],
    ) -> Result<ProductPage, QueryError> {
        let request = PageRequest {
            cursor: cursor.map(str::to_string),
            page_size: self.page_size,
            collection_id: collection_scope(collection_ids).map(str::to_string),
        };

        debug!(
            "Fetching {} product(s) after {:?} in {:?}",
            request.page_size, request.cursor, request.collection_id
        );

        let page = self.platform.fetch_products(&request).await?;
        debug!(
            "Fetched {} product(s), has_next_page={}",
            page.products.len(),
            page.has_next_page
        );
        Ok(page)
    }
}

/// Only the first non-empty collection id scopes a traversal.
pub fn collection_scope(collection_ids: &[String]) -> Option<&str> {
    let mut ids = collection_ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty());
    let first = ids.next()?;

    let ignored: Vec<&str> = ids.collect();
    if !ignored.is_empty() {
        warn!(
            "Batch scoped to collection {}; ignoring additional collections {:?}",
            first, ignored
        );
    }
    Some(first)
}
