// Batch module - paginated, resumable watermark runs over the catalog
mod catalog;
mod driver;
mod error;
mod params;
mod transaction;

pub use catalog::{CatalogPaginator, collection_scope};
pub use driver::{
    BatchDriver, BatchRequest, BatchResponse, BatchStatus, DEFAULT_STEP_PATH, ProductFailure,
};
pub use error::{BatchError, DeleteError, ImageFailure, ProductError, QueryError, UploadError};
pub use transaction::{ImageOutcome, MediaReplacer, ProductReport, upload_filename};
