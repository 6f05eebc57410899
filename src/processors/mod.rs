// blazing-webp/src/processors/mod.rs
mod batch;
mod compressor;
mod loader;
mod metadata;
mod resizer;

pub use batch::{BatchHandle, BatchProcessor};
pub use compressor::{Compressor, WEBP_MAX_DIMENSION};
pub use loader::Loader;
pub use metadata::MetadataProcessor;
pub use resizer::Resizer;

