//! Document registry, chat context and upload storage

mod blob_store;
mod context;
mod registry;
mod upload;

pub use blob_store::{BlobStore, DiskBlobStore, MemoryBlobStore, StoreError, StoredBlob};
pub use context::{ContextFile, ContextSet};
pub use registry::{DISPLAY_NAME_MAX_CHARS, DocumentDescriptor, DocumentRegistry, SourceLocator};
pub use upload::{
    DEFAULT_MAX_UPLOAD_BYTES, PDF_CONTENT_TYPE, UploadCandidate, UploadRejection, new_local_id,
    sniff_content_type, validate_upload,
};
