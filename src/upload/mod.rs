//! # Upload
//!
//! Master-data uploader: local `*.tsv.gz` files into a blob container.

pub mod audit;
pub mod candidates;
pub mod report;
pub mod store;
pub mod target;
pub mod uploader;

pub use audit::AuditLog;
pub use candidates::{blob_path_for, enumerate, UploadCandidate};
pub use report::{format_bytes, FileOutcome, UploadMode, UploadReport, UploadStatus};
pub use store::{BlobStore, BlobStoreError, ObjectStoreBlobStore, StorageConnection};
pub use target::{credential_store_path, UploadTarget};
pub use uploader::Uploader;
