//! Storage module for binary assets
//!
//! Provides the object storage capability (`BlobStore`), its MinIO/S3
//! implementation and the client the asset coordinator talks to.

mod blob_store;
mod client;
mod minio_client;

pub use blob_store::{folder_path, AssetKind, BlobStore, BlobStoreError, StoredObject};
pub use client::BlobStoreClient;
pub use minio_client::MinIOClient;
