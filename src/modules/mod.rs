//! Modules layer - Infrastructure adapters the asset coordinator builds on
//!
//! Blob storage, local staging of uploads and document persistence.

pub mod records;
pub mod staging;
pub mod storage;
