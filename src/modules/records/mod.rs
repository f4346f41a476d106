//! Record store: JSON document persistence per entity type

mod document;
mod postgres_store;

pub use document::{Collection, Document, ElementStore, Filter, RecordStore, Sort, StoreError};
pub use postgres_store::PgRecordStore;
