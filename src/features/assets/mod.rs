//! Asset lifecycle: the coordinator keeping blobs and records consistent,
//! the per-entity configuration it runs on, and the generic service and
//! HTTP surface shared by every entity kind.

pub mod coordinator;
pub mod entity;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;

pub use coordinator::AssetCoordinator;
pub use entity::{AssetEntity, AssetSet, AssetSlot, ElementDescriptor, ElementOwner, EntityDescriptor};
pub use handlers::EntityState;
pub use models::{AssetRef, OpContext, Operation};
pub use routes::{element_routes, entity_routes};
pub use service::EntityService;
