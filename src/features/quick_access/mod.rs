pub mod models;
pub mod routes;

pub use models::QuickAccessItem;
pub use routes::routes;
