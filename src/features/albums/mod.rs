pub mod models;
pub mod routes;

pub use models::{Album, Photo};
pub use routes::routes;
