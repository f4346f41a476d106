pub mod models;
pub mod routes;

pub use models::Programme;
pub use routes::routes;
