pub mod models;
pub mod routes;

pub use models::Achievement;
pub use routes::routes;
