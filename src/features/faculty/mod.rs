pub mod models;
pub mod routes;

pub use models::Faculty;
pub use routes::routes;
