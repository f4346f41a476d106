pub mod models;
pub mod routes;

pub use models::StudyMaterial;
pub use routes::routes;
