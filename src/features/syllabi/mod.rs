pub mod models;
pub mod routes;

pub use models::Syllabus;
pub use routes::routes;
