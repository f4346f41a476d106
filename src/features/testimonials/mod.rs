pub mod models;
pub mod routes;

pub use models::Testimonial;
pub use routes::routes;
