//! Features layer: the asset coordinator and one module per record kind

pub mod achievements;
pub mod albums;
pub mod assets;
pub mod faculty;
pub mod programmes;
pub mod quick_access;
pub mod study_materials;
pub mod syllabi;
pub mod testimonials;
