//! Local staging of uploaded bytes
//!
//! Uploads are written to disk before they reach the blob store. Staged
//! files are owned guards, released on every exit path of a request.

mod intake;
mod staging_area;

pub use intake::{FormFields, UploadIntake};
pub use staging_area::{StagedFile, StagingArea, UploadHandle};
