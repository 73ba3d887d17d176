//! Custom Axum extractors.

pub mod admin;
pub mod multipart;

pub use admin::AdminToken;
pub use multipart::{UploadForm, read_upload_form};
