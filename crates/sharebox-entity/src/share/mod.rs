//! Share domain entities.

pub mod model;

pub use model::{DownloadShare, ShareKind, ShareRecord, UploadShare};
