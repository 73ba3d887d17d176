//! # sharebox-service
//!
//! Business logic for Sharebox. The share registry owns every share
//! record; the file services combine it with the storage layer to serve
//! downloads and archives, ingest uploads, and keep shares consistent
//! while files are moved or deleted.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod file;
pub mod share;

pub use file::{DownloadService, FileService, UploadService};
pub use share::{LinkService, ShareRegistry, ShareStore};
