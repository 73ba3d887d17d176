//! File services: share downloads, share uploads, and admin file operations.

pub mod download;
pub mod service;
pub mod upload;

pub use download::{DownloadService, FolderArchive, file_etag};
pub use service::{AdminUpload, FileService, Selection};
pub use upload::{ChunkReply, ChunkRequest, UploadService, UploadSummary, UploadedPart};
