//! Core type definitions used across the Sharebox workspace.

pub mod path;
pub mod range;
pub mod size;

pub use path::{join_key, key_name, normalize_directory_path, sanitize_archive_path};
pub use range::ByteRange;
pub use size::format_bytes;
