//! Core traits defined in `sharebox-core` and implemented by other crates.

pub mod storage;

pub use storage::StorageProvider;
