//! # sharebox-core
//!
//! Core crate for Sharebox. Contains the storage provider trait,
//! configuration schemas, storage key helpers, byte ranges, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other Sharebox crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
