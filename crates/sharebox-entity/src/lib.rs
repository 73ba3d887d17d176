//! # sharebox-entity
//!
//! Domain models for Sharebox. Share records are persisted as JSON in the
//! share store; resumable upload metadata is persisted beside each staged
//! upload. All entities derive `Debug`, `Clone`, `Serialize`, and
//! `Deserialize`.

pub mod share;
pub mod upload;
