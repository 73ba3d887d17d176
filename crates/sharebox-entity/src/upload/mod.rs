//! Resumable upload entities.

pub mod meta;

pub use meta::{ContentRange, ResumableMeta};
