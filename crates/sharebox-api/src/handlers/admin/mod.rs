//! Admin handlers. Every handler takes [`AdminToken`](crate::extractors::AdminToken).

pub mod files;
pub mod shares;
