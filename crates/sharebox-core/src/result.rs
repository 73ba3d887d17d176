//! Convenience result type alias for Sharebox.

use crate::error::AppError;

/// A specialized `Result` type for Sharebox operations.
pub type AppResult<T> = Result<T, AppError>;
