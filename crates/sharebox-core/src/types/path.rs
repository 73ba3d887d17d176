//! Storage key and archive path normalization.

use crate::error::AppError;
use crate::result::AppResult;

/// Normalize a caller-supplied directory path into a storage key prefix.
///
/// Backslashes become `/`, empty segments are dropped, and `""` or `"/"`
/// mean the storage root. Any `.` or `..` segment is rejected.
pub fn normalize_directory_path(input: &str) -> AppResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return Ok(String::new());
    }

    let replaced = trimmed.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in replaced.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(AppError::invalid_argument("Invalid folder path."));
        }
        segments.push(segment);
    }

    Ok(segments.join("/"))
}

/// Normalize a caller-supplied file key the same way as a directory path.
///
/// The storage root is not a file, so an empty result is rejected.
pub fn normalize_file_key(input: &str) -> AppResult<String> {
    let key = normalize_directory_path(input)
        .map_err(|_| AppError::invalid_argument("Invalid file key."))?;
    if key.is_empty() {
        return Err(AppError::invalid_argument("Invalid file key."));
    }
    Ok(key)
}

/// Sanitize a path for use inside an archive.
///
/// Unlike [`normalize_directory_path`] this never fails: `.`, `..`, and
/// empty segments are silently dropped.
pub fn sanitize_archive_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a normalized directory and a relative path into a storage key.
pub fn join_key(directory: &str, relative: &str) -> String {
    match (directory.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (false, true) => directory.to_string(),
        (false, false) => format!("{directory}/{relative}"),
    }
}

/// Last `/`-separated segment of a key.
pub fn key_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
