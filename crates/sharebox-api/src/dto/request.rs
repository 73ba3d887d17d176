//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Create a download share from file and directory selections.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDownloadShareRequest {
    /// `file:<key>` or `directory:<path>` selections.
    #[validate(length(min = 1, message = "Select at least one file or folder to share."))]
    pub entries: Vec<String>,
    /// Minutes until the share expires; absent for no expiry.
    #[validate(range(min = 1, max = 525_600, message = "Expiry must be between 1 minute and 1 year."))]
    pub expires_in_minutes: Option<i64>,
}

/// Create an upload share into a directory.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUploadShareRequest {
    /// Directory receiving uploads.
    #[serde(default)]
    #[validate(custom(function = "validate_target_directory"))]
    pub target_directory: String,
    /// Minutes until the share expires; absent for no expiry.
    #[validate(range(min = 1, max = 525_600, message = "Expiry must be between 1 minute and 1 year."))]
    pub expires_in_minutes: Option<i64>,
    /// Byte quota; absent for unlimited.
    #[validate(range(min = 1, message = "Upload limit must be a positive number of bytes."))]
    pub max_bytes: Option<u64>,
}

/// Create a directory.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDirectoryRequest {
    /// Parent directory, empty for the root.
    #[serde(default)]
    pub path: String,
    /// New directory name.
    #[validate(length(min = 1, message = "Folder name is required."))]
    pub name: String,
}

/// Move selections into a directory.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MoveRequest {
    /// `file:<key>` or `directory:<path>` selections.
    #[validate(length(min = 1, message = "Select one or more items to move."))]
    pub entries: Vec<String>,
    /// Destination directory, empty for the root.
    #[serde(default)]
    pub destination: String,
}

/// Query of `GET /share/download/{token}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadQuery {
    /// Key of a single shared file.
    pub file: Option<String>,
    /// Folder to archive; empty archives the whole share.
    pub folder: Option<String>,
}

/// A directory path in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathQuery {
    /// Directory path, empty for the root.
    #[serde(default)]
    pub path: String,
}

/// A file key in the query string.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyQuery {
    /// Storage key.
    pub key: String,
}

fn validate_target_directory(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().trim_matches('/').is_empty() {
        let mut error = validator::ValidationError::new("target_directory");
        error.message =
            Some("Choose or create a folder before generating an upload link.".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_share_requires_target() {
        let request = CreateUploadShareRequest {
            target_directory: " / ".into(),
            expires_in_minutes: None,
            max_bytes: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("target_directory"));
    }

    #[test]
    fn test_download_share_validation() {
        let request = CreateDownloadShareRequest {
            entries: vec![],
            expires_in_minutes: Some(60),
        };
        assert!(request.validate().is_err());

        let request = CreateDownloadShareRequest {
            entries: vec!["file:a.txt".into()],
            expires_in_minutes: Some(0),
        };
        assert!(request.validate().is_err());

        let request = CreateDownloadShareRequest {
            entries: vec!["file:a.txt".into()],
            expires_in_minutes: None,
        };
        assert!(request.validate().is_ok());
    }
}
