//! Multipart upload forms.

use std::collections::HashMap;

use axum::extract::Multipart;

use sharebox_core::error::AppError;
use sharebox_core::result::AppResult;
use sharebox_service::file::UploadedPart;

/// Multipart field carrying files.
const FILES_FIELD: &str = "files";

/// Files and text fields of a multipart upload.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// Parts of the `files` field, in submission order.
    pub parts: Vec<UploadedPart>,
    /// Text fields by name; later values win.
    pub fields: HashMap<String, String>,
}

/// Drain `multipart` into an [`UploadForm`].
///
/// File parts without a file name are dropped: browsers send one when no
/// file was chosen.
pub async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid_argument(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == FILES_FIELD || field.file_name().is_some() {
            let file_name = field.file_name().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::invalid_argument(format!("Read error: {e}")))?;
            if !file_name.is_empty() {
                form.parts.push(UploadedPart { file_name, data });
            }
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::invalid_argument(format!("Read error: {e}")))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}
