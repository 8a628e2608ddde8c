use std::collections::HashMap;

use actix_multipart::Multipart;
use futures_util::TryStreamExt;

use crate::errors::AppError;

pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A multipart form read into memory: one file part plus plain text fields.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self) -> Result<UploadedFile, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest("file is required".to_string()))
    }
}

/// Reads the `file` part and any text parts, rejecting files over `max_bytes`.
pub async fn read_form(mut payload: Multipart, max_bytes: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::BadRequest(format!(
                    "File size exceeds {} KiB limit",
                    max_bytes / 1024
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match (name.as_str(), filename) {
            ("file", Some(filename)) => form.file = Some(UploadedFile { filename, bytes }),
            (_, _) => {
                let value = String::from_utf8(bytes)
                    .map_err(|_| AppError::BadRequest(format!("Field {} is not valid text", name)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
