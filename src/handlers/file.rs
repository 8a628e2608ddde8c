use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::AppError;
use crate::utils::jwt;
use crate::utils::response;
use crate::utils::storage::{self, MediaFolder, Storage};
use crate::utils::upload;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Deserialize)]
pub struct UploadQuery {
    folder: MediaFolder,
}

#[derive(Serialize)]
struct FileUploadResponse {
    uri: String,
}

/// Sniffs the image type from its bytes. Returns the mime type and extension.
pub fn detect_image(bytes: &[u8]) -> Result<(&'static str, &'static str), AppError> {
    let kind = infer::get(bytes).ok_or_else(|| AppError::BadRequest("Invalid file type".to_string()))?;
    match kind.mime_type() {
        "image/jpeg" | "image/png" | "image/webp" | "image/gif" => Ok((kind.mime_type(), kind.extension())),
        _ => Err(AppError::BadRequest("Only JPEG, PNG, WEBP and GIF files are allowed".to_string())),
    }
}

/// Stores an image in the public media bucket under the requested folder.
pub async fn upload_file(
    req: HttpRequest,
    config: web::Data<Config>,
    storage: web::Data<Storage>,
    query: web::Query<UploadQuery>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    if query.folder == MediaFolder::BlogPicture {
        claims.require_admin()?;
    }

    let mut form = upload::read_form(payload, MAX_IMAGE_BYTES).await?;
    let file = form.take_file()?;
    let (mime, extension) = detect_image(&file.bytes)?;

    let key = storage::media_key(query.folder, extension);
    let uri = storage.put_media(&key, mime, file.bytes).await?;
    log::info!("{} uploaded {}", claims.sub, key);

    Ok(response::created("File uploaded", FileUploadResponse { uri }))
}
