use std::time::Duration;

use aws_config::{BehaviorVersion, ConfigLoader, SdkConfig};
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::Object;
use aws_sdk_s3::Client as S3Client;
use aws_types::region::Region;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

pub async fn load_aws_config() -> SdkConfig {
    ConfigLoader::default()
        .region(std::env::var("AWS_REGION").ok().map(Region::new))
        .behavior_version(BehaviorVersion::latest())
        .load()
        .await
}

/// Upload prefixes in the public media bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, Serialize)]
pub enum MediaFolder {
    #[serde(rename = "blog_pic")]
    BlogPicture,
    #[serde(rename = "img_upload")]
    ImageUpload,
    #[serde(rename = "reports")]
    Reports,
}

impl MediaFolder {
    pub fn prefix(&self) -> &'static str {
        match self {
            MediaFolder::BlogPicture => "blog_pic",
            MediaFolder::ImageUpload => "img_upload",
            MediaFolder::Reports => "reports",
        }
    }
}

/// Object key of a stored payroll export.
pub fn payroll_key(company_id: Uuid, year: i32, filename: &str) -> String {
    format!("{}/{}/{}", company_id, year, sanitize_filename(filename))
}

pub fn media_key(folder: MediaFolder, extension: &str) -> String {
    format!("{}/{}.{}", folder.prefix(), Uuid::new_v4(), extension)
}

/// Keeps the last path component and replaces characters that are awkward in
/// object keys.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        format!("{}.csv", Uuid::new_v4())
    } else {
        cleaned
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub key: String,
    pub url: String,
    pub size: Option<i64>,
}

#[derive(Clone)]
pub struct Storage {
    client: S3Client,
    payroll_bucket: String,
    media_bucket: String,
}

fn aws_error(action: &str, err: impl std::fmt::Display) -> AppError {
    AppError::AWSError(format!("{}: {}", action, err))
}

impl Storage {
    pub fn new(client: S3Client, config: &Config) -> Self {
        Self {
            client,
            payroll_bucket: config.payroll_bucket.clone(),
            media_bucket: config.media_bucket.clone(),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.media_bucket, key)
    }

    /// Stores a public image and returns its URL.
    pub async fn put_media(&self, key: &str, content_type: &str, body: Vec<u8>) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(&self.media_bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| aws_error("media upload failed", e))?;
        Ok(self.public_url(key))
    }

    pub async fn put_payroll_export(&self, key: &str, body: Vec<u8>) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.payroll_bucket)
            .key(key)
            .content_type("text/csv")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| aws_error("payroll upload failed", e))?;
        Ok(())
    }

    /// Lists exports under `prefix` with short-lived download URLs.
    /// Every payroll object under `prefix`, across all listing pages.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<Object>, AppError> {
        let mut objects = Vec::new();
        let mut continuation = None;
        loop {
            let output = self.client
                .list_objects_v2()
                .bucket(&self.payroll_bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| aws_error("listing exports failed", e))?;
            objects.extend(output.contents().iter().cloned());
            match next_page(&output) {
                Some(token) => continuation = Some(token),
                None => return Ok(objects),
            }
        }
    }

    pub async fn list_payroll_exports(&self, prefix: &str) -> Result<Vec<StoredFile>, AppError> {
        let objects = self.list_objects(prefix).await?;

        let presign = PresigningConfig::expires_in(PRESIGNED_URL_TTL)
            .map_err(|e| aws_error("presigning config", e))?;

        let mut files = Vec::new();
        for object in &objects {
            let Some(key) = object.key() else { continue };
            let request = self.client
                .get_object()
                .bucket(&self.payroll_bucket)
                .key(key)
                .presigned(presign.clone())
                .await
                .map_err(|e| aws_error("presigning failed", e))?;
            files.push(StoredFile {
                key: key.to_string(),
                url: request.uri().to_string(),
                size: object.size(),
            });
        }
        Ok(files)
    }

    /// Removes every object under `prefix`. Used when a company is deleted.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, AppError> {
        let objects = self.list_objects(prefix).await?;

        let mut removed = 0;
        for key in objects.iter().filter_map(|o| o.key()) {
            self.client
                .delete_object()
                .bucket(&self.payroll_bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| aws_error("delete failed", e))?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// Token for the following page of a truncated listing.
fn next_page(output: &ListObjectsV2Output) -> Option<String> {
    if output.is_truncated().unwrap_or(false) {
        output.next_continuation_token().map(str::to_string)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_listing_continues() {
        let page = ListObjectsV2Output::builder()
            .is_truncated(true)
            .next_continuation_token("page-2")
            .contents(Object::builder().key("payroll/a.csv").build())
            .build();
        assert_eq!(next_page(&page).as_deref(), Some("page-2"));

        let last = ListObjectsV2Output::builder()
            .is_truncated(false)
            .next_continuation_token("stale")
            .build();
        assert_eq!(next_page(&last), None);
        assert_eq!(next_page(&ListObjectsV2Output::builder().build()), None);
    }

    #[test]
    fn payroll_keys_are_namespaced_by_company_and_year() {
        let company = Uuid::nil();
        assert_eq!(
            payroll_key(company, 2024, "../../etc/May 2024.csv"),
            format!("{}/2024/May_2024.csv", company)
        );
    }

    #[test]
    fn media_keys_use_folder_prefix() {
        assert!(media_key(MediaFolder::BlogPicture, "png").starts_with("blog_pic/"));
        assert!(media_key(MediaFolder::Reports, "jpg").ends_with(".jpg"));
    }

    #[test]
    fn empty_names_get_generated() {
        assert!(sanitize_filename("..").ends_with(".csv"));
        assert_eq!(sanitize_filename("payroll-01.csv"), "payroll-01.csv");
    }
}
