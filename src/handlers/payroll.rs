use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::db::payroll;
use crate::errors::AppError;
use crate::ingest::{self, PayrollRecord};
use crate::utils::jwt;
use crate::utils::response;
use crate::utils::storage::{self, Storage};
use crate::utils::upload;

const MAX_EXPORT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub records_parsed: usize,
    pub records_stored: usize,
    pub failed_batches: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_key: String,
    #[serde(flatten)]
    report: IngestReport,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesQuery {
    company_id: Option<Uuid>,
    year: i32,
}

fn parse_period(year: Option<&str>, month: Option<&str>) -> Result<(i32, i32), AppError> {
    let year: i32 = year
        .and_then(|y| y.parse().ok())
        .filter(|y| (2000..=2100).contains(y))
        .ok_or_else(|| AppError::BadRequest("year must be a valid year".to_string()))?;
    let month: i32 = month
        .and_then(|m| m.parse().ok())
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| AppError::BadRequest("month must be between 1 and 12".to_string()))?;
    Ok((year, month))
}

/// Writes records in fixed-size batches, one transaction each. A failed batch
/// is logged and skipped; the remaining batches still run.
pub async fn store_in_batches(pool: &PgPool, records: &[PayrollRecord], batch_size: usize) -> IngestReport {
    let mut report = IngestReport {
        records_parsed: records.len(),
        ..Default::default()
    };

    for (index, batch) in records.chunks(batch_size.max(1)).enumerate() {
        let result: Result<(), sqlx::Error> = async {
            let mut tx = pool.begin().await?;
            payroll::upsert_records(&mut tx, batch).await?;
            tx.commit().await
        }
        .await;

        match result {
            Ok(()) => report.records_stored += batch.len(),
            Err(err) => {
                log::warn!("Payroll batch {} ({} records) skipped: {}", index, batch.len(), err);
                report.failed_batches += 1;
            }
        }
    }
    report
}

/// Imports a payroll export for one period and keeps the raw file.
pub async fn upload_payroll(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    storage: web::Data<Storage>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;

    let mut form = upload::read_form(payload, MAX_EXPORT_BYTES).await?;
    let (year, month) = parse_period(form.field("year"), form.field("month"))?;
    let requested = form
        .field("companyId")
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| AppError::BadRequest("Invalid companyId".to_string()))?;
    let company_id = claims.company_scope(requested)?;
    let file = form.take_file()?;

    let records = ingest::parse_payroll_csv(file.bytes.as_slice(), company_id, year, month)
        .map_err(|e| AppError::BadRequest(format!("Invalid CSV: {}", e)))?;
    if records.is_empty() {
        return Err(AppError::BadRequest("CSV contains no payroll rows".to_string()));
    }

    let file_key = storage::payroll_key(company_id, year, &file.filename);
    storage.put_payroll_export(&file_key, file.bytes).await?;

    let report = store_in_batches(&pool, &records, config.ingest_batch_size).await;
    log::info!(
        "Imported {}/{} payroll records for {} {}-{:02} ({} failed batches)",
        report.records_stored,
        report.records_parsed,
        company_id,
        year,
        month,
        report.failed_batches
    );

    Ok(response::ok("Payroll imported", UploadResponse { file_key, report }))
}

/// Stored exports of a company year with temporary download links.
pub async fn get_payroll_files(
    req: HttpRequest,
    config: web::Data<Config>,
    storage: web::Data<Storage>,
    query: web::Query<FilesQuery>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let company_id = claims.company_scope(query.company_id)?;

    let files = storage
        .list_payroll_exports(&format!("{}/{}/", company_id, query.year))
        .await?;
    Ok(response::ok("Files retrieved", files))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_must_be_valid() {
        assert_eq!(parse_period(Some("2024"), Some("7")).unwrap(), (2024, 7));
        assert!(parse_period(Some("2024"), Some("13")).is_err());
        assert!(parse_period(Some("24"), Some("1")).is_err());
        assert!(parse_period(None, Some("1")).is_err());
    }
}
