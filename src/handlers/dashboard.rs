use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::db::payroll;
use crate::errors::AppError;
use crate::models::payroll::{Expense, Income, Tax};
use crate::models::user::Role;
use crate::rollup::{self, Band, BandField, ExpenseBreakdown, IncomeBreakdown, MonthlySummary, TaxBreakdown, TotalSummary};
use crate::utils::{jwt, response};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    company_id: Option<Uuid>,
    year: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearsQuery {
    company_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    company_id: Option<Uuid>,
    year: i32,
    field: BandField,
}

#[derive(Deserialize)]
pub struct OverviewQuery {
    year: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompanyDashboard {
    company_id: Uuid,
    year: i32,
    employee_count: usize,
    monthly: Vec<MonthlySummary>,
    total: TotalSummary,
    income_breakdown: IncomeBreakdown,
    expense_breakdown: ExpenseBreakdown,
    tax_breakdown: TaxBreakdown,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RangeReport {
    field: BandField,
    year: i32,
    bands: Vec<Band>,
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    company: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompanyOverview {
    company_id: Uuid,
    company: String,
    #[serde(flatten)]
    total: TotalSummary,
}

/// Company rollup for one fiscal year.
pub async fn get_dashboard(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let company_id = claims.company_scope(query.company_id)?;

    let employees = payroll::fetch_employees(&pool, company_id, query.year).await?;
    let rows = payroll::fetch_rows(&pool, company_id, query.year, None).await?;
    let monthly = rollup::monthly_summaries(&rows.incomes, &rows.expenses, &rows.taxes);

    Ok(response::ok(
        "Dashboard retrieved",
        CompanyDashboard {
            company_id,
            year: query.year,
            employee_count: employees.len(),
            total: rollup::total_summary(&monthly),
            monthly,
            income_breakdown: rollup::income_breakdown(&rows.incomes),
            expense_breakdown: rollup::expense_breakdown(&rows.expenses),
            tax_breakdown: rollup::tax_breakdown(&rows.taxes),
        },
    ))
}

pub async fn get_years(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<YearsQuery>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let company_id = claims.company_scope(query.company_id)?;
    Ok(response::ok("Years retrieved", payroll::fetch_years(&pool, company_id).await?))
}

/// Commission or diligence pay bands.
pub async fn get_ranges(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let company_id = claims.company_scope(query.company_id)?;

    let employees = payroll::fetch_employees(&pool, company_id, query.year).await?;
    let rows = payroll::fetch_rows(&pool, company_id, query.year, None).await?;
    let amounts = rollup::yearly_field_totals(&employees, &rows.incomes, query.field);

    Ok(response::ok(
        "Ranges retrieved",
        RangeReport {
            field: query.field,
            year: query.year,
            bands: rollup::range_bucketing(&amounts),
        },
    ))
}

/// Yearly totals of every customer company. Admin only.
pub async fn get_company_overview(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<OverviewQuery>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;

    let companies = sqlx::query_as::<_, CompanyRow>(
        "SELECT id, company FROM users WHERE role = $1 ORDER BY company",
    )
    .bind(Role::Customer.as_str())
    .fetch_all(&**pool)
    .await?;

    let (incomes, expenses, taxes) = tokio::try_join!(
        sqlx::query_as::<_, Income>("SELECT * FROM incomes WHERE year = $1").bind(query.year).fetch_all(&**pool),
        sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE year = $1").bind(query.year).fetch_all(&**pool),
        sqlx::query_as::<_, Tax>("SELECT * FROM taxes WHERE year = $1").bind(query.year).fetch_all(&**pool),
    )?;

    let overview: Vec<CompanyOverview> = companies
        .into_iter()
        .map(|c| {
            let inc: Vec<_> = incomes.iter().filter(|r| r.company_id == c.id).cloned().collect();
            let exp: Vec<_> = expenses.iter().filter(|r| r.company_id == c.id).cloned().collect();
            let tax: Vec<_> = taxes.iter().filter(|r| r.company_id == c.id).cloned().collect();
            CompanyOverview {
                company_id: c.id,
                company: c.company,
                total: rollup::total_summary(&rollup::monthly_summaries(&inc, &exp, &tax)),
            }
        })
        .collect();

    Ok(response::ok("Overview retrieved", overview))
}
