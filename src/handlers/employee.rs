use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::db::payroll;
use crate::errors::AppError;
use crate::models::employee::Employee;
use crate::models::payroll::PayrollRow;
use crate::rollup::{self, ExpenseBreakdown, IncomeBreakdown, MonthlySummary, TaxBreakdown, TotalSummary};
use crate::utils::{jwt, response};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQueryParams {
    company_id: Option<Uuid>,
    year: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeWithTotals {
    #[serde(flatten)]
    employee: Employee,
    #[serde(flatten)]
    totals: TotalSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeDetail {
    employee: Employee,
    monthly: Vec<MonthlySummary>,
    total: TotalSummary,
    income_breakdown: IncomeBreakdown,
    expense_breakdown: ExpenseBreakdown,
    tax_breakdown: TaxBreakdown,
}

fn of_employee<'a, T: PayrollRow + Clone>(rows: &'a [T], code: &'a str) -> impl Iterator<Item = T> + 'a {
    rows.iter().filter(move |r| r.employee_code() == code).cloned()
}

/// Employees of a company for one year, each with its yearly rollup.
pub async fn get_employees(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<EmployeeQueryParams>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let company_id = claims.company_scope(query.company_id)?;

    let employees = payroll::fetch_employees(&pool, company_id, query.year).await?;
    let rows = payroll::fetch_rows(&pool, company_id, query.year, None).await?;

    let data: Vec<EmployeeWithTotals> = employees
        .into_iter()
        .map(|employee| {
            let code = employee.employee_code.as_str();
            let incomes: Vec<_> = of_employee(&rows.incomes, code).collect();
            let expenses: Vec<_> = of_employee(&rows.expenses, code).collect();
            let taxes: Vec<_> = of_employee(&rows.taxes, code).collect();
            let totals = rollup::total_summary(&rollup::monthly_summaries(&incomes, &expenses, &taxes));
            EmployeeWithTotals { employee, totals }
        })
        .collect();

    Ok(response::ok("Employees retrieved", data))
}

pub async fn get_employee(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    employee_code: web::Path<String>,
    query: web::Query<EmployeeQueryParams>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    let company_id = claims.company_scope(query.company_id)?;
    let employee_code = employee_code.into_inner();

    let employee = payroll::fetch_employee(&pool, company_id, query.year, &employee_code)
        .await?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;
    let rows = payroll::fetch_rows(&pool, company_id, query.year, Some(&employee_code)).await?;

    let monthly = rollup::monthly_summaries(&rows.incomes, &rows.expenses, &rows.taxes);
    let detail = EmployeeDetail {
        total: rollup::total_summary(&monthly),
        monthly,
        income_breakdown: rollup::income_breakdown(&rows.incomes),
        expense_breakdown: rollup::expense_breakdown(&rows.expenses),
        tax_breakdown: rollup::tax_breakdown(&rows.taxes),
        employee,
    };
    Ok(response::ok("Employee retrieved", detail))
}

/// Removes one employee-year record and its payroll rows. Admin only.
pub async fn delete_employee(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    employee_code: web::Path<String>,
    query: web::Query<EmployeeQueryParams>,
) -> Result<HttpResponse, AppError> {
    let claims = jwt::authorize(&req, &config.jwt_secret)?;
    claims.require_admin()?;
    let company_id = claims.company_scope(query.company_id)?;
    let employee_code = employee_code.into_inner();

    let deleted = payroll::delete_employee_year(&pool, company_id, query.year, &employee_code).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Employee not found".to_string()));
    }
    Ok(response::message("Employee deleted successfully"))
}
