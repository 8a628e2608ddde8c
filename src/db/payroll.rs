//! Queries over the employee and payroll tables shared by several routes.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::ingest::PayrollRecord;
use crate::models::employee::Employee;
use crate::models::payroll::{Expense, Income, Tax};

const INCOME_COLUMNS: &str = "employee_code, company_id, year, month, salary, overtime, bonus, commission, diligence, allowance, other_income";
const EXPENSE_COLUMNS: &str = "employee_code, company_id, year, month, loan, absence, late, advance, other_deduction";
const TAX_COLUMNS: &str = "employee_code, company_id, year, month, employee_tax, social_security, provident_fund";

/// Income, expense and tax rows of one company and year.
pub struct PayrollRows {
    pub incomes: Vec<Income>,
    pub expenses: Vec<Expense>,
    pub taxes: Vec<Tax>,
}

fn scoped_select(columns: &str, table: &str, with_employee: bool) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE company_id = $1 AND year = $2",
        columns, table
    );
    if with_employee {
        sql.push_str(" AND employee_code = $3");
    }
    sql.push_str(" ORDER BY month, employee_code");
    sql
}

/// Loads the rows for a company/year, optionally narrowed to one employee.
/// The three tables are read concurrently.
pub async fn fetch_rows(
    pool: &PgPool,
    company_id: Uuid,
    year: i32,
    employee_code: Option<&str>,
) -> Result<PayrollRows, sqlx::Error> {
    let with_employee = employee_code.is_some();
    let income_sql = scoped_select(INCOME_COLUMNS, "incomes", with_employee);
    let expense_sql = scoped_select(EXPENSE_COLUMNS, "expenses", with_employee);
    let tax_sql = scoped_select(TAX_COLUMNS, "taxes", with_employee);

    let mut incomes = sqlx::query_as::<_, Income>(&income_sql).bind(company_id).bind(year);
    let mut expenses = sqlx::query_as::<_, Expense>(&expense_sql).bind(company_id).bind(year);
    let mut taxes = sqlx::query_as::<_, Tax>(&tax_sql).bind(company_id).bind(year);
    if let Some(code) = employee_code {
        incomes = incomes.bind(code);
        expenses = expenses.bind(code);
        taxes = taxes.bind(code);
    }

    let (incomes, expenses, taxes) = tokio::try_join!(
        incomes.fetch_all(pool),
        expenses.fetch_all(pool),
        taxes.fetch_all(pool),
    )?;
    Ok(PayrollRows { incomes, expenses, taxes })
}

pub async fn fetch_employees(pool: &PgPool, company_id: Uuid, year: i32) -> Result<Vec<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        "SELECT * FROM employees WHERE company_id = $1 AND year = $2 ORDER BY employee_code",
    )
    .bind(company_id)
    .bind(year)
    .fetch_all(pool)
    .await
}

pub async fn fetch_employee(
    pool: &PgPool,
    company_id: Uuid,
    year: i32,
    employee_code: &str,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        "SELECT * FROM employees WHERE company_id = $1 AND year = $2 AND employee_code = $3",
    )
    .bind(company_id)
    .bind(year)
    .bind(employee_code)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_years(pool: &PgPool, company_id: Uuid) -> Result<Vec<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT DISTINCT year FROM employees WHERE company_id = $1 ORDER BY year DESC",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await
}

/// Writes one batch of parsed records. Existing rows for the same key are
/// overwritten, so at most one row per employee and period survives.
pub async fn upsert_records(
    tx: &mut Transaction<'_, Postgres>,
    records: &[PayrollRecord],
) -> Result<(), sqlx::Error> {
    for record in records {
        let income = &record.income;
        sqlx::query(
            "INSERT INTO employees (employee_code, company_id, year, name, department, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
             ON CONFLICT (employee_code, company_id, year)
             DO UPDATE SET name = EXCLUDED.name, department = EXCLUDED.department, updated_at = NOW()",
        )
        .bind(&record.employee_code)
        .bind(income.company_id)
        .bind(income.year)
        .bind(&record.name)
        .bind(&record.department)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO incomes (employee_code, company_id, year, month, salary, overtime, bonus, commission, diligence, allowance, other_income)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (employee_code, company_id, year, month)
             DO UPDATE SET salary = EXCLUDED.salary, overtime = EXCLUDED.overtime, bonus = EXCLUDED.bonus,
                 commission = EXCLUDED.commission, diligence = EXCLUDED.diligence,
                 allowance = EXCLUDED.allowance, other_income = EXCLUDED.other_income",
        )
        .bind(&income.employee_code)
        .bind(income.company_id)
        .bind(income.year)
        .bind(income.month)
        .bind(income.salary)
        .bind(income.overtime)
        .bind(income.bonus)
        .bind(income.commission)
        .bind(income.diligence)
        .bind(income.allowance)
        .bind(income.other_income)
        .execute(&mut **tx)
        .await?;

        let expense = &record.expense;
        sqlx::query(
            "INSERT INTO expenses (employee_code, company_id, year, month, loan, absence, late, advance, other_deduction)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (employee_code, company_id, year, month)
             DO UPDATE SET loan = EXCLUDED.loan, absence = EXCLUDED.absence, late = EXCLUDED.late,
                 advance = EXCLUDED.advance, other_deduction = EXCLUDED.other_deduction",
        )
        .bind(&expense.employee_code)
        .bind(expense.company_id)
        .bind(expense.year)
        .bind(expense.month)
        .bind(expense.loan)
        .bind(expense.absence)
        .bind(expense.late)
        .bind(expense.advance)
        .bind(expense.other_deduction)
        .execute(&mut **tx)
        .await?;

        let tax = &record.tax;
        sqlx::query(
            "INSERT INTO taxes (employee_code, company_id, year, month, employee_tax, social_security, provident_fund)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (employee_code, company_id, year, month)
             DO UPDATE SET employee_tax = EXCLUDED.employee_tax, social_security = EXCLUDED.social_security,
                 provident_fund = EXCLUDED.provident_fund",
        )
        .bind(&tax.employee_code)
        .bind(tax.company_id)
        .bind(tax.year)
        .bind(tax.month)
        .bind(tax.employee_tax)
        .bind(tax.social_security)
        .bind(tax.provident_fund)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Removes one employee-year and its payroll rows.
pub async fn delete_employee_year(
    pool: &PgPool,
    company_id: Uuid,
    year: i32,
    employee_code: &str,
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    for table in ["taxes", "expenses", "incomes"] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE company_id = $1 AND year = $2 AND employee_code = $3",
            table
        ))
        .bind(company_id)
        .bind(year)
        .bind(employee_code)
        .execute(&mut *tx)
        .await?;
    }
    let deleted = sqlx::query(
        "DELETE FROM employees WHERE company_id = $1 AND year = $2 AND employee_code = $3",
    )
    .bind(company_id)
    .bind(year)
    .bind(employee_code)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;
    Ok(deleted)
}
