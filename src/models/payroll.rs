//! Monthly payroll rows. Each table holds at most one row per
//! (employee_code, company_id, year, month).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Income {
    pub employee_code: String,
    pub company_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub salary: Option<Decimal>,
    pub overtime: Option<Decimal>,
    pub bonus: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub diligence: Option<Decimal>,
    pub allowance: Option<Decimal>,
    pub other_income: Option<Decimal>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub employee_code: String,
    pub company_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub loan: Option<Decimal>,
    pub absence: Option<Decimal>,
    pub late: Option<Decimal>,
    pub advance: Option<Decimal>,
    pub other_deduction: Option<Decimal>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tax {
    pub employee_code: String,
    pub company_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub employee_tax: Option<Decimal>,
    pub social_security: Option<Decimal>,
    pub provident_fund: Option<Decimal>,
}

/// Shared view over the three payroll tables.
pub trait PayrollRow {
    fn period(&self) -> (i32, i32);
    fn employee_code(&self) -> &str;
    /// Sum of every amount on the row, absent amounts counted as zero.
    fn total(&self) -> Decimal;
}

fn sum(fields: &[Option<Decimal>]) -> Decimal {
    fields.iter().map(|f| f.unwrap_or_default()).sum()
}

impl PayrollRow for Income {
    fn period(&self) -> (i32, i32) {
        (self.year, self.month)
    }

    fn employee_code(&self) -> &str {
        &self.employee_code
    }

    fn total(&self) -> Decimal {
        sum(&[
            self.salary,
            self.overtime,
            self.bonus,
            self.commission,
            self.diligence,
            self.allowance,
            self.other_income,
        ])
    }
}

impl PayrollRow for Expense {
    fn period(&self) -> (i32, i32) {
        (self.year, self.month)
    }

    fn employee_code(&self) -> &str {
        &self.employee_code
    }

    fn total(&self) -> Decimal {
        sum(&[
            self.loan,
            self.absence,
            self.late,
            self.advance,
            self.other_deduction,
        ])
    }
}

impl PayrollRow for Tax {
    fn period(&self) -> (i32, i32) {
        (self.year, self.month)
    }

    fn employee_code(&self) -> &str {
        &self.employee_code
    }

    fn total(&self) -> Decimal {
        sum(&[self.employee_tax, self.social_security, self.provident_fund])
    }
}
