//! Payroll export parsing.
//!
//! Exports carry one row per employee per pay period with Thai column headers.
//! Numbered income (`รายได้ N`) and deduction (`รายหัก N`) slots map onto the
//! named payroll fields; slots past the named ones are summed into the
//! "other" field.

use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::payroll::{Expense, Income, Tax};

pub const COL_EMPLOYEE_CODE: &str = "รหัสพนักงาน";
pub const COL_NAME: &str = "ชื่อ-นามสกุล";
pub const COL_DEPARTMENT: &str = "แผนก";
pub const COL_SALARY: &str = "เงินเดือน";
pub const COL_TAX: &str = "ภาษี";
pub const COL_SOCIAL_SECURITY: &str = "ประกันสังคม";
pub const COL_PROVIDENT_FUND: &str = "กองทุนสำรองเลี้ยงชีพ";
const INCOME_SLOT_PREFIX: &str = "รายได้";
const DEDUCTION_SLOT_PREFIX: &str = "รายหัก";

/// One parsed export row.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollRecord {
    pub employee_code: String,
    pub name: String,
    pub department: Option<String>,
    pub income: Income,
    pub expense: Expense,
    pub tax: Tax,
}

/// Amounts are stored as NUMERIC(14, 2); magnitudes at or above this do not fit.
const AMOUNT_LIMIT: i64 = 1_000_000_000_000;

/// Zero for amounts the payroll columns cannot hold.
fn in_range(value: Decimal) -> Decimal {
    if value.abs() < Decimal::from(AMOUNT_LIMIT) {
        value
    } else {
        Decimal::ZERO
    }
}

/// Reads a cell as an amount. Thousands separators are accepted; anything
/// unparseable or out of range reads as zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',' && *c != ' ').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return Decimal::ZERO;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map(in_range)
        .unwrap_or(Decimal::ZERO)
}

/// Slot number of a `รายได้ 3` / `รายหัก3` style header.
fn slot_number(header: &str, prefix: &str) -> Option<u32> {
    header.strip_prefix(prefix)?.trim().parse().ok()
}

struct Row<'a> {
    headers: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    fn text(&self, column: &str) -> Option<String> {
        let idx = *self.headers.get(column)?;
        let value = self.record.get(idx)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn amount(&self, column: &str) -> Option<Decimal> {
        let idx = *self.headers.get(column)?;
        self.record.get(idx).map(parse_amount)
    }

    /// Sum of every numbered slot under `prefix` whose number satisfies `pick`.
    /// `None` when no such column exists in the file.
    fn slots(&self, prefix: &str, pick: impl Fn(u32) -> bool) -> Option<Decimal> {
        self.headers
            .iter()
            .filter(|(h, _)| slot_number(h, prefix).map_or(false, &pick))
            .filter_map(|(_, idx)| self.record.get(*idx))
            .map(parse_amount)
            .fold(None, |acc, v| {
                let sum = acc.unwrap_or_default().checked_add(v).unwrap_or(Decimal::ZERO);
                Some(in_range(sum))
            })
    }

    fn slot(&self, prefix: &str, n: u32) -> Option<Decimal> {
        self.slots(prefix, |k| k == n)
    }
}

/// Parses a payroll export for `company_id`, period `year`/`month`.
///
/// Blank lines and rows without an employee code are skipped.
pub fn parse_payroll_csv<R: Read>(
    reader: R,
    company_id: Uuid,
    year: i32,
    month: i32,
) -> Result<Vec<PayrollRecord>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: HashMap<String, usize> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
        .collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row = Row { headers: &headers, record: &record };
        let Some(employee_code) = row.text(COL_EMPLOYEE_CODE) else {
            continue;
        };

        let income = Income {
            employee_code: employee_code.clone(),
            company_id,
            year,
            month,
            salary: row.amount(COL_SALARY),
            overtime: row.slot(INCOME_SLOT_PREFIX, 1),
            commission: row.slot(INCOME_SLOT_PREFIX, 2),
            diligence: row.slot(INCOME_SLOT_PREFIX, 3),
            bonus: row.slot(INCOME_SLOT_PREFIX, 4),
            allowance: row.slot(INCOME_SLOT_PREFIX, 5),
            other_income: row.slots(INCOME_SLOT_PREFIX, |n| n >= 6),
        };
        let expense = Expense {
            employee_code: employee_code.clone(),
            company_id,
            year,
            month,
            loan: row.slot(DEDUCTION_SLOT_PREFIX, 1),
            absence: row.slot(DEDUCTION_SLOT_PREFIX, 2),
            late: row.slot(DEDUCTION_SLOT_PREFIX, 3),
            advance: row.slot(DEDUCTION_SLOT_PREFIX, 4),
            other_deduction: row.slots(DEDUCTION_SLOT_PREFIX, |n| n >= 5),
        };
        let tax = Tax {
            employee_code: employee_code.clone(),
            company_id,
            year,
            month,
            employee_tax: row.amount(COL_TAX),
            social_security: row.amount(COL_SOCIAL_SECURITY),
            provident_fund: row.amount(COL_PROVIDENT_FUND),
        };

        records.push(PayrollRecord {
            name: row.text(COL_NAME).unwrap_or_else(|| employee_code.clone()),
            department: row.text(COL_DEPARTMENT),
            employee_code,
            income,
            expense,
            tax,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\u{feff}รหัสพนักงาน,ชื่อ-นามสกุล,แผนก,เงินเดือน,รายได้ 1,รายได้ 2,รายได้ 6,รายได้ 7,รายหัก 1,รายหัก 5,ภาษี,ประกันสังคม
E001,สมชาย ใจดี,บัญชี,\"20,000.00\",500,,10,15,1000,abc,300,750

,,,,,,,,,,,
E002,สมหญิง รักงาน,,18000,0,2500.50,,,,,0,750
";

    #[test]
    fn parses_rows_and_maps_slots() {
        let company = Uuid::new_v4();
        let records = parse_payroll_csv(EXPORT.as_bytes(), company, 2024, 5).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.employee_code, "E001");
        assert_eq!(first.department.as_deref(), Some("บัญชี"));
        assert_eq!(first.income.salary, Some(Decimal::from(20_000)));
        assert_eq!(first.income.overtime, Some(Decimal::from(500)));
        assert_eq!(first.income.commission, Some(Decimal::ZERO));
        assert_eq!(first.income.other_income, Some(Decimal::from(25)));
        assert_eq!(first.income.bonus, None);
        assert_eq!(first.expense.loan, Some(Decimal::from(1_000)));
        assert_eq!(first.expense.other_deduction, Some(Decimal::ZERO));
        assert_eq!(first.tax.employee_tax, Some(Decimal::from(300)));
        assert_eq!(first.tax.provident_fund, None);
        assert_eq!(first.income.company_id, company);
        assert_eq!((first.tax.year, first.tax.month), (2024, 5));

        let second = &records[1];
        assert_eq!(second.department, None);
        assert_eq!(second.income.commission, Some(Decimal::new(2_500_50, 2)));
    }

    #[test]
    fn amounts_default_to_zero() {
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount(" - "), Decimal::ZERO);
        assert_eq!(parse_amount("n/a"), Decimal::ZERO);
        assert_eq!(parse_amount("1,234.5"), Decimal::new(12_345, 1));
        assert_eq!(parse_amount("-200"), Decimal::from(-200));
    }

    #[test]
    fn oversized_amounts_read_as_zero() {
        assert_eq!(parse_amount("79228162514264337593543950335"), Decimal::ZERO);
        assert_eq!(parse_amount("-1,000,000,000,000"), Decimal::ZERO);
        assert_eq!(parse_amount("1e40"), Decimal::ZERO);
        assert_eq!(parse_amount("999,999,999,999.99"), Decimal::new(99_999_999_999_999, 2));

        let csv = "รหัสพนักงาน,รายได้ 6,รายได้ 7,รายได้ 8\n\
                   E1,79228162514264337593543950335,79228162514264337593543950335,10\n\
                   E2,900000000000,900000000000,0\n";
        let records = parse_payroll_csv(csv.as_bytes(), Uuid::nil(), 2024, 1).unwrap();
        assert_eq!(records[0].income.other_income, Some(Decimal::from(10)));
        // Sum no longer fits the column.
        assert_eq!(records[1].income.other_income, Some(Decimal::ZERO));
    }

    #[test]
    fn rows_without_code_are_skipped() {
        let csv = "รหัสพนักงาน,เงินเดือน\n,100\nE9,200\n";
        let records = parse_payroll_csv(csv.as_bytes(), Uuid::nil(), 2023, 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "E9");
    }
}
