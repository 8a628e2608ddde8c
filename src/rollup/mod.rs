//! Financial rollups over payroll rows.
//!
//! Every reporting route goes through these functions. They are pure: callers
//! fetch the rows for a scope (one employee, one company, one year) and hand
//! them over. Absent amounts count as zero and negative amounts are summed as
//! they are.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::employee::Employee;
use crate::models::payroll::{Expense, Income, PayrollRow, Tax};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub year: i32,
    pub month: i32,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub total_tax: Decimal,
    pub net_income: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub total_tax: Decimal,
    pub net_income: Decimal,
}

/// Per-(year, month) totals, ordered by period.
///
/// A month bucket only exists once an income row has opened it. Expense and
/// tax rows for a month without income are dropped from the summaries.
pub fn monthly_summaries(income: &[Income], expense: &[Expense], tax: &[Tax]) -> Vec<MonthlySummary> {
    let mut buckets: BTreeMap<(i32, i32), MonthlySummary> = BTreeMap::new();

    for row in income {
        let (year, month) = row.period();
        let bucket = buckets.entry((year, month)).or_insert_with(|| MonthlySummary {
            year,
            month,
            total_income: Decimal::ZERO,
            total_expense: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            net_income: Decimal::ZERO,
        });
        bucket.total_income += row.total();
    }

    for row in expense {
        if let Some(bucket) = buckets.get_mut(&row.period()) {
            bucket.total_expense += row.total();
        }
    }

    for row in tax {
        if let Some(bucket) = buckets.get_mut(&row.period()) {
            bucket.total_tax += row.total();
        }
    }

    buckets
        .into_values()
        .map(|mut s| {
            s.net_income = s.total_income - s.total_expense - s.total_tax;
            s
        })
        .collect()
}

pub fn total_summary(months: &[MonthlySummary]) -> TotalSummary {
    let mut total = months.iter().fold(TotalSummary::default(), |mut acc, m| {
        acc.total_income += m.total_income;
        acc.total_expense += m.total_expense;
        acc.total_tax += m.total_tax;
        acc
    });
    total.net_income = total.total_income - total.total_expense - total.total_tax;
    total
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeBreakdown {
    pub salary: Decimal,
    pub overtime: Decimal,
    pub bonus: Decimal,
    pub commission: Decimal,
    pub diligence: Decimal,
    pub allowance: Decimal,
    pub other_income: Decimal,
}

impl IncomeBreakdown {
    pub fn total(&self) -> Decimal {
        self.salary
            + self.overtime
            + self.bonus
            + self.commission
            + self.diligence
            + self.allowance
            + self.other_income
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseBreakdown {
    pub loan: Decimal,
    pub absence: Decimal,
    pub late: Decimal,
    pub advance: Decimal,
    pub other_deduction: Decimal,
}

impl ExpenseBreakdown {
    pub fn total(&self) -> Decimal {
        self.loan + self.absence + self.late + self.advance + self.other_deduction
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub employee_tax: Decimal,
    pub social_security: Decimal,
    pub provident_fund: Decimal,
}

impl TaxBreakdown {
    pub fn total(&self) -> Decimal {
        self.employee_tax + self.social_security + self.provident_fund
    }
}

fn amount(value: Option<Decimal>) -> Decimal {
    value.unwrap_or_default()
}

pub fn income_breakdown(rows: &[Income]) -> IncomeBreakdown {
    rows.iter().fold(IncomeBreakdown::default(), |mut b, r| {
        b.salary += amount(r.salary);
        b.overtime += amount(r.overtime);
        b.bonus += amount(r.bonus);
        b.commission += amount(r.commission);
        b.diligence += amount(r.diligence);
        b.allowance += amount(r.allowance);
        b.other_income += amount(r.other_income);
        b
    })
}

pub fn expense_breakdown(rows: &[Expense]) -> ExpenseBreakdown {
    rows.iter().fold(ExpenseBreakdown::default(), |mut b, r| {
        b.loan += amount(r.loan);
        b.absence += amount(r.absence);
        b.late += amount(r.late);
        b.advance += amount(r.advance);
        b.other_deduction += amount(r.other_deduction);
        b
    })
}

pub fn tax_breakdown(rows: &[Tax]) -> TaxBreakdown {
    rows.iter().fold(TaxBreakdown::default(), |mut b, r| {
        b.employee_tax += amount(r.employee_tax);
        b.social_security += amount(r.social_security);
        b.provident_fund += amount(r.provident_fund);
        b
    })
}

/// Income fields that can be bucketed into pay bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandField {
    Commission,
    Diligence,
}

impl BandField {
    fn read(&self, row: &Income) -> Option<Decimal> {
        match self {
            BandField::Commission => row.commission,
            BandField::Diligence => row.diligence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAmount {
    pub employee_code: String,
    pub name: String,
    /// `None` when none of the employee's rows carries the field.
    pub amount: Option<Decimal>,
}

/// Yearly total of `field` for each employee, in the order given.
pub fn yearly_field_totals(employees: &[Employee], incomes: &[Income], field: BandField) -> Vec<EmployeeAmount> {
    employees
        .iter()
        .map(|e| {
            let amount = incomes
                .iter()
                .filter(|r| r.employee_code == e.employee_code && r.year == e.year)
                .filter_map(|r| field.read(r))
                .fold(None, |acc: Option<Decimal>, v| Some(acc.unwrap_or_default() + v));
            EmployeeAmount {
                employee_code: e.employee_code.clone(),
                name: e.name.clone(),
                amount,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub label: String,
    pub min: Decimal,
    pub max: Option<Decimal>,
    pub count: usize,
    pub members: Vec<EmployeeAmount>,
}

/// Inclusive upper bounds of the first four bands; the fifth is open ended.
const BAND_LIMITS: [i64; 4] = [10_000, 20_000, 30_000, 40_000];

fn empty_bands() -> Vec<Band> {
    let mut bands = Vec::with_capacity(BAND_LIMITS.len() + 1);
    let mut lower = 0i64;
    for upper in BAND_LIMITS {
        bands.push(Band {
            label: format!("{}-{}", lower, upper),
            min: Decimal::from(lower),
            max: Some(Decimal::from(upper)),
            count: 0,
            members: Vec::new(),
        });
        lower = upper + 1;
    }
    bands.push(Band {
        label: format!("{}+", lower),
        min: Decimal::from(lower),
        max: None,
        count: 0,
        members: Vec::new(),
    });
    bands
}

fn band_index(value: Decimal) -> usize {
    BAND_LIMITS
        .iter()
        .position(|upper| value <= Decimal::from(*upper))
        .unwrap_or(BAND_LIMITS.len())
}

/// Places every employee carrying an amount into exactly one of five bands.
pub fn range_bucketing(employees: &[EmployeeAmount]) -> Vec<Band> {
    let mut bands = empty_bands();
    for employee in employees {
        if let Some(value) = employee.amount {
            let band = &mut bands[band_index(value)];
            band.count += 1;
            band.members.push(employee.clone());
        }
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn income(code: &str, month: i32, salary: i64, overtime: i64) -> Income {
        Income {
            employee_code: code.to_string(),
            year: 2024,
            month,
            salary: Some(d(salary)),
            overtime: Some(d(overtime)),
            bonus: Some(d(0)),
            ..Default::default()
        }
    }

    fn expense(code: &str, month: i32, loan: i64) -> Expense {
        Expense {
            employee_code: code.to_string(),
            year: 2024,
            month,
            loan: Some(d(loan)),
            ..Default::default()
        }
    }

    fn tax(code: &str, month: i32, employee_tax: i64) -> Tax {
        Tax {
            employee_code: code.to_string(),
            year: 2024,
            month,
            employee_tax: Some(d(employee_tax)),
            ..Default::default()
        }
    }

    fn employee(code: &str) -> Employee {
        Employee {
            employee_code: code.to_string(),
            company_id: Uuid::nil(),
            year: 2024,
            name: format!("Employee {}", code),
            department: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn single_month_example() {
        let months = monthly_summaries(
            &[income("E1", 1, 20_000, 500)],
            &[expense("E1", 1, 1_000)],
            &[tax("E1", 1, 300)],
        );
        assert_eq!(months.len(), 1);
        let m = &months[0];
        assert_eq!(m.total_income, d(20_500));
        assert_eq!(m.total_expense, d(1_000));
        assert_eq!(m.total_tax, d(300));
        assert_eq!(m.net_income, d(19_200));
    }

    #[test]
    fn no_rows_means_zero_net() {
        assert!(monthly_summaries(&[], &[], &[]).is_empty());
        let total = total_summary(&[]);
        assert_eq!(total.net_income, Decimal::ZERO);
        assert_eq!(total, TotalSummary::default());
    }

    #[test]
    fn months_are_grouped_and_ordered() {
        let months = monthly_summaries(
            &[
                income("E1", 3, 100, 0),
                income("E2", 1, 200, 0),
                income("E1", 1, 300, 0),
            ],
            &[expense("E2", 3, 50)],
            &[],
        );
        let periods: Vec<_> = months.iter().map(|m| m.month).collect();
        assert_eq!(periods, vec![1, 3]);
        assert_eq!(months[0].total_income, d(500));
        assert_eq!(months[1].total_expense, d(50));
        assert_eq!(months[1].net_income, d(50));
    }

    #[test]
    fn expense_and_tax_without_income_month_are_dropped() {
        let months = monthly_summaries(
            &[income("E1", 1, 1_000, 0)],
            &[expense("E1", 2, 400)],
            &[tax("E1", 2, 40)],
        );
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].total_expense, Decimal::ZERO);
        assert_eq!(months[0].total_tax, Decimal::ZERO);
    }

    #[test]
    fn net_income_identity_holds_for_month_and_year() {
        let incomes = vec![income("E1", 1, 15_000, 250), income("E1", 2, 15_000, -100)];
        let expenses = vec![expense("E1", 1, 700), expense("E1", 2, 1_200)];
        let taxes = vec![tax("E1", 1, 150), tax("E1", 2, 90)];
        let months = monthly_summaries(&incomes, &expenses, &taxes);
        for m in &months {
            assert_eq!(m.net_income, m.total_income - m.total_expense - m.total_tax);
        }
        let total = total_summary(&months);
        assert_eq!(total.net_income, total.total_income - total.total_expense - total.total_tax);
        assert_eq!(total.total_income, d(30_150));
    }

    #[test]
    fn breakdowns_sum_to_totals() {
        let mut incomes = vec![income("E1", 1, 18_000, 300), income("E2", 1, 22_000, 0)];
        incomes[1].commission = Some(Decimal::new(123_45, 2));
        incomes[1].other_income = None;
        let mut expenses = vec![expense("E1", 1, 500), expense("E2", 1, 0)];
        expenses[1].late = Some(Decimal::new(75_50, 2));
        let taxes = vec![tax("E1", 1, 200), tax("E2", 1, 310)];

        let total = total_summary(&monthly_summaries(&incomes, &expenses, &taxes));
        assert_eq!(income_breakdown(&incomes).total(), total.total_income);
        assert_eq!(expense_breakdown(&expenses).total(), total.total_expense);
        assert_eq!(tax_breakdown(&taxes).total(), total.total_tax);
    }

    #[test]
    fn breakdown_treats_missing_fields_as_zero() {
        let rows = vec![Income {
            employee_code: "E1".into(),
            year: 2024,
            month: 1,
            ..Default::default()
        }];
        assert_eq!(income_breakdown(&rows), IncomeBreakdown::default());
    }

    #[test]
    fn bands_are_inclusive_on_upper_bound() {
        assert_eq!(band_index(d(-5)), 0);
        assert_eq!(band_index(d(10_000)), 0);
        assert_eq!(band_index(Decimal::new(10_000_50, 2)), 1);
        assert_eq!(band_index(d(20_000)), 1);
        assert_eq!(band_index(d(30_001)), 3);
        assert_eq!(band_index(d(40_001)), 4);
        assert_eq!(band_index(d(1_000_000)), 4);
    }

    #[test]
    fn every_employee_with_the_field_lands_in_one_band() {
        let employees = vec![employee("E1"), employee("E2"), employee("E3"), employee("E4")];
        let mut incomes = Vec::new();
        for (code, month, commission) in [("E1", 1, 6_000), ("E1", 2, 6_000), ("E2", 1, 45_000), ("E3", 1, 0)] {
            let mut row = income(code, month, 10_000, 0);
            row.commission = Some(d(commission));
            incomes.push(row);
        }
        // E4 has income but never a commission amount
        incomes.push(income("E4", 1, 10_000, 0));

        let amounts = yearly_field_totals(&employees, &incomes, BandField::Commission);
        assert_eq!(amounts[0].amount, Some(d(12_000)));
        assert_eq!(amounts[3].amount, None);

        let bands = range_bucketing(&amounts);
        assert_eq!(bands.len(), 5);
        assert_eq!(bands.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(bands[0].members[0].employee_code, "E3");
        assert_eq!(bands[1].members[0].employee_code, "E1");
        assert_eq!(bands[4].members[0].employee_code, "E2");
        assert_eq!(bands[4].max, None);
        assert_eq!(bands[1].label, "10001-20000");
    }
}
