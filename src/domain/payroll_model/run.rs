//! Payroll Calendar / Period / Run / Item / Detail — the unit-of-work
//! hierarchy the lifecycle state machine and run orchestrator operate on.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayrollCalendar {
    pub id: Uuid,
    pub year: i32,
    pub month: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Open,
    Processing,
    Computed,
    Approved,
    Paid,
    Closed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayrollPeriod {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    pub payment_date: Option<NaiveDate>,
    pub is_supplementary: bool,
    pub parent_period_id: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Draft,
    Computing,
    Computed,
    Reviewing,
    Approved,
    Rejected,
    ProcessingPayment,
    Paid,
    Reversed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayrollRunTotals {
    pub total_employees: i32,
    pub total_gross: Decimal,
    pub total_deductions: Decimal,
    pub total_net: Decimal,
    pub total_employer_cost: Decimal,
    pub total_paye: Decimal,
    pub total_overtime_tax: Decimal,
    pub total_bonus_tax: Decimal,
    pub total_ssnit_employee: Decimal,
    pub total_ssnit_employer: Decimal,
    pub total_tier2_employer: Decimal,
}

impl Default for PayrollRunTotals {
    fn default() -> Self {
        Self {
            total_employees: 0,
            total_gross: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            total_net: Decimal::ZERO,
            total_employer_cost: Decimal::ZERO,
            total_paye: Decimal::ZERO,
            total_overtime_tax: Decimal::ZERO,
            total_bonus_tax: Decimal::ZERO,
            total_ssnit_employee: Decimal::ZERO,
            total_ssnit_employer: Decimal::ZERO,
            total_tier2_employer: Decimal::ZERO,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayrollRun {
    pub id: Uuid,
    pub period_id: Uuid,
    pub run_number: String,
    pub status: RunStatus,
    pub totals: PayrollRunTotals,
    pub computed_by: Option<Uuid>,
    pub computed_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub is_deleted: bool,
}

impl PayrollRun {
    pub fn run_number(period_year: i32, period_month: u32, sequence: u32) -> String {
        format!("PR-{:04}{:02}-{:03}", period_year, period_month, sequence)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Computed,
    Approved,
    OnHold,
    Paid,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BankAccountSnapshot {
    pub bank_name: String,
    pub branch: String,
    pub account_number: String,
    pub account_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayrollItem {
    pub id: Uuid,
    pub run_id: Uuid,
    pub employee_id: Uuid,
    pub employee_number: String,
    pub basic_salary: Decimal,
    pub gross_earnings: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
    pub taxable_income: Decimal,
    pub paye: Decimal,
    pub overtime_tax: Decimal,
    pub bonus_tax: Decimal,
    pub total_overtime: Decimal,
    pub total_bonus: Decimal,
    pub ssnit_employee: Decimal,
    pub ssnit_employer: Decimal,
    pub tier2_employer: Decimal,
    pub employer_cost: Decimal,
    pub proration_factor: Decimal,
    pub days_payable: i64,
    pub total_days: i64,
    pub bank_snapshot: Option<BankAccountSnapshot>,
    pub status: ItemStatus,
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayrollItemDetail {
    pub id: Uuid,
    pub item_id: Uuid,
    pub pay_component_code: String,
    pub amount: Decimal,
    pub is_arrear: bool,
    pub arrear_months: Option<i32>,
    pub backpay_request_id: Option<Uuid>,
    pub display_order: i32,
}
