//! Minimal employee projection the payroll core needs.
//!
//! The full HR employee aggregate (personal info, documents, benefits
//! elections) lives outside this core's scope; only the fields payroll
//! computation reads are modelled here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Active,
    OnLeave,
    Probation,
    Notice,
    Terminated,
    Suspended,
}

impl EmploymentStatus {
    /// Statuses eligible for a payroll run (spec.md §4.I step 5).
    pub fn is_payroll_eligible(&self) -> bool {
        matches!(
            self,
            EmploymentStatus::Active
                | EmploymentStatus::OnLeave
                | EmploymentStatus::Probation
                | EmploymentStatus::Notice
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank_name: String,
    pub branch: String,
    pub account_number: String,
    pub account_name: String,
    pub is_primary: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayrollEmployee {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub employee_number: String,
    pub full_name: String,
    pub status: EmploymentStatus,
    pub date_of_joining: NaiveDate,
    pub date_of_exit: Option<NaiveDate>,
    pub is_resident: bool,
    pub grade_id: Option<Uuid>,
    pub salary_notch_id: Option<Uuid>,
    pub bank_accounts: Vec<BankAccount>,
}

impl PayrollEmployee {
    pub fn primary_bank_account(&self) -> Option<&BankAccount> {
        self.bank_accounts
            .iter()
            .find(|a| a.is_primary)
            .or_else(|| self.bank_accounts.first())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Hire,
    Promotion,
    GradeChange,
    Demotion,
    SalaryRevision,
}

/// Append-only ledger of grade/position/salary changes — the source of
/// truth for "what grade was the employee on at date D?" (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmploymentHistoryEntry {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub change_type: ChangeType,
    pub effective_date: NaiveDate,
    pub previous_grade_id: Option<Uuid>,
    pub new_grade_id: Option<Uuid>,
    pub previous_salary: Option<Decimal>,
    pub new_salary: Option<Decimal>,
    pub reason: String,
    pub approved_by: Option<Uuid>,
}

/// A one-shot or ad hoc payment approved for a specific (employee, period).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdHocPayment {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub period_id: Uuid,
    pub pay_component_code: String,
    pub amount: Decimal,
    pub is_approved: bool,
    pub processed: bool,
}
