//! Employee Salary: time-sliced, versioned-not-mutated compensation record.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmployeeSalary {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub basic_salary: Decimal,
    pub salary_structure_notch_id: Option<Uuid>,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub is_current: bool,
    pub reason: String,
}

impl EmployeeSalary {
    /// `current_salary(employee, as_of)` — spec.md §4.B: the row with
    /// `effective_from <= as_of` and the maximum such `effective_from`.
    pub fn resolve_current<'a>(
        salaries: &'a [EmployeeSalary],
        employee_id: Uuid,
        as_of: NaiveDate,
    ) -> Option<&'a EmployeeSalary> {
        salaries
            .iter()
            .filter(|s| s.employee_id == employee_id && s.effective_from <= as_of)
            .max_by_key(|s| s.effective_from)
    }

    /// Closes this record out because `new_effective_from` supersedes it.
    /// Never mutates the amount — only the window and current flag.
    pub fn close_out(&mut self, new_effective_from: NaiveDate) {
        self.effective_to = Some(new_effective_from - chrono::Duration::days(1));
        self.is_current = false;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmployeeSalaryComponent {
    pub id: Uuid,
    pub employee_salary_id: Uuid,
    pub pay_component_code: String,
    pub amount: Decimal,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl EmployeeSalaryComponent {
    pub fn active<'a>(
        components: &'a [EmployeeSalaryComponent],
        employee_salary_id: Uuid,
        as_of: NaiveDate,
    ) -> Vec<&'a EmployeeSalaryComponent> {
        components
            .iter()
            .filter(|c| {
                c.employee_salary_id == employee_salary_id
                    && c.effective_from <= as_of
                    && c.effective_to.map(|to| to >= as_of).unwrap_or(true)
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// An employee-level change of notch (and optionally grade/position) with
/// an approval workflow (spec.md §3 "Salary Upgrade Request").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalaryUpgradeRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub new_notch_id: Uuid,
    pub new_grade_id: Option<Uuid>,
    pub new_position_id: Option<Uuid>,
    pub reason: String,
    pub effective_from: NaiveDate,
    pub status: UpgradeRequestStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// Shared across a bulk-created batch (salary_upgrade_service.py::bulk_create).
    pub is_bulk: bool,
    pub bulk_reference: Option<String>,
}

impl SalaryUpgradeRequest {
    pub fn approve(&mut self, approver: Uuid, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != UpgradeRequestStatus::Pending {
            return Err(format!("request is already {:?}", self.status));
        }
        self.status = UpgradeRequestStatus::Approved;
        self.approved_by = Some(approver);
        self.approved_at = Some(now);
        Ok(())
    }

    pub fn reject(&mut self, approver: Uuid, now: DateTime<Utc>, reason: String) -> Result<(), String> {
        if self.status != UpgradeRequestStatus::Pending {
            return Err(format!("request is already {:?}", self.status));
        }
        self.status = UpgradeRequestStatus::Rejected;
        self.approved_by = Some(approver);
        self.approved_at = Some(now);
        self.rejection_reason = Some(reason);
        Ok(())
    }
}
