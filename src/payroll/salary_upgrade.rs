//! Salary Upgrade workflow: the side-effecting counterpart to
//! `SalaryUpgradeRequest`'s plain status flips in `domain::payroll_model`.
//!
//! Grounded on `salary_upgrade_service.py::SalaryUpgradeService` —
//! `create_request`, `approve_request`/`_apply_upgrade`, `reject_request`,
//! and `bulk_create`. `_apply_upgrade` is the interesting part: it closes
//! the current `EmployeeSalary`, opens a successor, updates the employee's
//! grade/notch/position, writes one `EmploymentHistoryEntry`, and — when the
//! new salary is backdated before the active period's start — auto-drafts a
//! `BackpayRequest` rather than requiring a separate detector pass.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::payroll_model::backpay::{BackpayReason, BackpayRequest, BackpayStatus};
use crate::domain::payroll_model::employee::{ChangeType, EmploymentHistoryEntry};
use crate::domain::payroll_model::employee_salary::{EmployeeSalary, SalaryUpgradeRequest, UpgradeRequestStatus};
use crate::domain::payroll_model::run::PayrollPeriod;
use crate::payroll::error::{PayrollError, PayrollResult};

/// `create_request` (spec.md §3 SalaryUpgradeRequest): rejects a no-op
/// upgrade where the requested notch matches the employee's current one.
pub fn create_request(
    request: &SalaryUpgradeRequest,
    current_notch_id: Option<Uuid>,
) -> PayrollResult<()> {
    if request.new_notch_id == current_notch_id.unwrap_or(Uuid::nil()) {
        return Err(PayrollError::Validation(
            "new notch must differ from the employee's current notch".into(),
        ));
    }
    Ok(())
}

/// Fields the caller must resolve before invoking `apply_upgrade`: the new
/// notch's amount, and the prior grade/position/salary snapshot needed to
/// classify the change and populate the history row.
pub struct UpgradeFacts {
    pub new_notch_amount: rust_decimal::Decimal,
    pub previous_grade_id: Option<Uuid>,
    pub previous_position_id: Option<Uuid>,
}

pub struct ApplyUpgradeOutcome {
    pub closed_salary: EmployeeSalary,
    pub new_salary: EmployeeSalary,
    pub history_entry: EmploymentHistoryEntry,
    pub auto_backpay: Option<BackpayRequest>,
}

/// `_apply_upgrade(req, user)` (spec.md §3 / `salary_upgrade_service.py`):
/// closes the current salary row, opens the successor effective on the
/// request's date, derives the employment-history change type from which
/// of grade/position changed, and auto-drafts a backdated BackpayRequest
/// when the new salary's effective date falls before the active period.
pub fn apply_upgrade(
    request: &mut SalaryUpgradeRequest,
    current_salary: &EmployeeSalary,
    facts: &UpgradeFacts,
    active_period: Option<&PayrollPeriod>,
    approver: Uuid,
    now: DateTime<Utc>,
) -> PayrollResult<ApplyUpgradeOutcome> {
    if request.status != UpgradeRequestStatus::Pending {
        return Err(PayrollError::illegal_transition(
            "apply_upgrade",
            format!("{:?}", request.status),
            "APPROVED",
        ));
    }
    if current_salary.employee_id != request.employee_id {
        return Err(PayrollError::Validation(
            "current salary does not belong to the upgrade request's employee".into(),
        ));
    }

    let mut closed_salary = current_salary.clone();
    closed_salary.close_out(request.effective_from);

    let new_salary = EmployeeSalary {
        id: Uuid::new_v4(),
        employee_id: request.employee_id,
        basic_salary: facts.new_notch_amount,
        salary_structure_notch_id: Some(request.new_notch_id),
        effective_from: request.effective_from,
        effective_to: None,
        is_current: true,
        reason: request.reason.clone(),
    };

    let change_type = match (request.new_grade_id, request.new_position_id) {
        (Some(_), Some(_)) => ChangeType::Promotion,
        (Some(_), None) => ChangeType::GradeChange,
        _ => ChangeType::SalaryRevision,
    };

    let history_entry = EmploymentHistoryEntry {
        id: Uuid::new_v4(),
        employee_id: request.employee_id,
        change_type,
        effective_date: request.effective_from,
        previous_grade_id: facts.previous_grade_id,
        new_grade_id: request.new_grade_id.or(facts.previous_grade_id),
        previous_salary: current_salary.basic_salary,
        new_salary: facts.new_notch_amount,
        reason: request.reason.clone(),
        approved_by: Some(approver),
    };

    let auto_backpay = active_period
        .filter(|p| request.effective_from < p.start_date)
        .map(|p| BackpayRequest {
            id: Uuid::new_v4(),
            employee_id: request.employee_id,
            reason: match change_type {
                ChangeType::Promotion | ChangeType::GradeChange => BackpayReason::Upgrade,
                _ => BackpayReason::SalaryRevision,
            },
            description: format!("Auto-created from salary upgrade: {}", request.reason),
            effective_from: request.effective_from,
            effective_to: p.start_date - chrono::Duration::days(1),
            new_salary_id: Some(new_salary.id),
            old_salary_id: Some(closed_salary.id),
            reference_period_id: Some(p.id),
            status: BackpayStatus::Draft,
            net_arrears: rust_decimal::Decimal::ZERO,
            created_by: Some(approver),
            applied_to_run_id: None,
            applied_at: None,
        });

    request.approve(approver, now).map_err(PayrollError::Validation)?;

    Ok(ApplyUpgradeOutcome { closed_salary, new_salary, history_entry, auto_backpay })
}

/// `reject_request` (spec.md §3): a straight status flip, no side effects.
pub fn reject_request(
    request: &mut SalaryUpgradeRequest,
    approver: Uuid,
    now: DateTime<Utc>,
    reason: String,
) -> PayrollResult<()> {
    request.reject(approver, now, reason).map_err(PayrollError::Validation)
}

/// `bulk_create` (spec.md §3 "bulk variant"): every generated request shares
/// one `bulk_reference` so the caller can later approve/reject the batch as
/// a unit; each employee still gets its own row and its own `create_request`
/// validation.
pub fn bulk_requests(
    employee_ids: &[Uuid],
    new_notch_id: Uuid,
    new_grade_id: Option<Uuid>,
    reason: &str,
    effective_from: NaiveDate,
) -> Vec<SalaryUpgradeRequest> {
    let bulk_reference = format!("BULK-{}", Uuid::new_v4());
    employee_ids
        .iter()
        .map(|&employee_id| SalaryUpgradeRequest {
            id: Uuid::new_v4(),
            employee_id,
            new_notch_id,
            new_grade_id,
            new_position_id: None,
            reason: reason.to_string(),
            effective_from,
            status: UpgradeRequestStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            is_bulk: true,
            bulk_reference: Some(bulk_reference.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn salary(employee_id: Uuid, basic: rust_decimal::Decimal, from: NaiveDate) -> EmployeeSalary {
        EmployeeSalary {
            id: Uuid::new_v4(),
            employee_id,
            basic_salary: basic,
            salary_structure_notch_id: None,
            effective_from: from,
            effective_to: None,
            is_current: true,
            reason: "initial".into(),
        }
    }

    fn request(employee_id: Uuid, new_notch_id: Uuid, effective_from: NaiveDate) -> SalaryUpgradeRequest {
        SalaryUpgradeRequest {
            id: Uuid::new_v4(),
            employee_id,
            new_notch_id,
            new_grade_id: None,
            new_position_id: None,
            reason: "annual review".into(),
            effective_from,
            status: UpgradeRequestStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            is_bulk: false,
            bulk_reference: None,
        }
    }

    #[test]
    fn apply_upgrade_closes_old_salary_and_opens_new_one() {
        let employee_id = Uuid::new_v4();
        let current = salary(employee_id, dec!(4000), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let mut req = request(employee_id, Uuid::new_v4(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let facts = UpgradeFacts { new_notch_amount: dec!(5000), previous_grade_id: None, previous_position_id: None };

        let outcome = apply_upgrade(&mut req, &current, &facts, None, Uuid::new_v4(), Utc::now()).unwrap();

        assert!(!outcome.closed_salary.is_current);
        assert_eq!(outcome.closed_salary.effective_to, Some(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
        assert_eq!(outcome.new_salary.basic_salary, dec!(5000));
        assert!(outcome.new_salary.is_current);
        assert_eq!(req.status, UpgradeRequestStatus::Approved);
    }

    #[test]
    fn backdated_upgrade_auto_drafts_backpay() {
        let employee_id = Uuid::new_v4();
        let current = salary(employee_id, dec!(4000), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let mut req = request(employee_id, Uuid::new_v4(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let facts = UpgradeFacts { new_notch_amount: dec!(5000), previous_grade_id: None, previous_position_id: None };
        let period = PayrollPeriod {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            name: "Mar 2026".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            status: crate::domain::payroll_model::run::PeriodStatus::Open,
            payment_date: None,
            is_supplementary: false,
            parent_period_id: None,
        };

        let outcome = apply_upgrade(&mut req, &current, &facts, Some(&period), Uuid::new_v4(), Utc::now()).unwrap();

        let backpay = outcome.auto_backpay.expect("backdated upgrade should auto-draft backpay");
        assert_eq!(backpay.status, BackpayStatus::Draft);
        assert_eq!(backpay.effective_from, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(backpay.effective_to, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn non_pending_request_cannot_be_applied() {
        let employee_id = Uuid::new_v4();
        let current = salary(employee_id, dec!(4000), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let mut req = request(employee_id, Uuid::new_v4(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        req.status = UpgradeRequestStatus::Rejected;
        let facts = UpgradeFacts { new_notch_amount: dec!(5000), previous_grade_id: None, previous_position_id: None };

        let result = apply_upgrade(&mut req, &current, &facts, None, Uuid::new_v4(), Utc::now());
        assert!(matches!(result, Err(PayrollError::IllegalTransition { .. })));
    }
}
