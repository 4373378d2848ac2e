//! Lifecycle State Machine (§4.J): the Run and Period transition tables.
//!
//! Grounded on `workflow_service.py`'s approve/reject/process_payment
//! methods and `views.py` lines 340-599 (the reopen/close endpoints), kept
//! here as explicit match-based transition functions rather than the
//! teacher's method-per-aggregate style, since Run and Period transitions
//! are cross-cutting (a Run transition frequently cascades into a Period
//! status change).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::payroll_model::run::{ItemStatus, PayrollItem, PayrollPeriod, PayrollRun, PeriodStatus, RunStatus};
use crate::payroll::error::{PayrollError, PayrollResult};

/// `approve(run)` (spec.md §4.J): COMPUTED, error_item_count = 0 -> APPROVED;
/// Items COMPUTED -> APPROVED; period -> APPROVED.
pub fn approve(run: &mut PayrollRun, items: &mut [PayrollItem], period: &mut PayrollPeriod, approver: Uuid, now: DateTime<Utc>) -> PayrollResult<()> {
    if run.status != RunStatus::Computed {
        return Err(PayrollError::illegal_transition("approve", format!("{:?}", run.status), "APPROVED"));
    }
    let error_count = items.iter().filter(|i| i.status == ItemStatus::Error).count();
    if error_count > 0 {
        return Err(PayrollError::Validation(format!(
            "cannot approve run {}: {} item(s) in ERROR status",
            run.id, error_count
        )));
    }
    for item in items.iter_mut() {
        if item.status == ItemStatus::Computed {
            item.status = ItemStatus::Approved;
        }
    }
    run.status = RunStatus::Approved;
    run.approved_by = Some(approver);
    run.approved_at = Some(now);
    period.status = PeriodStatus::Approved;
    Ok(())
}

/// `reject(run)` (spec.md §4.J): COMPUTED|REVIEWING -> REJECTED; period -> OPEN.
pub fn reject(run: &mut PayrollRun, period: &mut PayrollPeriod) -> PayrollResult<()> {
    if !matches!(run.status, RunStatus::Computed | RunStatus::Reviewing) {
        return Err(PayrollError::illegal_transition("reject", format!("{:?}", run.status), "REJECTED"));
    }
    run.status = RunStatus::Rejected;
    period.status = PeriodStatus::Open;
    Ok(())
}

/// `process_payment(run)` (spec.md §4.J): APPROVED -> PROCESSING_PAYMENT ->
/// PAID; Items APPROVED -> PAID with date+reference; period -> PAID.
pub fn process_payment(
    run: &mut PayrollRun,
    items: &mut [PayrollItem],
    period: &mut PayrollPeriod,
    payment_reference: String,
    now: DateTime<Utc>,
) -> PayrollResult<()> {
    if run.status != RunStatus::Approved {
        return Err(PayrollError::illegal_transition("process_payment", format!("{:?}", run.status), "PAID"));
    }
    run.status = RunStatus::ProcessingPayment;
    for item in items.iter_mut() {
        if item.status == ItemStatus::Approved {
            item.status = ItemStatus::Paid;
        }
    }
    run.status = RunStatus::Paid;
    run.paid_at = Some(now);
    run.payment_reference = Some(payment_reference);
    period.status = PeriodStatus::Paid;
    Ok(())
}

/// `reset_to_draft(run)` (spec.md §4.J): COMPUTED|REJECTED -> DRAFT (period
/// must not be PAID/CLOSED); caller is responsible for deleting the
/// existing Items once this returns Ok — the state change and the deletion
/// are one storage transaction the core doesn't own.
pub fn reset_to_draft(run: &mut PayrollRun, period: &PayrollPeriod) -> PayrollResult<()> {
    if !matches!(run.status, RunStatus::Computed | RunStatus::Rejected) {
        return Err(PayrollError::illegal_transition("reset_to_draft", format!("{:?}", run.status), "DRAFT"));
    }
    if matches!(period.status, PeriodStatus::Paid | PeriodStatus::Closed) {
        return Err(PayrollError::illegal_transition("reset_to_draft", format!("{:?}", period.status), "DRAFT"));
    }
    run.status = RunStatus::Draft;
    run.totals = Default::default();
    Ok(())
}

/// `delete(run)` (spec.md §4.J): DRAFT -> soft-deleted.
pub fn delete(run: &mut PayrollRun) -> PayrollResult<()> {
    if run.status != RunStatus::Draft {
        return Err(PayrollError::illegal_transition("delete", format!("{:?}", run.status), "deleted"));
    }
    run.is_deleted = true;
    Ok(())
}

pub struct ReopenOutcome {
    pub previous_status: PeriodStatus,
    pub runs_reset: usize,
}

/// `reopen(period)` (spec.md §4.J): from PAID/CLOSED requires `force` and a
/// non-empty `reason`; optionally resets runs (COMPUTED/APPROVED/REVIEWING
/// -> DRAFT; PAID/REVERSED -> REJECTED). Result: period -> OPEN.
pub fn reopen(
    period: &mut PayrollPeriod,
    runs: &mut [PayrollRun],
    force: bool,
    reason: &str,
) -> PayrollResult<ReopenOutcome> {
    let previous_status = period.status;
    if matches!(previous_status, PeriodStatus::Paid | PeriodStatus::Closed) {
        if !force {
            return Err(PayrollError::illegal_transition("reopen", format!("{:?}", previous_status), "OPEN"));
        }
        if reason.trim().is_empty() {
            return Err(PayrollError::Validation("reopen requires a non-empty reason when forcing".into()));
        }
    }

    let mut runs_reset = 0;
    for run in runs.iter_mut() {
        match run.status {
            RunStatus::Computed | RunStatus::Approved | RunStatus::Reviewing => {
                run.status = RunStatus::Draft;
                runs_reset += 1;
            }
            RunStatus::Paid | RunStatus::Reversed => {
                run.status = RunStatus::Rejected;
                runs_reset += 1;
            }
            _ => {}
        }
    }

    period.status = PeriodStatus::Open;
    Ok(ReopenOutcome { previous_status, runs_reset })
}

/// `close(period)` (spec.md §4.J): allowed from PAID or APPROVED only.
pub fn close(period: &mut PayrollPeriod) -> PayrollResult<()> {
    if !matches!(period.status, PeriodStatus::Paid | PeriodStatus::Approved) {
        return Err(PayrollError::illegal_transition("close", format!("{:?}", period.status), "CLOSED"));
    }
    period.status = PeriodStatus::Closed;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_period(status: PeriodStatus) -> PayrollPeriod {
        PayrollPeriod {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            name: "Jan 2026".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            status,
            payment_date: None,
            is_supplementary: false,
            parent_period_id: None,
        }
    }

    fn sample_run(status: RunStatus) -> PayrollRun {
        PayrollRun {
            id: Uuid::new_v4(),
            period_id: Uuid::new_v4(),
            run_number: "PR-202601-001".into(),
            status,
            totals: Default::default(),
            computed_by: None,
            computed_at: None,
            approved_by: None,
            approved_at: None,
            paid_at: None,
            payment_reference: None,
            is_deleted: false,
        }
    }

    #[test]
    fn approve_rejects_when_items_have_errors() {
        let mut run = sample_run(RunStatus::Computed);
        let mut period = sample_period(PeriodStatus::Computed);
        let mut items = vec![PayrollItem {
            id: Uuid::new_v4(),
            run_id: run.id,
            employee_id: Uuid::new_v4(),
            employee_number: "E1".into(),
            basic_salary: Default::default(),
            gross_earnings: Default::default(),
            total_deductions: Default::default(),
            net_salary: Default::default(),
            taxable_income: Default::default(),
            paye: Default::default(),
            overtime_tax: Default::default(),
            bonus_tax: Default::default(),
            total_overtime: Default::default(),
            total_bonus: Default::default(),
            ssnit_employee: Default::default(),
            ssnit_employer: Default::default(),
            tier2_employer: Default::default(),
            employer_cost: Default::default(),
            proration_factor: Default::default(),
            days_payable: 0,
            total_days: 0,
            bank_snapshot: None,
            status: ItemStatus::Error,
            error_message: Some("boom".into()),
        }];
        let result = approve(&mut run, &mut items, &mut period, Uuid::new_v4(), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn reopen_paid_without_force_is_illegal() {
        let mut period = sample_period(PeriodStatus::Paid);
        let mut runs = vec![];
        let result = reopen(&mut period, &mut runs, false, "");
        assert!(matches!(result, Err(PayrollError::IllegalTransition { .. })));
    }

    #[test]
    fn reopen_paid_with_force_and_reason_resets_runs() {
        let mut period = sample_period(PeriodStatus::Paid);
        let mut runs = vec![sample_run(RunStatus::Paid)];
        let outcome = reopen(&mut period, &mut runs, true, "correction requested by finance").unwrap();
        assert_eq!(outcome.runs_reset, 1);
        assert_eq!(runs[0].status, RunStatus::Rejected);
        assert_eq!(period.status, PeriodStatus::Open);
    }
}
