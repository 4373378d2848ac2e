//! Retroactive Change Detector (§4.L): scans for backdated compensation
//! facts touching closed periods and surfaces candidate backpay requests
//! without ever creating one automatically.
//!
//! Grounded line-for-line on `backpay_service.py::RetropayDetectionService`
//! (lines 637-789): the "created during the active period but effective in
//! a past period" rule applied to EmployeeSalary, EmploymentHistory, and
//! EmployeeTransaction, merged per employee via `_add_detection`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::payroll_model::backpay::{BackpayCandidate, BackpayRequest, BackpayStatus, DetectedChange};
use crate::domain::payroll_model::employee::{ChangeType, EmploymentHistoryEntry};
use crate::domain::payroll_model::employee_salary::EmployeeSalary;
use crate::domain::payroll_model::run::{PayrollPeriod, PeriodStatus};
use crate::domain::payroll_model::transaction::{EmployeeTransaction, TargetType, TransactionStatus};

/// `created_at` is tracked separately per row type in the originals; this
/// core threads it in explicitly since none of the payroll_model rows
/// carry their own `created_at` (that lives on the owning `Entity`).
pub struct SalaryFact<'a> {
    pub salary: &'a EmployeeSalary,
    pub created_at: DateTime<Utc>,
}

pub struct HistoryFact<'a> {
    pub entry: &'a EmploymentHistoryEntry,
    pub created_at: DateTime<Utc>,
}

pub struct TransactionFact<'a> {
    pub transaction: &'a EmployeeTransaction,
    pub created_at: DateTime<Utc>,
}

pub struct DetectionScope<'a> {
    pub paid_periods: &'a [PayrollPeriod],
    pub active_period: &'a PayrollPeriod,
    pub existing_requests: &'a [BackpayRequest],
    pub salaries: &'a [SalaryFact<'a>],
    pub history: &'a [HistoryFact<'a>],
    pub transactions: &'a [TransactionFact<'a>],
}

/// `RetropayDetectionService.detect()` (spec.md §4.L).
pub fn detect(scope: &DetectionScope) -> Vec<BackpayCandidate> {
    let covered = covered_employees(scope.existing_requests);

    let mut candidates: HashMap<Uuid, BackpayCandidateBuilder> = HashMap::new();

    let paid_or_closed: Vec<&PayrollPeriod> = scope
        .paid_periods
        .iter()
        .filter(|p| !p.is_supplementary && matches!(p.status, PeriodStatus::Paid | PeriodStatus::Closed))
        .collect();

    for period in &paid_or_closed {
        detect_salary_changes(period, scope, &covered, &mut candidates);
        detect_grade_changes(period, scope, &covered, &mut candidates);
        detect_transaction_changes(period, scope, &covered, &mut candidates);
    }

    candidates.into_values().map(|b| b.finish()).collect()
}

fn covered_employees(requests: &[BackpayRequest]) -> HashSet<Uuid> {
    requests
        .iter()
        .filter(|r| r.status != BackpayStatus::Cancelled)
        .map(|r| r.employee_id)
        .collect()
}

fn created_during_active_window(created_at: DateTime<Utc>, active_period: &PayrollPeriod) -> bool {
    let d = created_at.date_naive();
    d >= active_period.start_date && d <= active_period.end_date
}

struct BackpayCandidateBuilder {
    employee_id: Uuid,
    changes: Vec<DetectedChange>,
    affected_period_ids: Vec<Uuid>,
    earliest_from: chrono::NaiveDate,
    latest_to: chrono::NaiveDate,
}

impl BackpayCandidateBuilder {
    fn new(employee_id: Uuid, period: &PayrollPeriod) -> Self {
        Self {
            employee_id,
            changes: Vec::new(),
            affected_period_ids: vec![period.id],
            earliest_from: period.start_date,
            latest_to: period.end_date,
        }
    }

    fn add(&mut self, period: &PayrollPeriod, change_type: String, description: String, created_at: DateTime<Utc>) {
        self.changes.push(DetectedChange {
            change_type,
            description,
            affected_period_id: period.id,
            created_at,
        });
        if !self.affected_period_ids.contains(&period.id) {
            self.affected_period_ids.push(period.id);
        }
        if period.start_date < self.earliest_from {
            self.earliest_from = period.start_date;
        }
        if period.end_date > self.latest_to {
            self.latest_to = period.end_date;
        }
    }

    fn finish(self) -> BackpayCandidate {
        BackpayCandidate {
            employee_id: self.employee_id,
            changes: self.changes,
            affected_period_ids: self.affected_period_ids,
            earliest_from: self.earliest_from,
            latest_to: self.latest_to,
        }
    }
}

fn entry<'a>(
    candidates: &'a mut HashMap<Uuid, BackpayCandidateBuilder>,
    employee_id: Uuid,
    period: &PayrollPeriod,
) -> &'a mut BackpayCandidateBuilder {
    candidates
        .entry(employee_id)
        .or_insert_with(|| BackpayCandidateBuilder::new(employee_id, period))
}

fn detect_salary_changes(
    period: &PayrollPeriod,
    scope: &DetectionScope,
    covered: &HashSet<Uuid>,
    candidates: &mut HashMap<Uuid, BackpayCandidateBuilder>,
) {
    for fact in scope.salaries {
        let sal = fact.salary;
        if covered.contains(&sal.employee_id) {
            continue;
        }
        if sal.effective_from > period.end_date {
            continue;
        }
        if fact.created_at.date_naive() <= period.end_date {
            continue;
        }
        if !created_during_active_window(fact.created_at, scope.active_period) {
            continue;
        }
        entry(candidates, sal.employee_id, period).add(
            period,
            "SALARY_CHANGE".to_string(),
            format!("Salary revised to {} effective {}", sal.basic_salary, sal.effective_from),
            fact.created_at,
        );
    }
}

fn detect_grade_changes(
    period: &PayrollPeriod,
    scope: &DetectionScope,
    covered: &HashSet<Uuid>,
    candidates: &mut HashMap<Uuid, BackpayCandidateBuilder>,
) {
    for fact in scope.history {
        let entry_row = fact.entry;
        if covered.contains(&entry_row.employee_id) {
            continue;
        }
        if !matches!(
            entry_row.change_type,
            ChangeType::Promotion | ChangeType::GradeChange | ChangeType::SalaryRevision | ChangeType::Demotion
        ) {
            continue;
        }
        if entry_row.effective_date > period.end_date {
            continue;
        }
        if fact.created_at.date_naive() <= period.end_date {
            continue;
        }
        if !created_during_active_window(fact.created_at, scope.active_period) {
            continue;
        }
        let description = format!("{:?} effective {}", entry_row.change_type, entry_row.effective_date);
        entry(candidates, entry_row.employee_id, period).add(
            period,
            format!("{:?}", entry_row.change_type),
            description,
            fact.created_at,
        );
    }
}

fn detect_transaction_changes(
    period: &PayrollPeriod,
    scope: &DetectionScope,
    covered: &HashSet<Uuid>,
    candidates: &mut HashMap<Uuid, BackpayCandidateBuilder>,
) {
    for fact in scope.transactions {
        let txn = fact.transaction;
        let Some(employee_id) = txn.employee_id else { continue };
        if covered.contains(&employee_id) {
            continue;
        }
        if !txn.is_current_version
            || !matches!(txn.status, TransactionStatus::Active | TransactionStatus::Approved)
            || txn.target_type != TargetType::Individual
        {
            continue;
        }
        if txn.effective_from > period.end_date {
            continue;
        }
        if let Some(to) = txn.effective_to {
            if to < period.start_date {
                continue;
            }
        }
        if fact.created_at.date_naive() <= period.end_date {
            continue;
        }
        if !created_during_active_window(fact.created_at, scope.active_period) {
            continue;
        }
        entry(candidates, employee_id, period).add(
            period,
            "TRANSACTION_CHANGE".to_string(),
            format!("{} effective {}", txn.pay_component_code, txn.effective_from),
            fact.created_at,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(id: Uuid, start: NaiveDate, end: NaiveDate, status: PeriodStatus) -> PayrollPeriod {
        PayrollPeriod {
            id,
            calendar_id: Uuid::new_v4(),
            name: "period".into(),
            start_date: start,
            end_date: end,
            status,
            payment_date: None,
            is_supplementary: false,
            parent_period_id: None,
        }
    }

    #[test]
    fn salary_change_created_after_period_during_active_window_is_detected() {
        let employee_id = Uuid::new_v4();
        let paid = period(Uuid::new_v4(), date(2026, 1, 1), date(2026, 1, 31), PeriodStatus::Paid);
        let active = period(Uuid::new_v4(), date(2026, 3, 1), date(2026, 3, 31), PeriodStatus::Open);

        let salary = EmployeeSalary {
            id: Uuid::new_v4(),
            employee_id,
            basic_salary: dec!(5000),
            salary_structure_notch_id: None,
            effective_from: date(2026, 1, 15),
            effective_to: None,
            is_current: true,
            reason: "revision".into(),
        };
        let created_at = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let fact = SalaryFact { salary: &salary, created_at };

        let scope = DetectionScope {
            paid_periods: std::slice::from_ref(&paid),
            active_period: &active,
            existing_requests: &[],
            salaries: std::slice::from_ref(&fact),
            history: &[],
            transactions: &[],
        };

        let candidates = detect(&scope);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].employee_id, employee_id);
    }

    #[test]
    fn covered_employee_is_skipped() {
        let employee_id = Uuid::new_v4();
        let paid = period(Uuid::new_v4(), date(2026, 1, 1), date(2026, 1, 31), PeriodStatus::Paid);
        let active = period(Uuid::new_v4(), date(2026, 3, 1), date(2026, 3, 31), PeriodStatus::Open);

        let salary = EmployeeSalary {
            id: Uuid::new_v4(),
            employee_id,
            basic_salary: dec!(5000),
            salary_structure_notch_id: None,
            effective_from: date(2026, 1, 15),
            effective_to: None,
            is_current: true,
            reason: "revision".into(),
        };
        let fact = SalaryFact { salary: &salary, created_at: Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap() };

        let existing = BackpayRequest {
            id: Uuid::new_v4(),
            employee_id,
            reason: crate::domain::payroll_model::backpay::BackpayReason::SalaryRevision,
            description: String::new(),
            effective_from: date(2026, 1, 1),
            effective_to: date(2026, 1, 31),
            new_salary_id: None,
            old_salary_id: None,
            reference_period_id: None,
            status: BackpayStatus::Draft,
            net_arrears: Decimal::ZERO,
            created_by: None,
            applied_to_run_id: None,
            applied_at: None,
        };

        let scope = DetectionScope {
            paid_periods: std::slice::from_ref(&paid),
            active_period: &active,
            existing_requests: std::slice::from_ref(&existing),
            salaries: std::slice::from_ref(&fact),
            history: &[],
            transactions: &[],
        };

        assert!(detect(&scope).is_empty());
    }
}
