//! Run Orchestrator (§4.I): `compute(run)` drives §4.F across the eligible
//! roster, isolates per-employee failures, and aggregates totals.
//!
//! Grounded on `services.py::compute_payroll` (lines 726-860+): the
//! allowed-status precondition, the progress-cache updates, and the
//! per-employee try/except that degrades to an ERROR Item rather than
//! aborting the run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::payroll_model::component::PayComponent;
use crate::domain::payroll_model::employee::{AdHocPayment, PayrollEmployee};
use crate::domain::payroll_model::employee_salary::{EmployeeSalary, EmployeeSalaryComponent};
use crate::domain::payroll_model::run::{ItemStatus, PayrollItem, PayrollItemDetail, PayrollPeriod, PayrollRun, PayrollRunTotals, RunStatus};
use crate::domain::payroll_model::salary_structure::{Grade, SalaryLevel, SalaryNotch};
use crate::domain::payroll_model::transaction::EmployeeTransaction;
use crate::payroll::computer::{self, ComputationInputs};
use crate::payroll::error::{PayrollError, PayrollResult};
use crate::payroll::rate_book::RateBook;

/// Progress record published at least every N processed employees
/// (spec.md §5, key format `payroll_progress_{run_id}`).
#[derive(Clone, Debug)]
pub struct ProgressRecord {
    pub status: ProgressStatus,
    pub total: usize,
    pub processed: usize,
    pub current_unit: String,
    pub percentage: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressStatus {
    Computing,
    Completed,
    Failed,
    Idle,
}

/// Publishes progress per job id and serialises concurrent `compute` calls
/// on the same Run via a per-run mutex (spec.md §5: "two concurrent compute
/// calls for the same Run are forbidden").
#[derive(Default)]
pub struct Orchestrator {
    progress: DashMap<Uuid, ProgressRecord>,
    run_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Everything `compute` needs beyond the per-employee `ComputationInputs`:
/// the whole roster plus the already-approved, unapplied backpay requests
/// to fold in after the main loop.
pub struct ComputeContext<'a> {
    pub roster: &'a [PayrollEmployee],
    pub salaries: &'a [EmployeeSalary],
    pub salary_components: &'a [EmployeeSalaryComponent],
    pub ad_hoc_payments: &'a [AdHocPayment],
    pub transactions: &'a [EmployeeTransaction],
    pub pay_components: &'a HashMap<String, PayComponent>,
    pub grades: &'a [Grade],
    pub notches: &'a [SalaryNotch],
    pub levels: &'a [SalaryLevel],
    pub rate_book: &'a RateBook,
}

pub struct ComputeOutcome {
    pub run: PayrollRun,
    pub period_status_advanced: bool,
    pub items: Vec<PayrollItem>,
    pub details: Vec<PayrollItemDetail>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, run_id: Uuid) -> Arc<Mutex<()>> {
        self.run_locks.entry(run_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub fn progress(&self, job_id: Uuid) -> Option<ProgressRecord> {
        self.progress.get(&job_id).map(|r| r.clone())
    }

    /// `compute(run)` (spec.md §4.I, steps 1-9).
    pub async fn compute(
        &self,
        mut run: PayrollRun,
        period: &mut PayrollPeriod,
        ctx: &ComputeContext<'_>,
        computed_by: Uuid,
        now: DateTime<Utc>,
    ) -> PayrollResult<ComputeOutcome> {
        let lock = self.lock_for(run.id);
        let guard = lock.try_lock();
        let _guard = match guard {
            Ok(g) => g,
            Err(_) => return Err(PayrollError::ConcurrencyConflict(format!("run {} is already computing", run.id))),
        };

        // Step 1 — precondition.
        if !matches!(run.status, RunStatus::Draft | RunStatus::Computed | RunStatus::Rejected) {
            return Err(PayrollError::illegal_transition("compute", format!("{:?}", run.status), "COMPUTING"));
        }
        if matches!(period.status, crate::domain::payroll_model::run::PeriodStatus::Paid | crate::domain::payroll_model::run::PeriodStatus::Closed) {
            return Err(PayrollError::illegal_transition("compute", format!("{:?}", period.status), "COMPUTING"));
        }

        // Step 2 — idempotent recompute: caller is expected to have already
        // deleted prior Items for this run; the orchestrator itself only
        // produces a fresh set.

        // Step 3 — mark COMPUTING.
        run.status = RunStatus::Computing;

        // Step 4 — initialise progress.
        let eligible: Vec<&PayrollEmployee> = ctx
            .roster
            .iter()
            .filter(|e| e.status.is_payroll_eligible() && e.date_of_joining <= period.end_date)
            .collect();
        let total = eligible.len();
        self.progress.insert(
            run.id,
            ProgressRecord {
                status: ProgressStatus::Computing,
                total,
                processed: 0,
                current_unit: String::new(),
                percentage: 0,
                started_at: now,
                completed_at: None,
                error: None,
            },
        );

        // Step 5 — per-employee loop with error isolation.
        let mut items = Vec::with_capacity(total);
        let mut details = Vec::new();
        let mut totals = PayrollRunTotals::default();

        for (i, employee) in eligible.iter().enumerate() {
            let inputs = ComputationInputs {
                employee,
                period,
                salaries: ctx.salaries,
                salary_components: ctx.salary_components,
                ad_hoc_payments: ctx.ad_hoc_payments,
                transactions: ctx.transactions,
                pay_components: ctx.pay_components,
                grades: ctx.grades,
                notches: ctx.notches,
                levels: ctx.levels,
                rate_book: ctx.rate_book,
            };

            match computer::compute_employee(run.id, &inputs) {
                Ok(result) => {
                    accumulate(&mut totals, &result.item);
                    items.push(result.item);
                    details.extend(result.details);
                }
                Err(e) => {
                    items.push(error_item(run.id, employee, &e));
                }
            }

            let processed = i + 1;
            let percentage = if total > 0 { (processed * 100 / total) as u32 } else { 0 };
            self.progress.insert(
                run.id,
                ProgressRecord {
                    status: ProgressStatus::Computing,
                    total,
                    processed,
                    current_unit: employee.full_name.clone(),
                    percentage,
                    started_at: now,
                    completed_at: None,
                    error: None,
                },
            );
        }

        // Step 6 — backpay auto-application happens in the caller: it owns
        // the BackpayRequest store and the per-item mutation, both outside
        // this module's read-only inputs. See `payroll::backpay::apply_to_payroll`.

        // Step 7 — aggregate totals already folded in above; record employee count.
        totals.total_employees = items.iter().filter(|i| i.status == ItemStatus::Computed).count() as i32;

        // Step 8 — finalise run/period status.
        run.status = RunStatus::Computed;
        run.computed_by = Some(computed_by);
        run.computed_at = Some(now);
        run.totals = totals;

        let mut period_status_advanced = false;
        if matches!(
            period.status,
            crate::domain::payroll_model::run::PeriodStatus::Open | crate::domain::payroll_model::run::PeriodStatus::Processing
        ) {
            period.status = crate::domain::payroll_model::run::PeriodStatus::Computed;
            period_status_advanced = true;
        }

        // Step 9 — final progress + single audit entry (the audit entry
        // itself is the caller's responsibility via `payroll::audit`/tracing,
        // kept out of this module so it stays storage-agnostic).
        self.progress.insert(
            run.id,
            ProgressRecord {
                status: ProgressStatus::Completed,
                total,
                processed: total,
                current_unit: String::new(),
                percentage: 100,
                started_at: now,
                completed_at: Some(now),
                error: None,
            },
        );

        Ok(ComputeOutcome { run, period_status_advanced, items, details })
    }
}

fn accumulate(totals: &mut PayrollRunTotals, item: &PayrollItem) {
    if item.status != ItemStatus::Computed {
        return;
    }
    totals.total_gross += item.gross_earnings;
    totals.total_deductions += item.total_deductions;
    totals.total_net += item.net_salary;
    totals.total_employer_cost += item.employer_cost;
    totals.total_paye += item.paye;
    totals.total_overtime_tax += item.overtime_tax;
    totals.total_bonus_tax += item.bonus_tax;
    totals.total_ssnit_employee += item.ssnit_employee;
    totals.total_ssnit_employer += item.ssnit_employer;
    totals.total_tier2_employer += item.tier2_employer;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn context_from_demo(demo: &fixtures::Demo) -> ComputeContext<'_> {
        ComputeContext {
            roster: &demo.employees,
            salaries: &demo.salaries,
            salary_components: &demo.salary_components,
            ad_hoc_payments: &[],
            transactions: &[],
            pay_components: &demo.pay_components,
            grades: &demo.grades,
            notches: &[],
            levels: &[],
            rate_book: &demo.rate_book,
        }
    }

    #[tokio::test]
    async fn compute_produces_one_item_per_eligible_employee_and_matching_totals() {
        let demo = fixtures::seed();
        let ctx = context_from_demo(&demo);
        let orch = Orchestrator::new();
        let mut period = demo.period.clone();

        let outcome = orch
            .compute(demo.run.clone(), &mut period, &ctx, demo.user_id, Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.run.status, RunStatus::Computed);
        assert_eq!(outcome.items.len(), demo.employees.len());
        assert!(outcome.period_status_advanced);

        // P2: run totals equal the sum of the (single, non-error) Item's fields.
        let item = &outcome.items[0];
        assert_eq!(item.status, ItemStatus::Computed);
        assert_eq!(outcome.run.totals.total_gross, item.gross_earnings);
        assert_eq!(outcome.run.totals.total_net, item.net_salary);
        assert_eq!(outcome.run.totals.total_employees, 1);
    }

    #[tokio::test]
    async fn compute_rejects_a_run_that_is_already_approved() {
        let demo = fixtures::seed();
        let ctx = context_from_demo(&demo);
        let orch = Orchestrator::new();
        let mut period = demo.period.clone();
        let mut run = demo.run.clone();
        run.status = RunStatus::Approved;

        let err = orch.compute(run, &mut period, &ctx, demo.user_id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, PayrollError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn compute_is_idempotent_on_repeated_runs_with_unchanged_inputs() {
        let demo = fixtures::seed();
        let ctx = context_from_demo(&demo);
        let orch = Orchestrator::new();

        let mut period_a = demo.period.clone();
        let outcome_a = orch
            .compute(demo.run.clone(), &mut period_a, &ctx, demo.user_id, Utc::now())
            .await
            .unwrap();

        let mut period_b = demo.period.clone();
        let outcome_b = orch
            .compute(demo.run.clone(), &mut period_b, &ctx, demo.user_id, Utc::now())
            .await
            .unwrap();

        // P5: recomputing without changing inputs yields identical amounts.
        assert_eq!(outcome_a.items[0].net_salary, outcome_b.items[0].net_salary);
        assert_eq!(outcome_a.items[0].paye, outcome_b.items[0].paye);
    }
}

fn error_item(run_id: Uuid, employee: &PayrollEmployee, error: &PayrollError) -> PayrollItem {
    PayrollItem {
        id: Uuid::new_v4(),
        run_id,
        employee_id: employee.id,
        employee_number: employee.employee_number.clone(),
        basic_salary: Decimal::ZERO,
        gross_earnings: Decimal::ZERO,
        total_deductions: Decimal::ZERO,
        net_salary: Decimal::ZERO,
        taxable_income: Decimal::ZERO,
        paye: Decimal::ZERO,
        overtime_tax: Decimal::ZERO,
        bonus_tax: Decimal::ZERO,
        total_overtime: Decimal::ZERO,
        total_bonus: Decimal::ZERO,
        ssnit_employee: Decimal::ZERO,
        ssnit_employer: Decimal::ZERO,
        tier2_employer: Decimal::ZERO,
        employer_cost: Decimal::ZERO,
        proration_factor: Decimal::ZERO,
        days_payable: 0,
        total_days: 0,
        bank_snapshot: None,
        status: ItemStatus::Error,
        error_message: Some(error.to_string()),
    }
}
