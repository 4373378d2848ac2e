//! Transaction Overlay (§4.C): resolves which `EmployeeTransaction` rows
//! apply to an employee in a given period, and accumulates their amounts
//! per pay component.
//!
//! Grounded line-for-line on `services.py::get_active_transactions` — the
//! target-type matching chain (INDIVIDUAL / GRADE / BAND via
//! `employee.grade.salary_band` then `employee.salary_notch.level.band`),
//! the recurring-or-period-match rule, and "structural components win over
//! transaction overlays for the same code".

use uuid::Uuid;

use crate::domain::payroll_model::employee::PayrollEmployee;
use crate::domain::payroll_model::run::PayrollPeriod;
use crate::domain::payroll_model::salary_structure::{Grade, SalaryLevel, SalaryNotch};
use crate::domain::payroll_model::transaction::{EmployeeTransaction, TargetType};
use crate::payroll::error::{PayrollError, PayrollResult};

/// Resolves the salary band an employee's GRADE/BAND-targeted transactions
/// should match, per spec.md §4.C step 2: first via the employee's grade's
/// own `salary_band`, falling back to the band of the level that owns the
/// employee's current notch.
pub fn resolve_band_id(
    employee: &PayrollEmployee,
    grades: &[Grade],
    notches: &[SalaryNotch],
    levels: &[SalaryLevel],
) -> Option<Uuid> {
    if let Some(grade_id) = employee.grade_id {
        if let Some(band_id) = grades
            .iter()
            .find(|g| g.id == grade_id)
            .and_then(|g| g.salary_band_id)
        {
            return Some(band_id);
        }
    }
    let notch = notches.iter().find(|n| Some(n.id) == employee.salary_notch_id)?;
    levels.iter().find(|l| l.id == notch.level_id).map(|l| l.band_id)
}

/// `applicable_transactions(employee, period)` (spec.md §4.C).
///
/// Does not itself skip components already covered by
/// `EmployeeSalaryComponent` rows — that filter is applied by the caller
/// (`payroll::computer`), which needs the per-component, per-source view
/// this function doesn't build.
pub fn applicable_transactions<'a>(
    transactions: &'a [EmployeeTransaction],
    employee: &PayrollEmployee,
    band_id: Option<Uuid>,
    period: &PayrollPeriod,
) -> Vec<&'a EmployeeTransaction> {
    transactions
        .iter()
        .filter(|t| t.is_current_version && t.status == crate::domain::payroll_model::transaction::TransactionStatus::Active)
        .filter(|t| target_matches(t, employee, band_id))
        .filter(|t| t.effective_from <= period.end_date)
        .filter(|t| t.effective_to.map(|to| to >= period.start_date).unwrap_or(true))
        .filter(|t| t.is_recurring || t.payroll_period_id == Some(period.id))
        .collect()
}

fn target_matches(t: &EmployeeTransaction, employee: &PayrollEmployee, band_id: Option<Uuid>) -> bool {
    match t.target_type {
        TargetType::Individual => t.employee_id == Some(employee.id),
        TargetType::Grade => employee.grade_id.is_some() && t.grade_id == employee.grade_id,
        TargetType::Band => band_id.is_some() && t.band_id == band_id,
    }
}

/// Enforces the write-time invariant from spec.md §9 Open Question 2: at
/// most one current version may exist per `(employee, pay_component,
/// target_type)` logical key.
pub fn assert_unique_current_version(
    existing: &[EmployeeTransaction],
    candidate: &EmployeeTransaction,
) -> PayrollResult<()> {
    let clashes = existing.iter().any(|t| {
        t.id != candidate.id
            && t.is_current_version
            && t.logical_key() == candidate.logical_key()
    });
    if clashes {
        return Err(PayrollError::Validation(format!(
            "a current version already exists for component {} on target {:?}",
            candidate.pay_component_code, candidate.target_type
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn period(start: NaiveDate, end: NaiveDate) -> PayrollPeriod {
        PayrollPeriod {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            name: "Jan 2026".into(),
            start_date: start,
            end_date: end,
            status: crate::domain::payroll_model::run::PeriodStatus::Open,
            payment_date: None,
            is_supplementary: false,
            parent_period_id: None,
        }
    }

    fn sample(target_type: TargetType, employee_id: Option<Uuid>) -> EmployeeTransaction {
        EmployeeTransaction {
            id: Uuid::new_v4(),
            reference_number: "TXN-202601-X".into(),
            target_type,
            employee_id,
            grade_id: None,
            band_id: None,
            pay_component_code: "RISK_ALL".into(),
            override_type: crate::domain::payroll_model::transaction::OverrideType::Fixed,
            override_amount: Some(dec!(200)),
            override_percentage: None,
            override_formula: None,
            is_recurring: true,
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_to: None,
            payroll_period_id: None,
            status: crate::domain::payroll_model::transaction::TransactionStatus::Active,
            is_current_version: true,
            version: 1,
            parent_id: None,
        }
    }

    #[test]
    fn individual_target_matches_only_that_employee() {
        let employee = PayrollEmployee {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            employee_number: "E1".into(),
            full_name: "A B".into(),
            status: crate::domain::payroll_model::employee::EmploymentStatus::Active,
            date_of_joining: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            date_of_exit: None,
            is_resident: true,
            grade_id: None,
            salary_notch_id: None,
            bank_accounts: vec![],
        };
        let mine = sample(TargetType::Individual, Some(employee.id));
        let theirs = sample(TargetType::Individual, Some(Uuid::new_v4()));
        let txns = vec![mine, theirs];
        let p = period(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        );
        let applicable = applicable_transactions(&txns, &employee, None, &p);
        assert_eq!(applicable.len(), 1);
        assert_eq!(applicable[0].employee_id, Some(employee.id));
    }

    #[test]
    fn duplicate_current_version_is_rejected() {
        let employee_id = Some(Uuid::new_v4());
        let existing = vec![sample(TargetType::Individual, employee_id)];
        let mut candidate = sample(TargetType::Individual, employee_id);
        candidate.id = Uuid::new_v4();
        assert!(assert_unique_current_version(&existing, &candidate).is_err());
    }
}
