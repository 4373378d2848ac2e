//! Compensation Graph queries (§4.B): `current_salary`, `salary_components`,
//! `structure_components`. Grounded on `services.py::get_employee_salary`
//! and `EmployeeSalaryComponent.objects.filter(...)`.
//!
//! Writes happen only through upgrade/increment workflows or bulk import
//! (spec.md §4.B); this module is read-only by design — it never mutates a
//! historical row, it only projects over the slices handed to it.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::payroll_model::employee_salary::{EmployeeSalary, EmployeeSalaryComponent};
use crate::domain::payroll_model::salary_structure::SalaryNotch;

/// `current_salary(employee, as_of)` (spec.md §4.B).
pub fn current_salary<'a>(
    salaries: &'a [EmployeeSalary],
    employee_id: Uuid,
    as_of: NaiveDate,
) -> Option<&'a EmployeeSalary> {
    EmployeeSalary::resolve_current(salaries, employee_id, as_of)
}

/// `salary_components(employee_salary)` (spec.md §4.B): active
/// EmployeeSalaryComponent rows for the given salary as of a date.
pub fn salary_components<'a>(
    components: &'a [EmployeeSalaryComponent],
    employee_salary_id: Uuid,
    as_of: NaiveDate,
) -> Vec<&'a EmployeeSalaryComponent> {
    EmployeeSalaryComponent::active(components, employee_salary_id, as_of)
}

/// `structure_components(structure)` (spec.md §4.B): the notch amount for an
/// employee's salary structure slot, if one is assigned.
pub fn structure_notch(notches: &[SalaryNotch], notch_id: Option<Uuid>) -> Option<&SalaryNotch> {
    let notch_id = notch_id?;
    notches.iter().find(|n| n.id == notch_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn current_salary_picks_max_effective_from_not_exceeding_as_of() {
        let employee_id = Uuid::new_v4();
        let salaries = vec![
            EmployeeSalary {
                id: Uuid::new_v4(),
                employee_id,
                basic_salary: dec!(4000),
                salary_structure_notch_id: None,
                effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                effective_to: Some(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()),
                is_current: false,
                reason: "hire".into(),
            },
            EmployeeSalary {
                id: Uuid::new_v4(),
                employee_id,
                basic_salary: dec!(5000),
                salary_structure_notch_id: None,
                effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                effective_to: None,
                is_current: true,
                reason: "increment".into(),
            },
        ];
        let resolved =
            current_salary(&salaries, employee_id, NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
                .unwrap();
        assert_eq!(resolved.basic_salary, dec!(5000));
    }
}
