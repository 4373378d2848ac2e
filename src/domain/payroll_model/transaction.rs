//! Employee Transaction: a dated, versioned overlay that adds or replaces a
//! pay component's value for an employee, grade, or salary band.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideType {
    None,
    Fixed,
    Percentage,
    Formula,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Active,
    Suspended,
    Completed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Individual,
    Grade,
    Band,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmployeeTransaction {
    pub id: Uuid,
    pub reference_number: String,
    pub target_type: TargetType,
    pub employee_id: Option<Uuid>,
    pub grade_id: Option<Uuid>,
    pub band_id: Option<Uuid>,
    pub pay_component_code: String,
    pub override_type: OverrideType,
    pub override_amount: Option<Decimal>,
    pub override_percentage: Option<Decimal>,
    pub override_formula: Option<String>,
    pub is_recurring: bool,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub payroll_period_id: Option<Uuid>,
    pub status: TransactionStatus,
    pub is_current_version: bool,
    pub version: i32,
    pub parent_id: Option<Uuid>,
}

impl EmployeeTransaction {
    /// `calculate_amount` (spec.md §4.C / §4.F step 3.4): resolves the
    /// override against the given base amounts. The `Formula` branch is
    /// delegated to `payroll::formula::evaluate`, kept out of this module
    /// so the data model has no dependency on the evaluator internals.
    pub fn calculate_amount(
        &self,
        basic_salary: Decimal,
        gross_salary: Decimal,
        default_amount: Option<Decimal>,
        evaluate_formula: impl FnOnce(&str, Decimal, Decimal) -> Decimal,
    ) -> Decimal {
        match self.override_type {
            OverrideType::Fixed => self.override_amount.unwrap_or(Decimal::ZERO),
            OverrideType::Percentage => {
                let pct = self.override_percentage.unwrap_or(Decimal::ZERO);
                basic_salary * pct / Decimal::from(100)
            }
            OverrideType::Formula => match &self.override_formula {
                Some(f) => evaluate_formula(f, basic_salary, gross_salary),
                None => Decimal::ZERO,
            },
            OverrideType::None => default_amount.unwrap_or(Decimal::ZERO),
        }
    }

    /// The write-time invariant from spec.md §9 Open Question 2: at most
    /// one current version may exist for a given logical key.
    pub fn logical_key(&self) -> (Option<Uuid>, String, TargetType) {
        (self.employee_id, self.pay_component_code.clone(), self.target_type)
    }

    pub fn active_in_window(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.is_current_version
            && self.status == TransactionStatus::Active
            && self.effective_from <= end
            && self.effective_to.map(|to| to >= start).unwrap_or(true)
    }

    /// Version-on-update: close this row out and produce its successor.
    /// Caller persists both; the old row becomes non-current.
    pub fn new_version(&self, new_effective_from: NaiveDate) -> (EmployeeTransaction, NaiveDate) {
        let mut successor = self.clone();
        successor.id = Uuid::new_v4();
        successor.version = self.version + 1;
        successor.parent_id = Some(self.parent_id.unwrap_or(self.id));
        successor.effective_from = new_effective_from;
        successor.is_current_version = true;
        (successor, new_effective_from - chrono::Duration::days(1))
    }
}

pub fn generate_reference_number(period: NaiveDate, suffix: &str) -> String {
    format!("TXN-{}-{}", period.format("%Y%m"), suffix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fixed_override_ignores_bases() {
        let txn = sample_txn(OverrideType::Fixed, Some(dec!(500)), None, None);
        let amount = txn.calculate_amount(dec!(1000), dec!(1500), None, |_, _, _| Decimal::ZERO);
        assert_eq!(amount, dec!(500));
    }

    #[test]
    fn percentage_override_uses_basic() {
        let txn = sample_txn(OverrideType::Percentage, None, Some(dec!(10)), None);
        let amount = txn.calculate_amount(dec!(1000), dec!(1500), None, |_, _, _| Decimal::ZERO);
        assert_eq!(amount, dec!(100.0));
    }

    fn sample_txn(
        override_type: OverrideType,
        amount: Option<Decimal>,
        pct: Option<Decimal>,
        formula: Option<String>,
    ) -> EmployeeTransaction {
        EmployeeTransaction {
            id: Uuid::new_v4(),
            reference_number: "TXN-202601-ABCDEF12".into(),
            target_type: TargetType::Individual,
            employee_id: Some(Uuid::new_v4()),
            grade_id: None,
            band_id: None,
            pay_component_code: "RISK_ALL".into(),
            override_type,
            override_amount: amount,
            override_percentage: pct,
            override_formula: formula,
            is_recurring: true,
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_to: None,
            payroll_period_id: None,
            status: TransactionStatus::Active,
            is_current_version: true,
            version: 1,
            parent_id: None,
        }
    }
}
