//! Pay Component — the catalogue entry every earning/deduction line refers to.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::entity::Entity;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Earning,
    Deduction,
    EmployerContribution,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Basic,
    Allowance,
    Bonus,
    Statutory,
    Overtime,
    Shift,
    Loan,
    Fund,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalcKind {
    Fixed,
    PctOfBasic,
    PctOfGross,
    Formula,
    Lookup,
}

/// Reserved component codes that every tenant must carry and that can never
/// be deleted (spec.md §3 invariant).
pub const STATUTORY_CODES: [&str; 5] = ["PAYE", "SSNIT_EMP", "OVERTIME_TAX", "BONUS_TAX", "TIER2_EMP"];
pub const BASIC_CODE: &str = "BASIC";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayComponent {
    pub entity: Entity,
    pub code: String,
    pub name: String,
    pub component_type: ComponentType,
    pub category: ComponentCategory,
    pub calc_kind: CalcKind,
    pub default_amount: Option<Decimal>,
    pub default_percentage: Option<Decimal>,
    pub formula: Option<String>,

    pub is_taxable: bool,
    pub reduces_taxable: bool,
    pub is_overtime: bool,
    pub is_bonus: bool,
    pub affects_ssnit: bool,
    pub is_statutory: bool,
    pub is_recurring: bool,
    pub is_prorated: bool,
    pub is_arrears_applicable: bool,
    pub show_on_payslip: bool,
    pub display_order: i32,
}

impl PayComponent {
    /// Enforces the "overtime and bonus are mutually exclusive" invariant
    /// (spec.md §3). Call before persisting a new or edited component.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_overtime && self.is_bonus {
            return Err(format!(
                "component {} cannot be both overtime and bonus",
                self.code
            ));
        }
        if STATUTORY_CODES.contains(&self.code.as_str()) && !self.is_statutory {
            return Err(format!("component {} must be marked statutory", self.code));
        }
        Ok(())
    }

    pub fn is_statutory_code(code: &str) -> bool {
        STATUTORY_CODES.contains(&code)
    }
}
