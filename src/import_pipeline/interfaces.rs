//! Bulk Import Pipeline (§4.M): the registry-facing trait seams every
//! entity-specific creator/validator/matcher implements.
//!
//! Grounded on `assistant/import_pipeline/interfaces.py`: `ValidationResult`,
//! `MatchResult`, and the four abstract base classes
//! (`LLMColumnMapper`, `EntityValidator`, `EntityMatcher`, `EntityCreator`).
//! The core has no ORM, so `create`/`update` return a `CreatedEntity` value
//! rather than mutating a persisted row in place.

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::domain::payroll_model::bank::Bank;
use crate::domain::payroll_model::component::PayComponent;
use crate::domain::payroll_model::employee::{BankAccount, PayrollEmployee};
use crate::domain::payroll_model::transaction::EmployeeTransaction;
use crate::import_pipeline::error::ImportResult;

/// A parsed spreadsheet row after column mapping: target field name to
/// loosely-typed value (`raw_dict` in `preview_generator.py`).
pub type Row = HashMap<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Employee,
    EmployeeTransaction,
    PayComponent,
    Bank,
    BankAccount,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Employee => "EMPLOYEE",
            EntityType::EmployeeTransaction => "EMPLOYEE_TRANSACTION",
            EntityType::PayComponent => "PAY_COMPONENT",
            EntityType::Bank => "BANK",
            EntityType::BankAccount => "BANK_ACCOUNT",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One field's old/new value, surfaced in the preview when an UPDATE would
/// change an existing record.
#[derive(Clone, Debug)]
pub struct FieldChange {
    pub old: String,
    pub new: String,
}

#[derive(Clone, Debug, Default)]
pub struct MatchResult {
    pub existing_record: Option<CreatedEntity>,
    pub changes: Option<HashMap<String, FieldChange>>,
}

/// The concrete payroll-core objects a creator can produce. The in-memory
/// core has no persistence layer, so "update" means "return the merged
/// value" rather than mutating a row behind an ORM.
#[derive(Clone, Debug)]
pub enum CreatedEntity {
    Employee(PayrollEmployee),
    Transaction(EmployeeTransaction),
    PayComponent(PayComponent),
    Bank(Bank),
    BankAccount { employee_id: Uuid, account: BankAccount },
}

/// Read-only lookups every creator/matcher needs to resolve foreign-key-ish
/// references (employee_number -> employee, component_code -> component,
/// bank_code -> bank). Populated by the caller from whatever store backs
/// the tenant; the core never queries storage itself.
pub struct ImportContext<'a> {
    pub tenant_id: Uuid,
    pub created_by: Uuid,
    pub employees: &'a [PayrollEmployee],
    pub pay_components: &'a HashMap<String, PayComponent>,
    pub banks: &'a [Bank],
    /// Current-version transactions, for the EMPLOYEE_TRANSACTION matcher's
    /// upsert lookup (`EmployeeTransactionMatcher.find_existing`).
    pub transactions: &'a [EmployeeTransaction],
}

impl<'a> ImportContext<'a> {
    pub fn find_employee(&self, employee_number: &str) -> Option<&PayrollEmployee> {
        self.employees.iter().find(|e| e.employee_number == employee_number)
    }

    pub fn find_bank_by_code(&self, code: &str) -> Option<&Bank> {
        self.banks.iter().find(|b| b.code.eq_ignore_ascii_case(code))
    }

    pub fn find_bank_by_name(&self, name: &str) -> Option<&Bank> {
        self.banks.iter().find(|b| b.name.eq_ignore_ascii_case(name))
    }
}

/// `EntityValidator.validate_row` (spec.md §4.M phase 2).
pub trait EntityValidator: Send + Sync {
    fn validate_row(&self, row: &Row, row_number: usize) -> ValidationResult;
}

/// `EntityMatcher.find_existing` (spec.md §4.M phase 2): CREATE vs UPDATE.
pub trait EntityMatcher: Send + Sync {
    fn find_existing(&self, row: &Row, ctx: &ImportContext) -> Option<MatchResult>;
}

/// `EntityCreator` (spec.md §4.M): the Open/Closed seam a new importable
/// entity type plugs into without touching the executor.
pub trait EntityCreator: Send + Sync {
    fn entity_type(&self) -> EntityType;

    /// `get_target_schema` — field name to human-readable hint, fed to the
    /// AI column mapper's prompt.
    fn target_schema(&self) -> Vec<(&'static str, &'static str)>;

    fn create(&self, row: &Row, ctx: &ImportContext) -> ImportResult<CreatedEntity>;

    fn update(&self, existing: &CreatedEntity, row: &Row, ctx: &ImportContext) -> ImportResult<(CreatedEntity, bool)>;
}

/// `LLMColumnMapper` (spec.md §6 "import AI collaborator contract"). Async
/// because a real implementation calls out to the AI collaborator over
/// HTTP; the fuzzy fallback still implements this trait synchronously via
/// a blocking-free `async fn` body.
#[async_trait::async_trait]
pub trait LlmColumnMapper: Send + Sync {
    async fn map_columns(
        &self,
        source_columns: &[String],
        sample_rows: &[Row],
        target_schema: &[(&'static str, &'static str)],
        entity_type: EntityType,
    ) -> HashMap<String, Option<String>>;

    async fn detect_entity_type(&self, source_columns: &[String], sample_rows: &[Row]) -> EntityType;
}
