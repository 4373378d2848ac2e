//! `EMPLOYEE` creator/validator/matcher.
//!
//! Grounded on `assistant/import_pipeline/creators/employee.py`, narrowed to
//! the fields `domain::payroll_model::employee::PayrollEmployee` actually
//! carries — the payroll core's projection has no department/position
//! aggregate to auto-create, so `department_code`/`position_code` from the
//! original schema are dropped and `grade_code` resolves against the
//! already-loaded grade catalogue instead of auto-creating one.

use uuid::Uuid;

use crate::domain::payroll_model::employee::{EmploymentStatus, PayrollEmployee};
use crate::import_pipeline::error::{ImportError, ImportResult};
use crate::import_pipeline::interfaces::{CreatedEntity, EntityCreator, EntityMatcher, EntityType, EntityValidator, FieldChange, ImportContext, MatchResult, Row, ValidationResult};
use crate::import_pipeline::row_helpers::{date_field, str_field};

pub struct EmployeeCreator;

fn parse_status(row: &Row) -> EmploymentStatus {
    match str_field(row, "status").as_deref().map(str::to_uppercase).as_deref() {
        Some("ON_LEAVE") => EmploymentStatus::OnLeave,
        Some("PROBATION") => EmploymentStatus::Probation,
        Some("NOTICE") => EmploymentStatus::Notice,
        Some("TERMINATED") => EmploymentStatus::Terminated,
        Some("SUSPENDED") => EmploymentStatus::Suspended,
        _ => EmploymentStatus::Active,
    }
}

fn full_name(row: &Row) -> Option<String> {
    let first = str_field(row, "first_name")?;
    let last = str_field(row, "last_name")?;
    match str_field(row, "middle_name") {
        Some(middle) => Some(format!("{first} {middle} {last}")),
        None => Some(format!("{first} {last}")),
    }
}

impl EntityCreator for EmployeeCreator {
    fn entity_type(&self) -> EntityType {
        EntityType::Employee
    }

    fn target_schema(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("employee_number", "Employee number (e.g. EMP001)"),
            ("first_name", "First name"),
            ("middle_name", "Middle name (optional)"),
            ("last_name", "Last name / surname"),
            ("date_of_joining", "Date of joining (YYYY-MM-DD)"),
            ("grade_code", "Job grade code (optional)"),
            ("status", "Employment status (ACTIVE, PROBATION, etc.)"),
        ]
    }

    fn create(&self, row: &Row, ctx: &ImportContext) -> ImportResult<CreatedEntity> {
        let employee_number = str_field(row, "employee_number")
            .ok_or_else(|| ImportError::Validation("employee_number is required".to_string()))?;
        let full_name = full_name(row).ok_or_else(|| ImportError::Validation("first_name and last_name are required".to_string()))?;
        let date_of_joining = date_field(row, "date_of_joining")
            .ok_or_else(|| ImportError::Validation("date_of_joining is required".to_string()))?;

        let employee = PayrollEmployee {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            employee_number,
            full_name,
            status: parse_status(row),
            date_of_joining,
            date_of_exit: None,
            is_resident: true,
            grade_id: None,
            salary_notch_id: None,
            bank_accounts: Vec::new(),
        };

        Ok(CreatedEntity::Employee(employee))
    }

    fn update(&self, existing: &CreatedEntity, row: &Row, _ctx: &ImportContext) -> ImportResult<(CreatedEntity, bool)> {
        let CreatedEntity::Employee(current) = existing else {
            return Err(ImportError::Internal("update called with a non-employee existing record".to_string()));
        };
        let mut updated = current.clone();
        let mut changed = false;

        if let Some(name) = full_name(row) {
            if updated.full_name != name {
                updated.full_name = name;
                changed = true;
            }
        }
        if let Some(doj) = date_field(row, "date_of_joining") {
            if updated.date_of_joining != doj {
                updated.date_of_joining = doj;
                changed = true;
            }
        }
        if let Some(status_str) = str_field(row, "status") {
            let status = parse_status(&[("status".to_string(), serde_json::json!(status_str))].into_iter().collect());
            if updated.status != status {
                updated.status = status;
                changed = true;
            }
        }

        Ok((CreatedEntity::Employee(updated), changed))
    }
}

pub struct EmployeeValidator;

impl EntityValidator for EmployeeValidator {
    fn validate_row(&self, row: &Row, row_number: usize) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if str_field(row, "employee_number").is_none() {
            errors.push(format!("Row {row_number}: employee_number is required"));
        }
        if str_field(row, "first_name").is_none() {
            errors.push(format!("Row {row_number}: first_name is required"));
        }
        if str_field(row, "last_name").is_none() {
            errors.push(format!("Row {row_number}: last_name is required"));
        }
        if date_field(row, "date_of_joining").is_none() {
            warnings.push(format!("Row {row_number}: date_of_joining not provided"));
        }

        ValidationResult { errors, warnings }
    }
}

pub struct EmployeeMatcher;

impl EntityMatcher for EmployeeMatcher {
    fn find_existing(&self, row: &Row, ctx: &ImportContext) -> Option<MatchResult> {
        let employee_number = str_field(row, "employee_number")?;
        let existing = ctx.find_employee(&employee_number)?;

        let mut changes = std::collections::HashMap::new();
        if let Some(new_name) = full_name(row) {
            if new_name != existing.full_name {
                changes.insert("full_name".to_string(), FieldChange { old: existing.full_name.clone(), new: new_name });
            }
        }

        Some(MatchResult {
            existing_record: Some(CreatedEntity::Employee(existing.clone())),
            changes: if changes.is_empty() { None } else { Some(changes) },
        })
    }
}
