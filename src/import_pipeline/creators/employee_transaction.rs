//! `EMPLOYEE_TRANSACTION` creator/validator/matcher.
//!
//! Grounded on `assistant/import_pipeline/creators/employee_transaction.py`.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::payroll_model::transaction::{EmployeeTransaction, OverrideType, TargetType, TransactionStatus};
use crate::import_pipeline::error::{ImportError, ImportResult};
use crate::import_pipeline::interfaces::{CreatedEntity, EntityCreator, EntityMatcher, EntityType, EntityValidator, ImportContext, MatchResult, Row, ValidationResult};
use crate::import_pipeline::row_helpers::{bool_field, date_field, decimal_field, str_field};

pub struct EmployeeTransactionCreator;

fn parse_override_type(row: &Row) -> OverrideType {
    match str_field(row, "override_type").as_deref().map(str::to_uppercase).as_deref() {
        Some("FIXED") => OverrideType::Fixed,
        Some("PCT") => OverrideType::Percentage,
        Some("FORMULA") => OverrideType::Formula,
        _ => OverrideType::None,
    }
}

fn parse_status(row: &Row) -> TransactionStatus {
    match str_field(row, "status").as_deref().map(str::to_uppercase).as_deref() {
        Some("PENDING") => TransactionStatus::Pending,
        Some("APPROVED") => TransactionStatus::Approved,
        Some("SUSPENDED") => TransactionStatus::Suspended,
        Some("COMPLETED") => TransactionStatus::Completed,
        Some("CANCELLED") => TransactionStatus::Cancelled,
        _ => TransactionStatus::Active,
    }
}

fn resolve_component_code(row: &Row, ctx: &ImportContext) -> ImportResult<String> {
    if let Some(code) = str_field(row, "component_code") {
        if ctx.pay_components.contains_key(&code) {
            return Ok(code);
        }
    }
    if let Some(name) = str_field(row, "component_name") {
        if let Some(found) = ctx.pay_components.values().find(|c| c.name.eq_ignore_ascii_case(&name)) {
            return Ok(found.code.clone());
        }
    }
    Err(ImportError::NotFound {
        entity: "pay_component",
        reference: str_field(row, "component_code").or_else(|| str_field(row, "component_name")).unwrap_or_default(),
    })
}

impl EntityCreator for EmployeeTransactionCreator {
    fn entity_type(&self) -> EntityType {
        EntityType::EmployeeTransaction
    }

    fn target_schema(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("employee_number", "Employee number (e.g. EMP001)"),
            ("component_code", "Pay component code (e.g. HOUSING)"),
            ("component_name", "Pay component name (fallback if code not found)"),
            ("override_type", "Override type: NONE, FIXED, PCT, FORMULA"),
            ("override_amount", "Fixed override amount (decimal)"),
            ("override_percentage", "Percentage override (decimal, e.g. 10.5)"),
            ("is_recurring", "Is recurring? true/false"),
            ("effective_from", "Start date (YYYY-MM-DD)"),
            ("effective_to", "End date (YYYY-MM-DD, optional)"),
            ("status", "Status: PENDING, APPROVED, ACTIVE"),
            ("description", "Description / notes"),
        ]
    }

    fn create(&self, row: &Row, ctx: &ImportContext) -> ImportResult<CreatedEntity> {
        let employee_number = str_field(row, "employee_number")
            .ok_or_else(|| ImportError::Validation("employee_number is required".to_string()))?;
        let employee = ctx
            .find_employee(&employee_number)
            .ok_or_else(|| ImportError::NotFound { entity: "employee", reference: employee_number })?;
        let component_code = resolve_component_code(row, ctx)?;

        let txn = EmployeeTransaction {
            id: Uuid::new_v4(),
            reference_number: crate::domain::payroll_model::transaction::generate_reference_number(
                Utc::now().date_naive(),
                &Uuid::new_v4().to_string()[..8],
            ),
            target_type: TargetType::Individual,
            employee_id: Some(employee.id),
            grade_id: None,
            band_id: None,
            pay_component_code: component_code,
            override_type: parse_override_type(row),
            override_amount: decimal_field(row, "override_amount"),
            override_percentage: decimal_field(row, "override_percentage"),
            override_formula: None,
            is_recurring: bool_field(row, "is_recurring", true),
            effective_from: date_field(row, "effective_from").unwrap_or_else(|| Utc::now().date_naive()),
            effective_to: date_field(row, "effective_to"),
            payroll_period_id: None,
            status: parse_status(row),
            is_current_version: true,
            version: 1,
            parent_id: None,
        };
        Ok(CreatedEntity::Transaction(txn))
    }

    fn update(&self, existing: &CreatedEntity, row: &Row, _ctx: &ImportContext) -> ImportResult<(CreatedEntity, bool)> {
        let CreatedEntity::Transaction(current) = existing else {
            return Err(ImportError::Internal("update called with a non-transaction existing record".to_string()));
        };
        let mut updated = current.clone();
        let mut changed = false;

        if let Some(amount) = decimal_field(row, "override_amount") {
            if updated.override_amount != Some(amount) {
                updated.override_amount = Some(amount);
                changed = true;
            }
        }
        if let Some(pct) = decimal_field(row, "override_percentage") {
            if updated.override_percentage != Some(pct) {
                updated.override_percentage = Some(pct);
                changed = true;
            }
        }
        if let Some(to) = date_field(row, "effective_to") {
            if updated.effective_to != Some(to) {
                updated.effective_to = Some(to);
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

        Ok((CreatedEntity::Transaction(updated), changed))
    }
}

pub struct EmployeeTransactionValidator;

impl EntityValidator for EmployeeTransactionValidator {
    fn validate_row(&self, row: &Row, row_number: usize) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if str_field(row, "employee_number").is_none() {
            errors.push(format!("Row {row_number}: employee_number is required"));
        }
        if str_field(row, "component_code").is_none() && str_field(row, "component_name").is_none() {
            errors.push(format!("Row {row_number}: component_code or component_name is required"));
        }

        let override_type = parse_override_type(row);
        if override_type == OverrideType::Fixed && decimal_field(row, "override_amount").is_none() {
            errors.push(format!("Row {row_number}: override_amount required when override_type=FIXED"));
        }
        if override_type == OverrideType::Percentage && decimal_field(row, "override_percentage").is_none() {
            errors.push(format!("Row {row_number}: override_percentage required when override_type=PCT"));
        }
        if date_field(row, "effective_from").is_none() {
            warnings.push(format!("Row {row_number}: effective_from not provided, will default to today"));
        }

        ValidationResult { errors, warnings }
    }
}

pub struct EmployeeTransactionMatcher;

impl EntityMatcher for EmployeeTransactionMatcher {
    fn find_existing(&self, row: &Row, ctx: &ImportContext) -> Option<MatchResult> {
        let employee_number = str_field(row, "employee_number")?;
        let component_code = str_field(row, "component_code")?;
        let employee = ctx.find_employee(&employee_number)?;

        let existing = ctx.transactions.iter().find(|t| {
            t.employee_id == Some(employee.id)
                && t.pay_component_code == component_code
                && t.is_current_version
                && !matches!(t.status, TransactionStatus::Completed | TransactionStatus::Cancelled)
        })?;

        let mut changes = std::collections::HashMap::new();
        if let Some(new_amount) = decimal_field(row, "override_amount") {
            let old = existing.override_amount.unwrap_or_default();
            if old != new_amount {
                changes.insert(
                    "override_amount".to_string(),
                    crate::import_pipeline::interfaces::FieldChange { old: old.to_string(), new: new_amount.to_string() },
                );
            }
        }
        if let Some(new_pct) = decimal_field(row, "override_percentage") {
            let old = existing.override_percentage.unwrap_or_default();
            if old != new_pct {
                changes.insert(
                    "override_percentage".to_string(),
                    crate::import_pipeline::interfaces::FieldChange { old: old.to_string(), new: new_pct.to_string() },
                );
            }
        }

        Some(MatchResult {
            existing_record: Some(CreatedEntity::Transaction(existing.clone())),
            changes: if changes.is_empty() { None } else { Some(changes) },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payroll_model::employee::{EmploymentStatus, PayrollEmployee};
    use std::collections::HashMap;

    fn sample_employee() -> PayrollEmployee {
        PayrollEmployee {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            employee_number: "EMP001".to_string(),
            full_name: "Ama Owusu".to_string(),
            status: EmploymentStatus::Active,
            date_of_joining: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            date_of_exit: None,
            is_resident: true,
            grade_id: None,
            salary_notch_id: None,
            bank_accounts: Vec::new(),
        }
    }

    #[test]
    fn validator_requires_override_amount_for_fixed_type() {
        let mut row: Row = HashMap::new();
        row.insert("employee_number".to_string(), serde_json::json!("EMP001"));
        row.insert("component_code".to_string(), serde_json::json!("RISK_ALL"));
        row.insert("override_type".to_string(), serde_json::json!("FIXED"));

        let result = EmployeeTransactionValidator.validate_row(&row, 2);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("override_amount")));
    }

    #[test]
    fn create_rejects_unknown_employee() {
        let row: Row = [
            ("employee_number".to_string(), serde_json::json!("MISSING")),
            ("component_code".to_string(), serde_json::json!("HOUSING")),
        ]
        .into_iter()
        .collect();
        let pay_components = HashMap::new();
        let ctx = ImportContext {
            tenant_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            employees: &[],
            pay_components: &pay_components,
            banks: &[],
            transactions: &[],
        };

        let result = EmployeeTransactionCreator.create(&row, &ctx);
        assert!(matches!(result, Err(ImportError::NotFound { .. })));
    }

    #[test]
    fn matcher_finds_current_active_transaction_for_same_component() {
        let employee = sample_employee();
        let existing_txn = EmployeeTransaction {
            id: Uuid::new_v4(),
            reference_number: "TXN-202601-ABCDEF12".into(),
            target_type: TargetType::Individual,
            employee_id: Some(employee.id),
            grade_id: None,
            band_id: None,
            pay_component_code: "RISK_ALL".into(),
            override_type: OverrideType::Fixed,
            override_amount: Some(rust_decimal_macros::dec!(500)),
            override_percentage: None,
            override_formula: None,
            is_recurring: true,
            effective_from: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_to: None,
            payroll_period_id: None,
            status: TransactionStatus::Active,
            is_current_version: true,
            version: 1,
            parent_id: None,
        };
        let pay_components = HashMap::new();
        let employees = [employee];
        let transactions = [existing_txn];
        let ctx = ImportContext {
            tenant_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            employees: &employees,
            pay_components: &pay_components,
            banks: &[],
            transactions: &transactions,
        };

        let row: Row = [
            ("employee_number".to_string(), serde_json::json!("EMP001")),
            ("component_code".to_string(), serde_json::json!("RISK_ALL")),
            ("override_amount".to_string(), serde_json::json!("600")),
        ]
        .into_iter()
        .collect();

        let result = EmployeeTransactionMatcher.find_existing(&row, &ctx).expect("should match");
        assert!(result.existing_record.is_some());
        assert!(result.changes.is_some());
    }
}
