//! `BANK_ACCOUNT` creator/validator/matcher.
//!
//! Grounded on `assistant/import_pipeline/creators/bank_account.py`. The
//! account type enum the original carries (SAVINGS/CURRENT/OTHER) has no
//! counterpart on `domain::payroll_model::employee::BankAccount` — the
//! payroll core only needs the account number/name/branch to build a
//! payslip snapshot, so it is dropped rather than bolted on unused.

use crate::domain::payroll_model::employee::BankAccount;
use crate::import_pipeline::error::{ImportError, ImportResult};
use crate::import_pipeline::interfaces::{CreatedEntity, EntityCreator, EntityMatcher, EntityType, EntityValidator, FieldChange, ImportContext, MatchResult, Row, ValidationResult};
use crate::import_pipeline::row_helpers::{bool_field, str_field};

pub struct BankAccountCreator;

fn resolve_bank_name(row: &Row, ctx: &ImportContext) -> ImportResult<String> {
    if let Some(code) = str_field(row, "bank_code") {
        if let Some(bank) = ctx.find_bank_by_code(&code) {
            return Ok(bank.name.clone());
        }
    }
    if let Some(name) = str_field(row, "bank_name") {
        return Ok(name);
    }
    Err(ImportError::Validation("bank_code or bank_name must resolve to a known bank".to_string()))
}

impl EntityCreator for BankAccountCreator {
    fn entity_type(&self) -> EntityType {
        EntityType::BankAccount
    }

    fn target_schema(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("employee_number", "Employee number (e.g. EMP001)"),
            ("bank_code", "Bank code (e.g. GCB)"),
            ("bank_name", "Bank name (fallback if code not found)"),
            ("account_name", "Account holder name"),
            ("account_number", "Bank account number"),
            ("branch_name", "Bank branch name (optional)"),
            ("is_primary", "Is primary account? true/false"),
        ]
    }

    fn create(&self, row: &Row, ctx: &ImportContext) -> ImportResult<CreatedEntity> {
        let employee_number = str_field(row, "employee_number")
            .ok_or_else(|| ImportError::Validation("employee_number is required".to_string()))?;
        let employee = ctx
            .find_employee(&employee_number)
            .ok_or_else(|| ImportError::NotFound { entity: "employee", reference: employee_number })?;
        let bank_name = resolve_bank_name(row, ctx)?;
        let account_number = str_field(row, "account_number")
            .ok_or_else(|| ImportError::Validation("account_number is required".to_string()))?;

        let account = BankAccount {
            bank_name,
            branch: str_field(row, "branch_name").unwrap_or_default(),
            account_number,
            account_name: str_field(row, "account_name").unwrap_or_else(|| employee.full_name.clone()),
            is_primary: bool_field(row, "is_primary", true),
        };

        Ok(CreatedEntity::BankAccount { employee_id: employee.id, account })
    }

    fn update(&self, existing: &CreatedEntity, row: &Row, _ctx: &ImportContext) -> ImportResult<(CreatedEntity, bool)> {
        let CreatedEntity::BankAccount { employee_id, account: current } = existing else {
            return Err(ImportError::Internal("update called with a non-bank-account existing record".to_string()));
        };
        let mut updated = current.clone();
        let mut changed = false;

        if let Some(account_name) = str_field(row, "account_name") {
            if updated.account_name != account_name {
                updated.account_name = account_name;
                changed = true;
            }
        }
        if let Some(branch) = str_field(row, "branch_name") {
            if updated.branch != branch {
                updated.branch = branch;
                changed = true;
            }
        }

        Ok((CreatedEntity::BankAccount { employee_id: *employee_id, account: updated }, changed))
    }
}

pub struct BankAccountValidator;

impl EntityValidator for BankAccountValidator {
    fn validate_row(&self, row: &Row, row_number: usize) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if str_field(row, "employee_number").is_none() {
            errors.push(format!("Row {row_number}: employee_number is required"));
        }
        if str_field(row, "account_number").is_none() {
            errors.push(format!("Row {row_number}: account_number is required"));
        }
        if str_field(row, "bank_code").is_none() && str_field(row, "bank_name").is_none() {
            warnings.push(format!("Row {row_number}: bank_code/bank_name not provided, bank will be null"));
        }

        ValidationResult { errors, warnings }
    }
}

pub struct BankAccountMatcher;

impl EntityMatcher for BankAccountMatcher {
    fn find_existing(&self, row: &Row, ctx: &ImportContext) -> Option<MatchResult> {
        let employee_number = str_field(row, "employee_number")?;
        let account_number = str_field(row, "account_number")?;
        let employee = ctx.find_employee(&employee_number)?;

        let existing = employee.bank_accounts.iter().find(|a| a.account_number == account_number)?;

        let mut changes = std::collections::HashMap::new();
        for (field, new_val, old_val) in [
            ("account_name", str_field(row, "account_name"), existing.account_name.clone()),
            ("branch_name", str_field(row, "branch_name"), existing.branch.clone()),
        ] {
            if let Some(new_val) = new_val {
                if new_val != old_val {
                    changes.insert(field.to_string(), FieldChange { old: old_val, new: new_val });
                }
            }
        }

        Some(MatchResult {
            existing_record: Some(CreatedEntity::BankAccount { employee_id: employee.id, account: existing.clone() }),
            changes: if changes.is_empty() { None } else { Some(changes) },
        })
    }
}
