//! `BANK` creator/validator/matcher.
//!
//! Grounded on `assistant/import_pipeline/creators/bank.py`.

use uuid::Uuid;

use crate::domain::payroll_model::bank::Bank;
use crate::import_pipeline::error::{ImportError, ImportResult};
use crate::import_pipeline::interfaces::{CreatedEntity, EntityCreator, EntityMatcher, EntityType, EntityValidator, FieldChange, ImportContext, MatchResult, Row, ValidationResult};
use crate::import_pipeline::row_helpers::str_field;

pub struct BankCreator;

impl EntityCreator for BankCreator {
    fn entity_type(&self) -> EntityType {
        EntityType::Bank
    }

    fn target_schema(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("code", "Unique bank code (e.g. GCB)"),
            ("name", "Bank full name (e.g. GCB Bank Limited)"),
            ("short_name", "Short name (e.g. GCB)"),
            ("swift_code", "SWIFT/BIC code (optional)"),
            ("sort_code", "Sort code (optional)"),
            ("phone", "Phone number (optional)"),
            ("email", "Email address (optional)"),
        ]
    }

    fn create(&self, row: &Row, ctx: &ImportContext) -> ImportResult<CreatedEntity> {
        let code = str_field(row, "code").ok_or_else(|| ImportError::Validation("code is required".to_string()))?;
        let name = str_field(row, "name").ok_or_else(|| ImportError::Validation("name is required".to_string()))?;

        Ok(CreatedEntity::Bank(Bank {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            code,
            name,
            short_name: str_field(row, "short_name"),
            swift_code: str_field(row, "swift_code"),
            sort_code: str_field(row, "sort_code"),
            phone: str_field(row, "phone"),
            email: str_field(row, "email"),
            is_active: true,
        }))
    }

    fn update(&self, existing: &CreatedEntity, row: &Row, _ctx: &ImportContext) -> ImportResult<(CreatedEntity, bool)> {
        let CreatedEntity::Bank(current) = existing else {
            return Err(ImportError::Internal("update called with a non-bank existing record".to_string()));
        };
        let mut updated = current.clone();
        let mut changed = false;

        if let Some(name) = str_field(row, "name") {
            if updated.name != name {
                updated.name = name;
                changed = true;
            }
        }
        if let Some(short_name) = str_field(row, "short_name") {
            if updated.short_name.as_deref() != Some(short_name.as_str()) {
                updated.short_name = Some(short_name);
                changed = true;
            }
        }
        if let Some(swift_code) = str_field(row, "swift_code") {
            if updated.swift_code.as_deref() != Some(swift_code.as_str()) {
                updated.swift_code = Some(swift_code);
                changed = true;
            }
        }
        if let Some(sort_code) = str_field(row, "sort_code") {
            if updated.sort_code.as_deref() != Some(sort_code.as_str()) {
                updated.sort_code = Some(sort_code);
                changed = true;
            }
        }
        if let Some(phone) = str_field(row, "phone") {
            if updated.phone.as_deref() != Some(phone.as_str()) {
                updated.phone = Some(phone);
                changed = true;
            }
        }
        if let Some(email) = str_field(row, "email") {
            if updated.email.as_deref() != Some(email.as_str()) {
                updated.email = Some(email);
                changed = true;
            }
        }

        Ok((CreatedEntity::Bank(updated), changed))
    }
}

pub struct BankValidator;

impl EntityValidator for BankValidator {
    fn validate_row(&self, row: &Row, row_number: usize) -> ValidationResult {
        let mut errors = Vec::new();
        if str_field(row, "code").is_none() {
            errors.push(format!("Row {row_number}: code is required"));
        }
        if str_field(row, "name").is_none() {
            errors.push(format!("Row {row_number}: name is required"));
        }
        ValidationResult { errors, warnings: Vec::new() }
    }
}

pub struct BankMatcher;

impl EntityMatcher for BankMatcher {
    fn find_existing(&self, row: &Row, ctx: &ImportContext) -> Option<MatchResult> {
        let code = str_field(row, "code");
        let name = str_field(row, "name");

        let existing = code
            .as_deref()
            .and_then(|c| ctx.find_bank_by_code(c))
            .or_else(|| name.as_deref().and_then(|n| ctx.find_bank_by_name(n)))?;

        let mut changes = std::collections::HashMap::new();
        for (field, new_val, old_val) in [
            ("name", str_field(row, "name"), Some(existing.name.clone())),
            ("short_name", str_field(row, "short_name"), existing.short_name.clone()),
            ("swift_code", str_field(row, "swift_code"), existing.swift_code.clone()),
            ("sort_code", str_field(row, "sort_code"), existing.sort_code.clone()),
        ] {
            if let Some(new_val) = new_val {
                let old = old_val.unwrap_or_default();
                if new_val != old {
                    changes.insert(field.to_string(), FieldChange { old, new: new_val });
                }
            }
        }

        Some(MatchResult {
            existing_record: Some(CreatedEntity::Bank(existing.clone())),
            changes: if changes.is_empty() { None } else { Some(changes) },
        })
    }
}
