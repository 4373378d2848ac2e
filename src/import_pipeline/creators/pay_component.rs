//! `PAY_COMPONENT` creator/validator/matcher.
//!
//! Grounded on `assistant/import_pipeline/creators/pay_component.py`.

use crate::domain::entity::Entity;
use crate::domain::payroll_model::component::{CalcKind, ComponentCategory, ComponentType, PayComponent};
use crate::import_pipeline::error::{ImportError, ImportResult};
use crate::import_pipeline::interfaces::{CreatedEntity, EntityCreator, EntityMatcher, EntityType, EntityValidator, FieldChange, ImportContext, MatchResult, Row, ValidationResult};
use crate::import_pipeline::row_helpers::{bool_field, decimal_field, str_field};

pub struct PayComponentCreator;

fn parse_component_type(row: &Row) -> ComponentType {
    match str_field(row, "component_type").as_deref().map(str::to_uppercase).as_deref() {
        Some("DEDUCTION") => ComponentType::Deduction,
        Some("EMPLOYER") => ComponentType::EmployerContribution,
        _ => ComponentType::Earning,
    }
}

fn parse_category(row: &Row) -> ComponentCategory {
    match str_field(row, "category").as_deref().map(str::to_uppercase).as_deref() {
        Some("BASIC") => ComponentCategory::Basic,
        Some("ALLOWANCE") => ComponentCategory::Allowance,
        Some("BONUS") => ComponentCategory::Bonus,
        Some("STATUTORY") => ComponentCategory::Statutory,
        Some("OVERTIME") => ComponentCategory::Overtime,
        Some("SHIFT") => ComponentCategory::Shift,
        Some("LOAN") => ComponentCategory::Loan,
        Some("FUND") => ComponentCategory::Fund,
        _ => ComponentCategory::Other,
    }
}

fn parse_calc_kind(row: &Row) -> CalcKind {
    match str_field(row, "calculation_type").as_deref().map(str::to_uppercase).as_deref() {
        Some("PCT_BASIC") => CalcKind::PctOfBasic,
        Some("PCT_GROSS") => CalcKind::PctOfGross,
        Some("FORMULA") => CalcKind::Formula,
        Some("LOOKUP") => CalcKind::Lookup,
        _ => CalcKind::Fixed,
    }
}

impl EntityCreator for PayComponentCreator {
    fn entity_type(&self) -> EntityType {
        EntityType::PayComponent
    }

    fn target_schema(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("code", "Unique component code (e.g. HOUSING)"),
            ("name", "Component name (e.g. Housing Allowance)"),
            ("component_type", "Type: EARNING, DEDUCTION, EMPLOYER"),
            ("category", "Category: BASIC, ALLOWANCE, BONUS, STATUTORY, OVERTIME, SHIFT, LOAN, FUND, OTHER"),
            ("calculation_type", "Calculation: FIXED, PCT_BASIC, PCT_GROSS, FORMULA, LOOKUP"),
            ("default_amount", "Default amount (decimal)"),
            ("percentage_value", "Percentage value (decimal)"),
            ("is_taxable", "Is taxable? true/false"),
            ("is_statutory", "Is statutory? true/false"),
            ("is_recurring", "Is recurring? true/false"),
        ]
    }

    fn create(&self, row: &Row, ctx: &ImportContext) -> ImportResult<CreatedEntity> {
        let code = str_field(row, "code").ok_or_else(|| ImportError::Validation("code is required".to_string()))?;
        let name = str_field(row, "name").ok_or_else(|| ImportError::Validation("name is required".to_string()))?;

        let component = PayComponent {
            entity: Entity::new(ctx.tenant_id),
            code,
            name,
            component_type: parse_component_type(row),
            category: parse_category(row),
            calc_kind: parse_calc_kind(row),
            default_amount: decimal_field(row, "default_amount"),
            default_percentage: decimal_field(row, "percentage_value"),
            formula: None,
            is_taxable: bool_field(row, "is_taxable", true),
            reduces_taxable: false,
            is_overtime: false,
            is_bonus: false,
            affects_ssnit: false,
            is_statutory: bool_field(row, "is_statutory", false),
            is_recurring: bool_field(row, "is_recurring", true),
            is_prorated: true,
            is_arrears_applicable: true,
            show_on_payslip: true,
            display_order: 0,
        };
        component.validate().map_err(ImportError::Validation)?;

        Ok(CreatedEntity::PayComponent(component))
    }

    fn update(&self, existing: &CreatedEntity, row: &Row, _ctx: &ImportContext) -> ImportResult<(CreatedEntity, bool)> {
        let CreatedEntity::PayComponent(current) = existing else {
            return Err(ImportError::Internal("update called with a non-pay-component existing record".to_string()));
        };
        let mut updated = current.clone();
        let mut changed = false;

        if let Some(name) = str_field(row, "name") {
            if updated.name != name {
                updated.name = name;
                changed = true;
            }
        }
        if let Some(amount) = decimal_field(row, "default_amount") {
            if updated.default_amount != Some(amount) {
                updated.default_amount = Some(amount);
                changed = true;
            }
        }
        if let Some(pct) = decimal_field(row, "percentage_value") {
            if updated.default_percentage != Some(pct) {
                updated.default_percentage = Some(pct);
                changed = true;
            }
        }
        if str_field(row, "is_taxable").is_some() {
            let new_val = bool_field(row, "is_taxable", updated.is_taxable);
            if updated.is_taxable != new_val {
                updated.is_taxable = new_val;
                changed = true;
            }
        }

        if changed {
            updated.entity.touch();
        }
        Ok((CreatedEntity::PayComponent(updated), changed))
    }
}

pub struct PayComponentValidator;

impl EntityValidator for PayComponentValidator {
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

pub struct PayComponentMatcher;

impl EntityMatcher for PayComponentMatcher {
    fn find_existing(&self, row: &Row, ctx: &ImportContext) -> Option<MatchResult> {
        let code = str_field(row, "code")?;
        let existing = ctx.pay_components.get(&code)?;

        let mut changes = std::collections::HashMap::new();
        if let Some(new_name) = str_field(row, "name") {
            if new_name != existing.name {
                changes.insert("name".to_string(), FieldChange { old: existing.name.clone(), new: new_name });
            }
        }

        Some(MatchResult {
            existing_record: Some(CreatedEntity::PayComponent(existing.clone())),
            changes: if changes.is_empty() { None } else { Some(changes) },
        })
    }
}
