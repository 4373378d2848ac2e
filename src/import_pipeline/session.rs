//! ImportSession: phases 1 (Analyse) and 2 (Preview) of the bulk import
//! pipeline (spec.md §4.M).
//!
//! Grounded on `assistant/import_pipeline/preview_generator.py::ImportPreviewGenerator`
//! for phase 2, and `column_mapper.py`'s entry points for phase 1.

use std::collections::HashMap;

use uuid::Uuid;

use crate::import_pipeline::interfaces::{EntityType, ImportContext, LlmColumnMapper, MatchResult, Row};
use crate::import_pipeline::registry::EntityCreatorRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportSessionStatus {
    Mapped,
    Previewed,
    Confirmed,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Default)]
pub struct ImportSessionCounts {
    pub total: usize,
    pub to_create: usize,
    pub to_update: usize,
    pub to_skip: usize,
    pub to_error: usize,
}

#[derive(Clone, Debug)]
pub struct ImportSession {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub status: ImportSessionStatus,
    pub column_mapping: HashMap<String, Option<String>>,
    pub target_schema: Vec<(&'static str, &'static str)>,
    pub sample_rows: Vec<Row>,
    pub counts: ImportSessionCounts,
    /// Default field values merged into every parsed row before validation
    /// (e.g. a blanket `effective_from` for a transaction import).
    pub import_params: HashMap<String, serde_json::Value>,
    pub rollback_on_error: bool,
}

/// `analyse` (spec.md §4.M phase 1): classify the entity type (if not
/// supplied) and propose a column mapping, via the AI collaborator with a
/// fuzzy fallback already baked into `LlmColumnMapper::map_columns`.
pub async fn analyse(
    session_id: Uuid,
    source_columns: &[String],
    raw_rows: &[Row],
    entity_type: Option<EntityType>,
    mapper: &dyn LlmColumnMapper,
    registry: &EntityCreatorRegistry,
    import_params: HashMap<String, serde_json::Value>,
    rollback_on_error: bool,
) -> crate::import_pipeline::error::ImportResult<ImportSession> {
    let sample: Vec<Row> = raw_rows.iter().take(3).cloned().collect();

    let entity_type = match entity_type {
        Some(t) => t,
        None => mapper.detect_entity_type(source_columns, &sample).await,
    };

    let target_schema = registry.target_schema(entity_type)?;
    let column_mapping = mapper.map_columns(source_columns, &sample, &target_schema, entity_type).await;

    Ok(ImportSession {
        id: session_id,
        entity_type,
        status: ImportSessionStatus::Mapped,
        column_mapping,
        target_schema,
        sample_rows: sample,
        counts: ImportSessionCounts::default(),
        import_params,
        rollback_on_error,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewAction {
    Create,
    Update,
    Skip,
    Error,
}

#[derive(Clone, Debug)]
pub struct ImportPreviewRow {
    pub row_number: usize,
    pub action: PreviewAction,
    pub raw_data: Row,
    pub parsed_data: Row,
    pub existing_record: Option<crate::import_pipeline::interfaces::CreatedEntity>,
    pub changes: Option<HashMap<String, crate::import_pipeline::interfaces::FieldChange>>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Applies `session.column_mapping` to one raw row, producing the row a
/// Validator/Matcher/Creator actually sees.
fn apply_mapping(raw: &Row, mapping: &HashMap<String, Option<String>>) -> Row {
    mapping
        .iter()
        .filter_map(|(target, source)| {
            let source = source.as_ref()?;
            raw.get(source).map(|v| (target.clone(), v.clone()))
        })
        .collect()
}

fn merge_defaults(mut parsed: Row, defaults: &HashMap<String, serde_json::Value>) -> Row {
    for (key, value) in defaults {
        parsed.entry(key.clone()).or_insert_with(|| value.clone());
    }
    parsed
}

/// `generate` (spec.md §4.M phase 2): validate then match every row,
/// producing one `ImportPreviewRow` each and updating the session counts.
/// Mutates no business data.
pub fn preview(session: &mut ImportSession, raw_rows: &[Row], registry: &EntityCreatorRegistry, ctx: &ImportContext) -> crate::import_pipeline::error::ImportResult<Vec<ImportPreviewRow>> {
    let entry = registry.get_creator(session.entity_type)?;
    let validator = entry.validator();
    let matcher = entry.matcher();

    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut counts = ImportSessionCounts::default();

    for (i, raw) in raw_rows.iter().enumerate() {
        let row_number = i + 1;
        counts.total += 1;

        let mapped = apply_mapping(raw, &session.column_mapping);
        let parsed = merge_defaults(mapped, &session.import_params);

        let validation = validator.map(|v| v.validate_row(&parsed, row_number)).unwrap_or_default();
        if !validation.is_valid() {
            counts.to_error += 1;
            rows.push(ImportPreviewRow {
                row_number,
                action: PreviewAction::Error,
                raw_data: raw.clone(),
                parsed_data: parsed,
                existing_record: None,
                changes: None,
                errors: validation.errors,
                warnings: validation.warnings,
            });
            continue;
        }

        let match_result: Option<MatchResult> = matcher.and_then(|m| m.find_existing(&parsed, ctx));
        let (action, existing_record, changes) = match match_result {
            Some(m) if m.existing_record.is_some() => {
                counts.to_update += 1;
                (PreviewAction::Update, m.existing_record, m.changes)
            }
            _ => {
                counts.to_create += 1;
                (PreviewAction::Create, None, None)
            }
        };

        rows.push(ImportPreviewRow {
            row_number,
            action,
            raw_data: raw.clone(),
            parsed_data: parsed,
            existing_record,
            changes,
            errors: Vec::new(),
            warnings: validation.warnings,
        });
    }

    session.counts = counts;
    session.status = ImportSessionStatus::Previewed;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_mapping_skips_unmapped_targets() {
        let raw: Row = [("Emp No".to_string(), serde_json::json!("E001"))].into_iter().collect();
        let mut mapping = HashMap::new();
        mapping.insert("employee_number".to_string(), Some("Emp No".to_string()));
        mapping.insert("component_code".to_string(), None);

        let parsed = apply_mapping(&raw, &mapping);
        assert_eq!(parsed.get("employee_number").and_then(|v| v.as_str()), Some("E001"));
        assert!(!parsed.contains_key("component_code"));
    }

    #[test]
    fn merge_defaults_does_not_override_existing_values() {
        let mut parsed: Row = HashMap::new();
        parsed.insert("status".to_string(), serde_json::json!("PENDING"));
        let mut defaults = HashMap::new();
        defaults.insert("status".to_string(), serde_json::json!("ACTIVE"));
        defaults.insert("is_recurring".to_string(), serde_json::json!(true));

        let merged = merge_defaults(parsed, &defaults);
        assert_eq!(merged.get("status").and_then(|v| v.as_str()), Some("PENDING"));
        assert_eq!(merged.get("is_recurring").and_then(|v| v.as_bool()), Some(true));
    }
}
