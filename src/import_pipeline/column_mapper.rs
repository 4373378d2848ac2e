//! AI-assisted column mapping (spec.md §6 "import AI collaborator
//! contract"): asks the collaborator to map a spreadsheet's source columns
//! onto an entity's target schema, with a deterministic fuzzy-match
//! fallback when the collaborator is unavailable or returns garbage.
//!
//! Grounded on `assistant/import_pipeline/column_mapper.py::OllamaColumnMapper`
//! — the system prompts, the JSON-fence-stripping parse, and the
//! `SequenceMatcher`-based fallback (ported here to `strsim::jaro_winkler`,
//! same >=0.6 acceptance threshold, greedy best-match-wins).

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::import_pipeline::interfaces::{EntityType, LlmColumnMapper, Row};

const COLUMN_MAPPING_SYSTEM_PROMPT: &str = "\
You are a data mapping assistant. Given a list of source spreadsheet columns \
and a target schema, return ONLY a JSON object mapping each target field \
name to the best-matching source column name, or null if no good match \
exists. Respond with pure JSON, no markdown code fences, no commentary.";

const ENTITY_DETECT_SYSTEM_PROMPT: &str = "\
You are a data mapping assistant. Given a list of source spreadsheet columns \
and sample rows, identify which entity type this spreadsheet describes. \
Respond with exactly one of: EMPLOYEE_TRANSACTION, EMPLOYEE, BANK_ACCOUNT, \
PAY_COMPONENT, BANK. Respond with pure JSON: {\"entity_type\": \"...\"}, no \
markdown code fences, no commentary.";

const FUZZY_THRESHOLD: f64 = 0.6;

pub struct AiColumnMapper {
    client: reqwest::Client,
    endpoint: String,
}

impl AiColumnMapper {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self { client, endpoint }
    }

    fn schema_description(target_schema: &[(&'static str, &'static str)]) -> String {
        target_schema
            .iter()
            .map(|(field, hint)| format!("- {field}: {hint}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sample_text(sample_rows: &[Row]) -> String {
        sample_rows
            .iter()
            .take(3)
            .map(|row| format!("{:?}", row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, String> {
        let body = serde_json::json!({
            "system": system_prompt,
            "prompt": user_prompt,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let text = response.text().await.map_err(|e| e.to_string())?;
        parse_json_response(&text).ok_or_else(|| format!("collaborator returned non-JSON response: {text}"))
    }
}

#[async_trait::async_trait]
impl LlmColumnMapper for AiColumnMapper {
    async fn map_columns(
        &self,
        source_columns: &[String],
        sample_rows: &[Row],
        target_schema: &[(&'static str, &'static str)],
        entity_type: EntityType,
    ) -> HashMap<String, Option<String>> {
        let prompt = format!(
            "Entity type: {}\nTarget schema:\n{}\nSource columns: {:?}\nSample rows:\n{}",
            entity_type.as_str(),
            Self::schema_description(target_schema),
            source_columns,
            Self::sample_text(sample_rows),
        );

        match self.chat_json(COLUMN_MAPPING_SYSTEM_PROMPT, &prompt).await {
            Ok(value) => validate_mapping(value, target_schema),
            Err(e) => {
                tracing::warn!(error = %e, "column mapper collaborator call failed, falling back to fuzzy match");
                fuzzy_fallback(source_columns, target_schema)
            }
        }
    }

    async fn detect_entity_type(&self, source_columns: &[String], sample_rows: &[Row]) -> EntityType {
        let prompt = format!("Source columns: {:?}\nSample rows:\n{}", source_columns, Self::sample_text(sample_rows));
        match self.chat_json(ENTITY_DETECT_SYSTEM_PROMPT, &prompt).await {
            Ok(value) => value
                .get("entity_type")
                .and_then(Value::as_str)
                .and_then(parse_entity_type)
                .unwrap_or(EntityType::EmployeeTransaction),
            Err(e) => {
                tracing::warn!(error = %e, "entity-type detection collaborator call failed, defaulting");
                EntityType::EmployeeTransaction
            }
        }
    }
}

fn parse_entity_type(s: &str) -> Option<EntityType> {
    match s.trim().to_uppercase().as_str() {
        "EMPLOYEE" => Some(EntityType::Employee),
        "EMPLOYEE_TRANSACTION" => Some(EntityType::EmployeeTransaction),
        "PAY_COMPONENT" => Some(EntityType::PayComponent),
        "BANK" => Some(EntityType::Bank),
        "BANK_ACCOUNT" => Some(EntityType::BankAccount),
        _ => None,
    }
}

/// Strips ```json fences, falling back to the first `{...}` span — mirrors
/// `_parse_json` in the Python original.
fn parse_json_response(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let fenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    if let Ok(v) = serde_json::from_str::<Value>(fenced) {
        return Some(v);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

/// `_validate_mapping`: drops any target field the collaborator didn't
/// recognise.
fn validate_mapping(value: Value, target_schema: &[(&'static str, &'static str)]) -> HashMap<String, Option<String>> {
    let Some(obj) = value.as_object() else { return HashMap::new() };
    target_schema
        .iter()
        .filter_map(|(field, _)| {
            obj.get(*field).map(|v| {
                let mapped = v.as_str().map(|s| s.to_string());
                (field.to_string(), mapped)
            })
        })
        .collect()
}

/// `_fuzzy_fallback`: greedy best-match-wins, Jaro-Winkler similarity
/// >= 0.6 against normalized column names.
fn fuzzy_fallback(source_columns: &[String], target_schema: &[(&'static str, &'static str)]) -> HashMap<String, Option<String>> {
    let normalize = |s: &str| s.to_lowercase().replace([' ', '-'], "_");

    let mut used_sources: Vec<bool> = vec![false; source_columns.len()];
    let mut mapping = HashMap::new();

    for (field, _) in target_schema {
        let normalized_field = normalize(field);
        let mut best: Option<(usize, f64)> = None;

        for (i, source) in source_columns.iter().enumerate() {
            if used_sources[i] {
                continue;
            }
            let score = strsim::jaro_winkler(&normalized_field, &normalize(source));
            if score >= FUZZY_THRESHOLD && best.map(|(_, b)| score > b).unwrap_or(true) {
                best = Some((i, score));
            }
        }

        match best {
            Some((i, _)) => {
                used_sources[i] = true;
                mapping.insert(field.to_string(), Some(source_columns[i].clone()));
            }
            None => {
                mapping.insert(field.to_string(), None);
            }
        }
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_response_strips_markdown_fence() {
        let text = "```json\n{\"employee_number\": \"Emp No\"}\n```";
        let value = parse_json_response(text).unwrap();
        assert_eq!(value["employee_number"], "Emp No");
    }

    #[test]
    fn parse_json_response_finds_embedded_object() {
        let text = "Sure, here you go: {\"a\": 1} thanks!";
        let value = parse_json_response(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn fuzzy_fallback_matches_close_column_names() {
        let source = vec!["Employee No".to_string(), "Amount Override".to_string()];
        let schema = vec![("employee_number", "hint"), ("override_amount", "hint")];
        let mapping = fuzzy_fallback(&source, &schema);
        assert!(mapping.get("employee_number").unwrap().is_some());
    }

    #[test]
    fn fuzzy_fallback_leaves_unmatched_fields_null() {
        let source = vec!["Totally Unrelated Column".to_string()];
        let schema = vec![("component_code", "hint")];
        let mapping = fuzzy_fallback(&source, &schema);
        assert_eq!(mapping.get("component_code").unwrap(), &None);
    }
}
