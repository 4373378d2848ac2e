//! Loosely-typed row field coercion shared by every creator/validator.
//!
//! Grounded on `assistant/import_pipeline/creators/base.py`'s
//! `to_decimal`/`to_date`/`to_bool`/`to_str` — the same "never raise, fall
//! back to a default" contract, since a malformed spreadsheet cell should
//! surface as a validation error, not a panic.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::import_pipeline::interfaces::Row;

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];

fn raw_str(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

pub fn str_field(row: &Row, key: &str) -> Option<String> {
    row.get(key).and_then(raw_str)
}

pub fn decimal_field(row: &Row, key: &str) -> Option<Decimal> {
    let raw = str_field(row, key)?;
    Decimal::from_str(&raw).ok()
}

pub fn date_field(row: &Row, key: &str) -> Option<NaiveDate> {
    let raw = str_field(row, key)?;
    DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(&raw, fmt).ok())
}

pub fn bool_field(row: &Row, key: &str, default: bool) -> bool {
    match row.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(v) => match raw_str(v) {
            Some(s) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "y"),
            None => default,
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn date_field_tries_every_known_format() {
        let row: Row = [("effective_from".to_string(), json!("15/01/2026"))].into_iter().collect();
        assert_eq!(date_field(&row, "effective_from"), NaiveDate::from_ymd_opt(2026, 1, 15));
    }

    #[test]
    fn decimal_field_rejects_garbage() {
        let row: Row = [("amount".to_string(), json!("not-a-number"))].into_iter().collect();
        assert_eq!(decimal_field(&row, "amount"), None);
    }

    #[test]
    fn bool_field_defaults_when_absent() {
        let row: Row = HashMap::new();
        assert!(bool_field(&row, "is_primary", true));
        assert!(!bool_field(&row, "is_primary", false));
    }
}
