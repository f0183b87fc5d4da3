//! Structured clinical fields extracted by the language model.
//!
//! The model is asked for a fixed set of keys but is free to omit some or add
//! others. Every known key is declared here and defaults to an empty string;
//! anything else lands in `additional`. Known values are validated and
//! coerced to strings after parsing; nested objects there are rejected.
//! Extra keys are kept leniently, with structured values stored as compact
//! JSON text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a parsed JSON payload is not an acceptable field record.
#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("field `{field}` has unsupported value type {kind}")]
    UnsupportedValue { field: String, kind: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFields {
    #[serde(default)]
    pub nature_of_illness: String,
    #[serde(default)]
    pub relevant_critical_findings: String,
    #[serde(default)]
    pub duration_of_ailment: String,
    #[serde(default)]
    pub date_of_first_consultation: String,
    #[serde(default)]
    pub past_history: String,
    #[serde(default)]
    pub provisional_diagnosis: String,
    #[serde(default)]
    pub icd_10_code: String,
    #[serde(default)]
    pub proposed_treatment: String,
    /// Keys the model returned beyond the known set.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, String>,
}

impl StructuredFields {
    /// Validate a parsed JSON value and build a field record from it.
    pub fn from_json_value(value: Value) -> Result<Self, FieldError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(FieldError::NotAnObject(kind_of(&other))),
        };
        Self::from_map(map)
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, FieldError> {
        let mut fields = Self::default();
        for (key, value) in map {
            let slot = match key.as_str() {
                "nature_of_illness" => &mut fields.nature_of_illness,
                "relevant_critical_findings" => &mut fields.relevant_critical_findings,
                "duration_of_ailment" => &mut fields.duration_of_ailment,
                "date_of_first_consultation" => &mut fields.date_of_first_consultation,
                "past_history" => &mut fields.past_history,
                "provisional_diagnosis" => &mut fields.provisional_diagnosis,
                "icd_10_code" => &mut fields.icd_10_code,
                "proposed_treatment" => &mut fields.proposed_treatment,
                _ => {
                    fields.additional.insert(key, coerce_additional(value));
                    continue;
                }
            };
            *slot = coerce(&key, value)?;
        }
        Ok(fields)
    }

    /// The provisional diagnosis, if the model filled it in.
    pub fn diagnosis(&self) -> Option<&str> {
        let trimmed = self.provisional_diagnosis.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Look up any field by its JSON key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "nature_of_illness" => &self.nature_of_illness,
            "relevant_critical_findings" => &self.relevant_critical_findings,
            "duration_of_ailment" => &self.duration_of_ailment,
            "date_of_first_consultation" => &self.date_of_first_consultation,
            "past_history" => &self.past_history,
            "provisional_diagnosis" => &self.provisional_diagnosis,
            "icd_10_code" => &self.icd_10_code,
            "proposed_treatment" => &self.proposed_treatment,
            other => return self.additional.get(other).map(String::as_str),
        };
        Some(value.as_str())
    }
}

/// Extra keys never fail validation.
fn coerce_additional(value: Value) -> String {
    match value {
        Value::Object(_) => value.to_string(),
        Value::Array(ref items) if items.iter().any(|i| i.is_array() || i.is_object()) => {
            value.to_string()
        }
        other => coerce("", other).unwrap_or_default(),
    }
}

fn coerce(key: &str, value: Value) -> Result<String, FieldError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Array(_) | Value::Object(_) => {
                        return Err(FieldError::UnsupportedValue {
                            field: key.to_string(),
                            kind: "nested array",
                        })
                    }
                    scalar => {
                        let text = coerce(key, scalar)?;
                        if !text.is_empty() {
                            parts.push(text);
                        }
                    }
                }
            }
            Ok(parts.join(", "))
        }
        Value::Object(_) => Err(FieldError::UnsupportedValue {
            field: key.to_string(),
            kind: "object",
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_and_additional_keys() {
        let fields = StructuredFields::from_json_value(json!({
            "provisional_diagnosis": " RE cataract nuclear ",
            "icd_10_code": "H25.1",
            "patient_name": "A. Kumar",
        }))
        .unwrap();

        assert_eq!(fields.provisional_diagnosis, "RE cataract nuclear");
        assert_eq!(fields.icd_10_code, "H25.1");
        assert_eq!(fields.nature_of_illness, "");
        assert_eq!(fields.get("patient_name"), Some("A. Kumar"));
        assert_eq!(fields.diagnosis(), Some("RE cataract nuclear"));
    }

    #[test]
    fn test_scalar_coercion() {
        let fields = StructuredFields::from_json_value(json!({
            "duration_of_ailment": 3,
            "past_history": null,
            "proposed_treatment": ["phaco", "IOL implant", ""],
            "follow_up": true,
        }))
        .unwrap();

        assert_eq!(fields.duration_of_ailment, "3");
        assert_eq!(fields.past_history, "");
        assert_eq!(fields.proposed_treatment, "phaco, IOL implant");
        assert_eq!(fields.get("follow_up"), Some("true"));
        assert_eq!(fields.diagnosis(), None);
    }

    #[test]
    fn test_rejects_non_object() {
        let err = StructuredFields::from_json_value(json!(["a", "b"])).unwrap_err();
        assert_eq!(err, FieldError::NotAnObject("array"));
    }

    #[test]
    fn test_rejects_nested_object() {
        let err = StructuredFields::from_json_value(json!({
            "provisional_diagnosis": {"primary": "cataract"}
        }))
        .unwrap_err();
        assert!(matches!(err, FieldError::UnsupportedValue { ref field, .. } if field == "provisional_diagnosis"));

        let err = StructuredFields::from_json_value(json!({
            "proposed_treatment": [["phaco"]]
        }))
        .unwrap_err();
        assert!(matches!(err, FieldError::UnsupportedValue { kind: "nested array", .. }));
    }

    #[test]
    fn test_extra_structured_values_kept_as_json() {
        let fields = StructuredFields::from_json_value(json!({
            "provisional_diagnosis": "RE cataract nuclear",
            "patient_details": {"name": "A"},
            "medications": [{"name": "timolol", "dose": "0.5%"}],
            "allergies": ["penicillin", "sulfa"],
        }))
        .unwrap();

        assert_eq!(fields.diagnosis(), Some("RE cataract nuclear"));
        assert_eq!(fields.get("patient_details"), Some(r#"{"name":"A"}"#));
        assert_eq!(
            fields.get("medications"),
            Some(r#"[{"dose":"0.5%","name":"timolol"}]"#)
        );
        assert_eq!(fields.get("allergies"), Some("penicillin, sulfa"));
    }
}
