use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::store::Fields;

/// ===============================
/// Accepted shape of a patched field
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM:SS`
    Time,
    /// `HH:MM:SS` or null to clear it
    OptionalTime,
}

/// ===============================
/// Build a merge patch from a JSON payload
/// ===============================
pub fn build_patch(payload: &Value, allowed: &[(&str, FieldKind)]) -> Result<Fields, String> {
    let obj = payload
        .as_object()
        .ok_or_else(|| "Payload must be a JSON object".to_string())?;

    if obj.is_empty() {
        return Err("No fields provided for update".to_string());
    }

    let mut patch = Fields::new();

    for (key, value) in obj {
        let kind = allowed
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| format!("Field '{}' cannot be updated", key))?;

        let checked = match (kind, value) {
            (FieldKind::OptionalTime, Value::Null) => Value::Null,
            (FieldKind::Time | FieldKind::OptionalTime, Value::String(s)) => {
                NaiveTime::parse_from_str(s, "%H:%M:%S")
                    .map_err(|_| format!("Field '{}' must be a time (HH:MM:SS)", key))?;
                value.clone()
            }
            (FieldKind::Date, Value::String(s)) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| format!("Field '{}' must be a date (YYYY-MM-DD)", key))?;
                value.clone()
            }
            _ => return Err(format!("Unsupported value for field '{}'", key)),
        };

        patch.insert(key.clone(), checked);
    }

    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[(&str, FieldKind)] = &[
        ("inTime", FieldKind::Time),
        ("outTime", FieldKind::OptionalTime),
        ("date", FieldKind::Date),
    ];

    #[test]
    fn accepts_known_fields_and_null_out_time() {
        let patch = build_patch(
            &json!({"inTime": "08:30:00", "outTime": null, "date": "2026-02-01"}),
            FIELDS,
        )
        .unwrap();

        assert_eq!(patch.get("inTime"), Some(&json!("08:30:00")));
        assert_eq!(patch.get("outTime"), Some(&Value::Null));
        assert_eq!(patch.len(), 3);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_formats() {
        assert!(build_patch(&json!({"userId": "someone-else"}), FIELDS).is_err());
        assert!(build_patch(&json!({"inTime": "8am"}), FIELDS).is_err());
        assert!(build_patch(&json!({"inTime": null}), FIELDS).is_err());
        assert!(build_patch(&json!({"date": "01/02/2026"}), FIELDS).is_err());
        assert!(build_patch(&json!({}), FIELDS).is_err());
        assert!(build_patch(&json!([1, 2]), FIELDS).is_err());
    }
}
