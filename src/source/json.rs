// src/source/json.rs

use serde_json::Value;

use super::{RawRow, RowSet, RowSource};
use crate::error::{EtlError, Result};

/// A top-level object whose first value is the array of row objects.
pub struct JsonSource;

impl RowSource for JsonSource {
    fn read_rows(&self, file: &str, text: &str) -> Result<RowSet> {
        let doc: Value = serde_json::from_str(text)
            .map_err(|e| EtlError::format(file, format!("JSON parse: {}", e)))?;

        let items = doc
            .as_object()
            .ok_or_else(|| EtlError::format(file, "top-level JSON value is not an object"))?
            .values()
            .next()
            .ok_or_else(|| EtlError::format(file, "top-level JSON object is empty"))?
            .as_array()
            .ok_or_else(|| EtlError::format(file, "first JSON value is not an array"))?;

        let mut rows = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or_else(|| EtlError::format(file, format!("row {} is not an object", idx)))?;
            let mut row = RawRow::new();
            for (key, value) in obj {
                let text = scalar_text(value).ok_or_else(|| {
                    EtlError::format(file, format!("row {}: `{}` is not a scalar", idx, key))
                })?;
                row.insert(key.as_str(), text);
            }
            rows.push(row);
        }

        Ok(RowSet::from_rows(rows))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_value_in_document_order() {
        let text = r#"{"fields": [{"D1": "a", "M1": 5}, {"D1": "b", "M1": "7"}], "other": []}"#;
        let set = JsonSource.read_rows("t.json", text).unwrap();
        assert_eq!(set.headers, vec!["D1", "M1"]);
        assert_eq!(set.rows[0].values().collect::<Vec<_>>(), vec!["a", "5"]);
        assert_eq!(set.rows[1].values().collect::<Vec<_>>(), vec!["b", "7"]);
    }

    #[test]
    fn key_order_is_preserved() {
        let text = r#"{"x": [{"M2": "1", "D1": "z"}]}"#;
        let set = JsonSource.read_rows("t.json", text).unwrap();
        assert_eq!(set.headers, vec!["M2", "D1"]);
    }

    #[test]
    fn rejects_non_object_rows_and_nested_values() {
        assert!(JsonSource.read_rows("t.json", r#"{"x": [1, 2]}"#).is_err());
        assert!(JsonSource
            .read_rows("t.json", r#"{"x": [{"D1": null}]}"#)
            .is_err());
        assert!(JsonSource.read_rows("t.json", "[]").is_err());
        assert!(JsonSource.read_rows("t.json", "{}").is_err());
        assert!(JsonSource.read_rows("t.json", "{not json").is_err());
    }

    #[test]
    fn empty_row_array_has_no_headers() {
        let set = JsonSource.read_rows("t.json", r#"{"x": []}"#).unwrap();
        assert!(set.headers.is_empty());
        assert!(set.rows.is_empty());
    }
}
