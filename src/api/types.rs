//! Wire types for the data service.
//!
//! The row object on the wire is a flat JSON map: `"Date"` holding a
//! `YYYY-MM-DD` string, every other key a number, in registry order (the
//! serializer preserves insertion order, so the backend sees columns the
//! way the user sees them).

use crate::core::dataset::{DATE_COLUMN, DATE_FORMAT, Dataset, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// One row as it travels over HTTP.
pub type WireRow = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A full table as decoded from the wire: registry plus rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl TableData {
    /// Decode a `get_data`-shaped payload.
    ///
    /// The registry is taken from the first row's key order; an empty
    /// payload keeps the built-in default shape, which is exactly what a
    /// cleared table should look like.
    pub fn from_wire(rows: Vec<WireRow>) -> Result<Self, ApiError> {
        let Some(first) = rows.first() else {
            return Ok(Self {
                columns: Dataset::default_columns(),
                rows: Vec::new(),
            });
        };

        let mut columns = vec![DATE_COLUMN.to_string()];
        columns.extend(first.keys().filter(|k| *k != DATE_COLUMN).cloned());

        let mut decoded = Vec::with_capacity(rows.len());
        for wire in &rows {
            let date_raw = wire
                .get(DATE_COLUMN)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ApiError::Malformed(format!("row is missing a '{DATE_COLUMN}' string"))
                })?;
            let date = Dataset::parse_date(date_raw)
                .map_err(|e| ApiError::Malformed(e.to_string()))?;

            let mut values = HashMap::with_capacity(columns.len() - 1);
            for column in &columns[1..] {
                let value = match wire.get(column).and_then(Value::as_f64) {
                    Some(v) => v,
                    None => {
                        warn!("non-numeric value for '{column}', coercing to 0");
                        0.0
                    }
                };
                values.insert(column.clone(), value);
            }
            decoded.push(Row::new(date, values));
        }

        Ok(Self {
            columns,
            rows: decoded,
        })
    }
}

/// Encode one row in registry order, `Date` first.
pub fn row_to_wire(columns: &[String], row: &Row) -> WireRow {
    let mut wire = Map::with_capacity(columns.len());
    wire.insert(
        DATE_COLUMN.to_string(),
        Value::String(row.date.format(DATE_FORMAT).to_string()),
    );
    for column in columns.iter().filter(|c| c.as_str() != DATE_COLUMN) {
        let value = row.value(column).unwrap_or(0.0);
        let number = serde_json::Number::from_f64(value)
            .unwrap_or_else(|| serde_json::Number::from(0));
        wire.insert(column.clone(), Value::Number(number));
    }
    wire
}

/// Encode the whole table for `replace_data`.
pub fn dataset_to_wire(dataset: &Dataset) -> Vec<WireRow> {
    dataset
        .rows()
        .iter()
        .map(|row| row_to_wire(dataset.columns(), row))
        .collect()
}

/// Mutation acknowledgement: `{"status": "success"}` or an error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// `import_datafile` answer: the replacement table plus a human-readable
/// message, or an error string.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<WireRow>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `calculate_correlation` request body. Field names follow the endpoint,
/// not Rust convention.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationRequest {
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    #[serde(rename = "xAxis")]
    pub x_axis: String,
    #[serde(rename = "yAxis")]
    pub y_axis: String,
    #[serde(rename = "isDateX")]
    pub is_date_x: bool,
    #[serde(rename = "isDateY")]
    pub is_date_y: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationResponse {
    #[serde(default)]
    pub correlation: Option<f64>,
    #[serde(default)]
    pub p_value: Option<f64>,
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_dataset() -> Dataset {
        let mut ds = Dataset::default();
        let mut entries = HashMap::new();
        entries.insert("Variable 1".to_string(), "1.5".to_string());
        entries.insert("Variable 2".to_string(), "2".to_string());
        ds.add_row("2024-05-01", &entries).unwrap();
        ds
    }

    #[test]
    fn wire_rows_keep_registry_order_with_date_first() {
        let ds = sample_dataset();
        let wire = dataset_to_wire(&ds);
        let keys: Vec<&String> = wire[0].keys().collect();
        assert_eq!(keys, vec!["Date", "Variable 1", "Variable 2"]);
        assert_eq!(wire[0]["Date"], Value::String("2024-05-01".to_string()));
        assert_eq!(wire[0]["Variable 1"].as_f64(), Some(1.5));
    }

    #[test]
    fn wire_round_trip_preserves_the_table() {
        let ds = sample_dataset();
        let decoded = TableData::from_wire(dataset_to_wire(&ds)).unwrap();
        assert_eq!(decoded.columns, ds.columns());
        assert_eq!(decoded.rows, ds.rows());
    }

    #[test]
    fn empty_payload_decodes_to_the_default_shape() {
        let table = TableData::from_wire(vec![]).unwrap();
        assert_eq!(table.columns, Dataset::default_columns());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn imported_structure_replaces_the_column_set() {
        let payload: Vec<WireRow> = serde_json::from_str(
            r#"[{"Date": "2024-01-01", "Temp": 21.5, "Humidity": 60}]"#,
        )
        .unwrap();
        let table = TableData::from_wire(payload).unwrap();
        assert_eq!(table.columns, vec!["Date", "Temp", "Humidity"]);
        assert_eq!(table.rows[0].value("Temp"), Some(21.5));
    }

    #[test]
    fn missing_date_is_malformed() {
        let payload: Vec<WireRow> =
            serde_json::from_str(r#"[{"Temp": 1.0}]"#).unwrap();
        assert!(TableData::from_wire(payload).is_err());
    }

    #[test]
    fn status_envelope_maps_to_result() {
        let ok: StatusResponse =
            serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        assert!(ok.into_result().is_ok());

        let err: StatusResponse = serde_json::from_str(
            r#"{"status": "error", "message": "Data must be a list"}"#,
        )
        .unwrap();
        match err.into_result() {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Data must be a list"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn correlation_request_uses_endpoint_field_names() {
        let req = CorrelationRequest {
            x_values: vec![1.0],
            y_values: vec![2.0],
            x_axis: "Date".to_string(),
            y_axis: "Variable 1".to_string(),
            is_date_x: true,
            is_date_y: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("xAxis").is_some());
        assert!(json.get("isDateX").is_some());
        assert!(json.get("x_axis").is_none());
    }
}
