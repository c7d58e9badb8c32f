//! Dynamic values and records
//!
//! A [`Record`] is one instance of a set's record type: a bag of named,
//! typed values. Related records loaded alongside it are embedded as
//! [`Value::Record`] / [`Value::Records`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{AdminError, Result};
use crate::schema::RecordType;
use crate::types::{PropertyType, ScalarKind};

static NULL: Value = Value::Null;

/// A single property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(uuid::Uuid),
    /// Enumeration member name
    Enum(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Record(Box<Record>),
    Records(Vec<Record>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Compare two values of the same variant
    pub fn compare_same(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => {
                Some(a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)))
            }
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Enum(a), Value::Enum(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Textual literal of a scalar value, as accepted by `parse_literal`
    pub fn to_literal(&self) -> Option<String> {
        match self {
            Value::Text(s) | Value::Enum(s) => Some(s.clone()),
            Value::Integer(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Decimal(v) => Some(v.to_string()),
            Value::Boolean(v) => Some(v.to_string()),
            Value::DateTime(v) => Some(v.to_rfc3339()),
            Value::Date(v) => Some(v.format("%Y-%m-%d").to_string()),
            Value::Time(v) => Some(v.format("%H:%M:%S%.f").to_string()),
            Value::Uuid(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Convert a JSON document into a value of the given type
    ///
    /// Understands the shapes PostgreSQL's `to_jsonb` produces (RFC 3339
    /// timestamps, `\x` hex-encoded bytea). Nested records are left null;
    /// relations are attached by the provider that loads them.
    pub fn from_json(property_type: &PropertyType, json: &serde_json::Value) -> Result<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let mismatch =
            || AdminError::validation(format!("Cannot read {} as {:?}", json, property_type));
        match property_type {
            PropertyType::Scalar(kind) => match (kind, json) {
                (ScalarKind::Text, serde_json::Value::String(s)) => Ok(Value::Text(s.clone())),
                (ScalarKind::Integer, serde_json::Value::Number(n)) => {
                    n.as_i64().map(Value::Integer).ok_or_else(mismatch)
                }
                (ScalarKind::Float, serde_json::Value::Number(n)) => {
                    n.as_f64().map(Value::Float).ok_or_else(mismatch)
                }
                (ScalarKind::Decimal, serde_json::Value::Number(n)) => {
                    // Digits as written in the document, never through f64
                    let digits = n.to_string();
                    Decimal::from_str(&digits)
                        .or_else(|_| Decimal::from_scientific(&digits))
                        .map(Value::Decimal)
                        .map_err(|_| mismatch())
                }
                (ScalarKind::Boolean, serde_json::Value::Bool(b)) => Ok(Value::Boolean(*b)),
                (_, serde_json::Value::String(s)) => kind.parse_literal(s).ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            PropertyType::Enum(_) => match json {
                serde_json::Value::String(s) => property_type.parse_literal(s).ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            PropertyType::Bytes => match json {
                serde_json::Value::String(s) => decode_hex(s.trim_start_matches("\\x"))
                    .map(Value::Bytes)
                    .ok_or_else(mismatch),
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|i| i.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .map(Value::Bytes)
                    .ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            PropertyType::Json => Ok(Value::Json(json.clone())),
            PropertyType::Record(_) | PropertyType::Records(_) => Ok(Value::Null),
        }
    }
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Json(j) => write!(f, "{}", j),
            Value::Record(r) => write!(f, "{}", r),
            Value::Records(rs) => write!(f, "[{} records]", rs.len()),
            other => match other.to_literal() {
                Some(literal) => write!(f, "{}", literal),
                None => write!(f, "?"),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(Box::new(r))
    }
}

/// One instance of a record type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Name of the record type this instance belongs to
    #[serde(rename = "recordType")]
    pub record_type: String,
    /// Property values by name
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field (builder form)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Value of a field, null when absent
    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }

    /// Build a record from a JSON object, reading each declared property
    pub fn from_json(record_type: &RecordType, json: &serde_json::Value) -> Result<Record> {
        let object = json
            .as_object()
            .ok_or_else(|| AdminError::validation("Record must be a JSON object"))?;

        let mut record = Record::new(&record_type.name);
        for property in &record_type.properties {
            if let Some(value) = object.get(&property.name) {
                let value = Value::from_json(&property.property_type, value).map_err(|e| {
                    AdminError::validation(format!(
                        "Invalid value for property '{}': {}",
                        property.name, e
                    ))
                })?;
                record.set(property.name.clone(), value);
            }
        }
        Ok(record)
    }
}

/// Default textual shape: `TypeName { field: value, .. }`, related records omitted
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.record_type)?;
        let mut first = true;
        for (name, value) in &self.fields {
            if matches!(value, Value::Record(_) | Value::Records(_)) {
                continue;
            }
            write!(f, "{}{}: {}", if first { " " } else { ", " }, name, value)?;
            first = false;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyDefinition;

    #[test]
    fn test_record_builder_and_get() {
        let record = Record::new("Person").with("Name", "Ada").with("Age", 36_i64);

        assert_eq!(record.get("Name"), &Value::Text("Ada".into()));
        assert_eq!(record.get("Age"), &Value::Integer(36));
        assert!(record.get("Missing").is_null());
    }

    #[test]
    fn test_record_display_skips_relations() {
        let job = Record::new("JobEntity").with("Name", "Smith");
        let record = Record::new("ParentEntity")
            .with("Name", "Ada")
            .with("Job", job);

        assert_eq!(record.to_string(), r#"ParentEntity { Name: "Ada" }"#);
    }

    #[test]
    fn test_compare_same_rejects_mixed_variants() {
        assert_eq!(
            Value::Integer(1).compare_same(&Value::Integer(2)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Integer(1).compare_same(&Value::Float(1.0)), None);
    }

    #[test]
    fn test_float_zero_signs_compare_equal() {
        assert_eq!(
            Value::Float(-0.0).compare_same(&Value::Float(0.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Float(f64::NAN).compare_same(&Value::Float(1.0)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_literal_round_trip_for_keys() {
        let id = uuid::Uuid::new_v4();
        let literal = Value::Uuid(id).to_literal().unwrap();
        assert_eq!(ScalarKind::Uuid.parse_literal(&literal), Some(Value::Uuid(id)));
    }

    #[test]
    fn test_record_from_postgres_json() {
        let record_type = RecordType::new("ImageData")
            .property(PropertyDefinition::new("Id", PropertyType::integer()))
            .property(PropertyDefinition::new("Data", PropertyType::Bytes))
            .property(PropertyDefinition::new("TakenAt", PropertyType::date_time()));

        let json = serde_json::json!({
            "Id": 7,
            "Data": "\\x0aff",
            "TakenAt": "2024-03-01T08:00:00+00:00",
            "Unknown": "ignored"
        });

        let record = Record::from_json(&record_type, &json).unwrap();
        assert_eq!(record.get("Id"), &Value::Integer(7));
        assert_eq!(record.get("Data"), &Value::Bytes(vec![0x0a, 0xff]));
        assert!(matches!(record.get("TakenAt"), Value::DateTime(_)));
        assert!(!record.fields.contains_key("Unknown"));
    }

    #[test]
    fn test_record_from_postgres_json_keeps_decimal_digits() {
        let record_type = RecordType::new("Product")
            .property(PropertyDefinition::new("Price", PropertyType::decimal()));

        let json: serde_json::Value =
            serde_json::from_str(r#"{"Price": 12345678901234567.89}"#).unwrap();
        let record = Record::from_json(&record_type, &json).unwrap();

        assert_eq!(
            record.get("Price"),
            &Value::Decimal(Decimal::from_str("12345678901234567.89").unwrap())
        );
        assert_eq!(record.get("Price").to_literal().unwrap(), "12345678901234567.89");
    }

    #[test]
    fn test_record_from_json_rejects_mismatch() {
        let record_type = RecordType::new("Job")
            .property(PropertyDefinition::new("Salary", PropertyType::integer()));

        let result = Record::from_json(&record_type, &serde_json::json!({"Salary": "lots"}));
        assert!(matches!(result, Err(AdminError::Validation(_))));
    }

    #[test]
    fn test_value_serialization_is_untagged() {
        let record = Record::new("Job").with("Salary", 100_i64).with("Name", "Dev");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fields"]["Salary"], serde_json::json!(100));
        assert_eq!(json["fields"]["Name"], serde_json::json!("Dev"));
        assert_eq!(json["recordType"], serde_json::json!("Job"));
    }
}
