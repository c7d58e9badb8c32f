//! Core type definitions for record properties
//!
//! Every property of a record type is classified exactly once into a
//! [`PropertyType`]. Literal parsing, orderability and value comparison all
//! dispatch on that single classification.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value::Value;

// ============================================================================
// Scalar families
// ============================================================================

/// Primitive runtime type families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// Text (ordinal string semantics)
    Text,
    /// Integer family, widened to 64 bits
    Integer,
    /// Floating-point family
    Float,
    /// Fixed-point decimal
    Decimal,
    Boolean,
    /// Date and time, always UTC
    DateTime,
    /// Date without time
    Date,
    /// Time of day without date
    Time,
    Uuid,
}

impl ScalarKind {
    pub fn is_text(&self) -> bool {
        matches!(self, ScalarKind::Text)
    }

    /// Parse a literal filter value into this family
    ///
    /// Accepts the same coercions a CSV import would: booleans from
    /// `true/false/1/0/yes/no`, timestamps from RFC 3339, naive date-times
    /// (read as UTC) or bare dates (midnight UTC).
    pub fn parse_literal(&self, literal: &str) -> Option<Value> {
        let trimmed = literal.trim();
        match self {
            ScalarKind::Text => Some(Value::Text(literal.to_string())),
            ScalarKind::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
            ScalarKind::Float => trimmed.parse::<f64>().ok().map(Value::Float),
            ScalarKind::Decimal => Decimal::from_str(trimmed).ok().map(Value::Decimal),
            ScalarKind::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Value::Boolean(true)),
                "false" | "0" | "no" => Some(Value::Boolean(false)),
                _ => None,
            },
            ScalarKind::DateTime => parse_date_time(trimmed).map(Value::DateTime),
            ScalarKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(Value::Date),
            ScalarKind::Time => NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
                .ok()
                .map(Value::Time),
            ScalarKind::Uuid => uuid::Uuid::parse_str(trimmed).ok().map(Value::Uuid),
        }
    }

    /// PostgreSQL type a bound literal is cast to
    pub fn to_sql_type(&self) -> &'static str {
        match self {
            ScalarKind::Text => "text",
            ScalarKind::Integer => "bigint",
            ScalarKind::Float => "double precision",
            ScalarKind::Decimal => "numeric",
            ScalarKind::Boolean => "boolean",
            ScalarKind::DateTime => "timestamptz",
            ScalarKind::Date => "date",
            ScalarKind::Time => "time",
            ScalarKind::Uuid => "uuid",
        }
    }

    /// Whether a stored value belongs to this family
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarKind::Text, Value::Text(_))
                | (ScalarKind::Integer, Value::Integer(_))
                | (ScalarKind::Float, Value::Float(_))
                | (ScalarKind::Decimal, Value::Decimal(_))
                | (ScalarKind::Boolean, Value::Boolean(_))
                | (ScalarKind::DateTime, Value::DateTime(_))
                | (ScalarKind::Date, Value::Date(_))
                | (ScalarKind::Time, Value::Time(_))
                | (ScalarKind::Uuid, Value::Uuid(_))
        )
    }
}

fn parse_date_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Enumerations
// ============================================================================

/// An enumeration type with members in declared order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub members: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Declared position of a member
    pub fn position(&self, member: &str) -> Option<usize> {
        self.members.iter().position(|m| m == member)
    }

    pub fn contains(&self, member: &str) -> bool {
        self.position(member).is_some()
    }
}

// ============================================================================
// Property types
// ============================================================================

/// Runtime type of a record property
///
/// `Record`/`Records` only say that the property holds another record shape.
/// Whether that is a *relation* is decided by the storage model, see
/// [`crate::introspect::Introspector::is_relation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "of", rename_all = "lowercase")]
pub enum PropertyType {
    Scalar(ScalarKind),
    Enum(EnumType),
    /// Raw bytes
    Bytes,
    /// Arbitrary JSON document
    Json,
    /// A single nested record of the named type
    Record(String),
    /// A collection of records of the named type
    Records(String),
}

impl PropertyType {
    pub fn text() -> Self {
        PropertyType::Scalar(ScalarKind::Text)
    }

    pub fn integer() -> Self {
        PropertyType::Scalar(ScalarKind::Integer)
    }

    pub fn float() -> Self {
        PropertyType::Scalar(ScalarKind::Float)
    }

    pub fn decimal() -> Self {
        PropertyType::Scalar(ScalarKind::Decimal)
    }

    pub fn boolean() -> Self {
        PropertyType::Scalar(ScalarKind::Boolean)
    }

    pub fn date_time() -> Self {
        PropertyType::Scalar(ScalarKind::DateTime)
    }

    pub fn date() -> Self {
        PropertyType::Scalar(ScalarKind::Date)
    }

    pub fn time() -> Self {
        PropertyType::Scalar(ScalarKind::Time)
    }

    pub fn uuid() -> Self {
        PropertyType::Scalar(ScalarKind::Uuid)
    }

    pub fn enumeration(enum_type: EnumType) -> Self {
        PropertyType::Enum(enum_type)
    }

    pub fn record(type_name: impl Into<String>) -> Self {
        PropertyType::Record(type_name.into())
    }

    pub fn records(type_name: impl Into<String>) -> Self {
        PropertyType::Records(type_name.into())
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            PropertyType::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, PropertyType::Scalar(ScalarKind::Text))
    }

    /// Whether values of this type carry a total order
    pub fn is_orderable(&self) -> bool {
        matches!(self, PropertyType::Scalar(_) | PropertyType::Enum(_))
    }

    /// Name of the record type held by a `Record`/`Records` property
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            PropertyType::Record(name) | PropertyType::Records(name) => Some(name),
            _ => None,
        }
    }

    /// Parse a literal into a value of this type
    pub fn parse_literal(&self, literal: &str) -> Option<Value> {
        match self {
            PropertyType::Scalar(kind) => kind.parse_literal(literal),
            PropertyType::Enum(enum_type) => {
                let member = literal.trim();
                enum_type
                    .contains(member)
                    .then(|| Value::Enum(member.to_string()))
            }
            _ => None,
        }
    }

    /// Total order over two values of this type
    ///
    /// Nulls sort before everything else. Enumeration members compare by
    /// declared position. Values outside the type compare as equal, which
    /// keeps a stable sort from moving them.
    pub fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        match (self, a, b) {
            (PropertyType::Enum(enum_type), Value::Enum(x), Value::Enum(y)) => {
                let px = enum_type.position(x).unwrap_or(usize::MAX);
                let py = enum_type.position(y).unwrap_or(usize::MAX);
                px.cmp(&py).then_with(|| x.cmp(y))
            }
            _ => a.compare_same(b).unwrap_or(Ordering::Equal),
        }
    }

    /// Validate that a value is compatible with this type
    pub fn validate_value(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            // Null is handled by the nullable flag, not type validation
            return Ok(());
        }
        match (self, value) {
            (PropertyType::Scalar(kind), v) if kind.accepts(v) => Ok(()),
            (PropertyType::Enum(enum_type), Value::Enum(member)) => {
                if enum_type.contains(member) {
                    Ok(())
                } else {
                    Err(format!(
                        "Value '{}' not in enum {}: {:?}",
                        member, enum_type.name, enum_type.members
                    ))
                }
            }
            (PropertyType::Bytes, Value::Bytes(_)) | (PropertyType::Json, Value::Json(_)) => Ok(()),
            (PropertyType::Record(name), Value::Record(record)) if &record.record_type == name => {
                Ok(())
            }
            (PropertyType::Records(name), Value::Records(records))
                if records.iter().all(|r| &r.record_type == name) =>
            {
                Ok(())
            }
            _ => Err(format!("Type mismatch: expected {:?}, got {:?}", self, value)),
        }
    }
}

fn default_nullable() -> bool {
    true
}

/// A named, typed property of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,

    #[serde(rename = "propertyType")]
    pub property_type: PropertyType,

    /// Whether the property may hold null (default: true)
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            nullable: true,
        }
    }

    /// Mark the property as required
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}
