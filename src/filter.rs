//! Predicate building
//!
//! Compiles `FilterSpec`s into a [`Predicate`] expression tree. The tree is
//! evaluated directly by in-memory providers and translated to SQL by the
//! PostgreSQL provider, so both execution paths share one set of semantics.
//!
//! Building is fail-open: an unknown property, an operator that is not valid
//! for the property's type, or a literal that does not parse yields `None`
//! and a warning instead of an error.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::schema::RecordType;
use crate::types::{PropertyType, ScalarKind};
use crate::value::{Record, Value};

// ============================================================================
// Request types
// ============================================================================

/// Filter operators offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
}

impl FilterOperator {
    /// Operators that only make sense on text
    pub fn is_text_only(&self) -> bool {
        matches!(
            self,
            FilterOperator::Contains
                | FilterOperator::DoesNotContain
                | FilterOperator::StartsWith
                | FilterOperator::EndsWith
        )
    }

    /// Operators offered for a property type, in display order
    pub fn valid_for(property_type: &PropertyType) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match property_type {
            PropertyType::Scalar(ScalarKind::Text) => &[
                Equals,
                NotEquals,
                Contains,
                DoesNotContain,
                StartsWith,
                EndsWith,
            ],
            PropertyType::Scalar(ScalarKind::Uuid) | PropertyType::Enum(_) => {
                &[Equals, NotEquals]
            }
            PropertyType::Scalar(_) => &[
                Equals,
                NotEquals,
                GreaterThan,
                GreaterThanOrEquals,
                LessThan,
                LessThanOrEquals,
            ],
            _ => &[],
        }
    }
}

/// How text operators compare characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StringComparison {
    /// Exact code-point comparison
    #[default]
    Ordinal,
    /// Code-point comparison after lowercasing both sides
    OrdinalIgnoreCase,
}

impl StringComparison {
    fn normalize<'s>(&self, s: &'s str) -> std::borrow::Cow<'s, str> {
        match self {
            StringComparison::Ordinal => std::borrow::Cow::Borrowed(s),
            StringComparison::OrdinalIgnoreCase => std::borrow::Cow::Owned(s.to_lowercase()),
        }
    }
}

/// A single user-supplied filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub property: String,
    pub operator: FilterOperator,
    /// Literal as typed by the user
    pub value: String,
    #[serde(default)]
    pub mode: StringComparison,
}

impl FilterSpec {
    pub fn new(
        property: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.into(),
            mode: StringComparison::Ordinal,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.mode = StringComparison::OrdinalIgnoreCase;
        self
    }
}

// ============================================================================
// Predicate tree
// ============================================================================

/// Text tests; negated forms are expressed with [`Predicate::Not`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperation {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

/// Comparisons over ordered values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    pub fn sql_operator(&self) -> &'static str {
        match self {
            Comparison::Equal => "=",
            Comparison::NotEqual => "IS DISTINCT FROM",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
        }
    }
}

/// Executable boolean test over a record
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record
    True,
    /// Text test; a null property value is read as the empty string
    Text {
        property: String,
        operation: TextOperation,
        value: String,
        mode: StringComparison,
    },
    /// Typed comparison against a parsed literal
    Compare {
        property: String,
        property_type: PropertyType,
        comparison: Comparison,
        value: Value,
    },
    Not(Box<Predicate>),
    /// Conjunction; empty is `True`
    And(Vec<Predicate>),
}

impl Predicate {
    /// Compile one filter against a record type
    pub fn build(record_type: &RecordType, spec: &FilterSpec) -> Option<Predicate> {
        let Some(property) = record_type.find_property(&spec.property) else {
            warn!(
                record_type = %record_type.name,
                property = %spec.property,
                "Filter dropped: unknown property"
            );
            return None;
        };

        if !FilterOperator::valid_for(&property.property_type).contains(&spec.operator) {
            warn!(
                record_type = %record_type.name,
                property = %spec.property,
                operator = ?spec.operator,
                "Filter dropped: operator not valid for property type"
            );
            return None;
        }

        if property.property_type.is_text() {
            return Some(Self::text(&spec.property, spec));
        }

        let Some(value) = property.property_type.parse_literal(&spec.value) else {
            warn!(
                record_type = %record_type.name,
                property = %spec.property,
                literal = %spec.value,
                "Filter dropped: literal does not parse"
            );
            return None;
        };

        let comparison = match spec.operator {
            FilterOperator::Equals => Comparison::Equal,
            FilterOperator::NotEquals => Comparison::NotEqual,
            FilterOperator::GreaterThan => Comparison::Greater,
            FilterOperator::GreaterThanOrEquals => Comparison::GreaterOrEqual,
            FilterOperator::LessThan => Comparison::Less,
            FilterOperator::LessThanOrEquals => Comparison::LessOrEqual,
            _ => return None,
        };

        Some(Predicate::Compare {
            property: spec.property.clone(),
            property_type: property.property_type.clone(),
            comparison,
            value,
        })
    }

    fn text(property: &str, spec: &FilterSpec) -> Predicate {
        let test = |operation| Predicate::Text {
            property: property.to_string(),
            operation,
            value: spec.value.clone(),
            mode: spec.mode,
        };
        match spec.operator {
            FilterOperator::NotEquals => Predicate::Not(Box::new(test(TextOperation::Equals))),
            FilterOperator::Contains => test(TextOperation::Contains),
            FilterOperator::DoesNotContain => {
                Predicate::Not(Box::new(test(TextOperation::Contains)))
            }
            FilterOperator::StartsWith => test(TextOperation::StartsWith),
            FilterOperator::EndsWith => test(TextOperation::EndsWith),
            _ => test(TextOperation::Equals),
        }
    }

    /// Compile every filter and combine the survivors with AND
    pub fn build_all(record_type: &RecordType, specs: &[FilterSpec]) -> Predicate {
        Predicate::all(
            specs
                .iter()
                .filter_map(|spec| Predicate::build(record_type, spec))
                .collect(),
        )
    }

    /// Conjunction, flattening the trivial cases
    pub fn all(mut predicates: Vec<Predicate>) -> Predicate {
        predicates.retain(|p| !p.is_true());
        match predicates.len() {
            0 => Predicate::True,
            1 => predicates.remove(0),
            _ => Predicate::And(predicates),
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            Predicate::True => true,
            Predicate::And(ps) => ps.iter().all(Predicate::is_true),
            _ => false,
        }
    }

    /// Number of leaf tests in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::True => 0,
            Predicate::Text { .. } | Predicate::Compare { .. } => 1,
            Predicate::Not(p) => p.leaf_count(),
            Predicate::And(ps) => ps.iter().map(Predicate::leaf_count).sum(),
        }
    }

    /// Evaluate against a record
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Predicate::True => true,
            Predicate::Text {
                property,
                operation,
                value,
                mode,
            } => {
                let actual = mode.normalize(record.get(property).as_text().unwrap_or(""));
                let expected = mode.normalize(value);
                match operation {
                    TextOperation::Equals => actual == expected,
                    TextOperation::Contains => actual.contains(expected.as_ref()),
                    TextOperation::StartsWith => actual.starts_with(expected.as_ref()),
                    TextOperation::EndsWith => actual.ends_with(expected.as_ref()),
                }
            }
            Predicate::Compare {
                property,
                property_type,
                comparison,
                value,
            } => {
                let actual = record.get(property);
                if actual.is_null() {
                    return *comparison == Comparison::NotEqual;
                }
                let ordering = match property_type {
                    PropertyType::Enum(_) => Some(property_type.compare_values(actual, value)),
                    _ => actual.compare_same(value),
                };
                let Some(ordering) = ordering else {
                    return *comparison == Comparison::NotEqual;
                };
                match comparison {
                    Comparison::Equal => ordering.is_eq(),
                    Comparison::NotEqual => ordering.is_ne(),
                    Comparison::Greater => ordering.is_gt(),
                    Comparison::GreaterOrEqual => ordering.is_ge(),
                    Comparison::Less => ordering.is_lt(),
                    Comparison::LessOrEqual => ordering.is_le(),
                }
            }
            Predicate::Not(inner) => !inner.evaluate(record),
            Predicate::And(ps) => ps.iter().all(|p| p.evaluate(record)),
        }
    }
}
