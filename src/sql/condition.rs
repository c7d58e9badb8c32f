//! Condition building for SQL WHERE and ORDER BY clauses
//!
//! Translates [`Predicate`] trees and [`SortKey`]s into PostgreSQL. Every
//! user literal is bound as a `$n` parameter and cast to the property's SQL
//! type; text semantics (null as empty, vacuous empty substring) mirror
//! [`Predicate::evaluate`].

use crate::filter::{Comparison, Predicate, StringComparison, TextOperation};
use crate::sort::SortKey;
use crate::sql::sanitize::{qualified_column, quote_literal};
use crate::types::PropertyType;

/// Build SQL WHERE clause from a Predicate
///
/// Returns (clause, params) tuple where:
/// - `clause` is the SQL condition string with parameter placeholders ($1, $2, etc.)
/// - `params` is a vector of textual parameter values to bind, in order
///
/// # Arguments
/// * `predicate` - The Predicate to convert
/// * `alias` - Table alias column references are qualified with
/// * `param_offset` - Starting parameter number (mutated to track next available)
pub fn build_where_clause(
    predicate: &Predicate,
    alias: &str,
    param_offset: &mut i32,
) -> Result<(String, Vec<String>), String> {
    let mut params = Vec::new();

    match predicate {
        Predicate::True => Ok(("TRUE".to_string(), params)),
        Predicate::Text {
            property,
            operation,
            value,
            mode,
        } => {
            let column = format!("COALESCE({}, '')", qualified_column(alias, property));
            let placeholder = format!("${}::text", param_offset);
            let (column, placeholder) = match mode {
                StringComparison::Ordinal => (column, placeholder),
                StringComparison::OrdinalIgnoreCase => (
                    format!("lower({})", column),
                    format!("lower({})", placeholder),
                ),
            };
            params.push(value.clone());
            *param_offset += 1;

            let clause = match operation {
                TextOperation::Equals => format!("{} = {}", column, placeholder),
                TextOperation::Contains => format!("strpos({}, {}) > 0", column, placeholder),
                TextOperation::StartsWith => format!(
                    "left({}, length({})) = {}",
                    column, placeholder, placeholder
                ),
                TextOperation::EndsWith => format!(
                    "right({}, length({})) = {}",
                    column, placeholder, placeholder
                ),
            };
            Ok((clause, params))
        }
        Predicate::Compare {
            property,
            property_type,
            comparison,
            value,
        } => {
            let sql_type = match property_type {
                PropertyType::Scalar(kind) => kind.to_sql_type(),
                PropertyType::Enum(_) => {
                    if !matches!(comparison, Comparison::Equal | Comparison::NotEqual) {
                        return Err(format!(
                            "Enumeration property '{}' only supports equality",
                            property
                        ));
                    }
                    "text"
                }
                other => {
                    return Err(format!(
                        "Property '{}' of type {:?} cannot be compared",
                        property, other
                    ));
                }
            };
            let literal = value
                .to_literal()
                .ok_or_else(|| format!("Value for '{}' has no SQL literal", property))?;
            params.push(literal);

            let clause = format!(
                "{} {} ${}::{}",
                qualified_column(alias, property),
                comparison.sql_operator(),
                param_offset,
                sql_type
            );
            *param_offset += 1;

            Ok((clause, params))
        }
        Predicate::Not(inner) => {
            let (clause, sub_params) = build_where_clause(inner, alias, param_offset)?;
            params.extend(sub_params);
            Ok((format!("NOT ({})", clause), params))
        }
        Predicate::And(predicates) => {
            if predicates.is_empty() {
                return Ok(("TRUE".to_string(), params));
            }
            let mut clauses = Vec::new();
            for sub in predicates {
                let (clause, mut sub_params) = build_where_clause(sub, alias, param_offset)?;
                clauses.push(format!("({})", clause));
                params.append(&mut sub_params);
            }
            Ok((clauses.join(" AND "), params))
        }
    }
}

/// Build ORDER BY clause from sort keys
///
/// Ascending keys sort nulls first and descending keys nulls last, matching
/// the in-memory order. Text sorts byte-wise (`COLLATE "C"`); enumerations
/// sort by declared member position. The key property, when given and not
/// already sorted on, is appended as a final tie-breaker.
///
/// # Returns
/// SQL ORDER BY clause string (without "ORDER BY" prefix), or `None` when
/// there is nothing to order by
pub fn build_order_by_clause(
    keys: &[SortKey],
    alias: &str,
    key_property: Option<&str>,
) -> Option<String> {
    let mut order_parts = Vec::new();

    for key in keys {
        let column = qualified_column(alias, &key.property);
        let expression = match &key.property_type {
            PropertyType::Enum(enum_type) => {
                let members: Vec<String> =
                    enum_type.members.iter().map(|m| quote_literal(m)).collect();
                format!(
                    "array_position(ARRAY[{}]::text[], {}::text)",
                    members.join(", "),
                    column
                )
            }
            property_type if property_type.is_text() => format!("{} COLLATE \"C\"", column),
            _ => column,
        };
        let direction = if key.descending {
            "DESC NULLS LAST"
        } else {
            "ASC NULLS FIRST"
        };
        order_parts.push(format!("{} {}", expression, direction));
    }

    if let Some(key_property) = key_property {
        if !keys.iter().any(|k| k.property == key_property) {
            order_parts.push(format!("{} ASC", qualified_column(alias, key_property)));
        }
    }

    if order_parts.is_empty() {
        None
    } else {
        Some(order_parts.join(", "))
    }
}
