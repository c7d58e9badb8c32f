//! SQL utilities for the PostgreSQL provider
//!
//! Provides sanitization and predicate/ordering translation.

pub mod condition;
pub mod sanitize;

pub use condition::{build_order_by_clause, build_where_clause};
pub use sanitize::{
    MAX_IDENTIFIER_LENGTH, qualified_column, quote_identifier, quote_literal, validate_identifier,
};
