//! SQL Identifier Sanitization Utilities
//!
//! Provides functions to safely quote and validate the table and column names
//! taken from a data model before they are spliced into generated SQL.

use regex::Regex;

/// PostgreSQL truncates identifiers longer than this (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Quote a SQL identifier to make it safe for use in queries
///
/// # Example
/// ```
/// use runtara_admin::sql::quote_identifier;
///
/// let quoted = quote_identifier("ParentEntity");
/// assert_eq!(quoted, "\"ParentEntity\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    // Escape any double quotes in the identifier by doubling them
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Quote a column reference qualified by a table alias
///
/// ```
/// use runtara_admin::sql::qualified_column;
///
/// assert_eq!(qualified_column("t", "Name"), "t.\"Name\"");
/// ```
pub fn qualified_column(alias: &str, column: &str) -> String {
    format!("{}.{}", alias, quote_identifier(column))
}

/// Quote a string literal for inlining into generated SQL
///
/// Only used for values that come from the data model (enumeration members),
/// never for user input, which is always bound as a parameter.
///
/// ```
/// use runtara_admin::sql::quote_literal;
///
/// assert_eq!(quote_literal("O'Neil"), "'O''Neil'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Validate a table or column name taken from a data model
///
/// Rules:
/// - Must start with a letter or underscore
/// - Can only contain ASCII letters, numbers, and underscores
/// - At most 63 bytes, so PostgreSQL never silently truncates it
///
/// Mixed case is allowed; every identifier is quoted when used.
///
/// # Example
/// ```
/// use runtara_admin::sql::validate_identifier;
///
/// assert!(validate_identifier("ParentEntity").is_ok());
/// assert!(validate_identifier("Job Id").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "Identifier '{}' is longer than {} bytes.",
            name, MAX_IDENTIFIER_LENGTH
        ));
    }

    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| e.to_string())?;
    if !re.is_match(name) {
        return Err(format!(
            "Identifier '{}' is invalid. Must start with a letter or underscore and contain only letters, numbers, and underscores.",
            name
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // quote_identifier Tests
    // =========================================================================

    #[test]
    fn test_quote_identifier_simple() {
        assert_eq!(quote_identifier("JobEntity"), "\"JobEntity\"");
        assert_eq!(quote_identifier("a"), "\"a\"");
    }

    #[test]
    fn test_quote_identifier_with_quotes() {
        assert_eq!(
            quote_identifier("table\"with\"quotes"),
            "\"table\"\"with\"\"quotes\""
        );
    }

    #[test]
    fn test_quote_identifier_reserved_keyword() {
        // Even reserved keywords should be safely quoted
        assert_eq!(quote_identifier("select"), "\"select\"");
        assert_eq!(quote_identifier("User"), "\"User\"");
    }

    #[test]
    fn test_qualified_column() {
        assert_eq!(qualified_column("r0", "Id"), "r0.\"Id\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("Male"), "'Male'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(""), "''");
    }

    // =========================================================================
    // validate_identifier Tests
    // =========================================================================

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("ParentEntity").is_ok());
        assert!(validate_identifier("job_id").is_ok());
        assert!(validate_identifier("_shadow").is_ok());
        assert!(validate_identifier("Table1").is_ok());
    }

    #[test]
    fn test_validate_identifier_empty() {
        let result = validate_identifier("");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_identifier_invalid_characters() {
        assert!(validate_identifier("1Parent").is_err());
        assert!(validate_identifier("Job Id").is_err());
        assert!(validate_identifier("my-table").is_err());
        assert!(validate_identifier("schema.table").is_err());
        assert!(validate_identifier("x\"; DROP TABLE y; --").is_err());
    }

    #[test]
    fn test_validate_identifier_too_long() {
        let name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        let result = validate_identifier(&name);
        assert!(result.unwrap_err().contains("longer than"));
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
    }
}
