//! Identifier validation and quoting for dynamically built SQL.
//!
//! Schema, table and column names cannot be bound as statement parameters,
//! so every query that names a table goes through [`quote_pg`]. Quoting also
//! keeps comparisons case-sensitive: `"Users"` and `"users"` stay distinct.

use crate::error::{DriftError, Result};

/// PostgreSQL truncates identifiers at 63 bytes.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers longer than PostgreSQL's limit.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DriftError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(DriftError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(DriftError::Config(format!(
            "Identifier exceeds {} bytes (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL identifier, doubling embedded double quotes.
pub fn quote_pg(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Qualify a table name with its schema: `"schema"."table"`.
pub fn qualify_pg(schema: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_pg(schema)?, quote_pg(table)?))
}

/// Quote a list of columns and render each with a suffix, e.g. `::text`.
pub fn quote_list(columns: &[String], suffix: &str) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|c| Ok(format!("{}{}", quote_pg(c)?, suffix)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_pg() {
        assert_eq!(quote_pg("users").unwrap(), "\"users\"");
        assert_eq!(quote_pg("Users").unwrap(), "\"Users\"");
        assert_eq!(quote_pg("user\"table").unwrap(), "\"user\"\"table\"");
    }

    #[test]
    fn test_qualify_pg() {
        assert_eq!(
            qualify_pg("public", "orders").unwrap(),
            "\"public\".\"orders\""
        );
    }

    #[test]
    fn test_quote_list() {
        let cols = vec!["id".to_string(), "Name".to_string()];
        assert_eq!(
            quote_list(&cols, "::text").unwrap(),
            vec!["\"id\"::text", "\"Name\"::text"]
        );
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        assert!(quote_pg("").is_err());
        assert!(quote_pg("bad\0name").is_err());
        assert!(quote_pg(&"x".repeat(64)).is_err());
        assert!(quote_pg(&"x".repeat(63)).is_ok());
    }
}
