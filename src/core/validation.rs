//! Validation for table and column identifiers.
//!
//! Standard database naming rules: non-empty, at most 64 characters, letters,
//! digits and underscores only, no leading digit, and not a reserved SQL
//! keyword.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Maximum identifier length (MySQL standard).
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Reserved keywords that cannot be used as identifiers without quoting.
/// Combined core list from the SQL standard, MySQL and PostgreSQL.
static RESERVED_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BIGINT", "BOOLEAN", "BY",
        "CASE", "CHAR", "CHECK", "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE",
        "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DATE", "DATETIME", "DECIMAL", "DEFAULT",
        "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE", "FOREIGN", "FROM",
        "FULL", "GRANT", "GROUP", "HAVING", "IF", "IN", "INDEX", "INNER", "INSERT", "INT",
        "INTEGER", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET",
        "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE",
        "TEXT", "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "VARCHAR",
        "WHEN", "WHERE", "WITH",
    ]
    .into_iter()
    .collect()
});

/// Identifier validation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name cannot be empty")]
    Empty,

    #[error("name is too long ({actual} chars, max {max})")]
    TooLong { max: usize, actual: usize },

    #[error("name cannot start with a digit")]
    StartsWithDigit,

    #[error("name contains invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("'{0}' is a reserved SQL keyword")]
    ReservedKeyword(String),
}

/// Check a table or column name against the identifier rules.
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Empty);
    }
    let length = name.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_IDENTIFIER_LENGTH,
            actual: length,
        });
    }
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if first.is_ascii_digit() {
            return Err(ValidationError::StartsWithDigit);
        }
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(ValidationError::InvalidCharacter(first));
        }
    }
    for ch in chars {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(ValidationError::InvalidCharacter(ch));
        }
    }
    if is_reserved_keyword(name) {
        return Err(ValidationError::ReservedKeyword(name.to_uppercase()));
    }
    Ok(())
}

pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(name.to_uppercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("id").is_ok());
        assert!(validate_identifier("user_id").is_ok());
        assert!(validate_identifier("_internal").is_ok());
        assert!(validate_identifier("field123").is_ok());
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(validate_identifier(""), Err(ValidationError::Empty));
        assert_eq!(
            validate_identifier("1field"),
            Err(ValidationError::StartsWithDigit)
        );
        assert_eq!(
            validate_identifier("user-id"),
            Err(ValidationError::InvalidCharacter('-'))
        );
        assert_eq!(
            validate_identifier("user id"),
            Err(ValidationError::InvalidCharacter(' '))
        );
    }

    #[test]
    fn test_too_long_identifier() {
        let name = "a".repeat(65);
        assert_eq!(
            validate_identifier(&name),
            Err(ValidationError::TooLong {
                max: MAX_IDENTIFIER_LENGTH,
                actual: 65
            })
        );
    }

    #[test]
    fn test_reserved_keywords_rejected_case_insensitively() {
        assert!(is_reserved_keyword("select"));
        assert!(is_reserved_keyword("TABLE"));
        assert!(!is_reserved_keyword("users"));
        assert_eq!(
            validate_identifier("select"),
            Err(ValidationError::ReservedKeyword("SELECT".into()))
        );
    }
}
