//! SQL identifier validation and quoting for configurable table/column names.

use reclass_core::{Error, Result};

/// Validate a single PostgreSQL identifier.
///
/// Identifiers must:
/// - Not be empty
/// - Not exceed 63 characters (PostgreSQL identifier limit)
/// - Contain only ASCII alphanumeric characters and underscores
/// - Not start with a digit
///
/// Mixed case is allowed; identifiers are always emitted double-quoted.
///
/// # Examples
///
/// ```
/// use reclass_db::validate_identifier;
///
/// assert!(validate_identifier("CheckHistories").is_ok());
/// assert!(validate_identifier("attachments").is_ok());
/// assert!(validate_identifier("1table").is_err());
/// assert!(validate_identifier("a\"; DROP").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.len() > 63 {
        return Err(Error::InvalidInput(format!(
            "Identifier exceeds 63 character limit: {} characters",
            name.len()
        )));
    }

    if let Some(first) = name.chars().next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::InvalidInput(format!(
                "Identifier must start with a letter or underscore, found: '{}'",
                first
            )));
        }
    }

    if let Some(ch) = name
        .chars()
        .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_')
    {
        return Err(Error::InvalidInput(format!(
            "Identifier contains invalid character: '{}'. Only alphanumeric and underscore allowed",
            ch
        )));
    }

    Ok(())
}

/// Validate and double-quote a possibly schema-qualified name (`schema.table`).
pub fn quote_qualified(name: &str) -> Result<String> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return Err(Error::InvalidInput(format!(
            "Expected 'table' or 'schema.table', got '{}'",
            name
        )));
    }
    let mut quoted = Vec::with_capacity(parts.len());
    for part in parts {
        validate_identifier(part)?;
        quoted.push(format!("\"{}\"", part));
    }
    Ok(quoted.join("."))
}

/// Validate and double-quote a column name.
pub fn quote_column(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name))
}
