//! Identifier validation for dynamic table and column names
//!
//! Values are always bound as parameters, but table and column names end up
//! in SQL text. A name is accepted only when, after removing underscores,
//! it is non-empty and every remaining character is ASCII alphanumeric.

use crate::{Error, Result};

/// Check a table or column name against the identifier whitelist.
pub fn is_valid(name: &str) -> bool {
    let mut stripped = name.chars().filter(|c| *c != '_').peekable();
    stripped.peek().is_some() && stripped.all(|c| c.is_ascii_alphanumeric())
}

/// Validate an identifier, logging and returning an error when it is rejected.
pub fn validate(name: &str) -> Result<&str> {
    if is_valid(name) {
        Ok(name)
    } else {
        tracing::warn!("Rejected identifier {:?}", name);
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Validate every identifier in a list, failing on the first rejected one.
pub fn validate_all<'a, I>(names: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    for name in names {
        validate(name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_identifiers() {
        assert!(is_valid("users"));
        assert!(is_valid("cyber_incidents"));
        assert!(is_valid("_private"));
        assert!(is_valid("col2"));
    }

    #[test]
    fn test_rejects_injection_attempts() {
        for bad in [
            "users; DROP TABLE users",
            "users--",
            "name'",
            "a b",
            "tbl.col",
            "\"quoted\"",
            "",
            "___",
            "naïve",
        ] {
            assert!(!is_valid(bad), "{:?} should be rejected", bad);
            assert!(matches!(validate(bad), Err(Error::InvalidIdentifier(_))));
        }
    }

    #[test]
    fn test_validate_all_stops_on_first_bad_name() {
        assert!(validate_all(["title", "status"]).is_ok());
        let err = validate_all(["title", "status OR 1=1", "category"]).unwrap_err();
        assert!(err.to_string().contains("status OR 1=1"));
    }
}
