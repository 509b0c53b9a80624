//! Identifier safety utilities
//!
//! This module provides functions for:
//! - Escaping SQL identifiers (table names, column names) per dialect
//! - Validating alias names and alias identifier values
//! - Picking identifiers from a fixed allow-list

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backends::SqlDialect;
use crate::error::{GuardError, GuardResult};
use crate::provenance::SqlTemplate;

/// Alias names accepted in `{name}` tokens
static ALIAS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("alias name pattern is valid"));

/// Escape a SQL identifier for the given dialect
///
/// Any quote character inside the identifier is doubled and the result is
/// wrapped in the dialect's identifier quotes. Every string can be escaped
/// this way, including the empty string.
///
/// # Examples
/// ```
/// use sqlguard::backends::SqlDialect;
/// use sqlguard::security::escape_identifier;
///
/// assert_eq!(escape_identifier("user", SqlDialect::MySQL), "`user`");
/// assert_eq!(escape_identifier("na`me", SqlDialect::MySQL), "`na``me`");
/// assert_eq!(escape_identifier("table\"name", SqlDialect::PostgreSQL), "\"table\"\"name\"");
/// ```
pub fn escape_identifier(identifier: &str, dialect: SqlDialect) -> String {
    let quote = dialect.identifier_quote();
    let mut escaped = String::with_capacity(identifier.len() + 2);
    escaped.push(quote);
    for c in identifier.chars() {
        if c == quote {
            escaped.push(quote);
        }
        escaped.push(c);
    }
    escaped.push(quote);
    escaped
}

/// Validate an alias name against `[a-z0-9_]+`
pub fn validate_alias_name(name: &str) -> GuardResult<()> {
    if ALIAS_NAME.is_match(name) {
        Ok(())
    } else {
        Err(GuardError::InvalidAliasName {
            name: name.to_string(),
        })
    }
}

/// Validate that an identifier can be quoted safely
///
/// NUL bytes cannot appear in a quoted identifier on any supported database.
/// `max_length` is counted in characters.
pub fn validate_identifier(identifier: &str, max_length: Option<usize>) -> GuardResult<()> {
    if identifier.contains('\0') {
        return Err(GuardError::InvalidIdentifier {
            identifier: identifier.escape_default().to_string(),
            reason: "identifier contains a NUL byte".to_string(),
        });
    }

    if let Some(max_length) = max_length {
        let length = identifier.chars().count();
        if length > max_length {
            return Err(GuardError::InvalidIdentifier {
                identifier: identifier.to_string(),
                reason: format!("identifier is too long ({} > {} characters)", length, max_length),
            });
        }
    }

    Ok(())
}

/// Allow-list of identifiers chosen at runtime
///
/// The selected entry is the list's own `&'static str`, so the returned
/// template is literal no matter where the request came from.
///
/// # Examples
/// ```
/// use sqlguard::security::IdentifierWhitelist;
///
/// const ORDER_FIELDS: IdentifierWhitelist = IdentifierWhitelist::new(&["name", "email"]);
///
/// let requested = String::from("email");
/// let field = ORDER_FIELDS.select(&requested).unwrap();
/// assert!(field.is_literal());
/// assert!(ORDER_FIELDS.select("password").is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IdentifierWhitelist {
    allowed: &'static [&'static str],
}

impl IdentifierWhitelist {
    /// Create a new whitelist validator
    pub const fn new(allowed: &'static [&'static str]) -> Self {
        Self { allowed }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.allowed.iter().any(|allowed| *allowed == identifier)
    }

    /// The whitelisted entry equal to `requested`
    pub fn select(&self, requested: &str) -> GuardResult<SqlTemplate> {
        self.allowed
            .iter()
            .find(|allowed| **allowed == requested)
            .map(|allowed| SqlTemplate::literal(*allowed))
            .ok_or_else(|| GuardError::InvalidIdentifier {
                identifier: requested.to_string(),
                reason: "identifier is not in the allowed whitelist".to_string(),
            })
    }

    /// The whitelisted entry equal to `requested`, or `fallback`
    pub fn select_or(&self, requested: &str, fallback: &'static str) -> SqlTemplate {
        self.select(requested)
            .unwrap_or_else(|_| SqlTemplate::literal(fallback))
    }

    /// Whitelisted entry, escaped for the dialect
    pub fn escape_if_allowed(&self, requested: &str, dialect: SqlDialect) -> GuardResult<String> {
        let selected = self.select(requested)?;
        Ok(escape_identifier(selected.as_str(), dialect))
    }
}
