//! Identifier aliases
//!
//! Templates may contain alias tokens of the exact form `{name}`, where
//! `name` matches `[a-z0-9_]+`. [`substitute`] replaces every token whose
//! name is in the [`AliasMap`] with the mapped value, quoted and escaped as
//! an identifier for the configured dialect. This is the only way a runtime
//! chosen table, column or CTE name gets into SQL text.
//!
//! Token rules:
//! - tokens with a name missing from the map are left exactly as written;
//! - anything else with braces (`{Name}`, `{ name }`, `{}`) is plain text;
//! - the template is scanned once, so substituted identifiers are never
//!   scanned again.

use std::collections::btree_map::{self, BTreeMap};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::GuardConfig;
use crate::error::{GuardError, GuardResult};
use crate::provenance::{Provenance, SqlTemplate};
use crate::security::{escape_identifier, validate_alias_name, validate_identifier};

static ALIAS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z0-9_]+)\}").expect("alias token pattern is valid"));

/// Alias names mapped to raw identifier values
///
/// Values keep their own provenance: `&'static str` values are literal,
/// `String` values are runtime. Either way they are quoted on substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: BTreeMap<String, SqlTemplate>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an alias, returning the value it replaces
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<SqlTemplate>,
    ) -> GuardResult<Option<SqlTemplate>> {
        let name = name.into();
        validate_alias_name(&name)?;
        Ok(self.entries.insert(name, value.into()))
    }

    /// Builder form of [`AliasMap::insert`]
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<SqlTemplate>,
    ) -> GuardResult<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&SqlTemplate> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, SqlTemplate> {
        self.entries.iter()
    }

    /// Reject values that would be rewritten again by a sequential replace
    fn check_collisions(&self) -> GuardResult<()> {
        for (alias, value) in &self.entries {
            for captures in ALIAS_TOKEN.captures_iter(value.as_str()) {
                let Some(referenced) = captures.get(1) else {
                    continue;
                };
                if referenced.as_str() != alias && self.contains(referenced.as_str()) {
                    return Err(GuardError::AliasCollision {
                        alias: alias.clone(),
                        conflicts_with: referenced.as_str().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a AliasMap {
    type Item = (&'a String, &'a SqlTemplate);
    type IntoIter = btree_map::Iter<'a, String, SqlTemplate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Replace alias tokens in `template` with quoted identifiers
///
/// Returns the template unchanged when nothing was substituted. When a
/// non-literal value was substituted the result is at least
/// [`Provenance::AuditedUnsafe`]; a runtime template stays runtime.
///
/// # Examples
/// ```
/// use sqlguard::{substitute, AliasMap, GuardConfig, Provenance, SqlTemplate};
///
/// let sort = String::from("email");
/// let aliases = AliasMap::new().with("sort", sort).unwrap();
/// let template = SqlTemplate::literal("SELECT name FROM user ORDER BY {sort}");
///
/// let finished = substitute(&template, &aliases, &GuardConfig::default()).unwrap();
/// assert_eq!(finished.as_str(), "SELECT name FROM user ORDER BY `email`");
/// assert_eq!(finished.provenance(), Provenance::AuditedUnsafe);
/// ```
pub fn substitute(
    template: &SqlTemplate,
    aliases: &AliasMap,
    config: &GuardConfig,
) -> GuardResult<SqlTemplate> {
    if aliases.is_empty() {
        return Ok(template.clone());
    }

    for (_, value) in aliases {
        validate_identifier(value.as_str(), config.max_identifier_length)?;
    }
    aliases.check_collisions()?;

    let source = template.as_str();
    let mut output = String::with_capacity(source.len());
    let mut copied_up_to = 0;
    let mut substitutions = 0;
    let mut provenance = template.provenance();

    for captures in ALIAS_TOKEN.captures_iter(source) {
        let (Some(token), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(value) = aliases.get(name.as_str()) else {
            continue;
        };

        output.push_str(&source[copied_up_to..token.start()]);
        output.push_str(&escape_identifier(value.as_str(), config.dialect));
        copied_up_to = token.end();
        substitutions += 1;

        if !value.is_literal() {
            provenance = provenance.combine(Provenance::AuditedUnsafe);
        }
    }

    if substitutions == 0 {
        return Ok(template.clone());
    }

    output.push_str(&source[copied_up_to..]);
    debug!(substitutions, dialect = %config.dialect, "Substituted SQL aliases");

    Ok(SqlTemplate::generated(output, provenance))
}
