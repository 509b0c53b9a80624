//! SQL text provenance tracking
//!
//! A [`SqlTemplate`] is SQL text tagged with where it came from. Literal
//! templates can only be built from `&'static str` values (string literals,
//! or the [`sql!`](crate::sql!) macro which accepts nothing but literals),
//! so provenance is decided at the construction site and cannot be forgotten.
//! Everything else must go through [`SqlTemplate::runtime`] or an
//! [`UnsafeValue`], and concatenation carries the weakest provenance forward.
//!
//! # Examples
//! ```
//! use sqlguard::{sql, Provenance, SqlTemplate};
//!
//! let mut query = sql!("SELECT name FROM user ", "WHERE deleted IS NULL");
//! assert_eq!(query.provenance(), Provenance::Literal);
//!
//! let sort = String::from("email"); // e.g. from a request
//! query += SqlTemplate::runtime(sort);
//! assert_eq!(query.provenance(), Provenance::Runtime);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::ops::{Add, AddAssign};

/// Origin of a piece of SQL text
///
/// Variants are ordered from most to least trusted; combining two values
/// keeps the less trusted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provenance {
    /// Fixed source text
    Literal,
    /// Runtime text a human has explicitly marked as safe
    AuditedUnsafe,
    /// Runtime text of unknown origin
    Runtime,
}

impl Provenance {
    /// Provenance of text built from both inputs
    pub fn combine(self, other: Provenance) -> Provenance {
        self.max(other)
    }

    /// Whether enforcement lets this provenance through without a diagnostic
    pub fn is_trusted(self) -> bool {
        !matches!(self, Provenance::Runtime)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Literal => write!(f, "literal"),
            Provenance::AuditedUnsafe => write!(f, "audited-unsafe"),
            Provenance::Runtime => write!(f, "runtime"),
        }
    }
}

/// A runtime value that has been manually checked and is accepted as SQL text
///
/// Prefer bound parameters or aliases. This wrapper exists for the rare
/// fragment that can be neither, and it makes those places easy to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsafeValue(String);

impl UnsafeValue {
    pub fn new(unsafe_value: impl Into<String>) -> Self {
        Self(unsafe_value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnsafeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SQL text together with its [`Provenance`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlTemplate {
    sql: Cow<'static, str>,
    provenance: Provenance,
}

impl SqlTemplate {
    /// Literal SQL from fixed source text
    pub const fn literal(sql: &'static str) -> Self {
        Self {
            sql: Cow::Borrowed(sql),
            provenance: Provenance::Literal,
        }
    }

    /// Empty literal template
    pub const fn empty() -> Self {
        Self::literal("")
    }

    /// SQL text derived from runtime input
    pub fn runtime(sql: impl Into<String>) -> Self {
        Self {
            sql: Cow::Owned(sql.into()),
            provenance: Provenance::Runtime,
        }
    }

    /// SQL text from an audited runtime value
    pub fn audited(value: UnsafeValue) -> Self {
        Self {
            sql: Cow::Owned(value.0),
            provenance: Provenance::AuditedUnsafe,
        }
    }

    /// Text generated inside this crate with a known provenance
    pub(crate) fn generated(sql: String, provenance: Provenance) -> Self {
        Self {
            sql: Cow::Owned(sql),
            provenance,
        }
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_literal(&self) -> bool {
        self.provenance == Provenance::Literal
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    pub fn into_string(self) -> String {
        self.sql.into_owned()
    }

    /// Append another template, keeping the weaker provenance
    pub fn push(&mut self, other: &SqlTemplate) {
        self.sql.to_mut().push_str(&other.sql);
        self.provenance = self.provenance.combine(other.provenance);
    }

    /// Append literal text; provenance is unchanged
    pub fn push_str(&mut self, sql: &'static str) {
        self.sql.to_mut().push_str(sql);
    }

    /// Join templates with a literal separator
    ///
    /// Joining nothing yields an empty literal template.
    pub fn join<'a, I>(parts: I, separator: &'static str) -> SqlTemplate
    where
        I: IntoIterator<Item = &'a SqlTemplate>,
    {
        let mut joined = SqlTemplate::empty();
        for (index, part) in parts.into_iter().enumerate() {
            if index > 0 {
                joined.push_str(separator);
            }
            joined.push(part);
        }
        joined
    }
}

impl Default for SqlTemplate {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for SqlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl AsRef<str> for SqlTemplate {
    fn as_ref(&self) -> &str {
        &self.sql
    }
}

// `&'static str` is almost always a literal. Leaked strings are the exception
// and are treated as literal too.
impl From<&'static str> for SqlTemplate {
    fn from(sql: &'static str) -> Self {
        Self::literal(sql)
    }
}

impl From<String> for SqlTemplate {
    fn from(sql: String) -> Self {
        Self::runtime(sql)
    }
}

impl From<UnsafeValue> for SqlTemplate {
    fn from(value: UnsafeValue) -> Self {
        Self::audited(value)
    }
}

impl Add<&SqlTemplate> for SqlTemplate {
    type Output = SqlTemplate;

    fn add(mut self, rhs: &SqlTemplate) -> SqlTemplate {
        self.push(rhs);
        self
    }
}

impl Add<SqlTemplate> for SqlTemplate {
    type Output = SqlTemplate;

    fn add(self, rhs: SqlTemplate) -> SqlTemplate {
        self + &rhs
    }
}

impl Add<&'static str> for SqlTemplate {
    type Output = SqlTemplate;

    fn add(mut self, rhs: &'static str) -> SqlTemplate {
        self.push_str(rhs);
        self
    }
}

impl AddAssign<&SqlTemplate> for SqlTemplate {
    fn add_assign(&mut self, rhs: &SqlTemplate) {
        self.push(rhs);
    }
}

impl AddAssign<SqlTemplate> for SqlTemplate {
    fn add_assign(&mut self, rhs: SqlTemplate) {
        self.push(&rhs);
    }
}

impl AddAssign<&'static str> for SqlTemplate {
    fn add_assign(&mut self, rhs: &'static str) {
        self.push_str(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_sources_classify_literal() {
        assert_eq!(SqlTemplate::literal("SELECT 1").provenance(), Provenance::Literal);
        assert_eq!(SqlTemplate::from("SELECT 1").provenance(), Provenance::Literal);
        assert_eq!(crate::sql!("SELECT ", "name ", "FROM user").provenance(), Provenance::Literal);
        assert_eq!(crate::sql!("SELECT name FROM user").as_str(), "SELECT name FROM user");

        let built = SqlTemplate::literal("SELECT name")
            + " FROM user"
            + &SqlTemplate::literal(" WHERE id = ?");
        assert!(built.is_literal());
        assert_eq!(built.as_str(), "SELECT name FROM user WHERE id = ?");
    }

    #[test]
    fn test_runtime_taint_propagates_through_concatenation() {
        let id = String::from("1 OR 1=1");
        let tainted =
            SqlTemplate::literal("SELECT name FROM user WHERE id = ") + SqlTemplate::runtime(id);
        assert_eq!(tainted.provenance(), Provenance::Runtime);

        let mut longer = tainted.clone();
        longer += " AND deleted IS NULL";
        longer += SqlTemplate::literal(" LIMIT 1");
        assert_eq!(longer.provenance(), Provenance::Runtime);

        let prefixed = SqlTemplate::literal("/* audit */ ") + &longer;
        assert_eq!(prefixed.provenance(), Provenance::Runtime);
    }

    #[test]
    fn test_audited_values() {
        let audited = SqlTemplate::from(UnsafeValue::new("NOW()"));
        assert_eq!(audited.provenance(), Provenance::AuditedUnsafe);

        let combined = SqlTemplate::literal("SELECT ") + audited;
        assert_eq!(combined.provenance(), Provenance::AuditedUnsafe);

        let tainted = combined + SqlTemplate::from(String::from("x"));
        assert_eq!(tainted.provenance(), Provenance::Runtime);
    }

    #[test]
    fn test_join() {
        let columns = [SqlTemplate::literal("name"), SqlTemplate::literal("email")];
        let joined = SqlTemplate::join(&columns, ", ");
        assert_eq!(joined.as_str(), "name, email");
        assert!(joined.is_literal());

        let mixed = [SqlTemplate::literal("name"), SqlTemplate::runtime("dob")];
        assert_eq!(SqlTemplate::join(&mixed, ", ").provenance(), Provenance::Runtime);

        let nothing: [SqlTemplate; 0] = [];
        assert!(SqlTemplate::join(&nothing, ", ").is_empty());
    }

    #[test]
    fn test_provenance_ordering() {
        assert_eq!(
            Provenance::Literal.combine(Provenance::AuditedUnsafe),
            Provenance::AuditedUnsafe
        );
        assert_eq!(Provenance::Runtime.combine(Provenance::AuditedUnsafe), Provenance::Runtime);
        assert!(Provenance::AuditedUnsafe.is_trusted());
        assert!(!Provenance::Runtime.is_trusted());
    }
}
