//! Core Executor Traits
//!
//! The executor is the external collaborator that owns the database
//! transport. Guarded queries only ever hand it finished SQL text plus an
//! ordered parameter list, so the contract is deliberately small.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ExecutorError, GuardError, GuardResult};
use crate::provenance::{Provenance, SqlTemplate};

/// Transport that prepares and runs finished SQL
///
/// Errors are returned boxed; the facade wraps them with the SQL text and the
/// phase that failed.
#[async_trait]
pub trait SqlExecutor: Send {
    /// Prepared statement handle
    type Statement: Send;
    /// Pending result set
    type Rows: Send;
    /// A single result row
    type Row: Send;

    /// Prepare SQL text for execution
    async fn prepare(&mut self, sql: &str) -> Result<Self::Statement, ExecutorError>;

    /// Execute a prepared statement, binding parameters positionally
    async fn execute(
        &mut self,
        statement: Self::Statement,
        parameters: &[SqlValue],
    ) -> Result<Self::Rows, ExecutorError>;

    /// Next row of a result set, `None` once exhausted
    async fn fetch_next(
        &mut self,
        rows: &mut Self::Rows,
    ) -> Result<Option<Self::Row>, ExecutorError>;
}

/// Bound parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    DateTime(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Json(JsonValue),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::Int64(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float64(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::String(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::String(value.clone())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Bytes(value)
    }
}

impl From<uuid::Uuid> for SqlValue {
    fn from(value: uuid::Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for SqlValue {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        SqlValue::DateTime(value)
    }
}

impl From<chrono::NaiveDate> for SqlValue {
    fn from(value: chrono::NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(value: JsonValue) -> Self {
        SqlValue::Json(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Most parameters a single statement may bind
///
/// MySQL and PostgreSQL both count bound parameters in 16 bits.
pub const MAX_PARAMETERS: usize = 65_535;

/// SQL dialect, selecting identifier quoting and parameter markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    MySQL,
    PostgreSQL,
    SQLite,
}

impl SqlDialect {
    /// Parameter marker for the zero-based parameter `index`
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::MySQL | SqlDialect::SQLite => "?".to_string(),
        }
    }

    /// Quote character for identifiers in this dialect
    pub fn identifier_quote(&self) -> char {
        match self {
            SqlDialect::MySQL => '`',
            SqlDialect::PostgreSQL | SqlDialect::SQLite => '"',
        }
    }

    /// `count` comma-separated parameter markers
    ///
    /// `first_index` is the zero-based position of the first marker, so
    /// numbered dialects continue after parameters already bound. A count of
    /// zero yields an empty template; a negative count is rejected, as is any
    /// request whose last marker would pass [`MAX_PARAMETERS`].
    pub fn placeholders(&self, count: i64, first_index: usize) -> GuardResult<SqlTemplate> {
        let count = usize::try_from(count).map_err(|_| {
            GuardError::InvalidArgument(format!(
                "placeholder count must not be negative, got {}",
                count
            ))
        })?;

        let end = first_index
            .checked_add(count)
            .filter(|end| *end <= MAX_PARAMETERS)
            .ok_or_else(|| {
                GuardError::InvalidArgument(format!(
                    "{} placeholders after {} bound parameters exceed the limit of {}",
                    count, first_index, MAX_PARAMETERS
                ))
            })?;

        let mut markers = String::with_capacity(count.saturating_mul(2));
        for index in first_index..end {
            if index > first_index {
                markers.push(',');
            }
            self.push_placeholder(&mut markers, index);
        }

        Ok(SqlTemplate::generated(markers, Provenance::Literal))
    }

    fn push_placeholder(&self, out: &mut String, index: usize) {
        match self {
            SqlDialect::PostgreSQL => {
                out.push('$');
                out.push_str(&(index + 1).to_string());
            }
            SqlDialect::MySQL | SqlDialect::SQLite => out.push('?'),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::MySQL => write!(f, "mysql"),
            SqlDialect::PostgreSQL => write!(f, "postgresql"),
            SqlDialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySQL),
            "postgresql" | "postgres" => Ok(SqlDialect::PostgreSQL),
            "sqlite" => Ok(SqlDialect::SQLite),
            _ => Err(format!("Unsupported SQL dialect: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_quoting() {
        assert_eq!(SqlDialect::MySQL.identifier_quote(), '`');
        assert_eq!(SqlDialect::PostgreSQL.identifier_quote(), '"');
        assert_eq!(SqlDialect::SQLite.identifier_quote(), '"');
        assert_eq!(SqlDialect::default(), SqlDialect::MySQL);
    }

    #[test]
    fn test_numbered_placeholders_continue_after_bound_parameters() {
        let markers = SqlDialect::PostgreSQL.placeholders(3, 2).unwrap();
        assert_eq!(markers.as_str(), "$3,$4,$5");
        assert!(markers.is_literal());

        assert_eq!(SqlDialect::SQLite.placeholders(2, 7).unwrap().as_str(), "?,?");
    }

    #[test]
    fn test_placeholders_past_parameter_limit_are_rejected() {
        let offset_overflow = SqlDialect::PostgreSQL.placeholders(2, usize::MAX);
        assert!(matches!(offset_overflow, Err(GuardError::InvalidArgument(_))));

        let too_many = SqlDialect::MySQL.placeholders(i64::MAX, 0);
        assert!(matches!(too_many, Err(GuardError::InvalidArgument(_))));

        let at_limit = SqlDialect::PostgreSQL.placeholders(1, MAX_PARAMETERS - 1).unwrap();
        assert_eq!(at_limit.as_str(), "$65535");
        assert!(SqlDialect::PostgreSQL.placeholders(1, MAX_PARAMETERS).is_err());
        assert!(SqlDialect::SQLite.placeholders(MAX_PARAMETERS as i64 + 1, 0).is_err());
    }

    #[test]
    fn test_zero_placeholders_at_limit_is_empty() {
        let markers = SqlDialect::PostgreSQL.placeholders(0, MAX_PARAMETERS).unwrap();
        assert!(markers.is_empty());
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("MySQL".parse::<SqlDialect>().unwrap(), SqlDialect::MySQL);
        assert_eq!("postgres".parse::<SqlDialect>().unwrap(), SqlDialect::PostgreSQL);
        assert_eq!(
            SqlDialect::SQLite.to_string().parse::<SqlDialect>().unwrap(),
            SqlDialect::SQLite
        );
        assert!("oracle".parse::<SqlDialect>().is_err());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(SqlValue::from(42), SqlValue::Int32(42));
        assert_eq!(SqlValue::from("admin"), SqlValue::String("admin".to_string()));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(3_i64)), SqlValue::Int64(3));
        assert!(SqlValue::Null.is_null());
    }
}
