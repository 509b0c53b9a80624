//! # sqlguard: taint-aware SQL query construction
//!
//! Build SQL dynamically without ever concatenating runtime data into it.
//!
//! - SQL text is a [`SqlTemplate`] that knows its [`Provenance`]. Literal
//!   templates come from string literals only; anything built from runtime
//!   input is tainted, and the taint survives concatenation.
//! - Data goes through bound parameters ([`SqlValue`], [`params!`]).
//! - Runtime chosen identifiers go through `{name}` alias tokens and are
//!   quoted and escaped on substitution ([`AliasMap`], [`substitute`]).
//! - An [`EnforcementPolicy`] decides what happens when tainted SQL text
//!   reaches the executor: ignore, warn (default) or reject.
//!
//! ```no_run
//! use sqlguard::{params, sql, AliasMap, Database, MySqlExecutor, SqlTemplate};
//!
//! # async fn example(pool: sqlx::MySqlPool) -> Result<(), sqlguard::GuardError> {
//! let mut db = Database::new(MySqlExecutor::new(pool));
//! db.enforce_strict();
//!
//! let sort = String::from("email"); // from the request
//! let aliases = AliasMap::new().with("sort", sort)?;
//!
//! let rows = db
//!     .query(
//!         &sql!("SELECT name FROM user WHERE type = ? ORDER BY {sort}"),
//!         params!["admin"],
//!         &aliases,
//!     )
//!     .await?;
//!
//! // Tainted SQL text is rejected before it reaches the database
//! let id = String::from("1 OR 1=1");
//! let insecure = sql!("SELECT name FROM user WHERE id = ") + SqlTemplate::runtime(id);
//! assert!(db.query(&insecure, params![], &AliasMap::new()).await.is_err());
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

pub mod alias;
pub mod backends;
pub mod config;
pub mod database;
pub mod error;
pub mod policy;
pub mod provenance;
pub mod query;
pub mod security;
pub mod sql;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use alias::{substitute, AliasMap};
pub use backends::{MySqlExecutor, SqlDialect, SqlExecutor, SqlValue};
pub use config::{ConfigError, ConfigLoader, ConfigSource, GuardConfig};
pub use database::Database;
pub use error::{ExecutorError, GuardError, GuardResult};
pub use policy::{
    CallbackSink, DiagnosticSink, EnforcementLevel, EnforcementPolicy, NonLiteralDiagnostic,
    TracingSink,
};
pub use provenance::{Provenance, SqlTemplate, UnsafeValue};
pub use query::{PreparedQuery, Query};
pub use security::IdentifierWhitelist;
pub use sql::placeholders;

/// Literal SQL template from one or more string literals
///
/// Only literals are accepted, so the result is always
/// [`Provenance::Literal`]. Passing a variable does not compile:
///
/// ```compile_fail
/// let id = String::from("1");
/// let query = sqlguard::sql!(id);
/// ```
#[macro_export]
macro_rules! sql {
    ($($fragment:literal),+ $(,)?) => {
        $crate::SqlTemplate::literal(concat!($($fragment),+))
    };
}

/// `Vec<SqlValue>` from a list of values
///
/// ```
/// use sqlguard::{params, SqlValue};
///
/// let values = params![42, "admin", None::<i64>];
/// assert_eq!(values, vec![SqlValue::Int32(42), SqlValue::from("admin"), SqlValue::Null]);
/// assert!(params![].is_empty());
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::SqlValue::from($value)),+]
    };
}
