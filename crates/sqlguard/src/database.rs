//! Guarded query facade
//!
//! [`Database`] owns an executor, an enforcement policy and the guard
//! configuration. Every query goes through the same steps: alias
//! substitution, the enforcement check, then prepare / execute / fetch on
//! the executor. SQL syntax and identifiers come only from the template;
//! data comes only from the bound parameters.

use std::sync::Arc;

use tracing::debug;

use crate::alias::{substitute, AliasMap};
use crate::backends::{SqlDialect, SqlExecutor, SqlValue};
use crate::config::GuardConfig;
use crate::error::{GuardError, GuardResult};
use crate::policy::{DiagnosticSink, EnforcementLevel, EnforcementPolicy};
use crate::provenance::SqlTemplate;
use crate::query::{PreparedQuery, Query};

/// Query facade over a [`SqlExecutor`]
///
/// Policy changes take `&mut self`; share an instance between tasks behind
/// a lock of the caller's choosing.
pub struct Database<E: SqlExecutor> {
    executor: E,
    policy: EnforcementPolicy,
    config: GuardConfig,
}

impl<E: SqlExecutor> Database<E> {
    /// Facade with the default configuration (warn, MySQL quoting)
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, GuardConfig::default())
    }

    pub fn with_config(executor: E, config: GuardConfig) -> Self {
        Self {
            executor,
            policy: EnforcementPolicy::new(config.enforcement),
            config,
        }
    }

    /// Send enforcement diagnostics to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.policy.set_sink(sink);
        self
    }

    pub fn enforcement(&self) -> EnforcementLevel {
        self.policy.level()
    }

    /// Reject non-literal SQL on this instance from now on
    pub fn enforce_strict(&mut self) {
        self.policy.enforce_strict();
    }

    /// Stop checking SQL provenance on this instance
    ///
    /// Not recommended; prefer [`UnsafeValue`](crate::UnsafeValue) for the
    /// specific value that needs it.
    pub fn disable_enforcement(&mut self) {
        self.policy.disable_enforcement();
    }

    pub fn dialect(&self) -> SqlDialect {
        self.config.dialect
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Parameter markers for this dialect, numbered after `already_bound`
    pub fn placeholders(&self, count: i64, already_bound: usize) -> GuardResult<SqlTemplate> {
        self.config.dialect.placeholders(count, already_bound)
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Substitute aliases and apply the enforcement policy, without I/O
    pub fn prepare_query(
        &self,
        template: &SqlTemplate,
        parameters: Vec<SqlValue>,
        aliases: &AliasMap,
    ) -> GuardResult<PreparedQuery> {
        let finished = substitute(template, aliases, &self.config)?;
        self.policy.check(&finished)?;
        Ok(PreparedQuery::new(finished, parameters))
    }

    /// Run a query and collect its rows
    pub async fn query(
        &mut self,
        template: &SqlTemplate,
        parameters: Vec<SqlValue>,
        aliases: &AliasMap,
    ) -> GuardResult<Vec<E::Row>> {
        let prepared = self.prepare_query(template, parameters, aliases)?;
        self.dispatch(prepared).await
    }

    /// Run a [`Query`] and collect its rows
    pub async fn run(&mut self, query: Query) -> GuardResult<Vec<E::Row>> {
        let (template, parameters, aliases) = query.into_parts();
        self.query(&template, parameters, &aliases).await
    }

    async fn dispatch(&mut self, prepared: PreparedQuery) -> GuardResult<Vec<E::Row>> {
        let (sql, parameters) = prepared.into_parts();

        self.policy.sink().query_dispatched(&sql, &parameters);
        debug!(sql = %sql, parameter_count = parameters.len(), "Dispatching guarded query");

        let statement = self
            .executor
            .prepare(&sql)
            .await
            .map_err(|source| GuardError::Prepare {
                sql: sql.clone(),
                source,
            })?;

        let mut results = self
            .executor
            .execute(statement, &parameters)
            .await
            .map_err(|source| GuardError::Execute {
                sql: sql.clone(),
                source,
            })?;

        let mut rows = Vec::new();
        while let Some(row) = self
            .executor
            .fetch_next(&mut results)
            .await
            .map_err(|source| GuardError::Fetch {
                sql: sql.clone(),
                source,
            })?
        {
            rows.push(row);
        }

        debug!(row_count = rows.len(), "Guarded query completed");
        Ok(rows)
    }
}

impl<E: SqlExecutor + std::fmt::Debug> std::fmt::Debug for Database<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("executor", &self.executor)
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish()
    }
}
