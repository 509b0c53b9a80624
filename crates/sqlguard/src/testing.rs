//! Test doubles
//!
//! [`RecordingExecutor`] stands in for a database: it records the SQL it is
//! asked to prepare and the parameters bound to it, returns canned rows, and
//! can be told to fail at a given phase. [`RecordingSink`] collects
//! enforcement diagnostics.
//!
//! Compiled for this crate's own tests and behind the `testing` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::backends::{SqlExecutor, SqlValue};
use crate::error::ExecutorError;
use crate::policy::{DiagnosticSink, NonLiteralDiagnostic};
use crate::provenance::Provenance;

/// SQL and parameters that reached the executor
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub sql: String,
    pub parameters: Vec<SqlValue>,
}

/// Executor phase a [`RecordingExecutor`] should fail in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Prepare,
    Execute,
    Fetch,
}

/// Error returned by a [`RecordingExecutor`] set up to fail
#[derive(Debug, thiserror::Error)]
#[error("simulated {0:?} failure")]
pub struct SimulatedFailure(pub FailurePoint);

/// In-memory executor that records every call
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    prepared: Vec<String>,
    executed: Vec<ExecutedQuery>,
    rows: Vec<Vec<SqlValue>>,
    fail_at: Option<FailurePoint>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by every execution
    pub fn with_rows(mut self, rows: Vec<Vec<SqlValue>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn failing_at(mut self, point: FailurePoint) -> Self {
        self.fail_at = Some(point);
        self
    }

    /// SQL text passed to `prepare`, in call order
    pub fn prepared(&self) -> &[String] {
        &self.prepared
    }

    /// Statements executed with their parameters, in call order
    pub fn executed(&self) -> &[ExecutedQuery] {
        &self.executed
    }

    pub fn last_executed(&self) -> Option<&ExecutedQuery> {
        self.executed.last()
    }

    fn fail_if(&self, point: FailurePoint) -> Result<(), ExecutorError> {
        match self.fail_at {
            Some(fail_at) if fail_at == point => Err(SimulatedFailure(point).into()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    type Statement = String;
    type Rows = VecDeque<Vec<SqlValue>>;
    type Row = Vec<SqlValue>;

    async fn prepare(&mut self, sql: &str) -> Result<Self::Statement, ExecutorError> {
        self.prepared.push(sql.to_string());
        self.fail_if(FailurePoint::Prepare)?;
        Ok(sql.to_string())
    }

    async fn execute(
        &mut self,
        statement: Self::Statement,
        parameters: &[SqlValue],
    ) -> Result<Self::Rows, ExecutorError> {
        self.fail_if(FailurePoint::Execute)?;
        self.executed.push(ExecutedQuery {
            sql: statement,
            parameters: parameters.to_vec(),
        });
        Ok(self.rows.iter().cloned().collect())
    }

    async fn fetch_next(
        &mut self,
        rows: &mut Self::Rows,
    ) -> Result<Option<Self::Row>, ExecutorError> {
        self.fail_if(FailurePoint::Fetch)?;
        Ok(rows.pop_front())
    }
}

/// Diagnostic captured by a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDiagnostic {
    pub provenance: Provenance,
    pub sql: String,
}

/// Sink collecting diagnostics; clones share the same storage
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    diagnostics: Arc<Mutex<Vec<RecordedDiagnostic>>>,
    dispatched: Arc<Mutex<Vec<ExecutedQuery>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<RecordedDiagnostic> {
        lock(&self.diagnostics).clone()
    }

    pub fn diagnostic_count(&self) -> usize {
        lock(&self.diagnostics).len()
    }

    /// Queries reported through [`DiagnosticSink::query_dispatched`]
    pub fn dispatched(&self) -> Vec<ExecutedQuery> {
        lock(&self.dispatched).clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn non_literal(&self, diagnostic: &NonLiteralDiagnostic<'_>) {
        lock(&self.diagnostics).push(RecordedDiagnostic {
            provenance: diagnostic.provenance,
            sql: diagnostic.sql.to_string(),
        });
    }

    fn query_dispatched(&self, sql: &str, parameters: &[SqlValue]) {
        lock(&self.dispatched).push(ExecutedQuery {
            sql: sql.to_string(),
            parameters: parameters.to_vec(),
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
