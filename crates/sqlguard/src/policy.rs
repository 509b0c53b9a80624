//! Enforcement policy for non-literal SQL
//!
//! The policy decides what happens when SQL text that is not provably
//! literal reaches the executor: nothing (permissive), a diagnostic (warn,
//! the default) or an error (strict). The level belongs to one
//! [`Database`](crate::Database) instance and only changes through
//! [`EnforcementPolicy::enforce_strict`] and
//! [`EnforcementPolicy::disable_enforcement`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backends::SqlValue;
use crate::error::{GuardError, GuardResult};
use crate::provenance::{Provenance, SqlTemplate};

/// Reaction to non-literal SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementLevel {
    /// No checks
    Permissive,
    /// Report through the diagnostic sink and continue
    #[default]
    Warn,
    /// Reject the query
    Strict,
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnforcementLevel::Permissive => write!(f, "permissive"),
            EnforcementLevel::Warn => write!(f, "warn"),
            EnforcementLevel::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for EnforcementLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permissive" | "off" => Ok(EnforcementLevel::Permissive),
            "warn" | "warning" => Ok(EnforcementLevel::Warn),
            "strict" => Ok(EnforcementLevel::Strict),
            _ => Err(format!("Unknown enforcement level: {}", s)),
        }
    }
}

/// A non-literal template seen under [`EnforcementLevel::Warn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonLiteralDiagnostic<'a> {
    pub provenance: Provenance,
    pub sql: &'a str,
}

/// Destination for enforcement diagnostics
pub trait DiagnosticSink: Send + Sync {
    /// Called once per non-literal template under the warn level
    fn non_literal(&self, diagnostic: &NonLiteralDiagnostic<'_>);

    /// Called before each query is handed to the executor
    ///
    /// Parameter values are only ever exposed here; the default does nothing.
    fn query_dispatched(&self, _sql: &str, _parameters: &[SqlValue]) {}
}

/// Sink emitting `tracing` warnings
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn non_literal(&self, diagnostic: &NonLiteralDiagnostic<'_>) {
        warn!(
            provenance = %diagnostic.provenance,
            sql = diagnostic.sql,
            "Non-literal value detected in SQL"
        );
    }
}

/// Sink forwarding diagnostics to a closure
pub struct CallbackSink<F> {
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: Fn(&NonLiteralDiagnostic<'_>) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> DiagnosticSink for CallbackSink<F>
where
    F: Fn(&NonLiteralDiagnostic<'_>) + Send + Sync,
{
    fn non_literal(&self, diagnostic: &NonLiteralDiagnostic<'_>) {
        (self.callback)(diagnostic)
    }
}

/// Enforcement level plus the sink warnings go to
#[derive(Clone)]
pub struct EnforcementPolicy {
    level: EnforcementLevel,
    sink: Arc<dyn DiagnosticSink>,
}

impl EnforcementPolicy {
    pub fn new(level: EnforcementLevel) -> Self {
        Self::with_sink(level, Arc::new(TracingSink))
    }

    pub fn with_sink(level: EnforcementLevel, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { level, sink }
    }

    pub fn level(&self) -> EnforcementLevel {
        self.level
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    pub fn set_sink(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    /// Reject every non-literal template from now on
    pub fn enforce_strict(&mut self) {
        if self.level != EnforcementLevel::Strict {
            debug!(previous = %self.level, "SQL enforcement set to strict");
        }
        self.level = EnforcementLevel::Strict;
    }

    /// Turn every check off
    ///
    /// Not recommended; wrap the individual value in an
    /// [`UnsafeValue`](crate::UnsafeValue) instead.
    pub fn disable_enforcement(&mut self) {
        warn!(previous = %self.level, "SQL injection protection disabled");
        self.level = EnforcementLevel::Permissive;
    }

    /// Apply the policy to a template about to reach the executor
    pub fn check(&self, template: &SqlTemplate) -> GuardResult<()> {
        let provenance = template.provenance();
        if provenance.is_trusted() {
            return Ok(());
        }

        match self.level {
            EnforcementLevel::Permissive => Ok(()),
            EnforcementLevel::Warn => {
                self.sink.non_literal(&NonLiteralDiagnostic {
                    provenance,
                    sql: template.as_str(),
                });
                Ok(())
            }
            EnforcementLevel::Strict => Err(GuardError::NonLiteralValue {
                provenance,
                sql: template.as_str().to_string(),
            }),
        }
    }
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self::new(EnforcementLevel::default())
    }
}

impl fmt::Debug for EnforcementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnforcementPolicy")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
