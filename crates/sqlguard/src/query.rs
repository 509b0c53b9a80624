//! Query values
//!
//! A [`Query`] bundles a template, its bound parameters and its aliases.
//! [`PreparedQuery`] is what is left after alias substitution and the
//! enforcement check: finished SQL text and the parameters to bind.

use crate::alias::AliasMap;
use crate::backends::SqlValue;
use crate::error::GuardResult;
use crate::provenance::{Provenance, SqlTemplate};

/// Template, parameters and aliases for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    template: SqlTemplate,
    parameters: Vec<SqlValue>,
    aliases: AliasMap,
}

impl Query {
    pub fn new(template: impl Into<SqlTemplate>) -> Self {
        Self {
            template: template.into(),
            parameters: Vec::new(),
            aliases: AliasMap::new(),
        }
    }

    /// Bind the next positional parameter
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.parameters.push(value.into());
        self
    }

    /// Bind several positional parameters in order
    pub fn bind_all<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.parameters.extend(values.into_iter().map(Into::into));
        self
    }

    /// Map an alias name to an identifier
    pub fn alias(
        mut self,
        name: impl Into<String>,
        value: impl Into<SqlTemplate>,
    ) -> GuardResult<Self> {
        self.aliases.insert(name, value)?;
        Ok(self)
    }

    pub fn with_aliases(mut self, aliases: AliasMap) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn template(&self) -> &SqlTemplate {
        &self.template
    }

    pub fn parameters(&self) -> &[SqlValue] {
        &self.parameters
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn into_parts(self) -> (SqlTemplate, Vec<SqlValue>, AliasMap) {
        (self.template, self.parameters, self.aliases)
    }
}

impl From<SqlTemplate> for Query {
    fn from(template: SqlTemplate) -> Self {
        Self::new(template)
    }
}

/// Finished SQL text and the parameters to bind to it
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    sql: String,
    provenance: Provenance,
    parameters: Vec<SqlValue>,
}

impl PreparedQuery {
    pub(crate) fn new(template: SqlTemplate, parameters: Vec<SqlValue>) -> Self {
        Self {
            provenance: template.provenance(),
            sql: template.into_string(),
            parameters,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn parameters(&self) -> &[SqlValue] {
        &self.parameters
    }

    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuardError;

    #[test]
    fn test_query_builder() {
        let query = Query::new("SELECT name FROM user WHERE type = ? ORDER BY {sort} LIMIT ?, ?")
            .bind("admin")
            .bind_all([0, 3])
            .alias("sort", String::from("email"))
            .unwrap();

        assert!(query.template().is_literal());
        assert_eq!(
            query.parameters(),
            &[SqlValue::from("admin"), SqlValue::Int32(0), SqlValue::Int32(3)]
        );
        assert_eq!(query.aliases().len(), 1);
    }

    #[test]
    fn test_query_alias_validation() {
        let result = Query::new("SELECT {Sort} FROM user").alias("Sort", "name");
        assert!(matches!(result, Err(GuardError::InvalidAliasName { .. })));
    }

    #[test]
    fn test_runtime_template_query() {
        let query = Query::from(SqlTemplate::runtime(String::from("SELECT 1")));
        assert_eq!(query.template().provenance(), Provenance::Runtime);
        assert!(query.parameters().is_empty());
    }
}
