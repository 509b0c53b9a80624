//! Parameter placeholder generation
//!
//! Builds marker lists such as `?,?,?` for `IN (...)` clauses. The output is
//! made from constants and a count only, so it is always literal and can be
//! concatenated into a template without tainting it.

use crate::backends::SqlDialect;
use crate::error::GuardResult;
use crate::provenance::SqlTemplate;

/// `count` comma-separated `?` markers
///
/// A count of zero yields an empty template. A negative count, or one above
/// [`MAX_PARAMETERS`](crate::backends::MAX_PARAMETERS), fails with
/// [`GuardError::InvalidArgument`](crate::GuardError::InvalidArgument)
/// since no statement could bind that many values.
///
/// # Examples
/// ```
/// use sqlguard::{placeholders, sql};
///
/// let ids = [1, 2, 3];
/// let query = sql!("SELECT name FROM user WHERE id IN (")
///     + placeholders(ids.len() as i64).unwrap()
///     + ")";
/// assert_eq!(query.as_str(), "SELECT name FROM user WHERE id IN (?,?,?)");
/// assert!(query.is_literal());
/// ```
pub fn placeholders(count: i64) -> GuardResult<SqlTemplate> {
    SqlDialect::MySQL.placeholders(count, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuardError;

    #[test]
    fn test_placeholder_counts() {
        assert_eq!(placeholders(3).unwrap().as_str(), "?,?,?");
        assert_eq!(placeholders(1).unwrap().as_str(), "?");
        assert_eq!(placeholders(0).unwrap().as_str(), "");
    }

    #[test]
    fn test_placeholders_are_literal() {
        assert!(placeholders(5).unwrap().is_literal());
        assert!(placeholders(0).unwrap().is_literal());
    }

    #[test]
    fn test_negative_count_is_rejected() {
        assert!(matches!(placeholders(-1), Err(GuardError::InvalidArgument(_))));
        assert!(placeholders(i64::MIN).is_err());
    }

    #[test]
    fn test_unbindable_count_is_rejected() {
        assert!(matches!(placeholders(i64::MAX), Err(GuardError::InvalidArgument(_))));
        assert!(placeholders(65_536).is_err());

        let widest = placeholders(65_535).unwrap();
        assert_eq!(widest.as_str().len(), 65_535 * 2 - 1);
        assert!(widest.as_str().starts_with("?,?") && widest.as_str().ends_with(",?"));
    }
}
