//! Safety caps applied while planning a list query.
//!
//! - Maximum page size (`limit`); exceeding it is an `InvalidRange` error
//! - Maximum number of sort fields; extras are dropped
//! - Maximum number of filter tokens; extras are dropped

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QueryLimits {
    /// Largest accepted `limit` (default: 1000). `0` still means unlimited.
    pub max_limit: u64,
    /// Maximum number of sort clauses kept (default: 5)
    pub max_sort_fields: usize,
    /// Maximum number of filter parameters considered (default: 32)
    pub max_filter_tokens: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_limit: 1000,
            max_sort_fields: 5,
            max_filter_tokens: 32,
        }
    }
}

impl QueryLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_limit(mut self, max: u64) -> Self {
        self.max_limit = max;
        self
    }

    #[must_use]
    pub fn with_max_sort_fields(mut self, max: usize) -> Self {
        self.max_sort_fields = max;
        self
    }

    #[must_use]
    pub fn with_max_filter_tokens(mut self, max: usize) -> Self {
        self.max_filter_tokens = max;
        self
    }

    /// Validate a page size against the cap.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidRange` if `limit` exceeds `max_limit`.
    pub fn validate_limit(&self, limit: u64) -> Result<(), QueryError> {
        if limit > self.max_limit {
            let max = self.max_limit;
            return Err(QueryError::InvalidRange(format!(
                "limit {limit} exceeds maximum of {max}"
            )));
        }
        Ok(())
    }
}
