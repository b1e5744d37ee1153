use crate::error::QueryError;

/// Offset pagination. `limit == 0` means unlimited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: u64,
}

impl Pagination {
    #[must_use]
    pub fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.limit == 0
    }

    /// Parse query-string `skip` / `limit` values. Empty strings default to 0.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidRange` if either value is not a
    /// non-negative integer.
    pub fn parse(skip: &str, limit: &str) -> Result<Self, QueryError> {
        Ok(Self {
            skip: parse_bound("skip", skip)?,
            limit: parse_bound("limit", limit)?,
        })
    }

    /// Parse the legacy two-value range form, e.g. `"[0, 24]"` or `"0,24"`.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidRange` if the input does not hold exactly
    /// two non-negative integers, or if the first is not below the second.
    pub fn from_range(raw: &str) -> Result<Self, QueryError> {
        let inner = raw.trim();
        let inner = inner
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(inner);
        let parts: Vec<&str> = inner.split(',').collect();
        let [start, end] = parts.as_slice() else {
            return Err(QueryError::InvalidRange(format!(
                "expected two values, got {raw:?}"
            )));
        };
        Self::from_range_pair(parse_bound("start", start)?, parse_bound("end", end)?)
    }

    /// Build from an explicit `(start, end)` pair: `skip = start`,
    /// `limit = end - start`.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidRange` if `start >= end`.
    pub fn from_range_pair(start: u64, end: u64) -> Result<Self, QueryError> {
        if start >= end {
            return Err(QueryError::InvalidRange(format!(
                "range start {start} must be below end {end}"
            )));
        }
        Ok(Self {
            skip: start,
            limit: end - start,
        })
    }

    /// End of the returned range: `skip + limit`, or `total` when unlimited.
    #[must_use]
    pub fn range_end(&self, total: u64) -> u64 {
        if self.is_unlimited() {
            total
        } else {
            self.skip.saturating_add(self.limit)
        }
    }
}

fn parse_bound(name: &str, raw: &str) -> Result<u64, QueryError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u64>().map_err(|_| invalid_bound(name, raw))
}

fn invalid_bound(name: &str, raw: &str) -> QueryError {
    QueryError::InvalidRange(format!(
        "{name} must be a non-negative integer, got {raw:?}"
    ))
}
