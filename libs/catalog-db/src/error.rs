use uuid::Uuid;

/// Index name reported when a primary key is reused.
pub const PRIMARY_KEY_INDEX: &str = "primary_key";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// A write would have put two rows under the same unique key.
    #[error("unique constraint `{index}` violated by key {key}")]
    UniqueViolation { index: &'static str, key: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// A runner was requested from inside a transaction closure.
    #[error("connection requested inside an open transaction")]
    ConnRequestedInsideTx,

    #[error("database error: {0}")]
    Internal(String),
}

impl DbError {
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    /// `true` when this is a unique violation on `index`.
    #[must_use]
    pub fn violates(&self, index: &str) -> bool {
        matches!(self, DbError::UniqueViolation { index: i, .. } if *i == index)
    }
}
