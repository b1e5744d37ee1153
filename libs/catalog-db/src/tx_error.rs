use std::fmt;

use crate::error::DbError;

/// Result of [`crate::Db::in_transaction`]: either the closure's own error
/// or a store failure around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxError<E> {
    Domain(E),
    Infra(DbError),
}

impl<E> TxError<E> {
    /// Collapse into the domain error type.
    #[must_use]
    pub fn into_domain<F>(self, map_infra: F) -> E
    where
        F: FnOnce(DbError) -> E,
    {
        match self {
            TxError::Domain(e) => e,
            TxError::Infra(infra) => map_infra(infra),
        }
    }
}

impl<E: fmt::Display> fmt::Display for TxError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::Domain(e) => write!(f, "{e}"),
            TxError::Infra(e) => write!(f, "infrastructure error: {e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TxError<E> {}
