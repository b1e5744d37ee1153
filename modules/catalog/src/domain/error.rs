use catalog_db::DbError;
use catalog_query::QueryError;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::OrderStatus;

/// Coarse error classes the transport layer maps to protocol codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    LimitExceeded,
    Forbidden,
    InvalidRange,
    Internal,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Order number {sequence} is already taken in shop {shop_id}")]
    SequenceTaken { shop_id: Uuid, sequence: u64 },

    #[error("Order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order weight {weight} exceeds the limit of {limit}")]
    WeightLimitExceeded { weight: f64, limit: f64 },

    #[error("Origin {origin} is not allowed to order from shop {shop_id}")]
    OriginNotAllowed { shop_id: Uuid, origin: String },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) | Self::SequenceTaken { .. } | Self::InvalidTransition { .. } => {
                ErrorKind::Conflict
            }
            Self::WeightLimitExceeded { .. } => ErrorKind::LimitExceeded,
            Self::OriginNotAllowed { .. } => ErrorKind::Forbidden,
            Self::Query(QueryError::InvalidRange(_)) => ErrorKind::InvalidRange,
            Self::Database { .. } => ErrorKind::Internal,
        }
    }
}

impl From<DbError> for DomainError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::UniqueViolation { index, key } => {
                Self::conflict(format!("{index} already holds {key}"))
            }
            DbError::NotFound { entity, id } => Self::not_found(entity, id),
            other => Self::database(other.to_string()),
        }
    }
}
