/// Errors raised while planning a list query.
///
/// Filter and sort problems are never errors (they drop the offending
/// clause); only pagination input can be rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid range: {0}")]
    InvalidRange(String),
}
