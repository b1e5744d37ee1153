//! Store operations shared by plain connections and transactions.
//!
//! `DBRunner` is sealed: only [`DbConn`] and [`DbTx`] implement it, so code
//! handed a runner cannot build one that sidesteps the transaction it runs in.
//!
//! # Errors
//!
//! Every operation may fail with `DbError::Internal` on a store fault.
//! Writes additionally report `UniqueViolation` and `NotFound` as documented
//! per method.

use async_trait::async_trait;
use catalog_query::{FilterNode, QueryPlan};
use uuid::Uuid;

use crate::db::{DbConn, DbTx};
use crate::entity::Entity;
use crate::error::DbError;

mod sealed {
    pub trait Sealed {}
}

impl sealed::Sealed for DbConn<'_> {}
impl sealed::Sealed for DbTx {}

#[async_trait]
#[allow(clippy::missing_errors_doc)]
pub trait DBRunner: sealed::Sealed + Send + Sync {
    async fn get<E: Entity>(&self, id: Uuid) -> Result<Option<E>, DbError>;

    /// Run a plan; returns the requested slice and the filtered total.
    async fn query<E: Entity>(&self, plan: &QueryPlan) -> Result<(Vec<E>, u64), DbError>;

    async fn count<E: Entity>(&self, filter: Option<&FilterNode>) -> Result<u64, DbError>;

    /// Insert a new row.
    ///
    /// Fails with `UniqueViolation` if the id or any unique key is taken.
    async fn create<E: Entity>(&self, row: E) -> Result<E, DbError>;

    /// Replace an existing row, matched by id.
    ///
    /// Fails with `NotFound` for an unknown id and `UniqueViolation` if the
    /// new keys collide with another row.
    async fn update<E: Entity>(&self, row: E) -> Result<E, DbError>;

    /// Fails with `NotFound` for an unknown id.
    async fn delete<E: Entity>(&self, id: Uuid) -> Result<(), DbError>;

    /// Every row matching `filter`, in storage order.
    async fn find<E: Entity>(&self, filter: FilterNode) -> Result<Vec<E>, DbError> {
        let (rows, _) = self.query::<E>(&QueryPlan::filtered(filter)).await?;
        Ok(rows)
    }

    /// Like [`DBRunner::get`], but a missing row is `NotFound`.
    async fn fetch<E: Entity>(&self, id: Uuid) -> Result<E, DbError> {
        self.get::<E>(id).await?.ok_or(DbError::NotFound {
            entity: E::schema().name(),
            id,
        })
    }
}
