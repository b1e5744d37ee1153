//! Database handle and runner types.
//!
//! - [`Db`]: the shared handle. Cheap to clone.
//! - [`DbConn`]: non-transactional runner; every call sees committed state.
//! - [`DbTx`]: transactional runner. Writes go to a private working copy that
//!   replaces the committed state on commit and is discarded otherwise.
//!
//! Transactions are serialized: the committed state stays locked from
//! `begin` until commit or rollback.
//!
//! # Example
//!
//! ```
//! # use catalog_db::{Db, DbError};
//! # async fn demo(db: &Db) -> Result<(), DbError> {
//! let created = db
//!     .transaction(|tx| {
//!         Box::pin(async move {
//!             // only `tx` is usable here; `db.conn()` would fail
//!             let _ = tx;
//!             Ok::<_, DbError>(1)
//!         })
//!     })
//!     .await?;
//! assert_eq!(created, 1);
//! # Ok(())
//! # }
//! ```

use std::{cell::Cell, future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use catalog_query::{FilterNode, QueryPlan};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::DbError;
use crate::runner::DBRunner;
use crate::state::State;
use crate::tx_error::TxError;

// Set while a transaction closure runs. `Db::conn()` and `Db::begin()` refuse
// to hand out a second runner in that task.
tokio::task_local! {
    static IN_TX: Cell<bool>;
}

fn is_in_transaction() -> bool {
    IN_TX.try_with(Cell::get).unwrap_or(false)
}

async fn with_tx_guard<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    IN_TX.scope(Cell::new(true), f).await
}

/// Boxed transaction body, borrowing the transaction for `'a`.
pub type TxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

#[derive(Clone, Default)]
pub struct Db {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("engine", &"memory")
            .finish_non_exhaustive()
    }
}

impl Db {
    /// Empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Create a non-transactional runner.
    ///
    /// # Errors
    /// Returns `DbError::ConnRequestedInsideTx` when called from inside a
    /// transaction closure.
    pub fn conn(&self) -> Result<DbConn<'_>, DbError> {
        if is_in_transaction() {
            return Err(DbError::ConnRequestedInsideTx);
        }
        Ok(DbConn { state: &self.state })
    }

    /// Open a transaction. Prefer [`Db::transaction`], which also guards
    /// against runners leaking out of the transaction scope.
    ///
    /// # Errors
    /// Returns `DbError::ConnRequestedInsideTx` when called from inside a
    /// transaction closure.
    pub async fn begin(&self) -> Result<DbTx, DbError> {
        if is_in_transaction() {
            return Err(DbError::ConnRequestedInsideTx);
        }
        let committed = Arc::clone(&self.state).lock_owned().await;
        let work = parking_lot::Mutex::new(State::clone(&committed));
        trace!("transaction started");
        Ok(DbTx { committed, work })
    }

    /// Run `f` inside a transaction. Commits when it returns `Ok`, rolls back
    /// otherwise. Store failures are converted into `E`.
    ///
    /// # Errors
    /// Returns the closure's error, or a converted `DbError` if the
    /// transaction cannot be opened.
    pub async fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        E: From<DbError> + Send + 'static,
        F: for<'a> FnOnce(&'a DbTx) -> TxFuture<'a, T, E> + Send,
        T: Send + 'static,
    {
        let tx = self.begin().await.map_err(E::from)?;
        let res = with_tx_guard(f(&tx)).await;
        match res {
            Ok(v) => {
                tx.commit();
                Ok(v)
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }

    /// Like [`Db::transaction`], keeping store failures apart from the
    /// closure's own errors.
    ///
    /// # Errors
    /// `TxError::Domain` for closure errors, `TxError::Infra` when the
    /// transaction cannot be opened.
    pub async fn in_transaction<F, T, E>(&self, f: F) -> Result<T, TxError<E>>
    where
        E: Send + 'static,
        F: for<'a> FnOnce(&'a DbTx) -> TxFuture<'a, T, E> + Send,
        T: Send + 'static,
    {
        let tx = self.begin().await.map_err(TxError::Infra)?;
        let res = with_tx_guard(f(&tx)).await;
        match res {
            Ok(v) => {
                tx.commit();
                Ok(v)
            }
            Err(e) => {
                tx.rollback();
                Err(TxError::Domain(e))
            }
        }
    }
}

/// Non-transactional runner. Locks the store per call.
pub struct DbConn<'a> {
    state: &'a Mutex<State>,
}

/// Transactional runner.
///
/// Dropping a `DbTx` without calling [`DbTx::commit`] rolls it back.
pub struct DbTx {
    committed: OwnedMutexGuard<State>,
    work: parking_lot::Mutex<State>,
}

impl DbTx {
    /// Publish the working copy.
    pub fn commit(self) {
        let mut committed = self.committed;
        *committed = self.work.into_inner();
        debug!("transaction committed");
    }

    /// Discard the working copy.
    pub fn rollback(self) {
        drop(self);
        debug!("transaction rolled back");
    }
}

#[async_trait]
impl DBRunner for DbConn<'_> {
    async fn get<E: Entity>(&self, id: Uuid) -> Result<Option<E>, DbError> {
        Ok(self.state.lock().await.get(id))
    }

    async fn query<E: Entity>(&self, plan: &QueryPlan) -> Result<(Vec<E>, u64), DbError> {
        Ok(self.state.lock().await.query(plan))
    }

    async fn count<E: Entity>(&self, filter: Option<&FilterNode>) -> Result<u64, DbError> {
        Ok(self.state.lock().await.count::<E>(filter))
    }

    async fn create<E: Entity>(&self, row: E) -> Result<E, DbError> {
        self.state.lock().await.insert(row)
    }

    async fn update<E: Entity>(&self, row: E) -> Result<E, DbError> {
        self.state.lock().await.update(row)
    }

    async fn delete<E: Entity>(&self, id: Uuid) -> Result<(), DbError> {
        self.state.lock().await.delete::<E>(id)
    }
}

#[async_trait]
impl DBRunner for DbTx {
    async fn get<E: Entity>(&self, id: Uuid) -> Result<Option<E>, DbError> {
        Ok(self.work.lock().get(id))
    }

    async fn query<E: Entity>(&self, plan: &QueryPlan) -> Result<(Vec<E>, u64), DbError> {
        Ok(self.work.lock().query(plan))
    }

    async fn count<E: Entity>(&self, filter: Option<&FilterNode>) -> Result<u64, DbError> {
        Ok(self.work.lock().count::<E>(filter))
    }

    async fn create<E: Entity>(&self, row: E) -> Result<E, DbError> {
        self.work.lock().insert(row)
    }

    async fn update<E: Entity>(&self, row: E) -> Result<E, DbError> {
        self.work.lock().update(row)
    }

    async fn delete<E: Entity>(&self, id: Uuid) -> Result<(), DbError> {
        self.work.lock().delete::<E>(id)
    }
}
