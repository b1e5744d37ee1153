#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Catalog store.
//!
//! Entities implement [`Entity`]; services talk to the store through
//! [`DBRunner`], which both [`DbConn`] and [`DbTx`] implement, so the same
//! repository code runs inside or outside a transaction.

mod db;
pub mod entity;
pub mod error;
mod runner;
mod state;
pub mod tx_error;

pub use db::{Db, DbConn, DbTx, TxFuture};
pub use entity::{Entity, UniqueKey};
pub use error::{DbError, PRIMARY_KEY_INDEX};
pub use runner::DBRunner;
pub use tx_error::TxError;
