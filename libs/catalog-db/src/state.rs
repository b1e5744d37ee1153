//! In-memory table storage.
//!
//! One [`Table`] per entity type, keyed by `TypeId`. Rows keep insertion
//! order, which is the order unsorted queries return them in. Unique indexes
//! are checked on every write by scanning the keys of the other rows.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use catalog_query::{FilterNode, QueryPlan};
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::{DbError, PRIMARY_KEY_INDEX};

trait AnyTable: Send + Sync {
    fn clone_box(&self) -> Box<dyn AnyTable>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Table<E> {
    rows: Vec<E>,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<E: Entity> AnyTable for Table<E> {
    fn clone_box(&self) -> Box<dyn AnyTable> {
        Box::new(Table {
            rows: self.rows.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<E: Entity> Table<E> {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.rows.iter().position(|r| r.id() == id)
    }

    /// First unique key of `row` already held by a row other than `skip`.
    fn conflict(&self, row: &E, skip: Option<usize>) -> Option<DbError> {
        let keys = row.unique_keys();
        if keys.is_empty() {
            return None;
        }
        self.rows
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .find_map(|(_, other)| {
                let taken = other.unique_keys();
                let hit = keys.iter().find(|k| taken.contains(k))?;
                Some(DbError::UniqueViolation {
                    index: hit.index,
                    key: hit.key.clone(),
                })
            })
    }
}

#[derive(Default)]
pub struct State {
    tables: HashMap<TypeId, Box<dyn AnyTable>>,
}

impl Clone for State {
    fn clone(&self) -> Self {
        Self {
            tables: self
                .tables
                .iter()
                .map(|(k, t)| (*k, t.clone_box()))
                .collect(),
        }
    }
}

impl State {
    fn table<E: Entity>(&self) -> Option<&Table<E>> {
        self.tables
            .get(&TypeId::of::<E>())
            .and_then(|t| t.as_any().downcast_ref::<Table<E>>())
    }

    fn table_mut<E: Entity>(&mut self) -> Result<&mut Table<E>, DbError> {
        self.tables
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Table::<E>::default()))
            .as_any_mut()
            .downcast_mut::<Table<E>>()
            .ok_or_else(|| {
                DbError::Internal(format!("table type mismatch for {}", E::schema().name()))
            })
    }

    pub fn get<E: Entity>(&self, id: Uuid) -> Option<E> {
        self.table::<E>()
            .and_then(|t| t.rows.iter().find(|r| r.id() == id))
            .cloned()
    }

    pub fn query<E: Entity>(&self, plan: &QueryPlan) -> (Vec<E>, u64) {
        match self.table::<E>() {
            Some(t) => plan.apply(t.rows.iter().cloned()),
            None => (Vec::new(), 0),
        }
    }

    pub fn count<E: Entity>(&self, filter: Option<&FilterNode>) -> u64 {
        let Some(t) = self.table::<E>() else {
            return 0;
        };
        let n = t
            .rows
            .iter()
            .filter(|r| filter.is_none_or(|f| f.matches(*r)))
            .count();
        u64::try_from(n).unwrap_or(u64::MAX)
    }

    pub fn insert<E: Entity>(&mut self, row: E) -> Result<E, DbError> {
        let table = self.table_mut::<E>()?;
        if table.position(row.id()).is_some() {
            return Err(DbError::UniqueViolation {
                index: PRIMARY_KEY_INDEX,
                key: row.id().to_string(),
            });
        }
        if let Some(err) = table.conflict(&row, None) {
            return Err(err);
        }
        table.rows.push(row.clone());
        Ok(row)
    }

    pub fn update<E: Entity>(&mut self, row: E) -> Result<E, DbError> {
        let table = self.table_mut::<E>()?;
        let Some(pos) = table.position(row.id()) else {
            return Err(DbError::NotFound {
                entity: E::schema().name(),
                id: row.id(),
            });
        };
        if let Some(err) = table.conflict(&row, Some(pos)) {
            return Err(err);
        }
        table.rows[pos] = row.clone();
        Ok(row)
    }

    pub fn delete<E: Entity>(&mut self, id: Uuid) -> Result<(), DbError> {
        let table = self.table_mut::<E>()?;
        let Some(pos) = table.position(id) else {
            return Err(DbError::NotFound {
                entity: E::schema().name(),
                id,
            });
        };
        table.rows.remove(pos);
        Ok(())
    }
}
