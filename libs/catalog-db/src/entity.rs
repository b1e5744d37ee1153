use catalog_query::Record;
use uuid::Uuid;

/// A persistable record.
///
/// Entities are stored per type and identified by a UUID primary key. Any
/// uniqueness constraints beyond the primary key are declared through
/// [`Entity::unique_keys`]; the store rejects writes that would make two rows
/// share a key in the same index.
pub trait Entity: Record + Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;

    /// Keys this row occupies in the entity's unique indexes.
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }
}

/// One entry of a unique index: the index name and the row's composite key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    pub index: &'static str,
    pub key: String,
}

impl UniqueKey {
    #[must_use]
    pub fn new(index: &'static str, key: impl Into<String>) -> Self {
        Self {
            index,
            key: key.into(),
        }
    }
}
