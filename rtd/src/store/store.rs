use crate::collection::{Document, DocumentSet};
use crate::errors::RtdResult;
use std::ops::Deref;
use std::sync::Arc;

/// Persisted contents of one collection, as loaded on open.
#[derive(Debug, Clone, Default)]
pub struct StoredCollection {
    pub name: String,
    pub documents: Vec<Document>,
}

/// Persisted contents of one database, as loaded on open.
#[derive(Debug, Clone, Default)]
pub struct StoredDatabase {
    pub name: String,
    pub collections: Vec<StoredCollection>,
}

/// Durability backend of the engine.
///
/// The engine keeps the authoritative state in memory and calls into the store
/// while a mutation still holds its collection's gate. A mutation becomes
/// visible only after the store call returned `Ok`; an `Err` aborts the
/// mutation and leaves the previous state published.
///
/// Implementations must be safe to call concurrently for different
/// collections. Calls for the same collection are already serialized.
pub trait StoreProvider: Send + Sync {
    /// Opens the store and returns everything persisted so far.
    fn open(&self) -> RtdResult<Vec<StoredDatabase>>;

    fn is_closed(&self) -> bool;

    fn create_database(&self, database: &str) -> RtdResult<()>;

    /// Removes a database with all its collections.
    fn drop_database(&self, database: &str) -> RtdResult<()>;

    /// Replaces the persisted contents of a collection with `documents`.
    fn write_collection(
        &self,
        database: &str,
        collection: &str,
        documents: &DocumentSet,
    ) -> RtdResult<()>;

    fn drop_collection(&self, database: &str, collection: &str) -> RtdResult<()>;

    fn close(&self) -> RtdResult<()>;
}

/// A shareable handle to a [StoreProvider].
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn StoreProvider>,
}

impl Store {
    pub fn new<T: StoreProvider + 'static>(inner: T) -> Self {
        Store {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for Store {
    type Target = Arc<dyn StoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
