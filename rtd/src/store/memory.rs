use crate::collection::DocumentSet;
use crate::errors::{ErrorKind, RtdError, RtdResult};
use crate::store::{StoreProvider, StoredCollection, StoredDatabase};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A store that keeps the last committed state of every collection in memory.
///
/// Writes are O(1): the committed [DocumentSet] is a persistent structure and
/// is retained by cloning. Nothing survives the process, but a second engine
/// opened on a clone of the same store sees what the first one committed.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    databases: DashMap<String, HashMap<String, DocumentSet>>,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    fn check_opened(&self) -> RtdResult<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            log::error!("In-memory store is closed");
            return Err(RtdError::new("Store is closed", ErrorKind::StoreClosed));
        }
        Ok(())
    }
}

impl StoreProvider for InMemoryStore {
    fn open(&self) -> RtdResult<Vec<StoredDatabase>> {
        self.inner.closed.store(false, Ordering::Release);

        let mut databases: Vec<StoredDatabase> = self
            .inner
            .databases
            .iter()
            .map(|entry| {
                let mut collections: Vec<StoredCollection> = entry
                    .value()
                    .iter()
                    .map(|(name, documents)| StoredCollection {
                        name: name.clone(),
                        documents: documents.to_vec(),
                    })
                    .collect();
                collections.sort_by(|a, b| a.name.cmp(&b.name));
                StoredDatabase {
                    name: entry.key().clone(),
                    collections,
                }
            })
            .collect();
        databases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(databases)
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn create_database(&self, database: &str) -> RtdResult<()> {
        self.check_opened()?;
        self.inner
            .databases
            .entry(database.to_string())
            .or_default();
        Ok(())
    }

    fn drop_database(&self, database: &str) -> RtdResult<()> {
        self.check_opened()?;
        self.inner.databases.remove(database);
        Ok(())
    }

    fn write_collection(
        &self,
        database: &str,
        collection: &str,
        documents: &DocumentSet,
    ) -> RtdResult<()> {
        self.check_opened()?;
        self.inner
            .databases
            .entry(database.to_string())
            .or_default()
            .insert(collection.to_string(), documents.clone());
        Ok(())
    }

    fn drop_collection(&self, database: &str, collection: &str) -> RtdResult<()> {
        self.check_opened()?;
        if let Some(mut collections) = self.inner.databases.get_mut(database) {
            collections.remove(collection);
        }
        Ok(())
    }

    fn close(&self) -> RtdResult<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }
}
