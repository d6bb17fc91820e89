use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::collection::{Collection, Document, DocumentSet};
use crate::common::validate_name;
use crate::errors::{Entity, ErrorKind, RtdError, RtdResult};
use crate::filter::Filter;
use crate::rtd_config::RtdConfig;
use crate::store::{Store, StoredCollection};
use crate::update::UpdateSpec;

/// A named namespace of collections.
///
/// Collections are created implicitly by the first insert into them, or
/// explicitly with [Database::get_or_create_collection]. Once the database is
/// deleted every handle to it, and to its collections, fails further
/// operations.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    name: String,
    collections: RwLock<HashMap<String, Collection>>,
    dropped: AtomicBool,
    store: Store,
    config: RtdConfig,
}

impl Database {
    pub(crate) fn new(name: &str, store: Store, config: RtdConfig) -> Self {
        Database {
            inner: Arc::new(DatabaseInner {
                name: name.to_string(),
                collections: RwLock::new(HashMap::new()),
                dropped: AtomicBool::new(false),
                store,
                config,
            }),
        }
    }

    /// Rebuilds a database from what the store persisted.
    pub(crate) fn load(
        name: &str,
        stored: Vec<StoredCollection>,
        store: Store,
        config: RtdConfig,
    ) -> RtdResult<Self> {
        let database = Database::new(name, store, config);
        {
            let mut collections = database.inner.collections.write();
            for collection in stored {
                let documents = DocumentSet::from_documents(collection.documents).map_err(|err| {
                    RtdError::new_with_cause(
                        &format!("Failed to load collection {}/{}", name, collection.name),
                        err.kind().clone(),
                        err,
                    )
                })?;
                log::debug!(
                    "Loaded collection {}/{} with {} documents",
                    name,
                    collection.name,
                    documents.len()
                );
                collections.insert(collection.name.clone(), database.new_collection(&collection.name, documents));
            }
        }
        Ok(database)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_dropped(&self) -> bool {
        self.inner.dropped.load(Ordering::Acquire)
    }

    /// Returns an existing collection. Fails with [ErrorKind::NotFound] if absent.
    pub fn collection(&self, name: &str) -> RtdResult<Collection> {
        self.check_live()?;
        match self.inner.collections.read().get(name) {
            Some(collection) => Ok(collection.clone()),
            None => Err(self.collection_not_found(name)),
        }
    }

    /// Returns the named collection, creating it if it does not exist yet.
    pub fn get_or_create_collection(&self, name: &str) -> RtdResult<Collection> {
        self.check_live()?;
        if let Some(collection) = self.inner.collections.read().get(name) {
            return Ok(collection.clone());
        }

        validate_name("Collection", name)?;
        let mut collections = self.inner.collections.write();
        // re-check under the write lock, a delete may have finished meanwhile
        self.check_live()?;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| {
                log::debug!("Creating collection {}/{}", self.inner.name, name);
                self.new_collection(name, DocumentSet::new())
            })
            .clone();
        Ok(collection)
    }

    pub fn has_collection(&self, name: &str) -> bool {
        !self.is_dropped() && self.inner.collections.read().contains_key(name)
    }

    /// Names of all collections, sorted.
    pub fn collection_names(&self) -> RtdResult<Vec<String>> {
        self.check_live()?;
        let mut names: Vec<String> = self.inner.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Removes a collection and all its documents.
    ///
    /// Waits for the mutation in flight on the collection, if any, to finish.
    /// Handles to the collection fail afterwards with [ErrorKind::Conflict].
    pub fn drop_collection(&self, name: &str) -> RtdResult<()> {
        self.check_live()?;
        let mut collections = self.inner.collections.write();
        let collection = match collections.get(name) {
            Some(collection) => collection.clone(),
            None => return Err(self.collection_not_found(name)),
        };

        {
            let _guard = collection.lock_gate();
            self.inner.store.drop_collection(&self.inner.name, name)?;
            collection.mark_dropped();
        }
        collections.remove(name);
        log::info!("Dropped collection {}/{}", self.inner.name, name);
        Ok(())
    }

    /// Documents of `collection` matching `filter`. A missing collection
    /// yields an empty result.
    pub fn query(&self, collection: &str, filter: &Filter) -> RtdResult<Vec<Document>> {
        match self.existing_collection(collection)? {
            Some(collection) => collection.query(filter),
            None => Ok(vec![]),
        }
    }

    /// Updates every matching document of `collection`. A missing collection
    /// matches nothing.
    pub fn update_query(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> RtdResult<Vec<Document>> {
        match self.existing_collection(collection)? {
            Some(collection) => collection.update_query(filter, update),
            None => Ok(vec![]),
        }
    }

    /// Inserts into `collection`, creating the collection if needed.
    pub fn insert(&self, collection: &str, document: Document) -> RtdResult<Document> {
        self.get_or_create_collection(collection)?.insert(document)
    }

    pub fn insert_many(&self, collection: &str, documents: Vec<Document>) -> RtdResult<Vec<Document>> {
        self.get_or_create_collection(collection)?.insert_many(documents)
    }

    pub fn find(&self, collection: &str, id: &str) -> RtdResult<Document> {
        self.collection(collection)?.find_by_id(id)
    }

    pub fn update(&self, collection: &str, id: &str, update: &UpdateSpec) -> RtdResult<Document> {
        self.collection(collection)?.update_by_id(id, update)
    }

    pub fn delete(&self, collection: &str, id: &str) -> RtdResult<Document> {
        self.collection(collection)?.delete_by_id(id)
    }

    /// Drops the database: waits for every in-flight mutation, removes the
    /// persisted data, then invalidates all handles.
    pub(crate) fn retire(&self) -> RtdResult<()> {
        let mut collections = self.inner.collections.write();
        if self.is_dropped() {
            return Err(self.not_found());
        }

        let handles: Vec<Collection> = collections.values().cloned().collect();
        {
            // only this path holds more than one gate, and the map lock serializes it
            let _guards: Vec<_> = handles.iter().map(|c| c.lock_gate()).collect();
            self.inner.store.drop_database(&self.inner.name)?;
            self.inner.dropped.store(true, Ordering::Release);
            for collection in &handles {
                collection.mark_dropped();
            }
        }
        collections.clear();
        Ok(())
    }

    fn existing_collection(&self, name: &str) -> RtdResult<Option<Collection>> {
        self.check_live()?;
        Ok(self.inner.collections.read().get(name).cloned())
    }

    fn new_collection(&self, name: &str, documents: DocumentSet) -> Collection {
        Collection::new(
            &self.inner.name,
            name,
            documents,
            self.inner.store.clone(),
            self.inner.config.gate_timeout(),
            self.inner.config.events_enabled(),
        )
    }

    fn check_live(&self) -> RtdResult<()> {
        if self.inner.store.is_closed() {
            log::error!("Store is closed, cannot access database {}", self.inner.name);
            return Err(RtdError::new("Store is closed", ErrorKind::StoreClosed));
        }
        if self.is_dropped() {
            return Err(self.not_found());
        }
        Ok(())
    }

    fn not_found(&self) -> RtdError {
        let entity = Entity::Database(self.inner.name.clone());
        log::error!("{} not found", entity);
        RtdError::new(&format!("{} not found", entity), ErrorKind::NotFound).with_entity(entity)
    }

    fn collection_not_found(&self, name: &str) -> RtdError {
        let entity = Entity::Collection {
            database: self.inner.name.clone(),
            collection: name.to_string(),
        };
        log::debug!("{} not found", entity);
        RtdError::new(&format!("{} not found", entity), ErrorKind::NotFound).with_entity(entity)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.name)
            .field("dropped", &self.is_dropped())
            .finish()
    }
}
