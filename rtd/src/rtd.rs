use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::collection::Document;
use crate::common::{validate_name, RTD_VERSION};
use crate::database::Database;
use crate::errors::{Entity, ErrorKind, RtdError, RtdResult};
use crate::filter::Filter;
use crate::rtd_builder::RtdBuilder;
use crate::rtd_config::RtdConfig;
use crate::store::Store;
use crate::update::UpdateSpec;

/// The engine: a registry of named databases backed by one store.
///
/// `Rtd` is cheap to clone; clones share the same registry. The engine is
/// created through [Rtd::builder] and lives until [Rtd::close] is called,
/// after which every operation fails with [ErrorKind::StoreClosed].
///
/// The document-level operations below take filters and update specs in
/// their structured [Document] form, as a transport layer would decode them,
/// and resolve the database by name on every call.
///
/// # Examples
///
/// ```rust
/// use rtd::{doc, Rtd};
///
/// let db = Rtd::builder().open().unwrap();
/// db.create_database("app").unwrap();
///
/// let stored = db.insert_document("app", "users", doc! { "name": "a" }).unwrap();
/// let id = stored.id().unwrap().unwrap();
///
/// let updated = db
///     .update_document("app", "users", id.as_str(), &doc! { "name": "b" })
///     .unwrap();
/// assert_eq!(updated.get("name").unwrap().as_str(), Some("b"));
///
/// db.delete_document("app", "users", id.as_str()).unwrap();
/// assert!(db.find_document("app", "users", id.as_str()).is_err());
/// ```
#[derive(Clone)]
pub struct Rtd {
    inner: Arc<RtdInner>,
}

impl Rtd {
    pub fn builder() -> RtdBuilder {
        RtdBuilder::new()
    }

    /// Opens an engine over an already validated config, loading whatever
    /// the store persisted.
    pub(crate) fn open(config: RtdConfig) -> RtdResult<Rtd> {
        config.auto_configure()?;
        let store = config.store()?;
        let inner = RtdInner {
            config,
            store,
            databases: DashMap::new(),
            closed: AtomicBool::new(false),
        };
        inner.load()?;
        log::info!(
            "Opened rtd {} engine with {} databases",
            RTD_VERSION,
            inner.databases.len()
        );
        Ok(Rtd {
            inner: Arc::new(inner),
        })
    }

    pub fn config(&self) -> RtdConfig {
        self.inner.config.clone()
    }

    pub fn store(&self) -> Store {
        self.inner.store.clone()
    }

    /// Creates an empty database. Fails with [ErrorKind::AlreadyExists] if
    /// the name is taken.
    pub fn create_database(&self, name: &str) -> RtdResult<Database> {
        self.inner.create_database(name)
    }

    /// Deletes a database with every collection and document in it.
    pub fn delete_database(&self, name: &str) -> RtdResult<()> {
        self.inner.delete_database(name)
    }

    /// Returns a handle to an existing database.
    pub fn database(&self, name: &str) -> RtdResult<Database> {
        self.inner.check_opened()?;
        self.inner.database(name)
    }

    pub fn has_database(&self, name: &str) -> bool {
        !self.is_closed() && self.inner.databases.contains_key(name)
    }

    /// Names of all databases, sorted.
    pub fn database_names(&self) -> RtdResult<Vec<String>> {
        self.inner.check_opened()?;
        let mut names: Vec<String> = self
            .inner
            .databases
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn query(&self, database: &str, collection: &str, filter: &Document) -> RtdResult<Vec<Document>> {
        let filter = Filter::parse(filter).map_err(|e| e.about(collection_entity(database, collection)))?;
        self.database(database)?.query(collection, &filter)
    }

    pub fn update_query(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> RtdResult<Vec<Document>> {
        let filter = Filter::parse(filter).map_err(|e| e.about(collection_entity(database, collection)))?;
        let update = UpdateSpec::parse(update).map_err(|e| e.about(collection_entity(database, collection)))?;
        self.database(database)?.update_query(collection, &filter, &update)
    }

    pub fn insert_document(&self, database: &str, collection: &str, document: Document) -> RtdResult<Document> {
        self.database(database)?.insert(collection, document)
    }

    pub fn find_document(&self, database: &str, collection: &str, id: &str) -> RtdResult<Document> {
        self.database(database)?.find(collection, id)
    }

    pub fn update_document(
        &self,
        database: &str,
        collection: &str,
        id: &str,
        update: &Document,
    ) -> RtdResult<Document> {
        let update = UpdateSpec::parse(update).map_err(|e| {
            e.about(Entity::Document {
                database: database.to_string(),
                collection: collection.to_string(),
                id: id.to_string(),
            })
        })?;
        self.database(database)?.update(collection, id, &update)
    }

    pub fn delete_document(&self, database: &str, collection: &str, id: &str) -> RtdResult<Document> {
        self.database(database)?.delete(collection, id)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Closes the engine and its store. Closing twice is a no-op.
    pub fn close(&self) -> RtdResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.store.close()?;
        log::info!("Closed rtd engine");
        Ok(())
    }
}

impl std::fmt::Debug for Rtd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rtd")
            .field("databases", &self.inner.databases.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct RtdInner {
    config: RtdConfig,
    store: Store,
    databases: DashMap<String, Database>,
    closed: AtomicBool,
}

impl RtdInner {
    fn load(&self) -> RtdResult<()> {
        for stored in self.store.open()? {
            let database = Database::load(
                &stored.name,
                stored.collections,
                self.store.clone(),
                self.config.clone(),
            )?;
            self.databases.insert(stored.name, database);
        }
        Ok(())
    }

    fn check_opened(&self) -> RtdResult<()> {
        if self.closed.load(Ordering::Acquire) || self.store.is_closed() {
            log::error!("Rtd engine is closed");
            return Err(RtdError::new("Rtd engine is closed", ErrorKind::StoreClosed));
        }
        Ok(())
    }

    fn database(&self, name: &str) -> RtdResult<Database> {
        match self.databases.get(name) {
            Some(database) => Ok(database.clone()),
            None => Err(database_not_found(name)),
        }
    }

    fn create_database(&self, name: &str) -> RtdResult<Database> {
        self.check_opened()?;
        validate_name("Database", name)?;

        match self.databases.entry(name.to_string()) {
            Entry::Occupied(_) => {
                let entity = Entity::Database(name.to_string());
                log::error!("{} already exists", entity);
                Err(RtdError::new(&format!("{} already exists", entity), ErrorKind::AlreadyExists)
                    .with_entity(entity))
            }
            Entry::Vacant(entry) => {
                // the entry's shard lock keeps a racing create of the same name out
                self.store.create_database(name)?;
                let database = Database::new(name, self.store.clone(), self.config.clone());
                entry.insert(database.clone());
                log::info!("Created database {}", name);
                Ok(database)
            }
        }
    }

    fn delete_database(&self, name: &str) -> RtdResult<()> {
        self.check_opened()?;
        let database = self.database(name)?;
        database.retire()?;
        self.databases.remove_if(name, |_, current| current.is_dropped());
        log::info!("Deleted database {}", name);
        Ok(())
    }
}

fn collection_entity(database: &str, collection: &str) -> Entity {
    Entity::Collection {
        database: database.to_string(),
        collection: collection.to_string(),
    }
}

fn database_not_found(name: &str) -> RtdError {
    let entity = Entity::Database(name.to_string());
    log::error!("{} not found", entity);
    RtdError::new(&format!("{} not found", entity), ErrorKind::NotFound).with_entity(entity)
}
