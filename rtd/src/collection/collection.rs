use crate::collection::{
    CollectionEventInfo, CollectionEventListener, CollectionEvents, Document, DocumentId,
    DocumentSet,
};
use crate::common::{Gate, GateGuard, GateState, RtdEventBus, SubscriberRef};
use crate::errors::{Entity, ErrorKind, RtdError, RtdResult};
use crate::filter::{is_all_filter, Filter};
use crate::store::Store;
use crate::update::UpdateSpec;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A named set of documents inside a database.
///
/// Handles are cheap to clone and safe to share across threads; clones refer
/// to the same collection.
///
/// # Concurrency
///
/// Reads take an immutable snapshot of the committed state and never block on
/// writers. Mutations are serialized by the collection's [Gate]: a mutation
/// enters the gate, stages its change on a copy of the committed state,
/// persists it through the store, publishes it, notifies listeners and only
/// then leaves the gate. Any failure before publishing discards the copy, so
/// every mutation is all-or-nothing, bulk ones included.
///
/// # Examples
///
/// ```rust
/// use rtd::{doc, Rtd};
/// use rtd::filter::field;
///
/// let db = Rtd::builder().open().unwrap();
/// let users = db.create_database("app").unwrap().get_or_create_collection("users").unwrap();
///
/// let alice = users.insert(doc! { "name": "Alice", "age": 30 }).unwrap();
/// let adults = users.query(&field("age").gte(18)).unwrap();
/// assert_eq!(adults, vec![alice]);
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
    gate_timeout: Option<Duration>,
}

struct CollectionInner {
    database: String,
    name: String,
    gate: Gate,
    documents: RwLock<DocumentSet>,
    dropped: AtomicBool,
    store: Store,
    event_bus: RtdEventBus<CollectionEventInfo, CollectionEventListener>,
    events_enabled: bool,
}

/// The outcome of a staged mutation: what to return and what to announce.
struct Staged<T> {
    result: T,
    changed: bool,
    events: Vec<(CollectionEvents, Document)>,
}

impl Collection {
    pub(crate) fn new(
        database: &str,
        name: &str,
        documents: DocumentSet,
        store: Store,
        gate_timeout: Option<Duration>,
        events_enabled: bool,
    ) -> Self {
        Collection {
            inner: Arc::new(CollectionInner {
                database: database.to_string(),
                name: name.to_string(),
                gate: Gate::new(),
                documents: RwLock::new(documents),
                dropped: AtomicBool::new(false),
                store,
                event_bus: RtdEventBus::new(),
                events_enabled,
            }),
            gate_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn database_name(&self) -> &str {
        &self.inner.database
    }

    /// Returns a handle to the same collection whose mutations wait at most
    /// `timeout` for the gate before failing with [ErrorKind::Timeout].
    pub fn with_gate_timeout(&self, timeout: Duration) -> Collection {
        Collection {
            inner: self.inner.clone(),
            gate_timeout: Some(timeout),
        }
    }

    pub fn gate_state(&self) -> GateState {
        self.inner.gate.state()
    }

    pub fn is_dropped(&self) -> bool {
        self.inner.dropped.load(Ordering::Acquire)
    }

    /// Returns all documents matching `filter`, in insertion order.
    pub fn query(&self, filter: &Filter) -> RtdResult<Vec<Document>> {
        let snapshot = self.snapshot()?;
        if is_all_filter(filter) {
            return Ok(snapshot.to_vec());
        }

        Ok(snapshot
            .documents()
            .filter(|document| filter.apply(document))
            .cloned()
            .collect())
    }

    /// Returns every document, in insertion order.
    pub fn all(&self) -> RtdResult<Vec<Document>> {
        Ok(self.snapshot()?.to_vec())
    }

    pub fn count(&self) -> RtdResult<usize> {
        Ok(self.snapshot()?.len())
    }

    /// Fetches one document by id. Fails with [ErrorKind::NotFound] if absent.
    pub fn find_by_id(&self, id: &str) -> RtdResult<Document> {
        let snapshot = self.snapshot()?;
        match snapshot.get(id) {
            Some(document) => Ok(document.clone()),
            None => Err(self.document_not_found(id)),
        }
    }

    /// Inserts a document and returns it as stored, `id` included.
    ///
    /// A missing id is generated. An explicit id must be a non-empty string not
    /// yet present in this collection.
    pub fn insert(&self, document: Document) -> RtdResult<Document> {
        let mut inserted = self.insert_many(vec![document])?;
        inserted.pop().ok_or_else(|| {
            log::error!("Insert into {} returned no document", self.entity());
            RtdError::new("Insert returned no document", ErrorKind::InternalError)
        })
    }

    /// Inserts several documents as one mutation: either all of them are
    /// stored or none is.
    pub fn insert_many(&self, documents: Vec<Document>) -> RtdResult<Vec<Document>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        self.mutate("insert", |working| {
            let mut inserted = Vec::with_capacity(documents.len());
            for mut document in documents {
                document.validate().map_err(|e| e.about(self.entity()))?;
                let id = match document.id().map_err(|e| e.about(self.entity()))? {
                    Some(id) => {
                        if working.contains(id.as_str()) {
                            log::error!("Document with id {} already exists in {}", id, self.entity());
                            return Err(RtdError::new(
                                &format!("Document with id {} already exists", id),
                                ErrorKind::DuplicateId,
                            )
                            .with_entity(self.document_entity(id.as_str())));
                        }
                        id
                    }
                    None => {
                        let mut id = DocumentId::new();
                        while working.contains(id.as_str()) {
                            id = DocumentId::new();
                        }
                        document.set_id(&id);
                        id
                    }
                };
                working.insert(id, document.clone());
                inserted.push(document);
            }

            let events = inserted
                .iter()
                .map(|document| (CollectionEvents::Insert, document.clone()))
                .collect();
            Ok(Staged {
                result: inserted,
                changed: true,
                events,
            })
        })
    }

    /// Applies `update` to every document matching `filter`, atomically.
    ///
    /// Returns the updated documents in insertion order. Zero matches is a
    /// successful no-op. If the update fails on any document, no document is
    /// changed.
    pub fn update_query(&self, filter: &Filter, update: &UpdateSpec) -> RtdResult<Vec<Document>> {
        self.mutate("update", |working| {
            let matched: Vec<(DocumentId, Document)> = working
                .iter()
                .filter(|(_, document)| filter.apply(document))
                .map(|(id, document)| (id.clone(), document.clone()))
                .collect();

            let mut updated = Vec::with_capacity(matched.len());
            for (id, document) in matched {
                let document = update
                    .apply(&document)
                    .map_err(|err| err.with_entity(self.document_entity(id.as_str())))?;
                working.replace(&id, document.clone());
                updated.push(document);
            }

            let events = updated
                .iter()
                .map(|document| (CollectionEvents::Update, document.clone()))
                .collect();
            Ok(Staged {
                changed: !updated.is_empty(),
                result: updated,
                events,
            })
        })
    }

    /// Applies `update` to the document with the given id and returns it.
    pub fn update_by_id(&self, id: &str, update: &UpdateSpec) -> RtdResult<Document> {
        self.mutate("update", |working| {
            let current = match working.get(id) {
                Some(document) => document.clone(),
                None => return Err(self.document_not_found(id)),
            };
            let document_id = DocumentId::create_id(id).map_err(|e| e.about(self.document_entity(id)))?;
            let updated = update
                .apply(&current)
                .map_err(|err| err.with_entity(self.document_entity(id)))?;
            working.replace(&document_id, updated.clone());

            Ok(Staged {
                result: updated.clone(),
                changed: true,
                events: vec![(CollectionEvents::Update, updated)],
            })
        })
    }

    /// Removes the document with the given id and returns it.
    pub fn delete_by_id(&self, id: &str) -> RtdResult<Document> {
        self.mutate("delete", |working| match working.remove(id) {
            Some(removed) => Ok(Staged {
                result: removed.clone(),
                changed: true,
                events: vec![(CollectionEvents::Remove, removed)],
            }),
            None => Err(self.document_not_found(id)),
        })
    }

    /// Removes every document matching `filter` and returns them.
    pub fn delete_query(&self, filter: &Filter) -> RtdResult<Vec<Document>> {
        self.mutate("delete", |working| {
            let matched: Vec<DocumentId> = working
                .iter()
                .filter(|(_, document)| filter.apply(document))
                .map(|(id, _)| id.clone())
                .collect();

            let removed: Vec<Document> = matched
                .iter()
                .filter_map(|id| working.remove(id.as_str()))
                .collect();

            let events = removed
                .iter()
                .map(|document| (CollectionEvents::Remove, document.clone()))
                .collect();
            Ok(Staged {
                changed: !removed.is_empty(),
                result: removed,
                events,
            })
        })
    }

    /// Registers a listener for committed changes of this collection.
    pub fn subscribe(&self, listener: CollectionEventListener) -> RtdResult<SubscriberRef> {
        self.check_live()?;
        self.inner
            .event_bus
            .register(listener)
            .map_err(|e| e.with_entity(self.entity()))
    }

    /// Removes a listener. Unsubscribing the same handle twice fails with
    /// `NotFound`.
    pub fn unsubscribe(&self, subscriber: &SubscriberRef) -> RtdResult<()> {
        self.inner
            .event_bus
            .deregister(subscriber)
            .map_err(|e| e.with_entity(self.entity()))
    }

    /// Enters the gate without a deadline, for structural changes such as
    /// dropping the collection.
    pub(crate) fn lock_gate(&self) -> GateGuard<'_> {
        self.inner.gate.lock()
    }

    /// Marks the collection dropped. The caller must hold the gate.
    pub(crate) fn mark_dropped(&self) {
        self.inner.dropped.store(true, Ordering::Release);
        if let Err(err) = self.inner.event_bus.close() {
            log::warn!("Failed to release listeners of {}: {}", self.entity(), err.message());
        }
        *self.inner.documents.write() = DocumentSet::new();
    }

    fn snapshot(&self) -> RtdResult<DocumentSet> {
        self.check_live()?;
        Ok(self.inner.documents.read().clone())
    }

    fn mutate<T, F>(&self, operation: &str, stage: F) -> RtdResult<T>
    where
        F: FnOnce(&mut DocumentSet) -> RtdResult<Staged<T>>,
    {
        let _guard = self.enter_gate(operation)?;
        self.check_live()?;

        let mut working = self.inner.documents.read().clone();
        let staged = stage(&mut working)?;

        if staged.changed {
            self.inner
                .store
                .write_collection(&self.inner.database, &self.inner.name, &working)
                .map_err(|err| {
                    log::error!("Failed to persist {} on {}: {}", operation, self.entity(), err);
                    RtdError::new_with_cause(
                        &format!("Failed to persist {} on {}", operation, self.entity()),
                        err.kind().clone(),
                        err,
                    )
                    .with_entity(self.entity())
                })?;
            *self.inner.documents.write() = working;
        }

        if self.inner.events_enabled && self.inner.event_bus.has_listeners() {
            for (event_type, document) in staged.events {
                let event = CollectionEventInfo::new(event_type, &self.inner.database, &self.inner.name, document);
                // already committed, delivery failures are only logged
                if let Err(err) = self.inner.event_bus.publish(event) {
                    log::warn!("Failed to deliver {:?} on {}: {}", event_type, self.entity(), err.message());
                }
            }
        }
        Ok(staged.result)
    }

    fn enter_gate(&self, operation: &str) -> RtdResult<GateGuard<'_>> {
        match self.inner.gate.enter(self.gate_timeout) {
            Some(guard) => Ok(guard),
            None => {
                log::warn!(
                    "Timed out waiting {:?} to {} on {}",
                    self.gate_timeout,
                    operation,
                    self.entity()
                );
                Err(RtdError::new(
                    &format!("Timed out waiting to {} on {}", operation, self.entity()),
                    ErrorKind::Timeout,
                )
                .with_entity(self.entity()))
            }
        }
    }

    fn check_live(&self) -> RtdResult<()> {
        if self.inner.store.is_closed() {
            log::error!("Store is closed, cannot access {}", self.entity());
            return Err(RtdError::new("Store is closed", ErrorKind::StoreClosed));
        }

        if self.is_dropped() {
            log::error!("{} was dropped", self.entity());
            return Err(RtdError::new(
                &format!("{} was dropped", self.entity()),
                ErrorKind::Conflict,
            )
            .with_entity(self.entity()));
        }
        Ok(())
    }

    fn entity(&self) -> Entity {
        Entity::Collection {
            database: self.inner.database.clone(),
            collection: self.inner.name.clone(),
        }
    }

    fn document_entity(&self, id: &str) -> Entity {
        Entity::Document {
            database: self.inner.database.clone(),
            collection: self.inner.name.clone(),
            id: id.to_string(),
        }
    }

    fn document_not_found(&self, id: &str) -> RtdError {
        let entity = self.document_entity(id);
        log::debug!("{} not found", entity);
        RtdError::new(&format!("{} not found", entity), ErrorKind::NotFound).with_entity(entity)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("database", &self.inner.database)
            .field("name", &self.inner.name)
            .field("gate_timeout", &self.gate_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Value;
    use crate::doc;
    use crate::filter::{all, field};
    use crate::store::{InMemoryStore, StoreProvider, StoredDatabase};
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn collection() -> Collection {
        Collection::new("app", "users", DocumentSet::new(), Store::new(InMemoryStore::new()), None, true)
    }

    /// Fails writes while `fail` is set.
    #[derive(Clone, Default)]
    struct FlakyStore {
        fail: Arc<AtomicBool>,
        writes: Arc<AtomicUsize>,
    }

    impl StoreProvider for FlakyStore {
        fn open(&self) -> RtdResult<Vec<StoredDatabase>> {
            Ok(vec![])
        }

        fn is_closed(&self) -> bool {
            false
        }

        fn create_database(&self, _database: &str) -> RtdResult<()> {
            Ok(())
        }

        fn drop_database(&self, _database: &str) -> RtdResult<()> {
            Ok(())
        }

        fn write_collection(&self, _: &str, _: &str, _: &DocumentSet) -> RtdResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RtdError::new("disk full", ErrorKind::IOError));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn drop_collection(&self, _database: &str, _collection: &str) -> RtdResult<()> {
            Ok(())
        }

        fn close(&self) -> RtdResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_insert_generates_id() {
        let users = collection();
        let stored = users.insert(doc! { "name": "Alice" }).unwrap();
        let id = stored.id().unwrap().unwrap();
        assert_eq!(users.find_by_id(id.as_str()).unwrap(), stored);
        assert_eq!(stored.get("name"), Some(Value::from("Alice")));
    }

    #[test]
    fn test_insert_keeps_explicit_id() {
        let users = collection();
        let stored = users.insert(doc! { "id": "u1", "name": "Alice" }).unwrap();
        assert_eq!(stored.get("id"), Some(Value::from("u1")));
        assert!(users.find_by_id("u1").is_ok());
    }

    #[test]
    fn test_insert_duplicate_id() {
        let users = collection();
        users.insert(doc! { "id": "u1" }).unwrap();
        let err = users.insert(doc! { "id": "u1", "other": 1 }).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateId);
        assert_eq!(users.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_invalid_id() {
        let users = collection();
        let err = users.insert(doc! { "id": 5 }).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidId);
        let err = users.insert(doc! { "id": "" }).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidId);
        assert_eq!(users.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_many_is_atomic() {
        let users = collection();
        users.insert(doc! { "id": "taken" }).unwrap();
        let err = users
            .insert_many(vec![doc! { "id": "a" }, doc! { "id": "b" }, doc! { "id": "taken" }])
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateId);
        assert_eq!(users.count().unwrap(), 1);

        // duplicates inside the batch are caught too
        let err = users
            .insert_many(vec![doc! { "id": "x" }, doc! { "id": "x" }])
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateId);
        assert_eq!(users.count().unwrap(), 1);
    }

    #[test]
    fn test_query_in_insertion_order() {
        let users = collection();
        for (id, age) in [("c", 30), ("a", 10), ("b", 40)] {
            users.insert(doc! { "id": id, "age": age }).unwrap();
        }
        let ids: Vec<Value> = users
            .query(&field("age").gte(20))
            .unwrap()
            .iter()
            .filter_map(|d| d.get("id"))
            .collect();
        assert_eq!(ids, vec![Value::from("c"), Value::from("b")]);
        assert_eq!(users.query(&all()).unwrap().len(), 3);
        assert_eq!(users.all().unwrap().len(), 3);
    }

    #[test]
    fn test_find_missing() {
        let users = collection();
        let err = users.find_by_id("nope").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NotFound);
        assert_eq!(
            err.entity(),
            Some(&Entity::Document {
                database: "app".to_string(),
                collection: "users".to_string(),
                id: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_update_by_id() {
        let users = collection();
        users.insert(doc! { "id": "u1", "n": 1 }).unwrap();
        let updated = users
            .update_by_id("u1", &UpdateSpec::new().inc("n", 1))
            .unwrap();
        assert_eq!(updated.get("n"), Some(Value::Int(2)));
        assert_eq!(users.find_by_id("u1").unwrap(), updated);

        let err = users.update_by_id("nope", &UpdateSpec::new().set("n", 1)).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NotFound);
    }

    #[test]
    fn test_update_query_is_all_or_nothing() {
        let users = collection();
        users.insert(doc! { "id": "1", "n": 1 }).unwrap();
        users.insert(doc! { "id": "2", "n": "text" }).unwrap();
        users.insert(doc! { "id": "3", "n": 3 }).unwrap();

        let err = users
            .update_query(&all(), &UpdateSpec::new().inc("n", 1))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidUpdate);
        assert_eq!(users.find_by_id("1").unwrap().get("n"), Some(Value::Int(1)));
        assert_eq!(users.find_by_id("3").unwrap().get("n"), Some(Value::Int(3)));
    }

    #[test]
    fn test_update_query_zero_matches() {
        let users = collection();
        users.insert(doc! { "id": "1" }).unwrap();
        let updated = users
            .update_query(&field("x").eq(1), &UpdateSpec::new().set("y", 1))
            .unwrap();
        assert!(updated.is_empty());
    }

    #[test]
    fn test_delete() {
        let users = collection();
        users.insert(doc! { "id": "1" }).unwrap();
        users.insert(doc! { "id": "2", "tmp": true }).unwrap();
        let removed = users.delete_by_id("1").unwrap();
        assert_eq!(removed.get("id"), Some(Value::from("1")));
        assert_eq!(users.delete_by_id("1").unwrap_err().kind(), &ErrorKind::NotFound);

        let removed = users.delete_query(&field("tmp").eq(true)).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(users.count().unwrap(), 0);
    }

    #[test]
    fn test_failed_persist_changes_nothing() {
        let flaky = FlakyStore::default();
        let users = Collection::new("app", "users", DocumentSet::new(), Store::new(flaky.clone()), None, true);
        users.insert(doc! { "id": "1", "n": 1 }).unwrap();

        flaky.fail.store(true, Ordering::SeqCst);
        let err = users.insert(doc! { "id": "2" }).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::IOError);
        assert!(users.update_by_id("1", &UpdateSpec::new().set("n", 2)).is_err());
        assert!(users.delete_by_id("1").is_err());

        assert_eq!(users.count().unwrap(), 1);
        assert_eq!(users.find_by_id("1").unwrap().get("n"), Some(Value::Int(1)));
        assert_eq!(users.gate_state(), GateState::Idle);
    }

    #[test]
    fn test_noop_mutation_does_not_persist() {
        let flaky = FlakyStore::default();
        let users = Collection::new("app", "users", DocumentSet::new(), Store::new(flaky.clone()), None, true);
        users.update_query(&all(), &UpdateSpec::new().set("a", 1)).unwrap();
        users.insert_many(vec![]).unwrap();
        assert_eq!(flaky.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_gate_timeout() {
        let users = collection();
        let _guard = users.lock_gate();
        let impatient = users.with_gate_timeout(Duration::from_millis(10));

        let handle = thread::spawn(move || impatient.insert(doc! { "a": 1 }));
        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Timeout);
        // reads never wait for the gate
        assert_eq!(users.count().unwrap(), 0);
    }

    #[test]
    fn test_dropped_collection_rejects_operations() {
        let users = collection();
        users.insert(doc! { "id": "1" }).unwrap();
        {
            let _guard = users.lock_gate();
            users.mark_dropped();
        }
        assert_eq!(users.insert(doc! {}).unwrap_err().kind(), &ErrorKind::Conflict);
        assert_eq!(users.query(&all()).unwrap_err().kind(), &ErrorKind::Conflict);
        assert_eq!(users.find_by_id("1").unwrap_err().kind(), &ErrorKind::Conflict);
    }

    #[test]
    fn test_events_follow_commits() {
        let users = collection();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let subscriber = users
            .subscribe(CollectionEventListener::new(move |event| {
                seen_clone.lock().push(event.event_type());
                Ok(())
            }))
            .unwrap();

        users.insert(doc! { "id": "1", "n": 1 }).unwrap();
        users.update_by_id("1", &UpdateSpec::new().inc("n", 1)).unwrap();
        let _ = users.insert(doc! { "id": "1" });
        users.delete_by_id("1").unwrap();

        assert_eq!(
            *seen.lock(),
            vec![CollectionEvents::Insert, CollectionEvents::Update, CollectionEvents::Remove]
        );

        users.unsubscribe(&subscriber).unwrap();
        assert_eq!(users.unsubscribe(&subscriber).unwrap_err().kind(), &ErrorKind::NotFound);
    }

    #[test]
    fn test_events_disabled() {
        let users = Collection::new("app", "users", DocumentSet::new(), Store::new(InMemoryStore::new()), None, false);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        users
            .subscribe(CollectionEventListener::new(move |_| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        users.insert(doc! {}).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let users = collection();
        users.insert(doc! { "id": "counter", "n": 0 }).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let users = users.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        users
                            .update_by_id("counter", &UpdateSpec::new().inc("n", 1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(users.find_by_id("counter").unwrap().get("n"), Some(Value::Int(800)));
    }
}
