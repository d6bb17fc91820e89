use crate::collection::Document;
use crate::common::epoch_millis;
use crate::errors::RtdResult;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::Debug;
use std::sync::Arc;

/// The kind of change a collection event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEvents {
    Insert,
    Update,
    Remove,
}

/// Describes one committed change to a collection.
///
/// For `Insert` and `Update` the item is the document as stored after the
/// change; for `Remove` it is the document that was removed.
#[derive(Clone)]
pub struct CollectionEventInfo {
    inner: Arc<CollectionEventInner>,
}

struct CollectionEventInner {
    event_type: CollectionEvents,
    database: String,
    collection: String,
    item: Document,
    timestamp: u64,
}

impl CollectionEventInfo {
    pub fn new(event_type: CollectionEvents, database: &str, collection: &str, item: Document) -> Self {
        CollectionEventInfo {
            inner: Arc::new(CollectionEventInner {
                event_type,
                database: database.to_string(),
                collection: collection.to_string(),
                item,
                timestamp: epoch_millis(),
            }),
        }
    }

    pub fn event_type(&self) -> CollectionEvents {
        self.inner.event_type
    }

    pub fn database(&self) -> &str {
        &self.inner.database
    }

    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    pub fn item(&self) -> &Document {
        &self.inner.item
    }

    pub fn timestamp(&self) -> u64 {
        self.inner.timestamp
    }
}

impl Debug for CollectionEventInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventInfo")
            .field("event_type", &self.event_type())
            .field("database", &self.database())
            .field("collection", &self.collection())
            .field("item", self.item())
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

pub trait CollectionEventCallback: Send + Sync + Fn(CollectionEventInfo) -> RtdResult<()> {}

impl<F> CollectionEventCallback for F where
    F: Send + Sync + Fn(CollectionEventInfo) -> RtdResult<()>
{
}

/// A subscriber to collection events.
///
/// # Examples
///
/// ```rust,ignore
/// let listener = CollectionEventListener::new(|event| {
///     println!("{:?} {}", event.event_type(), event.item());
///     Ok(())
/// });
/// let subscription = collection.subscribe(listener)?;
/// ```
#[derive(Clone)]
pub struct CollectionEventListener {
    on_event: Arc<dyn CollectionEventCallback>,
}

impl CollectionEventListener {
    pub fn new(on_event: impl CollectionEventCallback + 'static) -> Self {
        CollectionEventListener {
            on_event: Arc::new(on_event),
        }
    }

}

impl Handle<CollectionEventInfo> for CollectionEventListener {
    fn handle(&self, event: &Event<CollectionEventInfo>) -> Result<(), BasuError> {
        // a failing listener is logged and never reaches the other listeners
        if let Err(err) = (self.on_event)(event.data.clone()) {
            log::warn!(
                "Event listener failed on {:?} in {}/{}: {}",
                event.data.event_type(),
                event.data.database(),
                event.data.collection(),
                err.message()
            );
        }
        Ok(())
    }
}

impl Debug for CollectionEventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventListener").finish()
    }
}
