use crate::common::COLLECTION_EVENT;
use crate::errors::{ErrorKind, RtdError, RtdResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle returned by a subscription, used to unsubscribe later.
///
/// A handle can be unsubscribed once; a second attempt reports `NotFound`.
pub struct SubscriberRef {
    inner: HandlerId,
    active: AtomicBool,
}

impl SubscriberRef {
    fn new(inner: HandlerId) -> Self {
        SubscriberRef {
            inner,
            active: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Dispatches events of type `E` to listeners of type `L`.
///
/// Publishing is synchronous: [RtdEventBus::publish] returns once every
/// listener has seen the event. Listener ordering within one publish is not
/// specified.
pub struct RtdEventBus<E, L> {
    inner: Arc<RtdEventBusInner<E, L>>,
}

impl<E, L> Clone for RtdEventBus<E, L> {
    fn clone(&self) -> Self {
        RtdEventBus {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, L> Default for RtdEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> RtdEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        RtdEventBus {
            inner: Arc::new(RtdEventBusInner {
                event_bus: EventBus::new(),
                phantom_data: PhantomData,
            }),
        }
    }

    pub fn register(&self, listener: L) -> RtdResult<SubscriberRef> {
        self.inner
            .event_bus
            .subscribe(COLLECTION_EVENT, Box::new(listener))
            .map(SubscriberRef::new)
            .map_err(to_rtd_error)
    }

    /// Removes a listener. Fails with `NotFound` if the handle was already
    /// unsubscribed.
    pub fn deregister(&self, subscriber: &SubscriberRef) -> RtdResult<()> {
        if !subscriber.active.swap(false, Ordering::AcqRel) {
            log::error!("Subscriber is not registered");
            return Err(RtdError::new("Subscriber is not registered", ErrorKind::NotFound));
        }
        self.inner
            .event_bus
            .unsubscribe(COLLECTION_EVENT, &subscriber.inner)
            .map(|_| ())
            .map_err(to_rtd_error)
    }

    pub fn publish(&self, event: E) -> RtdResult<()> {
        // fast path: nothing to notify
        if !self.has_listeners() {
            return Ok(());
        }
        self.inner
            .event_bus
            .publish(COLLECTION_EVENT, &Event::new(event))
            .map(|_| ())
            .map_err(to_rtd_error)
    }

    pub fn has_listeners(&self) -> bool {
        match self.inner.event_bus.get_handler_count(COLLECTION_EVENT) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to count event listeners: {}", e);
                false
            }
        }
    }

    /// Drops every listener.
    pub fn close(&self) -> RtdResult<()> {
        self.inner.event_bus.clear().map(|_| ()).map_err(to_rtd_error)
    }
}

struct RtdEventBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

fn to_rtd_error(e: BasuError) -> RtdError {
    let message = match e {
        BasuError::EventTypeNotFOUND => "No listener was ever registered on this event bus".to_string(),
        BasuError::MutexPoisoned => "Event bus lock is poisoned".to_string(),
        BasuError::HandlerError(e) => format!("Event listener failed: {}", e),
    };
    log::error!("{}", message);
    RtdError::new(&message, ErrorKind::EventError)
}
