//! Engine configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::Shared;
use crate::errors::{ErrorKind, RtdError, RtdResult};
use crate::store::{InMemoryStore, Store};

/// Settings of an [Rtd](crate::Rtd) engine.
///
/// A config is assembled by [RtdBuilder](crate::RtdBuilder) and frozen when the
/// engine opens; later attempts to change it fail with
/// [ErrorKind::ConfigError].
///
/// | setting | default |
/// |---------|---------|
/// | store | [InMemoryStore] |
/// | gate timeout | none, mutations wait for the gate indefinitely |
/// | events | enabled |
#[derive(Clone)]
pub struct RtdConfig {
    inner: Arc<RtdConfigInner>,
}

impl Default for RtdConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RtdConfig {
    pub fn new() -> Self {
        RtdConfig {
            inner: Arc::new(RtdConfigInner::new()),
        }
    }

    pub fn store(&self) -> RtdResult<Store> {
        self.inner.store()
    }

    pub fn set_store(&self, store: Store) -> RtdResult<()> {
        self.inner.set_store(store)
    }

    /// How long a mutation waits for its collection's gate. `None` waits forever.
    pub fn gate_timeout(&self) -> Option<Duration> {
        self.inner.gate_timeout()
    }

    pub fn set_gate_timeout(&self, timeout: Option<Duration>) -> RtdResult<()> {
        self.inner.set_gate_timeout(timeout)
    }

    pub fn events_enabled(&self) -> bool {
        self.inner.events_enabled()
    }

    pub fn set_events_enabled(&self, enabled: bool) -> RtdResult<()> {
        self.inner.set_events_enabled(enabled)
    }

    pub fn is_configured(&self) -> bool {
        self.inner.configured.load(Ordering::Acquire)
    }

    /// Fills in defaults and freezes the configuration.
    pub(crate) fn auto_configure(&self) -> RtdResult<()> {
        self.inner.auto_configure()
    }
}

struct RtdConfigInner {
    store: Shared<Option<Store>>,
    gate_timeout: Shared<Option<Duration>>,
    events_enabled: AtomicBool,
    configured: AtomicBool,
}

impl RtdConfigInner {
    fn new() -> Self {
        RtdConfigInner {
            store: Shared::new(None),
            gate_timeout: Shared::new(None),
            events_enabled: AtomicBool::new(true),
            configured: AtomicBool::new(false),
        }
    }

    fn check_not_configured(&self, setting: &str) -> RtdResult<()> {
        if self.configured.load(Ordering::Acquire) {
            log::error!("Cannot change {} after the engine is opened", setting);
            return Err(RtdError::new(
                &format!("Cannot change {} after the engine is opened", setting),
                ErrorKind::ConfigError,
            ));
        }
        Ok(())
    }

    fn store(&self) -> RtdResult<Store> {
        self.store.read_with(|store| match store {
            Some(store) => Ok(store.clone()),
            None => {
                log::error!("No store is configured");
                Err(RtdError::new("No store is configured", ErrorKind::ConfigError))
            }
        })
    }

    fn set_store(&self, store: Store) -> RtdResult<()> {
        self.check_not_configured("store")?;
        self.store.write_with(|current| {
            if current.is_some() {
                log::error!("A store is already configured");
                return Err(RtdError::new(
                    "A store is already configured",
                    ErrorKind::ConfigError,
                ));
            }
            *current = Some(store);
            Ok(())
        })
    }

    fn gate_timeout(&self) -> Option<Duration> {
        self.gate_timeout.read_with(|timeout| *timeout)
    }

    fn set_gate_timeout(&self, timeout: Option<Duration>) -> RtdResult<()> {
        self.check_not_configured("gate timeout")?;
        self.gate_timeout.write_with(|current| *current = timeout);
        Ok(())
    }

    fn events_enabled(&self) -> bool {
        self.events_enabled.load(Ordering::Acquire)
    }

    fn set_events_enabled(&self, enabled: bool) -> RtdResult<()> {
        self.check_not_configured("events")?;
        self.events_enabled.store(enabled, Ordering::Release);
        Ok(())
    }

    fn auto_configure(&self) -> RtdResult<()> {
        self.check_not_configured("configuration")?;
        self.store.write_with(|store| {
            if store.is_none() {
                log::debug!("No store configured, using in-memory store");
                *store = Some(Store::new(InMemoryStore::new()));
            }
        });
        self.configured.store(true, Ordering::Release);
        Ok(())
    }
}
