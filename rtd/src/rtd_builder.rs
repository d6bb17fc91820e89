use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{RtdError, RtdResult};
use crate::rtd::Rtd;
use crate::rtd_config::RtdConfig;
use crate::store::{FileStore, InMemoryStore, Store, StoreProvider};

/// Fluent builder for an [Rtd] engine.
///
/// The first configuration error is kept and returned from [RtdBuilder::open];
/// later settings are ignored once an error was captured.
///
/// ```rust
/// use std::time::Duration;
/// use rtd::Rtd;
///
/// let db = Rtd::builder()
///     .in_memory()
///     .gate_timeout(Duration::from_secs(5))
///     .open()
///     .unwrap();
/// assert_eq!(db.config().gate_timeout(), Some(Duration::from_secs(5)));
/// ```
#[derive(Default)]
pub struct RtdBuilder {
    error: Option<RtdError>,
    config: RtdConfig,
}

impl RtdBuilder {
    pub fn new() -> Self {
        RtdBuilder {
            error: None,
            config: RtdConfig::new(),
        }
    }

    /// Keeps everything in memory. This is the default.
    pub fn in_memory(self) -> Self {
        self.store(InMemoryStore::new())
    }

    /// Persists every collection as a JSON file under `path`.
    pub fn file_store(self, path: impl Into<PathBuf>) -> Self {
        self.store(FileStore::new(path))
    }

    /// Uses a custom storage backend.
    pub fn store<T: StoreProvider + 'static>(self, provider: T) -> Self {
        let store = Store::new(provider);
        self.apply(|config| config.set_store(store))
    }

    pub fn gate_timeout(self, timeout: Duration) -> Self {
        self.apply(|config| config.set_gate_timeout(Some(timeout)))
    }

    /// Turns off change events; subscribed listeners are never called.
    pub fn disable_events(self) -> Self {
        self.apply(|config| config.set_events_enabled(false))
    }

    pub fn open(self) -> RtdResult<Rtd> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Rtd::open(self.config)
    }

    fn apply(mut self, setting: impl FnOnce(&RtdConfig) -> RtdResult<()>) -> Self {
        if self.error.is_none() {
            if let Err(e) = setting(&self.config) {
                self.error = Some(e);
            }
        }
        self
    }
}
