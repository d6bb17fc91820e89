//! Engine factory functions for benchmarks

use rtd::collection::Collection;
use rtd::errors::RtdResult;
use rtd::Rtd;
use std::sync::Once;
use tempfile::TempDir;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// An open engine with an empty `bench` database. A file-backed engine
/// removes its directory when dropped.
pub struct BenchContext {
    db: Rtd,
    _dir: Option<TempDir>,
}

impl BenchContext {
    pub fn db(&self) -> &Rtd {
        &self.db
    }

    pub fn collection(&self, name: &str) -> RtdResult<Collection> {
        self.db.database("bench")?.get_or_create_collection(name)
    }
}

impl Drop for BenchContext {
    fn drop(&mut self) {
        let _ = self.db.close();
    }
}

/// Create an in-memory engine
pub fn create_inmemory_db() -> RtdResult<BenchContext> {
    init_logger();
    let db = Rtd::builder().in_memory().open()?;
    db.create_database("bench")?;
    Ok(BenchContext { db, _dir: None })
}

/// Create a file-backed engine in a fresh temp directory
pub fn create_file_db() -> RtdResult<BenchContext> {
    init_logger();
    let dir = tempfile::tempdir()?;
    let db = Rtd::builder().file_store(dir.path()).open()?;
    log::debug!("Opened file-backed bench engine at {:?}", dir.path());
    db.create_database("bench")?;
    Ok(BenchContext { db, _dir: Some(dir) })
}
