use crate::collection::{Document, DocumentSet};
use crate::common::{validate_name, COLLECTION_FILE_EXTENSION, TEMP_FILE_SUFFIX};
use crate::errors::{ErrorKind, RtdError, RtdResult};
use crate::store::{StoreProvider, StoredCollection, StoredDatabase};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A store persisting every collection as a JSON file.
///
/// Layout under the root directory:
///
/// ```text
/// <root>/<database>/<collection>.json
/// ```
///
/// Each file holds the collection's documents as a JSON array, in insertion
/// order. A write goes to `<collection>.json.tmp`, is flushed and fsynced, then
/// renamed over the live file, so a crash leaves either the old or the new
/// contents and never a torn file. Leftover temp files are discarded on open.
///
/// Every mutation rewrites the whole collection file.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

struct FileStoreInner {
    root: PathBuf,
    closed: AtomicBool,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore {
            inner: Arc::new(FileStoreInner {
                root: root.into(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn database_dir(&self, database: &str) -> PathBuf {
        self.inner.root.join(database)
    }

    fn collection_file(&self, database: &str, collection: &str) -> PathBuf {
        self.database_dir(database)
            .join(format!("{}.{}", collection, COLLECTION_FILE_EXTENSION))
    }

    fn check_opened(&self) -> RtdResult<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            log::error!("File store at {} is closed", self.inner.root.display());
            return Err(RtdError::new("Store is closed", ErrorKind::StoreClosed));
        }
        Ok(())
    }

    fn load_database(&self, name: &str, dir: &Path) -> RtdResult<StoredDatabase> {
        let mut collections = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| io_error("read database directory", dir, e))? {
            let entry = entry.map_err(|e| io_error("read database directory", dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.ends_with(TEMP_FILE_SUFFIX) {
                // an interrupted write, the live file is still intact
                log::warn!("Discarding incomplete write {}", path.display());
                if let Err(err) = fs::remove_file(&path) {
                    log::warn!("Failed to remove {}: {}", path.display(), err);
                }
                continue;
            }

            if path.extension().and_then(|ext| ext.to_str()) != Some(COLLECTION_FILE_EXTENSION) {
                continue;
            }

            let collection = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) if validate_name("Collection", stem).is_ok() => stem.to_string(),
                _ => {
                    log::warn!("Skipping unrecognized file {}", path.display());
                    continue;
                }
            };

            let bytes = fs::read(&path).map_err(|e| io_error("read collection file", &path, e))?;
            let documents: Vec<Document> = serde_json::from_slice(&bytes).map_err(|e| {
                log::error!("Corrupt collection file {}: {}", path.display(), e);
                RtdError::new_with_cause(
                    &format!("Corrupt collection file {}", path.display()),
                    ErrorKind::EncodingError,
                    e.into(),
                )
            })?;
            log::debug!("Loaded {} documents from {}", documents.len(), path.display());
            collections.push(StoredCollection {
                name: collection,
                documents,
            });
        }

        collections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(StoredDatabase {
            name: name.to_string(),
            collections,
        })
    }
}

impl StoreProvider for FileStore {
    fn open(&self) -> RtdResult<Vec<StoredDatabase>> {
        let root = &self.inner.root;
        fs::create_dir_all(root).map_err(|e| io_error("create store directory", root, e))?;

        let mut databases = Vec::new();
        for entry in fs::read_dir(root).map_err(|e| io_error("read store directory", root, e))? {
            let entry = entry.map_err(|e| io_error("read store directory", root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if validate_name("Database", &name).is_err() {
                log::warn!("Skipping unrecognized directory {}", path.display());
                continue;
            }
            databases.push(self.load_database(&name, &path)?);
        }

        databases.sort_by(|a, b| a.name.cmp(&b.name));
        self.inner.closed.store(false, Ordering::Release);
        log::info!(
            "Opened file store at {} with {} database(s)",
            root.display(),
            databases.len()
        );
        Ok(databases)
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn create_database(&self, database: &str) -> RtdResult<()> {
        self.check_opened()?;
        let dir = self.database_dir(database);
        fs::create_dir_all(&dir).map_err(|e| io_error("create database directory", &dir, e))?;
        sync_dir(&self.inner.root);
        Ok(())
    }

    fn drop_database(&self, database: &str) -> RtdResult<()> {
        self.check_opened()?;
        let dir = self.database_dir(database);
        match fs::remove_dir_all(&dir) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("remove database directory", &dir, e)),
        }
        sync_dir(&self.inner.root);
        Ok(())
    }

    fn write_collection(
        &self,
        database: &str,
        collection: &str,
        documents: &DocumentSet,
    ) -> RtdResult<()> {
        self.check_opened()?;
        let dir = self.database_dir(database);
        let target = self.collection_file(database, collection);
        let temp = dir.join(format!(
            "{}.{}{}",
            collection, COLLECTION_FILE_EXTENSION, TEMP_FILE_SUFFIX
        ));

        let result = write_temp(&temp, documents).and_then(|_| {
            fs::rename(&temp, &target).map_err(|e| io_error("replace collection file", &target, e))
        });

        if let Err(err) = result {
            if let Err(e) = fs::remove_file(&temp) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove {}: {}", temp.display(), e);
                }
            }
            return Err(err);
        }

        sync_dir(&dir);
        Ok(())
    }

    fn drop_collection(&self, database: &str, collection: &str) -> RtdResult<()> {
        self.check_opened()?;
        let file = self.collection_file(database, collection);
        match fs::remove_file(&file) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("remove collection file", &file, e)),
        }
        sync_dir(&self.database_dir(database));
        Ok(())
    }

    fn close(&self) -> RtdResult<()> {
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }
}

fn write_temp(temp: &Path, documents: &DocumentSet) -> RtdResult<()> {
    let file = File::create(temp).map_err(|e| io_error("create temp file", temp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, documents)?;
    writer
        .flush()
        .map_err(|e| io_error("flush temp file", temp, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| io_error("sync temp file", temp, e))
}

/// Makes a rename or unlink inside `dir` durable.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Err(err) = File::open(dir).and_then(|d| d.sync_all()) {
            log::warn!("Failed to sync directory {}: {}", dir.display(), err);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> RtdError {
    log::error!("Failed to {} {}: {}", action, path.display(), err);
    RtdError::new_with_cause(
        &format!("Failed to {} {}", action, path.display()),
        ErrorKind::IOError,
        err.into(),
    )
}
