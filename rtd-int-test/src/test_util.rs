use rtd::collection::{Collection, Document};
use rtd::doc;
use rtd::errors::{ErrorKind, RtdError, RtdResult};
use rtd::{Database, Rtd};
use std::any::Any;
use std::panic::{self, RefUnwindSafe};
use std::path::Path;
use std::time::{Duration, Instant};
use std::{env, fs, thread};

const ATTEMPTS: u32 = 3;

/// Runs a test between a setup and a teardown step.
///
/// A failing attempt is retried a few times before the test panics with the
/// last error, so a flaky filesystem does not fail the whole suite. Teardown
/// runs even when the test body fails.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> RtdResult<()> + RefUnwindSafe,
    B: Fn() -> RtdResult<TestContext> + RefUnwindSafe,
    A: Fn(TestContext) -> RtdResult<()> + RefUnwindSafe,
{
    let mut failures = Vec::new();

    for attempt in 1..=ATTEMPTS {
        let started = Instant::now();
        let outcome = panic::catch_unwind(|| run_once(&before, &test, &after))
            .unwrap_or_else(|payload| Err(format!("panicked: {}", panic_message(&*payload))));

        match outcome {
            Ok(()) => return,
            Err(reason) => {
                eprintln!(
                    "attempt {}/{} failed after {:?}: {}",
                    attempt,
                    ATTEMPTS,
                    started.elapsed(),
                    reason
                );
                failures.push(reason);
            }
        }

        if attempt < ATTEMPTS {
            thread::sleep(Duration::from_millis(50 * u64::from(attempt)));
        }
    }

    panic!(
        "test failed {} times, last failure: {}",
        ATTEMPTS,
        failures.pop().unwrap_or_default()
    );
}

fn run_once<T, B, A>(before: &B, test: &T, after: &A) -> Result<(), String>
where
    T: Fn(TestContext) -> RtdResult<()>,
    B: Fn() -> RtdResult<TestContext>,
    A: Fn(TestContext) -> RtdResult<()>,
{
    let ctx = before().map_err(|e| format!("setup: {}", e.message()))?;
    let tested = test(ctx.clone());
    let torn_down = after(ctx);

    tested.map_err(|e| format!("test: {:?}", e))?;
    torn_down.map_err(|e| format!("teardown: {}", e.message()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[derive(Clone)]
pub struct TestContext {
    path: String,
    db: Rtd,
}

impl TestContext {
    pub fn new(path: String, db: Rtd) -> Self {
        Self { path, db }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn db(&self) -> Rtd {
        self.db.clone()
    }

    /// The `app` database every context starts with.
    pub fn app(&self) -> RtdResult<Database> {
        self.db.database("app")
    }

    /// Opens a second engine over the same path, as a restarted process would.
    pub fn reopen(&self) -> RtdResult<Rtd> {
        self.db.close()?;
        open_engine(&self.path)
    }
}

pub fn random_path() -> String {
    let dir = env::temp_dir().join(format!("rtd-{}", uuid::Uuid::new_v4()));
    dir.to_string_lossy().into_owned()
}

#[cfg(feature = "file")]
fn open_engine(path: &str) -> RtdResult<Rtd> {
    Rtd::builder().file_store(path).open()
}

#[cfg(not(feature = "file"))]
fn open_engine(_path: &str) -> RtdResult<Rtd> {
    Err(RtdError::new(
        "In-memory engines cannot be reopened",
        ErrorKind::InternalError,
    ))
}

/// Opens a fresh engine with an empty `app` database.
pub fn create_test_context() -> RtdResult<TestContext> {
    let path = random_path();

    #[cfg(feature = "file")]
    let db = open_engine(&path)?;
    #[cfg(not(feature = "file"))]
    let db = Rtd::builder().in_memory().open()?;

    db.create_database("app")?;
    Ok(TestContext::new(path, db))
}

pub fn cleanup(ctx: TestContext) -> RtdResult<()> {
    // closing twice is fine, a test may already have closed the engine
    ctx.db().close()?;

    let path = ctx.path();
    if !Path::new(path).exists() {
        return Ok(());
    }
    fs::remove_dir_all(path).map_err(|e| {
        RtdError::new(
            &format!("Failed to remove test directory {}: {}", path, e),
            ErrorKind::IOError,
        )
    })
}

pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc! {
            "first_name": "fn1",
            "last_name": "ln1",
            "age": 31,
            "address": { "city": "Oslo", "zip": "0150" },
            "tags": ["admin", "user"],
            "body": "a quick brown fox jump over the lazy dog",
        },
        doc! {
            "first_name": "fn2",
            "last_name": "ln2",
            "age": 17,
            "address": { "city": "Bergen", "zip": "5003" },
            "tags": ["user"],
            "body": "quick hello world from rtd",
        },
        doc! {
            "first_name": "fn3",
            "last_name": "ln2",
            "age": 45.5,
            "tags": [],
            "body": "a lazy dog",
        },
    ]
}

pub fn insert_test_documents(collection: &Collection) -> RtdResult<Vec<Document>> {
    collection.insert_many(create_test_docs())
}
