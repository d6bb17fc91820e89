//! Durability backends.
//!
//! The engine talks to storage through [StoreProvider]. Two providers ship
//! with the crate: [InMemoryStore] for ephemeral use and tests, and
//! [FileStore], which keeps one JSON file per collection on disk.

mod file;
mod memory;
#[allow(clippy::module_inception)]
mod store;

pub use file::*;
pub use memory::*;
pub use store::*;
