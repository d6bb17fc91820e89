//! # rtd
//!
//! An embedded document database engine. An [Rtd] engine owns a registry of
//! named databases; each database owns named collections of schemaless JSON-like
//! documents. Collections answer filter queries and apply partial updates, and
//! every mutation is serialized per collection and made durable before it
//! becomes visible.
//!
//! ## Quick start
//!
//! ```rust
//! use rtd::{doc, Rtd};
//! use rtd::filter::field;
//! use rtd::update::UpdateSpec;
//!
//! let db = Rtd::builder().in_memory().open().unwrap();
//! let app = db.create_database("app").unwrap();
//!
//! // collections are created by the first insert
//! let alice = app.insert("users", doc! { "name": "Alice", "age": 30 }).unwrap();
//! app.insert("users", doc! { "name": "Bob", "age": 17 }).unwrap();
//!
//! let adults = app.query("users", &field("age").gte(18)).unwrap();
//! assert_eq!(adults, vec![alice]);
//!
//! let updated = app
//!     .update_query("users", &field("name").eq("Bob"), &UpdateSpec::new().inc("age", 1))
//!     .unwrap();
//! assert_eq!(updated[0].get("age").unwrap().as_i64(), Some(&18));
//! ```
//!
//! ## Modules
//!
//! - [collection]: documents, ids, collections and change events
//! - [filter]: filter expressions, parsed or built fluently
//! - [update]: update specs
//! - [store]: durability backends
//! - [errors]: the error type shared by every operation

use crate::collection::snowflake::SnowflakeIdGenerator;
use std::sync::LazyLock;

pub mod collection;
pub mod common;
pub mod errors;
pub mod filter;
pub mod store;
pub mod update;

mod database;
mod rtd;
mod rtd_builder;
mod rtd_config;

pub use database::Database;
pub use rtd::Rtd;
pub use rtd_builder::RtdBuilder;
pub use rtd_config::RtdConfig;

pub(crate) static ID_GENERATOR: LazyLock<SnowflakeIdGenerator> =
    LazyLock::new(SnowflakeIdGenerator::new);
