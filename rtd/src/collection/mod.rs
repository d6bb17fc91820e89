//! Collections and the documents they hold.
//!
//! A [Document] is an ordered map of field names to [Value](crate::common::Value)s.
//! Nested fields are addressed with dotted paths such as `address.city` or
//! `tags.0`. Every stored document carries a string id in its `id` field;
//! documents inserted without one get a generated [DocumentId].
//!
//! ```rust
//! use rtd::doc;
//! use rtd::collection::Document;
//!
//! let mut document = doc! { "name": "Alice", "address": { "city": "Oslo" } };
//! document.put("address.zip", "0150").unwrap();
//! assert_eq!(document.get("address.city").unwrap().as_str(), Some("Oslo"));
//! ```
//!
//! A [Collection] is a named set of documents inside a database. It answers
//! filter queries from a snapshot and serializes mutations through a per
//! collection gate, announcing committed changes to subscribed listeners.

#[allow(clippy::module_inception)]
mod collection;
mod document;
mod document_id;
mod document_set;
mod event;
pub(crate) mod snowflake;

pub use collection::*;
pub use document::*;
pub use document_id::*;
pub use document_set::*;
pub use event::*;
