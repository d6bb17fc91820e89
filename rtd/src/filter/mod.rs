//! Query filters over documents.
//!
//! A filter is a total predicate: evaluating it against any document yields
//! `true` or `false`, never an error. Filters are either parsed from a filter
//! document ([Filter::parse]) or built with the fluent API ([field]).
//!
//! # Filter documents
//!
//! | form | meaning |
//! |------|---------|
//! | `{"a": v}` | `a` is present and equals `v` |
//! | `{"a.b": v}` | path into nested documents |
//! | `{"a": {"$gt": v}}` | `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte` |
//! | `{"a": {"$exists": true}}` | field presence |
//! | `{"a": {"$in": [..]}}` | `$in`, `$nin` membership |
//! | `{"a": {"$contains": v}}` | array element or substring |
//! | `{"a": {"$regex": "^x"}}` | regular expression on strings |
//! | `{"$and": [..]}` | `$and`, `$or` over filter documents |
//! | `{"$not": {..}}` | negation |
//!
//! Several top-level keys are AND-ed together. An empty filter matches every
//! document.

#[allow(clippy::module_inception)]
mod filter;
mod fluent;
mod parser;

mod basic_filters;
mod logical_filters;
mod pattern_filters;
mod range_filters;

pub(crate) use basic_filters::*;
pub use filter::*;
pub use fluent::*;
pub(crate) use logical_filters::*;
pub(crate) use pattern_filters::*;
pub(crate) use range_filters::*;
