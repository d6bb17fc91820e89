//! Update specifications and their application to documents.

mod update_spec;

pub use update_spec::*;
