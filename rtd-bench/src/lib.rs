//! Benchmark helpers for the rtd engine: data generators and engine factories
//! for the in-memory and file-backed stores.

pub mod data_gen;
pub mod stores;
