//! Data generators for benchmarks

use rand::seq::SliceRandom;
use rand::Rng;
use rtd::collection::Document;
use rtd::doc;

const FIRST_NAMES: &[&str] = &["Ada", "Brian", "Chen", "Dagny", "Emeka", "Farah", "Goran", "Hana"];
const CITIES: &[&str] = &["Oslo", "Lagos", "Lima", "Osaka", "Perth", "Quito"];

/// Generate simple documents for CRUD benchmarks
pub fn generate_simple_docs(count: usize) -> Vec<Document> {
    (0..count).map(generate_single_doc).collect()
}

/// Generate a single document; `seq` is stored as a plain field, the id is
/// left to the engine.
pub fn generate_single_doc(seq: usize) -> Document {
    let mut rng = rand::thread_rng();
    let first_name = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Ada");
    let city = CITIES.choose(&mut rng).copied().unwrap_or("Oslo");
    let age: i64 = rng.gen_range(18..80);
    let salary: f64 = rng.gen_range(30000.0..200000.0);

    doc! {
        "seq": seq,
        "first_name": first_name,
        "email": (format!("user{}@example.com", seq)),
        "age": age,
        "salary": salary,
        "active": (rng.gen_bool(0.8)),
        "address": { "city": city },
    }
}
