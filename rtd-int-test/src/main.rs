use rand::Rng;
use rtd::doc;
use rtd::errors::RtdResult;
use rtd::filter::{all, field};
use rtd::update::UpdateSpec;
use rtd_int_test::test_util::{cleanup, create_test_context};
use std::sync::{Arc, Barrier};
use std::thread;

fn main() -> RtdResult<()> {
    colog::init();
    println!("Starting stress test...");
    let ctx = create_test_context()?;
    let records = ctx.app()?.get_or_create_collection("records")?;

    let count = 10_000;
    let mut rng = rand::thread_rng();
    let start = std::time::Instant::now();
    let batch = (0..count)
        .map(|_| {
            doc! {
                "first_name": (uuid::Uuid::new_v4().to_string()),
                "last_name": (uuid::Uuid::new_v4().to_string()),
                "score": (rng.gen_range(0..100)),
                "processed": false,
            }
        })
        .collect();
    records.insert_many(batch)?;
    println!("Inserted {} records in {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    let high = records.query(&field("score").gte(50))?;
    println!("Found {} high scores in {:?}", high.len(), start.elapsed());

    let start = std::time::Instant::now();
    let updated = records.update_query(&all(), &UpdateSpec::new().set("processed", true))?;
    println!("Updated {} records in {:?}", updated.len(), start.elapsed());

    let threads = 8;
    let increments = 200;
    records.insert(doc! { "id": "counter", "value": 0 })?;
    let barrier = Arc::new(Barrier::new(threads));
    let start = std::time::Instant::now();
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let records = records.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> RtdResult<()> {
                barrier.wait();
                for _ in 0..increments {
                    records.update_by_id("counter", &UpdateSpec::new().inc("value", 1))?;
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        if let Ok(result) = handle.join() {
            result?;
        }
    }
    let counter = records.find_by_id("counter")?;
    println!(
        "Counter reached {:?} after {} concurrent increments in {:?}",
        counter.get("value"),
        threads * increments,
        start.elapsed()
    );

    cleanup(ctx)?;
    println!("Stress test finished");
    Ok(())
}
