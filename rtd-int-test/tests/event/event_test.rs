use rtd::collection::{CollectionEventListener, CollectionEvents};
use rtd::doc;
use rtd::errors::{ErrorKind, RtdError};
use rtd::filter::field;
use rtd::update::UpdateSpec;
use rtd::Rtd;
use rtd_int_test::test_util::{cleanup, create_test_context, run_test};
use std::sync::{Arc, Mutex};

type Recorded = Arc<Mutex<Vec<(CollectionEvents, String)>>>;

fn recorder() -> (Recorded, CollectionEventListener) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();
    let listener = CollectionEventListener::new(move |event| {
        let id = event.item().id()?.map(|id| id.to_string()).unwrap_or_default();
        sink.lock().unwrap().push((event.event_type(), id));
        Ok(())
    });
    (recorded, listener)
}

#[test]
fn test_events_follow_mutation_order() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            let (recorded, listener) = recorder();
            users.subscribe(listener)?;

            users.insert_many(vec![doc! { "id": "1", "n": 1 }, doc! { "id": "2", "n": 2 }])?;
            users.update_query(&field("n").gt(1), &UpdateSpec::new().inc("n", 1))?;
            users.delete_by_id("1")?;

            let recorded = recorded.lock().unwrap().clone();
            assert_eq!(
                recorded,
                vec![
                    (CollectionEvents::Insert, "1".to_string()),
                    (CollectionEvents::Insert, "2".to_string()),
                    (CollectionEvents::Update, "2".to_string()),
                    (CollectionEvents::Remove, "1".to_string()),
                ]
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_mutation_fires_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            users.insert(doc! { "id": "1" })?;
            let (recorded, listener) = recorder();
            users.subscribe(listener)?;

            assert!(users.insert(doc! { "id": "1" }).is_err());
            assert!(users.delete_by_id("missing").is_err());
            assert!(users.update_query(&field("n").eq(5), &UpdateSpec::new().set("x", 1))?.is_empty());
            assert!(recorded.lock().unwrap().is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unsubscribe() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            let (recorded, listener) = recorder();
            let subscription = users.subscribe(listener)?;

            users.insert(doc! { "id": "1" })?;
            users.unsubscribe(&subscription)?;
            users.insert(doc! { "id": "2" })?;

            assert_eq!(recorded.lock().unwrap().len(), 1);
            assert_eq!(users.unsubscribe(&subscription).unwrap_err().kind(), &ErrorKind::NotFound);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failing_listener_does_not_fail_mutation() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            users.subscribe(CollectionEventListener::new(|_| {
                Err(RtdError::new("listener failed", ErrorKind::InternalError))
            }))?;

            users.insert(doc! { "id": "1" })?;
            assert_eq!(users.count()?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_disabled_events() {
    let db = Rtd::builder().disable_events().open().expect("engine opens");
    let users = db
        .create_database("app")
        .and_then(|app| app.get_or_create_collection("users"))
        .expect("collection");
    let (recorded, listener) = recorder();
    users.subscribe(listener).expect("subscribe");

    users.insert(doc! { "id": "1" }).expect("insert");
    assert!(recorded.lock().unwrap().is_empty());
}
