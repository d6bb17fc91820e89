use rtd::doc;
use rtd::errors::{Entity, ErrorKind};
use rtd::filter::all;
use rtd_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_create_database_twice() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.create_database("shop")?;
            let err = db.create_database("shop").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::AlreadyExists);
            assert_eq!(err.entity(), Some(&Entity::Database("shop".to_string())));
            assert_eq!(db.database_names()?, vec!["app".to_string(), "shop".to_string()]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_get_missing_database() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let err = db.database("ghost").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotFound);
            assert_eq!(err.entity(), Some(&Entity::Database("ghost".to_string())));
            assert!(err.to_string().contains("ghost"));

            let err = db.find_document("ghost", "users", "1").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotFound);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_database_cascades() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let app = ctx.app()?;
            let users = app.get_or_create_collection("users")?;
            users.insert(doc! { "id": "1" })?;
            app.insert("orders", doc! { "id": "2" })?;

            db.delete_database("app")?;
            assert!(!db.has_database("app"));
            assert_eq!(db.find_document("app", "users", "1").unwrap_err().kind(), &ErrorKind::NotFound);
            assert_eq!(db.find_document("app", "orders", "2").unwrap_err().kind(), &ErrorKind::NotFound);

            // stale handles are invalidated
            assert_eq!(app.query("users", &all()).unwrap_err().kind(), &ErrorKind::NotFound);
            assert_eq!(users.insert(doc! {}).unwrap_err().kind(), &ErrorKind::Conflict);
            assert_eq!(db.delete_database("app").unwrap_err().kind(), &ErrorKind::NotFound);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_recreate_deleted_database_is_empty() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert_document("app", "users", doc! { "id": "1" })?;
            db.delete_database("app")?;

            let app = db.create_database("app")?;
            assert!(app.collection_names()?.is_empty());
            assert!(db.query("app", "users", &doc! {})?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_closed_engine() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let app = ctx.app()?;
            db.close()?;

            assert_eq!(db.create_database("x").unwrap_err().kind(), &ErrorKind::StoreClosed);
            assert_eq!(app.insert("users", doc! {}).unwrap_err().kind(), &ErrorKind::StoreClosed);
            Ok(())
        },
        cleanup,
    )
}
