use rtd::doc;
use rtd::errors::{Entity, ErrorKind};
use rtd::filter::{all, field};
use rtd::update::UpdateSpec;
use rtd_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_duplicate_id_on_insert() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            app.insert("users", doc! { "id": "1", "v": 1 })?;

            let err = app.insert("users", doc! { "id": "1", "v": 2 }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::DuplicateId);
            assert_eq!(
                err.entity(),
                Some(&Entity::Document {
                    database: "app".to_string(),
                    collection: "users".to_string(),
                    id: "1".to_string(),
                })
            );
            assert_eq!(app.find("users", "1")?.get("v"), Some(rtd::common::Value::from(1)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_many_is_all_or_nothing() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            users.insert(doc! { "id": "taken" })?;

            let batch = vec![doc! { "id": "a" }, doc! { "id": "b" }, doc! { "id": "taken" }];
            let err = users.insert_many(batch).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::DuplicateId);
            assert_eq!(users.count()?, 1);

            let batch = vec![doc! { "id": "x" }, doc! { "id": "x" }];
            assert_eq!(users.insert_many(batch).unwrap_err().kind(), &ErrorKind::DuplicateId);
            assert_eq!(users.count()?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_ids() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            let err = app.insert("users", doc! { "id": 42 }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidId);
            let err = app.insert("users", doc! { "id": "" }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidId);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missing_document() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            app.insert("users", doc! { "id": "1" })?;

            for err in [
                app.find("users", "2").unwrap_err(),
                app.update("users", "2", &UpdateSpec::new().set("a", 1)).unwrap_err(),
                app.delete("users", "2").unwrap_err(),
            ] {
                assert_eq!(err.kind(), &ErrorKind::NotFound);
                assert!(matches!(err.entity(), Some(Entity::Document { id, .. }) if id == "2"));
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_twice() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            app.insert("users", doc! { "id": "1" })?;
            app.delete("users", "1")?;
            assert_eq!(app.delete("users", "1").unwrap_err().kind(), &ErrorKind::NotFound);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missing_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            assert!(app.query("ghost", &all())?.is_empty());
            assert!(app.update_query("ghost", &field("a").eq(1), &UpdateSpec::new().set("a", 2))?.is_empty());

            let err = app.find("ghost", "1").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotFound);
            assert!(matches!(err.entity(), Some(Entity::Collection { collection, .. }) if collection == "ghost"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_documents() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            let mut document = doc! { "a": 1 };
            document.put("nested", doc! {})?;
            // empty keys cannot be addressed by a path
            let bad = rtd::collection::Document::from_json(r#"{"": 1}"#)?;
            assert_eq!(app.insert("users", bad).unwrap_err().kind(), &ErrorKind::InvalidDocument);
            app.insert("users", document)?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_names() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            for name in ["", "a/b", "..", "with space"] {
                assert_eq!(db.create_database(name).unwrap_err().kind(), &ErrorKind::InvalidName);
            }
            let err = ctx.app()?.get_or_create_collection("a\\b").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidName);
            Ok(())
        },
        cleanup,
    )
}
