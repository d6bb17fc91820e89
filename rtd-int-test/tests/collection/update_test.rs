use rtd::common::Value;
use rtd::doc;
use rtd::errors::ErrorKind;
use rtd::filter::{all, field};
use rtd::update::UpdateSpec;
use rtd_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

#[test]
fn test_update_query_returns_post_update_state() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            insert_test_documents(&users)?;

            let update = UpdateSpec::new().set("status", "checked").inc("age", 1);
            let updated = users.update_query(&field("last_name").eq("ln2"), &update)?;
            assert_eq!(updated.len(), 2);
            assert_eq!(updated[0].get("age"), Some(Value::from(18)));
            assert_eq!(updated[1].get("age"), Some(Value::from(46.5)));
            assert!(updated.iter().all(|d| d.get("status") == Some(Value::from("checked"))));

            assert_eq!(users.query(&field("status").exists())?, updated);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_zero_matches() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            insert_test_documents(&users)?;
            let updated = users.update_query(&field("age").gt(100), &UpdateSpec::new().set("x", 1))?;
            assert!(updated.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nested_update_creates_intermediates() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            app.insert("users", doc! { "id": "1" })?;

            let update = UpdateSpec::parse(&doc! { "$set": { "profile": { "name": "a" } } })?;
            app.update("users", "1", &update)?;
            let update = UpdateSpec::new().set("settings.theme.color", "dark");
            let updated = app.update("users", "1", &update)?;

            assert_eq!(updated.get("profile.name"), Some(Value::from("a")));
            assert_eq!(updated.get("settings.theme.color"), Some(Value::from("dark")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unset_and_push() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            app.insert("users", doc! { "id": "1", "tmp": true, "tags": ["a"] })?;

            let update = UpdateSpec::parse(&doc! { "$unset": ["tmp"], "$push": { "tags": "b" } })?;
            let updated = app.update("users", "1", &update)?;
            assert!(!updated.contains_field("tmp"));
            assert_eq!(updated.get("tags"), Some(Value::from_vec(vec!["a", "b"])));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_id_is_immutable() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let stored = db.insert_document("app", "users", doc! { "id": "1", "name": "a" })?;
            let before = stored.to_bytes()?;

            for update in [
                doc! { "id": "2" },
                doc! { "name": "b", "id": "2" },
                doc! { "$set": { "id": "2" } },
                doc! { "$unset": "id" },
            ] {
                let err = db.update_document("app", "users", "1", &update).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::ImmutableField, "update {}", update);

                let err = db.update_query("app", "users", &doc! {}, &update).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::ImmutableField, "update {}", update);
            }

            assert_eq!(db.find_document("app", "users", "1")?.to_bytes()?, before);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_assignment_leaves_collection_untouched() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            users.insert(doc! { "id": "1", "n": 1 })?;
            users.insert(doc! { "id": "2", "n": "text" })?;
            let before = users.all()?;

            // the second document cannot be incremented, so neither is
            let err = users
                .update_query(&all(), &UpdateSpec::new().set("touched", true).inc("n", 1))
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidUpdate);
            assert!(err.message().contains("$inc"));
            assert_eq!(users.all()?, before);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_malformed_updates() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.insert_document("app", "users", doc! { "id": "1" })?;
            for update in [
                doc! {},
                doc! { "$rename": { "a": "b" } },
                doc! { "$set": { "a": 1 }, "plain": 2 },
                doc! { "$inc": { "a": "x" } },
            ] {
                let err = db.update_document("app", "users", "1", &update).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::InvalidUpdate, "update {}", update);
            }
            Ok(())
        },
        cleanup,
    )
}
