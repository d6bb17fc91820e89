use rtd::common::Value;
use rtd::doc;
use rtd::filter::{all, field};
use rtd::update::UpdateSpec;
use rtd_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

#[cfg(feature = "file")]
#[test]
fn test_state_survives_reopen() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            let users = app.get_or_create_collection("users")?;
            insert_test_documents(&users)?;
            users.update_query(&field("age").lt(18), &UpdateSpec::new().set("minor", true))?;
            users.delete_query(&field("first_name").eq("fn3"))?;
            app.insert("orders", doc! { "id": "o1", "total": 10 })?;
            ctx.db().create_database("empty")?;

            let reopened = ctx.reopen()?;
            assert_eq!(
                reopened.database_names()?,
                vec!["app".to_string(), "empty".to_string()]
            );
            let app = reopened.database("app")?;
            assert_eq!(app.collection_names()?, vec!["orders".to_string(), "users".to_string()]);

            let users = app.query("users", &all())?;
            assert_eq!(users.len(), 2);
            assert_eq!(users[0].get("first_name"), Some(Value::from("fn1")));
            assert_eq!(users[1].get("minor"), Some(Value::from(true)));
            assert_eq!(app.find("orders", "o1")?.get("total"), Some(Value::from(10)));
            reopened.close()?;
            Ok(())
        },
        cleanup,
    )
}

#[cfg(feature = "file")]
#[test]
fn test_deletes_survive_reopen() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            db.create_database("gone")?;
            db.insert_document("gone", "users", doc! { "id": "1" })?;
            db.insert_document("app", "dropped", doc! { "id": "1" })?;
            db.delete_database("gone")?;
            ctx.app()?.drop_collection("dropped")?;

            let reopened = ctx.reopen()?;
            assert!(!reopened.has_database("gone"));
            assert!(!reopened.database("app")?.has_collection("dropped"));
            reopened.close()?;
            Ok(())
        },
        cleanup,
    )
}

#[cfg(feature = "file")]
#[test]
fn test_generated_ids_survive_reopen() {
    run_test(
        create_test_context,
        |ctx| {
            let stored = ctx.db().insert_document("app", "users", doc! { "name": "a" })?;
            let id = stored.id()?.expect("generated id");

            let reopened = ctx.reopen()?;
            assert_eq!(reopened.find_document("app", "users", id.as_str())?, stored);

            // ids generated after a restart do not collide with loaded ones
            let next = reopened.insert_document("app", "users", doc! { "name": "b" })?;
            assert_ne!(next.id()?, Some(id));
            reopened.close()?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_snapshot_reads_are_consistent() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            insert_test_documents(&users)?;
            let before = users.all()?;

            users.update_query(&all(), &UpdateSpec::new().inc("age", 1))?;
            let after = users.all()?;
            assert_eq!(before.len(), after.len());
            for (old, new) in before.iter().zip(after.iter()) {
                assert_ne!(old.get("age"), new.get("age"));
                assert_eq!(old.get("first_name"), new.get("first_name"));
            }
            Ok(())
        },
        cleanup,
    )
}
