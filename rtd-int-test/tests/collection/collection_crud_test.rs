use rtd::collection::Document;
use rtd::common::Value;
use rtd::doc;
use rtd::filter::all;
use rtd::update::UpdateSpec;
use rtd_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

#[test]
fn test_insert_generates_id() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            let stored = app.insert("users", doc! { "name": "a" })?;

            let id = stored.id()?.expect("generated id");
            assert!(!id.as_str().is_empty());
            assert_eq!(stored.get("name"), Some(Value::from("a")));

            let found = app.find("users", id.as_str())?;
            assert_eq!(found, stored);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_insert_keeps_supplied_id() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            let stored = app.insert("users", doc! { "id": "u-1", "name": "a" })?;
            assert_eq!(stored.id()?.map(|id| id.to_string()), Some("u-1".to_string()));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_generated_ids_are_unique() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            let docs: Vec<Document> = (0..500).map(|i| doc! { "n": i }).collect();
            let stored = users.insert_many(docs)?;

            let mut ids: Vec<String> = stored
                .iter()
                .map(|d| d.id().map(|id| id.map(|id| id.to_string()).unwrap_or_default()))
                .collect::<Result<_, _>>()?;
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), 500);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_query_returns_insertion_order() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            for name in ["c", "a", "b"] {
                users.insert(doc! { "name": name })?;
            }

            let names: Vec<Value> = users
                .query(&all())?
                .iter()
                .filter_map(|d| d.get("name"))
                .collect();
            assert_eq!(names, vec![Value::from("c"), Value::from("a"), Value::from("b")]);

            // an update keeps the position
            users.update_query(&rtd::filter::field("name").eq("c"), &UpdateSpec::new().set("name", "z"))?;
            let first = users.all()?.remove(0);
            assert_eq!(first.get("name"), Some(Value::from("z")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_document_lifecycle() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let stored = db.insert_document("app", "users", doc! { "name": "a" })?;
            let id = stored.id()?.expect("generated id");

            let found = db.find_document("app", "users", id.as_str())?;
            assert_eq!(found, doc! { "name": "a", "id": (id.as_str()) });

            let updated = db.update_document("app", "users", id.as_str(), &doc! { "name": "b" })?;
            assert_eq!(updated, doc! { "name": "b", "id": (id.as_str()) });

            db.delete_document("app", "users", id.as_str())?;
            assert!(db.find_document("app", "users", id.as_str()).is_err());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_query() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            insert_test_documents(&users)?;

            let removed = users.delete_query(&rtd::filter::field("last_name").eq("ln2"))?;
            assert_eq!(removed.len(), 2);
            assert_eq!(users.count()?, 1);

            let removed = users.delete_query(&rtd::filter::field("last_name").eq("ln2"))?;
            assert!(removed.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nested_documents_round_trip() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            let original = doc! {
                "id": "n1",
                "profile": { "name": "a", "langs": ["rust", "go"] },
                "score": 1.5,
                "active": true,
                "nothing": (Value::Null),
            };
            app.insert("users", original.clone())?;
            let found = app.find("users", "n1")?;
            assert_eq!(found, original);
            assert_eq!(found.get("profile.langs.1"), Some(Value::from("go")));
            assert_eq!(Document::from_bytes(&found.to_bytes()?)?, original);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_drop_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            let users = app.get_or_create_collection("users")?;
            insert_test_documents(&users)?;
            app.get_or_create_collection("orders")?;

            app.drop_collection("users")?;
            assert_eq!(app.collection_names()?, vec!["orders".to_string()]);
            assert!(users.is_dropped());
            assert!(app.query("users", &all())?.is_empty());
            Ok(())
        },
        cleanup,
    )
}
