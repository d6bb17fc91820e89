use rtd::collection::Document;
use rtd::common::Value;
use rtd::doc;
use rtd::errors::ErrorKind;
use rtd::filter::{all, and, field, not, or, Filter};
use rtd_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

fn first_names(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .filter_map(|d| d.get("first_name"))
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[test]
fn test_filter_conjunction() {
    run_test(
        create_test_context,
        |ctx| {
            let app = ctx.app()?;
            app.insert("pairs", doc! { "a": 1, "b": 2 })?;
            app.insert("pairs", doc! { "a": 1, "b": 3 })?;

            let filter = Filter::parse(&doc! { "a": 1, "b": 2 })?;
            let matched = app.query("pairs", &filter)?;
            assert_eq!(matched.len(), 1);
            assert_eq!(matched[0].get("b"), Some(Value::from(2)));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_fluent_filters() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            insert_test_documents(&users)?;

            assert_eq!(first_names(&users.query(&field("age").gt(30))?), vec!["fn1", "fn3"]);
            assert_eq!(first_names(&users.query(&field("age").between(17, 31))?), vec!["fn1", "fn2"]);
            assert_eq!(first_names(&users.query(&field("address.city").eq("Bergen"))?), vec!["fn2"]);
            assert_eq!(first_names(&users.query(&field("address").not_exists())?), vec!["fn3"]);
            assert_eq!(first_names(&users.query(&field("tags").contains("admin"))?), vec!["fn1"]);
            assert_eq!(
                first_names(&users.query(&field("last_name").in_array(vec!["ln1", "ln9"]))?),
                vec!["fn1"]
            );
            assert_eq!(
                first_names(&users.query(&field("body").regex("^a .*dog$")?)?),
                vec!["fn1", "fn3"]
            );

            let combined = and(vec![field("last_name").eq("ln2"), not(field("age").lt(18))]);
            assert_eq!(first_names(&users.query(&combined)?), vec!["fn3"]);

            let either = or(vec![field("first_name").eq("fn1"), field("first_name").eq("fn3")]);
            assert_eq!(users.query(&either)?.len(), 2);
            assert_eq!(users.query(&all())?.len(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_parsed_operators() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            insert_test_documents(&users)?;

            let cases = vec![
                (doc! { "age": { "$gte": 31 } }, vec!["fn1", "fn3"]),
                (doc! { "age": { "$ne": 17 } }, vec!["fn1", "fn3"]),
                // a dotted key inside doc! nests, so the path filter comes from JSON
                (Document::from_json(r#"{"address.zip": {"$nin": ["0150"]}}"#)?, vec!["fn2", "fn3"]),
                (doc! { "address": { "$exists": false } }, vec!["fn3"]),
                (doc! { "body": { "$contains": "hello" } }, vec!["fn2"]),
                (doc! { "first_name": { "$regex": "fn[12]" } }, vec!["fn1", "fn2"]),
                (doc! { "$or": [{ "age": 17 }, { "age": 45.5 }] }, vec!["fn2", "fn3"]),
                (doc! { "$not": { "last_name": "ln2" } }, vec!["fn1"]),
                (doc! { "age": { "$not": { "$lt": 20 } } }, vec!["fn1", "fn3"]),
            ];

            for (filter, expected) in cases {
                let parsed = Filter::parse(&filter)?;
                assert_eq!(first_names(&users.query(&parsed)?), expected, "filter {}", filter);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_type_mismatch_does_not_match() {
    run_test(
        create_test_context,
        |ctx| {
            let users = ctx.app()?.get_or_create_collection("users")?;
            insert_test_documents(&users)?;

            assert!(users.query(&field("age").gt("thirty"))?.is_empty());
            assert!(users.query(&field("first_name").lt(5))?.is_empty());
            assert!(users.query(&field("address").eq(1))?.is_empty());
            assert!(users.query(&field("missing").eq(Value::Null))?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_malformed_filters() {
    run_test(
        create_test_context,
        |ctx| {
            let db = ctx.db();
            let malformed = vec![
                doc! { "age": { "$between": 1 } },
                doc! { "$and": [] },
                doc! { "$or": 1 },
                doc! { "age": { "$in": 1 } },
                doc! { "name": { "$regex": "(" } },
                doc! { "age": { "$gt": 1, "plain": 2 } },
            ];
            for filter in malformed {
                let err = db.query("app", "users", &filter).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::InvalidFilter, "filter {}", filter);
            }
            Ok(())
        },
        cleanup,
    )
}
