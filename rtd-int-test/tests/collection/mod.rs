mod collection_crud_test;
mod collection_negative_test;
mod query_test;
mod update_test;
