#![allow(dead_code)]

use tabula_core::{
    config::QueryConfig,
    model::{CollectionKind, PropertyModel, ScalarKind, TypeSchema},
    session::Session,
    value::RecordRef,
};
use tabula_memory::{MemoryStore, StoredValue};

pub const PERSON: &str = "Person";
pub const ADDRESS: &str = "Address";

/// Person → Address, with one column of every scalar kind.
pub fn types() -> Vec<TypeSchema> {
    vec![
        TypeSchema::new(PERSON)
            .with(PropertyModel::scalar("Id", 0, ScalarKind::Int))
            .with(PropertyModel::nullable("Name", 1, ScalarKind::String))
            .with(PropertyModel::scalar("Age", 2, ScalarKind::Int))
            .with(PropertyModel::scalar("Active", 3, ScalarKind::Bool))
            .with(PropertyModel::nullable("Photo", 4, ScalarKind::Data))
            .with(PropertyModel::link("Address", 5, ADDRESS))
            .with(PropertyModel::nullable("Score", 6, ScalarKind::Double))
            .with(PropertyModel::nullable("Bio", 7, ScalarKind::String))
            .with(PropertyModel::collection(
                "Tags",
                8,
                ScalarKind::String,
                CollectionKind::List,
            )),
        TypeSchema::new(ADDRESS)
            .with(PropertyModel::nullable("City", 0, ScalarKind::String))
            .with(PropertyModel::scalar("Zip", 1, ScalarKind::Int)),
    ]
}

pub fn empty_store() -> MemoryStore {
    MemoryStore::with_types(types()).expect("fixture types should be valid")
}

/// Insert a person with the required columns plus a name.
pub fn person(store: &mut MemoryStore, id: i64, name: Option<&str>, age: i64) -> RecordRef {
    store
        .insert(
            PERSON,
            [
                ("Id", StoredValue::from(id)),
                ("Name", StoredValue::from(name)),
                ("Age", StoredValue::from(age)),
                ("Active", StoredValue::from(id % 2 == 0)),
            ],
        )
        .expect("person should insert")
}

pub fn address(store: &mut MemoryStore, city: Option<&str>, zip: i64) -> RecordRef {
    store
        .insert(
            ADDRESS,
            [("City", StoredValue::from(city)), ("Zip", StoredValue::from(zip))],
        )
        .expect("address should insert")
}

pub fn id(store: &MemoryStore, record: &RecordRef) -> i64 {
    match store.value(record, "Id") {
        Some(StoredValue::Int(id)) => id,
        other => panic!("record {record} has no id: {other:?}"),
    }
}

pub fn ids<'a>(store: &MemoryStore, records: impl IntoIterator<Item = &'a RecordRef>) -> Vec<i64> {
    records.into_iter().map(|r| id(store, r)).collect()
}

/// Run `f` against a session over `store` with the given configuration.
pub fn with_session_config<R>(
    store: &MemoryStore,
    config: QueryConfig,
    f: impl FnOnce(&Session<'_, MemoryStore>) -> R,
) -> R {
    let schema = store.schema_metadata().expect("schema should build");
    let session = Session::open(store, &schema, config).expect("session should open");

    f(&session)
}

pub fn with_session<R>(store: &MemoryStore, f: impl FnOnce(&Session<'_, MemoryStore>) -> R) -> R {
    with_session_config(store, QueryConfig::default().with_metrics(false), f)
}
