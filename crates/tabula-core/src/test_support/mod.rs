//! Shared fixtures for unit tests: a three-type schema and a scripted native
//! store that records every protocol call it receives.
use crate::{
    config::QueryConfig,
    error::QueryError,
    expr::{Expr, StaticRegistry},
    model::{CollectionKind, ColumnIndex, PropertyModel, ScalarKind, SchemaMetadata, TypeSchema},
    native::{CompareOp, NativeError, NativeStore, Opcode, Operand, RawHandle, StringOp},
    translate::{PredicateTranslator, RecordingSink, TranslateContext},
    value::RowKey,
};
use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
};

pub(crate) const PERSON: &str = "Person";
pub(crate) const ADDRESS: &str = "Address";
pub(crate) const COUNTRY: &str = "Country";

/// Person → Address → Country, plus collections and one unsortable column.
pub(crate) fn fixture_types() -> Vec<TypeSchema> {
    vec![
        TypeSchema::new(PERSON)
            .with(PropertyModel::scalar("Id", 0, ScalarKind::Int))
            .with(PropertyModel::nullable("Name", 1, ScalarKind::String))
            .with(PropertyModel::scalar("Age", 2, ScalarKind::Int))
            .with(PropertyModel::scalar("Active", 3, ScalarKind::Bool))
            .with(PropertyModel::scalar("Score", 4, ScalarKind::Double))
            .with(PropertyModel::scalar("Rating", 5, ScalarKind::Float))
            .with(PropertyModel::scalar("Born", 6, ScalarKind::Timestamp))
            .with(PropertyModel::nullable("Photo", 7, ScalarKind::Data))
            .with(PropertyModel::link("Address", 8, ADDRESS))
            .with(PropertyModel::collection(
                "Tags",
                9,
                ScalarKind::String,
                CollectionKind::List,
            ))
            .with(
                PropertyModel::collection("Friends", 10, ScalarKind::Object, CollectionKind::List)
                    .linked_to(PERSON),
            )
            .with(PropertyModel::scalar("Bio", 11, ScalarKind::String)),
        TypeSchema::new(ADDRESS)
            .with(PropertyModel::nullable("City", 0, ScalarKind::String))
            .with(PropertyModel::link("Country", 1, COUNTRY))
            .with(PropertyModel::scalar("Zip", 2, ScalarKind::Int)),
        TypeSchema::new(COUNTRY)
            .with(PropertyModel::scalar("Name", 0, ScalarKind::String))
            .with(PropertyModel::nullable("Flag", 1, ScalarKind::Data)),
    ]
}

pub(crate) fn fixture_schema() -> SchemaMetadata {
    SchemaMetadata::build(fixture_types()).expect("fixture schema should build")
}

pub(crate) const fn col(index: u32) -> ColumnIndex {
    ColumnIndex(index)
}

pub(crate) fn cmp(column: u32, op: CompareOp, operand: Operand) -> Opcode {
    Opcode::Compare {
        column: col(column),
        op,
        operand,
    }
}

pub(crate) fn string_op(column: u32, op: StringOp, pattern: &str, case_sensitive: bool) -> Opcode {
    Opcode::String {
        column: col(column),
        op,
        pattern: Some(pattern.to_string()),
        case_sensitive,
    }
}

/// Translate one filter against the fixture schema into recorded opcodes.
pub(crate) fn translate_filter(filter: &Expr) -> Result<Vec<Opcode>, QueryError> {
    translate_filter_with(filter, &StaticRegistry::new(), &QueryConfig::default())
}

pub(crate) fn translate_filter_with(
    filter: &Expr,
    statics: &StaticRegistry,
    config: &QueryConfig,
) -> Result<Vec<Opcode>, QueryError> {
    let schema = fixture_schema();
    let ctx = TranslateContext {
        schema: &schema,
        statics,
        config,
        table: PERSON,
    };

    let mut sink = RecordingSink::new();
    PredicateTranslator::new(ctx).translate(filter, &mut sink)?;

    Ok(sink.into_opcodes())
}

///
/// ScriptedStore
///
/// Native store double. Every query matches `matches` in native order
/// regardless of the emitted predicates; a sorted results view reverses that
/// order. Calls are logged by name for assertions.
///

#[derive(Default)]
pub(crate) struct ScriptedStore {
    pub(crate) matches: Vec<RowKey>,
    next_handle: Cell<u64>,
    live: RefCell<BTreeSet<u64>>,
    sorted: RefCell<BTreeSet<u64>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedStore {
    pub(crate) fn with_rows(rows: &[u64]) -> Self {
        Self {
            matches: rows.iter().copied().map(RowKey).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn call_count(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.as_str() == name).count()
    }

    pub(crate) fn live_handles(&self) -> usize {
        self.live.borrow().len()
    }

    fn log(&self, call: &str) {
        self.calls.borrow_mut().push(call.to_string());
    }

    fn open(&self, call: &str) -> Result<RawHandle, NativeError> {
        self.log(call);
        let next = self.next_handle.get() + 1;
        self.next_handle.set(next);
        self.live.borrow_mut().insert(next);

        RawHandle::from_raw(next).ok_or_else(|| NativeError::Engine("handle overflow".into()))
    }

    fn check(&self, handle: RawHandle, kind: &'static str) -> Result<(), NativeError> {
        if self.live.borrow().contains(&handle.get()) {
            Ok(())
        } else {
            Err(NativeError::InvalidHandle { kind, handle })
        }
    }

    fn release(&self, call: &str, handle: RawHandle) {
        self.log(call);
        assert!(
            self.live.borrow_mut().remove(&handle.get()),
            "handle {handle} released twice"
        );
    }

    fn view(&self, results: RawHandle) -> Vec<RowKey> {
        let mut rows = self.matches.clone();
        if self.sorted.borrow().contains(&results.get()) {
            rows.reverse();
        }
        rows
    }
}

impl NativeStore for ScriptedStore {
    fn column_index(&self, table: &str, property: &str) -> Option<ColumnIndex> {
        fixture_schema().property(table, property).map(|p| p.column)
    }

    fn create_query(&self, table: &str) -> Result<RawHandle, NativeError> {
        if fixture_schema().type_names().all(|name| name != table) {
            return Err(NativeError::UnknownTable(table.to_string()));
        }
        self.open("create_query")
    }

    fn group_begin(&self, query: RawHandle) -> Result<(), NativeError> {
        self.log("group_begin");
        self.check(query, "query")
    }

    fn group_end(&self, query: RawHandle) -> Result<(), NativeError> {
        self.log("group_end");
        self.check(query, "query")
    }

    fn or(&self, query: RawHandle) -> Result<(), NativeError> {
        self.log("or");
        self.check(query, "query")
    }

    fn not(&self, query: RawHandle) -> Result<(), NativeError> {
        self.log("not");
        self.check(query, "query")
    }

    fn compare(
        &self,
        query: RawHandle,
        _column: ColumnIndex,
        _op: CompareOp,
        _operand: &Operand,
    ) -> Result<(), NativeError> {
        self.log("compare");
        self.check(query, "query")
    }

    fn string_op(
        &self,
        query: RawHandle,
        _column: ColumnIndex,
        _op: StringOp,
        _pattern: Option<&str>,
        _case_sensitive: bool,
    ) -> Result<(), NativeError> {
        self.log("string_op");
        self.check(query, "query")
    }

    fn full_text(
        &self,
        query: RawHandle,
        _column: ColumnIndex,
        _terms: &str,
    ) -> Result<(), NativeError> {
        self.log("full_text");
        self.check(query, "query")
    }

    fn count(&self, query: RawHandle) -> Result<usize, NativeError> {
        self.log("count");
        self.check(query, "query")?;
        Ok(self.matches.len())
    }

    fn find_direct(
        &self,
        query: RawHandle,
        start_after: Option<RowKey>,
    ) -> Result<Option<RowKey>, NativeError> {
        self.log("find_direct");
        self.check(query, "query")?;

        let next = match start_after {
            None => self.matches.first(),
            Some(after) => self
                .matches
                .iter()
                .skip_while(|row| **row != after)
                .nth(1),
        };
        Ok(next.copied())
    }

    fn release_query(&self, query: RawHandle) {
        self.release("release_query", query);
    }

    fn create_sort(&self, _table: &str) -> Result<RawHandle, NativeError> {
        self.open("create_sort")
    }

    fn sort_add_clause(
        &self,
        sort: RawHandle,
        _columns: &[ColumnIndex],
        _ascending: bool,
    ) -> Result<(), NativeError> {
        self.log("sort_add_clause");
        self.check(sort, "sort")
    }

    fn release_sort(&self, sort: RawHandle) {
        self.release("release_sort", sort);
    }

    fn create_results(
        &self,
        query: RawHandle,
        sort: Option<RawHandle>,
    ) -> Result<RawHandle, NativeError> {
        self.check(query, "query")?;
        let handle = self.open("create_results")?;
        if sort.is_some() {
            self.sorted.borrow_mut().insert(handle.get());
        }
        Ok(handle)
    }

    fn results_count(&self, results: RawHandle) -> Result<usize, NativeError> {
        self.log("results_count");
        self.check(results, "results")?;
        Ok(self.matches.len())
    }

    fn results_get(
        &self,
        results: RawHandle,
        index: usize,
    ) -> Result<Option<RowKey>, NativeError> {
        self.log("results_get");
        self.check(results, "results")?;
        Ok(self.view(results).get(index).copied())
    }

    fn release_results(&self, results: RawHandle) {
        self.release("release_results", results);
    }
}
