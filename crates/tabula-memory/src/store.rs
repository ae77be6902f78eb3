use crate::{
    error::MemoryError,
    program::{NULL, Predicate, Row, cell},
    value::StoredValue,
};
use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    collections::BTreeMap,
    ops::Bound,
};
use tabula_core::{
    model::{ColumnIndex, PropertyInfo, ScalarKind, SchemaMetadata, SchemaProvider, TypeSchema},
    native::{CompareOp, NativeError, NativeStore, Opcode, Operand, RawHandle, StringOp},
    value::{RecordRef, RowKey},
};

///
/// Table
///

#[derive(Debug)]
struct Table {
    schema: TypeSchema,
    rows: BTreeMap<RowKey, Row>,
}

impl Table {
    fn info(&self, property: &str) -> Option<&PropertyInfo> {
        self.schema.property(property).map(|p| &p.info)
    }

    fn column(&self, column: ColumnIndex) -> Option<&PropertyInfo> {
        self.schema
            .properties
            .iter()
            .map(|p| &p.info)
            .find(|info| info.column == column)
    }
}

#[derive(Debug)]
struct QueryState {
    table: String,
    opcodes: Vec<Opcode>,
}

#[derive(Debug)]
struct SortState {
    table: String,
    clauses: Vec<(Vec<ColumnIndex>, bool)>,
}

#[derive(Debug, Default)]
struct HandleTable {
    queries: BTreeMap<RawHandle, QueryState>,
    sorts: BTreeMap<RawHandle, SortState>,
    results: BTreeMap<RawHandle, Vec<RowKey>>,
}

impl HandleTable {
    fn len(&self) -> usize {
        self.queries.len() + self.sorts.len() + self.results.len()
    }
}

///
/// MemoryStore
///
/// Columnar in-memory engine speaking the native store protocol.
///
/// Rows are kept per table in native order (ascending row key); row keys are
/// unique across the whole store. Query handles record opcodes and compile
/// them when a count, scan or results view is requested. Results views are
/// snapshots taken at creation.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
    handles: RefCell<HandleTable>,
    next_handle: Cell<u64>,
    next_row: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a complete set of type declarations.
    pub fn with_types<I>(types: I) -> Result<Self, MemoryError>
    where
        I: IntoIterator<Item = TypeSchema>,
    {
        let mut store = Self::new();
        for ty in types {
            store.define(ty)?;
        }
        store.schema_metadata()?;

        Ok(store)
    }

    pub fn define(&mut self, schema: TypeSchema) -> Result<(), MemoryError> {
        if self.tables.contains_key(&schema.name) {
            return Err(MemoryError::DuplicateTable(schema.name));
        }

        tracing::debug!(
            table = %schema.name,
            properties = schema.properties.len(),
            "defined table"
        );
        self.tables.insert(
            schema.name.clone(),
            Table {
                schema,
                rows: BTreeMap::new(),
            },
        );

        Ok(())
    }

    /// Validated metadata for every defined table.
    pub fn schema_metadata(&self) -> Result<SchemaMetadata, MemoryError> {
        let types = self.tables.values().map(|t| t.schema.clone());

        Ok(SchemaMetadata::build(types)?)
    }

    /// Append one row. Omitted nullable properties store null and omitted
    /// collections store an empty list.
    pub fn insert<'a, I, V>(&mut self, table: &str, values: I) -> Result<RecordRef, MemoryError>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<StoredValue>,
    {
        let target = self
            .tables
            .get(table)
            .ok_or_else(|| MemoryError::UnknownTable(table.to_string()))?;

        let mut row = Row::new();
        for (property, value) in values {
            let info = target
                .info(property)
                .ok_or_else(|| MemoryError::UnknownProperty {
                    table: table.to_string(),
                    property: property.to_string(),
                })?;
            let value = value.into();

            if !value.fits(info) {
                return Err(MemoryError::KindMismatch {
                    table: table.to_string(),
                    property: property.to_string(),
                    expected: info.kind,
                    found: value.label(),
                });
            }
            self.check_links(table, property, info, &value)?;
            row.insert(info.column, value);
        }

        for property in &target.schema.properties {
            let info = &property.info;
            if row.contains_key(&info.column) {
                continue;
            }
            if info.is_collection() {
                row.insert(info.column, StoredValue::List(Vec::new()));
            } else if !info.nullable {
                return Err(MemoryError::MissingValue {
                    table: table.to_string(),
                    property: property.name.clone(),
                });
            }
        }

        self.next_row += 1;
        let key = RowKey(self.next_row);
        if let Some(target) = self.tables.get_mut(table) {
            target.rows.insert(key, row);
        }
        tracing::trace!(table, row = %key, "inserted row");

        Ok(RecordRef::new(table, key))
    }

    /// Read one property of a stored record.
    #[must_use]
    pub fn value(&self, record: &RecordRef, property: &str) -> Option<StoredValue> {
        let table = self.tables.get(&record.table)?;
        let info = table.info(property)?;
        let row = table.rows.get(&record.row)?;

        Some(cell(row, info.column).clone())
    }

    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }

    /// Native handles currently outstanding.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.handles.borrow().len()
    }

    fn check_links(
        &self,
        table: &str,
        property: &str,
        info: &PropertyInfo,
        value: &StoredValue,
    ) -> Result<(), MemoryError> {
        let Some(target) = info.linked_type.as_deref() else {
            return Ok(());
        };
        let links: Vec<RowKey> = match value {
            StoredValue::Link(row) => vec![*row],
            StoredValue::List(items) => items
                .iter()
                .filter_map(|item| match item {
                    StoredValue::Link(row) => Some(*row),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        for row in links {
            let exists = self
                .tables
                .get(target)
                .is_some_and(|t| t.rows.contains_key(&row));
            if !exists {
                return Err(MemoryError::DanglingLink {
                    table: table.to_string(),
                    property: property.to_string(),
                    target: target.to_string(),
                    row,
                });
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Handle bookkeeping
    // ------------------------------------------------------------------

    fn allocate(&self) -> Result<RawHandle, NativeError> {
        let next = self.next_handle.get().wrapping_add(1);
        self.next_handle.set(next);

        RawHandle::from_raw(next).ok_or_else(|| NativeError::Engine("handle space exhausted".into()))
    }

    fn table(&self, name: &str) -> Result<&Table, NativeError> {
        self.tables
            .get(name)
            .ok_or_else(|| NativeError::UnknownTable(name.to_string()))
    }

    fn column_info(&self, table: &str, column: ColumnIndex) -> Result<&PropertyInfo, NativeError> {
        self.table(table)?
            .column(column)
            .ok_or_else(|| NativeError::UnknownColumn {
                table: table.to_string(),
                column,
            })
    }

    fn query_table(&self, query: RawHandle) -> Result<String, NativeError> {
        self.handles
            .borrow()
            .queries
            .get(&query)
            .map(|q| q.table.clone())
            .ok_or(NativeError::InvalidHandle {
                kind: "query",
                handle: query,
            })
    }

    fn push(&self, query: RawHandle, opcode: Opcode) -> Result<(), NativeError> {
        tracing::trace!(handle = %query, %opcode, "query builder call");

        let mut handles = self.handles.borrow_mut();
        let state = handles
            .queries
            .get_mut(&query)
            .ok_or(NativeError::InvalidHandle {
                kind: "query",
                handle: query,
            })?;
        state.opcodes.push(opcode);

        Ok(())
    }

    // Compile the recorded opcodes for one query handle.
    fn program(&self, query: RawHandle) -> Result<(String, Predicate), NativeError> {
        let handles = self.handles.borrow();
        let state = handles.queries.get(&query).ok_or(NativeError::InvalidHandle {
            kind: "query",
            handle: query,
        })?;

        Ok((state.table.clone(), Predicate::compile(&state.opcodes)?))
    }

    fn matches(&self, query: RawHandle) -> Result<Vec<RowKey>, NativeError> {
        let (table, predicate) = self.program(query)?;

        Ok(self
            .table(&table)?
            .rows
            .iter()
            .filter(|(_, row)| predicate.eval(row))
            .map(|(key, _)| *key)
            .collect())
    }

    fn string_column(&self, query: RawHandle, column: ColumnIndex, call: &str) -> Result<(), NativeError> {
        let table = self.query_table(query)?;
        let info = self.column_info(&table, column)?;

        if info.kind == ScalarKind::String && !info.is_collection() {
            Ok(())
        } else {
            Err(NativeError::Engine(format!(
                "{call} on {column} of kind {}",
                info.kind
            )))
        }
    }

    // Follow a sort path through to-one links; a null link yields null.
    fn resolve_path(&self, table: &str, mut row: RowKey, path: &[ColumnIndex]) -> StoredValue {
        let mut table = table.to_string();

        for (i, column) in path.iter().enumerate() {
            let Some(current) = self.tables.get(&table) else {
                break;
            };
            let value = current.rows.get(&row).map_or(&NULL, |r| cell(r, *column));

            if i + 1 == path.len() {
                return value.clone();
            }
            let target = current
                .column(*column)
                .and_then(|info| info.linked_type.clone());
            match (value, target) {
                (StoredValue::Link(next), Some(target)) => {
                    row = *next;
                    table = target;
                }
                _ => break,
            }
        }

        StoredValue::Null
    }
}

fn check_operand(info: &PropertyInfo, op: CompareOp, operand: &Operand) -> Result<(), NativeError> {
    let ordered = !op.is_equality();
    let kind = info.kind;

    let fits = !info.is_collection()
        && match operand {
            Operand::Null => !ordered,
            Operand::Bool(_) => kind == ScalarKind::Bool && !ordered,
            Operand::Int(_) => kind == ScalarKind::Int,
            Operand::Long(_) => matches!(kind, ScalarKind::Int | ScalarKind::Bool),
            Operand::Float(_) => kind == ScalarKind::Float,
            Operand::Double(_) => kind == ScalarKind::Double,
            Operand::String { .. } => kind == ScalarKind::String,
            Operand::Timestamp(_) => kind == ScalarKind::Timestamp,
            Operand::Binary(_) | Operand::EmptyBinary => kind == ScalarKind::Data && !ordered,
            Operand::Object(_) => kind == ScalarKind::Object && !ordered,
        };

    if fits {
        Ok(())
    } else {
        Err(NativeError::UnsupportedOperand {
            operand: operand.label(),
            op,
        })
    }
}

impl NativeStore for MemoryStore {
    fn column_index(&self, table: &str, property: &str) -> Option<ColumnIndex> {
        self.tables.get(table)?.info(property).map(|info| info.column)
    }

    fn create_query(&self, table: &str) -> Result<RawHandle, NativeError> {
        self.table(table)?;
        let handle = self.allocate()?;

        self.handles.borrow_mut().queries.insert(
            handle,
            QueryState {
                table: table.to_string(),
                opcodes: Vec::new(),
            },
        );

        Ok(handle)
    }

    fn group_begin(&self, query: RawHandle) -> Result<(), NativeError> {
        self.push(query, Opcode::GroupBegin)
    }

    fn group_end(&self, query: RawHandle) -> Result<(), NativeError> {
        self.push(query, Opcode::GroupEnd)
    }

    fn or(&self, query: RawHandle) -> Result<(), NativeError> {
        self.push(query, Opcode::Or)
    }

    fn not(&self, query: RawHandle) -> Result<(), NativeError> {
        self.push(query, Opcode::Not)
    }

    fn compare(
        &self,
        query: RawHandle,
        column: ColumnIndex,
        op: CompareOp,
        operand: &Operand,
    ) -> Result<(), NativeError> {
        let table = self.query_table(query)?;
        check_operand(self.column_info(&table, column)?, op, operand)?;

        self.push(
            query,
            Opcode::Compare {
                column,
                op,
                operand: operand.clone(),
            },
        )
    }

    fn string_op(
        &self,
        query: RawHandle,
        column: ColumnIndex,
        op: StringOp,
        pattern: Option<&str>,
        case_sensitive: bool,
    ) -> Result<(), NativeError> {
        self.string_column(query, column, "string operation")?;

        self.push(
            query,
            Opcode::String {
                column,
                op,
                pattern: pattern.map(str::to_string),
                case_sensitive,
            },
        )
    }

    fn full_text(
        &self,
        query: RawHandle,
        column: ColumnIndex,
        terms: &str,
    ) -> Result<(), NativeError> {
        self.string_column(query, column, "full-text search")?;

        self.push(
            query,
            Opcode::FullText {
                column,
                terms: terms.to_string(),
            },
        )
    }

    fn count(&self, query: RawHandle) -> Result<usize, NativeError> {
        Ok(self.matches(query)?.len())
    }

    fn find_direct(
        &self,
        query: RawHandle,
        start_after: Option<RowKey>,
    ) -> Result<Option<RowKey>, NativeError> {
        let (table, predicate) = self.program(query)?;
        let lower = start_after.map_or(Bound::Unbounded, Bound::Excluded);

        Ok(self
            .table(&table)?
            .rows
            .range((lower, Bound::Unbounded))
            .find(|(_, row)| predicate.eval(row))
            .map(|(key, _)| *key))
    }

    fn release_query(&self, query: RawHandle) {
        if self.handles.borrow_mut().queries.remove(&query).is_none() {
            tracing::warn!(handle = %query, "release of unknown query handle");
        }
    }

    fn create_sort(&self, table: &str) -> Result<RawHandle, NativeError> {
        self.table(table)?;
        let handle = self.allocate()?;

        self.handles.borrow_mut().sorts.insert(
            handle,
            SortState {
                table: table.to_string(),
                clauses: Vec::new(),
            },
        );

        Ok(handle)
    }

    fn sort_add_clause(
        &self,
        sort: RawHandle,
        columns: &[ColumnIndex],
        ascending: bool,
    ) -> Result<(), NativeError> {
        let invalid = NativeError::InvalidHandle {
            kind: "sort",
            handle: sort,
        };
        let mut owner = self
            .handles
            .borrow()
            .sorts
            .get(&sort)
            .map(|s| s.table.clone())
            .ok_or_else(|| invalid.clone())?;

        let Some((last, links)) = columns.split_last() else {
            return Err(NativeError::Engine("empty sort path".into()));
        };
        for column in links {
            let info = self.column_info(&owner, *column)?;
            match (&info.linked_type, info.is_to_one_link()) {
                (Some(target), true) => owner = target.clone(),
                _ => {
                    return Err(NativeError::Engine(format!(
                        "sort path crosses {column} on '{owner}', which is not a to-one link"
                    )));
                }
            }
        }
        let info = self.column_info(&owner, *last)?;
        if info.is_collection() || !info.kind.is_sortable() {
            return Err(NativeError::Engine(format!(
                "{last} on '{owner}' is not sortable"
            )));
        }

        self.handles
            .borrow_mut()
            .sorts
            .get_mut(&sort)
            .ok_or(invalid)?
            .clauses
            .push((columns.to_vec(), ascending));

        Ok(())
    }

    fn release_sort(&self, sort: RawHandle) {
        if self.handles.borrow_mut().sorts.remove(&sort).is_none() {
            tracing::warn!(handle = %sort, "release of unknown sort handle");
        }
    }

    fn create_results(
        &self,
        query: RawHandle,
        sort: Option<RawHandle>,
    ) -> Result<RawHandle, NativeError> {
        let table = self.query_table(query)?;
        let mut rows = self.matches(query)?;

        if let Some(sort) = sort {
            let clauses = {
                let handles = self.handles.borrow();
                let state = handles.sorts.get(&sort).ok_or(NativeError::InvalidHandle {
                    kind: "sort",
                    handle: sort,
                })?;
                if state.table != table {
                    return Err(NativeError::Engine(format!(
                        "sort over '{}' applied to a query over '{table}'",
                        state.table
                    )));
                }
                state.clauses.clone()
            };

            let mut keyed: Vec<(RowKey, Vec<StoredValue>)> = rows
                .into_iter()
                .map(|row| {
                    let keys = clauses
                        .iter()
                        .map(|(path, _)| self.resolve_path(&table, row, path))
                        .collect();
                    (row, keys)
                })
                .collect();

            // stable: ties keep native order
            keyed.sort_by(|(_, a), (_, b)| {
                clauses
                    .iter()
                    .zip(a.iter().zip(b))
                    .map(|((_, ascending), (a, b))| {
                        let ord = a.sort_cmp(b);
                        if *ascending { ord } else { ord.reverse() }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
            rows = keyed.into_iter().map(|(row, _)| row).collect();
        }

        let handle = self.allocate()?;
        self.handles.borrow_mut().results.insert(handle, rows);

        Ok(handle)
    }

    fn results_count(&self, results: RawHandle) -> Result<usize, NativeError> {
        self.handles
            .borrow()
            .results
            .get(&results)
            .map(Vec::len)
            .ok_or(NativeError::InvalidHandle {
                kind: "results",
                handle: results,
            })
    }

    fn results_get(
        &self,
        results: RawHandle,
        index: usize,
    ) -> Result<Option<RowKey>, NativeError> {
        self.handles
            .borrow()
            .results
            .get(&results)
            .map(|rows| rows.get(index).copied())
            .ok_or(NativeError::InvalidHandle {
                kind: "results",
                handle: results,
            })
    }

    fn release_results(&self, results: RawHandle) {
        if self.handles.borrow_mut().results.remove(&results).is_none() {
            tracing::warn!(handle = %results, "release of unknown results handle");
        }
    }
}

impl SchemaProvider for MemoryStore {
    fn try_find_property(&self, type_name: &str, property: &str) -> Option<PropertyInfo> {
        self.tables.get(type_name)?.info(property).cloned()
    }

    fn has_type(&self, type_name: &str) -> bool {
        self.tables.contains_key(type_name)
    }
}
