use crate::{
    model::ColumnIndex,
    native::{NativeError, NativeStore, Opcode, RawHandle},
    value::RowKey,
};
use std::marker::PhantomData;

///
/// HandleKind
/// Selects the native release call for one handle family.
///

pub trait HandleKind {
    const LABEL: &'static str;

    fn release<S: NativeStore + ?Sized>(store: &S, raw: RawHandle);
}

///
/// QueryKind
///

pub enum QueryKind {}

impl HandleKind for QueryKind {
    const LABEL: &'static str = "query";

    fn release<S: NativeStore + ?Sized>(store: &S, raw: RawHandle) {
        store.release_query(raw);
    }
}

///
/// SortKind
///

pub enum SortKind {}

impl HandleKind for SortKind {
    const LABEL: &'static str = "sort";

    fn release<S: NativeStore + ?Sized>(store: &S, raw: RawHandle) {
        store.release_sort(raw);
    }
}

///
/// ResultsKind
///

pub enum ResultsKind {}

impl HandleKind for ResultsKind {
    const LABEL: &'static str = "results";

    fn release<S: NativeStore + ?Sized>(store: &S, raw: RawHandle) {
        store.release_results(raw);
    }
}

///
/// OwnedHandle
///
/// Exclusive owner of one native handle.
///
/// The handle is released exactly once: by `close`, or by `Drop` when the
/// owner goes out of scope (including unwind). The wrapper is neither `Send`
/// nor `Sync`; a handle never leaves the thread that created it.
///

pub struct OwnedHandle<'s, S: NativeStore + ?Sized, K: HandleKind> {
    store: &'s S,
    raw: RawHandle,
    _marker: PhantomData<(K, *const ())>,
}

pub type QueryHandle<'s, S> = OwnedHandle<'s, S, QueryKind>;
pub type SortHandle<'s, S> = OwnedHandle<'s, S, SortKind>;
pub type ResultsHandle<'s, S> = OwnedHandle<'s, S, ResultsKind>;

impl<'s, S, K> OwnedHandle<'s, S, K>
where
    S: NativeStore + ?Sized,
    K: HandleKind,
{
    // The raw value returned by `create` moves straight into its owner; no
    // fallible step sits between the native call returning and the wrapper
    // recording it.
    fn acquire(
        store: &'s S,
        create: impl FnOnce(&'s S) -> Result<RawHandle, NativeError>,
    ) -> Result<Self, NativeError> {
        create(store).map(|raw| {
            tracing::trace!(kind = K::LABEL, handle = %raw, "acquired native handle");

            Self {
                store,
                raw,
                _marker: PhantomData,
            }
        })
    }

    #[must_use]
    pub const fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Release the handle now rather than at end of scope.
    pub fn close(self) {
        drop(self);
    }
}

impl<S, K> Drop for OwnedHandle<'_, S, K>
where
    S: NativeStore + ?Sized,
    K: HandleKind,
{
    fn drop(&mut self) {
        K::release(self.store, self.raw);
        tracing::trace!(kind = K::LABEL, handle = %self.raw, "released native handle");
    }
}

impl<'s, S> OwnedHandle<'s, S, QueryKind>
where
    S: NativeStore + ?Sized,
{
    pub(crate) fn create(store: &'s S, table: &str) -> Result<Self, NativeError> {
        Self::acquire(store, |s| s.create_query(table))
    }

    /// Forward one translated opcode to the native builder.
    pub(crate) fn apply(&mut self, opcode: &Opcode) -> Result<(), NativeError> {
        let (store, raw) = (self.store, self.raw);

        match opcode {
            Opcode::GroupBegin => store.group_begin(raw),
            Opcode::GroupEnd => store.group_end(raw),
            Opcode::Or => store.or(raw),
            Opcode::Not => store.not(raw),
            Opcode::Compare {
                column,
                op,
                operand,
            } => store.compare(raw, *column, *op, operand),
            Opcode::String {
                column,
                op,
                pattern,
                case_sensitive,
            } => store.string_op(raw, *column, *op, pattern.as_deref(), *case_sensitive),
            Opcode::FullText { column, terms } => store.full_text(raw, *column, terms),
        }
    }

    pub(crate) fn count(&self) -> Result<usize, NativeError> {
        self.store.count(self.raw)
    }

    pub(crate) fn find_direct(&self, start_after: Option<RowKey>) -> Result<Option<RowKey>, NativeError> {
        self.store.find_direct(self.raw, start_after)
    }
}

impl<'s, S> OwnedHandle<'s, S, SortKind>
where
    S: NativeStore + ?Sized,
{
    pub(crate) fn create(store: &'s S, table: &str) -> Result<Self, NativeError> {
        Self::acquire(store, |s| s.create_sort(table))
    }

    pub(crate) fn add_clause(
        &mut self,
        columns: &[ColumnIndex],
        ascending: bool,
    ) -> Result<(), NativeError> {
        self.store.sort_add_clause(self.raw, columns, ascending)
    }
}

impl<'s, S> OwnedHandle<'s, S, ResultsKind>
where
    S: NativeStore + ?Sized,
{
    pub(crate) fn create(
        store: &'s S,
        query: &QueryHandle<'s, S>,
        sort: Option<&SortHandle<'s, S>>,
    ) -> Result<Self, NativeError> {
        Self::acquire(store, |s| {
            s.create_results(query.raw(), sort.map(OwnedHandle::raw))
        })
    }

    pub(crate) fn count(&self) -> Result<usize, NativeError> {
        self.store.results_count(self.raw)
    }

    pub(crate) fn get(&self, index: usize) -> Result<Option<RowKey>, NativeError> {
        self.store.results_get(self.raw, index)
    }
}
