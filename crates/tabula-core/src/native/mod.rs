//! Native store boundary.
//!
//! `NativeStore` is the exact call surface the engine drives: query-builder
//! opcodes, sort descriptors and results views, all addressed by opaque raw
//! handles. Raw handles never escape this module unwrapped; callers hold the
//! owning wrappers from [`handle`], which release on drop.
mod handle;
mod protocol;

pub use handle::{
    HandleKind, OwnedHandle, QueryHandle, QueryKind, ResultsHandle, ResultsKind, SortHandle,
    SortKind,
};
pub use protocol::{CompareOp, Opcode, Operand, StringOp};

use crate::{model::ColumnIndex, value::RowKey};
use derive_more::Display;
use std::num::NonZeroU64;
use thiserror::Error as ThisError;

///
/// RawHandle
/// Opaque native pointer-equivalent. Zero is never a valid handle.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("0x{_0:x}")]
pub struct RawHandle(NonZeroU64);

impl RawHandle {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

///
/// NativeStore
///
/// Protocol a native engine exposes to the query layer.
///
/// All calls are synchronous and take `&self`; the engine behind the boundary
/// owns its own interior state. Every `create_*` call hands out a handle the
/// caller must give back through the matching `release_*` exactly once.
///

pub trait NativeStore {
    // ------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------

    fn column_index(&self, table: &str, property: &str) -> Option<ColumnIndex>;

    // ------------------------------------------------------------------
    // Query builder
    // ------------------------------------------------------------------

    fn create_query(&self, table: &str) -> Result<RawHandle, NativeError>;

    fn group_begin(&self, query: RawHandle) -> Result<(), NativeError>;

    fn group_end(&self, query: RawHandle) -> Result<(), NativeError>;

    fn or(&self, query: RawHandle) -> Result<(), NativeError>;

    /// Negate the next emitted predicate or group.
    fn not(&self, query: RawHandle) -> Result<(), NativeError>;

    fn compare(
        &self,
        query: RawHandle,
        column: ColumnIndex,
        op: CompareOp,
        operand: &Operand,
    ) -> Result<(), NativeError>;

    fn string_op(
        &self,
        query: RawHandle,
        column: ColumnIndex,
        op: StringOp,
        pattern: Option<&str>,
        case_sensitive: bool,
    ) -> Result<(), NativeError>;

    fn full_text(
        &self,
        query: RawHandle,
        column: ColumnIndex,
        terms: &str,
    ) -> Result<(), NativeError>;

    fn count(&self, query: RawHandle) -> Result<usize, NativeError>;

    /// First match strictly after `start_after` in native order, or the first
    /// match overall when `start_after` is `None`.
    fn find_direct(
        &self,
        query: RawHandle,
        start_after: Option<RowKey>,
    ) -> Result<Option<RowKey>, NativeError>;

    fn release_query(&self, query: RawHandle);

    // ------------------------------------------------------------------
    // Sort descriptor
    // ------------------------------------------------------------------

    fn create_sort(&self, table: &str) -> Result<RawHandle, NativeError>;

    fn sort_add_clause(
        &self,
        sort: RawHandle,
        columns: &[ColumnIndex],
        ascending: bool,
    ) -> Result<(), NativeError>;

    fn release_sort(&self, sort: RawHandle);

    // ------------------------------------------------------------------
    // Results view
    // ------------------------------------------------------------------

    fn create_results(
        &self,
        query: RawHandle,
        sort: Option<RawHandle>,
    ) -> Result<RawHandle, NativeError>;

    fn results_count(&self, results: RawHandle) -> Result<usize, NativeError>;

    /// Row at `index`, or `None` past the end.
    fn results_get(&self, results: RawHandle, index: usize)
    -> Result<Option<RowKey>, NativeError>;

    fn release_results(&self, results: RawHandle);
}

///
/// NativeError
/// Failures reported across the native boundary.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum NativeError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("column {column} does not exist on '{table}'")]
    UnknownColumn { table: String, column: ColumnIndex },

    #[error("invalid {kind} handle {handle}")]
    InvalidHandle {
        kind: &'static str,
        handle: RawHandle,
    },

    #[error("predicate groups are not balanced")]
    UnbalancedGroup,

    #[error("operand {operand} cannot be applied with '{op}'")]
    UnsupportedOperand { operand: &'static str, op: CompareOp },

    #[error("native engine failure: {0}")]
    Engine(String),
}
