use tabula_core::{
    model::{SchemaError, ScalarKind},
    value::RowKey,
};
use thiserror::Error as ThisError;

///
/// MemoryError
/// Failures raised while defining tables or loading rows.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MemoryError {
    #[error("table '{0}' is already defined")]
    DuplicateTable(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("property '{table}.{property}' does not exist")]
    UnknownProperty { table: String, property: String },

    #[error("property '{table}.{property}' expects {expected}, found {found}")]
    KindMismatch {
        table: String,
        property: String,
        expected: ScalarKind,
        found: &'static str,
    },

    #[error("property '{table}.{property}' is required")]
    MissingValue { table: String, property: String },

    #[error("property '{table}.{property}' links to missing {row} in '{target}'")]
    DanglingLink {
        table: String,
        property: String,
        target: String,
        row: RowKey,
    },

    #[error("{0}")]
    Schema(#[from] SchemaError),
}
