mod timestamp;


use crate::model::{PropertyInfo, ScalarKind};
use derive_more::Display;

// re-exports
pub use timestamp::Timestamp;

///
/// RowKey
///
/// Native row identity. Two records are the same record exactly when their
/// table and row key agree; field values never take part in identity.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("row#{_0}")]
pub struct RowKey(pub u64);

///
/// RecordRef
///
/// Reference to one managed record, as handed back by the reducers and as
/// accepted by identity comparisons against to-one links.
///

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
#[display("{table}/{row}")]
pub struct RecordRef {
    pub table: String,
    pub row: RowKey,
}

impl RecordRef {
    #[must_use]
    pub fn new(table: impl Into<String>, row: RowKey) -> Self {
        Self {
            table: table.into(),
            row,
        }
    }
}

///
/// Literal
///
/// Fully resolved scalar used on the value side of a comparison.
/// Opcode selection dispatches on the variant, never on the declared
/// property kind.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Char(char),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Timestamp(Timestamp),
    Bytes(Vec<u8>),
    /// Managed record, compared by native row identity.
    Object(RecordRef),
}

impl Literal {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Runtime type label used in diagnostics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Str(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Bytes(_) => "bytes",
            Self::Object(_) => "object",
        }
    }

    /// Whether this literal may be compared against the given property.
    ///
    /// Kinds never coerce into each other; the only widening allowed is
    /// `Char` into integer columns, and only while `char_int_compat` holds.
    #[must_use]
    pub fn is_compatible_with(&self, property: &PropertyInfo, char_int_compat: bool) -> bool {
        match (self, property.kind) {
            (Self::Null, _) => property.nullable,
            (Self::I32(_) | Self::I64(_), ScalarKind::Int)
            | (Self::Bool(_), ScalarKind::Bool)
            | (Self::F32(_), ScalarKind::Float)
            | (Self::F64(_), ScalarKind::Double)
            | (Self::Str(_), ScalarKind::String)
            | (Self::Timestamp(_), ScalarKind::Timestamp)
            | (Self::Bytes(_), ScalarKind::Data) => true,
            (Self::Char(_), ScalarKind::Int) => char_int_compat,
            (Self::Object(record), ScalarKind::Object) => {
                property.linked_type.as_deref() == Some(record.table.as_str())
            }
            _ => false,
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<char> for Literal {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Self::F32(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Timestamp> for Literal {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<u8>> for Literal {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Literal {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<RecordRef> for Literal {
    fn from(value: RecordRef) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
