use crate::{
    model::ColumnIndex,
    value::{RowKey, Timestamp},
};
use derive_more::Display;
use std::fmt;

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum CompareOp {
    #[display("eq")]
    Eq = 0x01,
    #[display("neq")]
    Ne = 0x02,
    #[display("lt")]
    Lt = 0x03,
    #[display("lte")]
    Lte = 0x04,
    #[display("gt")]
    Gt = 0x05,
    #[display("gte")]
    Gte = 0x06,
}

impl CompareOp {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Operator to use when the operands are swapped (`5 < x` ≡ `x > 5`).
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Lt => Self::Gt,
            Self::Lte => Self::Gte,
            Self::Gt => Self::Lt,
            Self::Gte => Self::Lte,
        }
    }

    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

///
/// Operand
///
/// Right-hand side of one native comparison. Each variant selects one native
/// comparator family.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String { value: String, case_sensitive: bool },
    Timestamp(Timestamp),
    /// Non-empty byte sequence.
    Binary(Vec<u8>),
    /// Present-but-empty byte sequence; never matches a null value.
    EmptyBinary,
    /// Native row identity of a linked record.
    Object(RowKey),
    Null,
}

impl Operand {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String { .. } => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Binary(_) => "binary",
            Self::EmptyBinary => "empty-binary",
            Self::Object(_) => "object",
            Self::Null => "null",
        }
    }
}

///
/// StringOp
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum StringOp {
    #[display("contains")]
    Contains,
    #[display("starts-with")]
    StartsWith,
    #[display("ends-with")]
    EndsWith,
    #[display("like")]
    Like,
}

///
/// Opcode
///
/// One query-builder call, in emission order. A translated filter is a flat
/// opcode sequence whose grouping mirrors the boolean structure of the graph.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Opcode {
    GroupBegin,
    GroupEnd,
    Or,
    Not,
    Compare {
        column: ColumnIndex,
        op: CompareOp,
        operand: Operand,
    },
    String {
        column: ColumnIndex,
        op: StringOp,
        pattern: Option<String>,
        case_sensitive: bool,
    },
    FullText {
        column: ColumnIndex,
        terms: String,
    },
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupBegin => write!(f, "group-begin"),
            Self::GroupEnd => write!(f, "group-end"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::Compare {
                column,
                op,
                operand,
            } => write!(f, "{}-{op}({column}, {operand:?})", operand.label()),
            Self::String {
                column,
                op,
                pattern,
                case_sensitive,
            } => match pattern {
                Some(pattern) => write!(
                    f,
                    "string-{op}({column}, {pattern:?}, case_sensitive={case_sensitive})"
                ),
                None => write!(
                    f,
                    "string-{op}({column}, null, case_sensitive={case_sensitive})"
                ),
            },
            Self::FullText { column, terms } => write!(f, "full-text({column}, {terms:?})"),
        }
    }
}
