use std::cmp::Ordering;
use tabula_core::{
    model::{PropertyInfo, ScalarKind},
    value::{RowKey, Timestamp},
};

///
/// StoredValue
///
/// One cell as the in-memory engine keeps it. Integer widths collapse into
/// `Int`; links hold the target row only, the target table comes from the
/// schema.
///

#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
    Timestamp(Timestamp),
    Data(Vec<u8>),
    Link(RowKey),
    List(Vec<Self>),
}

impl StoredValue {
    /// Collection cell.
    #[must_use]
    pub fn list<T: Into<Self>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Data(_) => "data",
            Self::Link(_) => "link",
            Self::List(_) => "list",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value may be stored under the given property.
    pub(crate) fn fits(&self, info: &PropertyInfo) -> bool {
        if info.is_collection() {
            return match self {
                Self::List(items) => items.iter().all(|item| item.fits_scalar(info.kind)),
                _ => false,
            };
        }

        match self {
            Self::Null => info.nullable,
            other => other.fits_scalar(info.kind),
        }
    }

    const fn fits_scalar(&self, kind: ScalarKind) -> bool {
        matches!(
            (self, kind),
            (Self::Bool(_), ScalarKind::Bool)
                | (Self::Int(_), ScalarKind::Int)
                | (Self::Float(_), ScalarKind::Float)
                | (Self::Double(_), ScalarKind::Double)
                | (Self::String(_), ScalarKind::String)
                | (Self::Timestamp(_), ScalarKind::Timestamp)
                | (Self::Data(_), ScalarKind::Data)
                | (Self::Link(_), ScalarKind::Object)
        )
    }

    /// Total order used by sort descriptors: nulls first, then same-variant
    /// ordering. Mixed variants never meet in one sortable column.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

macro_rules! stored_value_from {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for StoredValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

stored_value_from!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Double,
    &str => String,
    String => String,
    Timestamp => Timestamp,
    Vec<u8> => Data,
    &[u8] => Data,
    RowKey => Link,
);

impl<T: Into<Self>> From<Option<T>> for StoredValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

