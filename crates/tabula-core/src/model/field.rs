use derive_more::Display;

///
/// ColumnIndex
/// The native engine's integer identifier for one declared property.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("col#{_0}")]
pub struct ColumnIndex(pub u32);

///
/// ScalarKind
///
/// Minimal type surface the translator needs.
/// Integer widths collapse into `Int`; single and double precision stay apart
/// because the native comparators differ.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ScalarKind {
    Int,
    Bool,
    Float,
    Double,
    String,
    Timestamp,
    Data,
    /// To-one link to another record type.
    Object,
}

impl ScalarKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Timestamp => "timestamp",
            Self::Data => "data",
            Self::Object => "object",
        }
    }

    /// Kinds a sort clause may terminate on.
    #[must_use]
    pub const fn is_sortable(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Bool | Self::Float | Self::Double | Self::String | Self::Timestamp
        )
    }
}

///
/// CollectionKind
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum CollectionKind {
    #[default]
    None,
    List,
    Set,
}

///
/// PropertyInfo
/// Runtime metadata for one persisted property, as reported by the store.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyInfo {
    pub column: ColumnIndex,
    pub kind: ScalarKind,
    pub nullable: bool,
    pub collection: CollectionKind,
    /// Target type name for `Object` properties (and collections of links).
    pub linked_type: Option<String>,
}

impl PropertyInfo {
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        !matches!(self.collection, CollectionKind::None)
    }

    /// Whether this property is a single to-one link that a sort chain may
    /// traverse.
    #[must_use]
    pub const fn is_to_one_link(&self) -> bool {
        matches!(self.kind, ScalarKind::Object) && !self.is_collection()
    }
}

///
/// PropertyModel
/// One named property within a `TypeSchema`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyModel {
    pub name: String,
    pub info: PropertyInfo,
}

impl PropertyModel {
    /// Required scalar property.
    #[must_use]
    pub fn scalar(name: impl Into<String>, column: u32, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            info: PropertyInfo {
                column: ColumnIndex(column),
                kind,
                nullable: false,
                collection: CollectionKind::None,
                linked_type: None,
            },
        }
    }

    /// Nullable scalar property.
    #[must_use]
    pub fn nullable(name: impl Into<String>, column: u32, kind: ScalarKind) -> Self {
        let mut model = Self::scalar(name, column, kind);
        model.info.nullable = true;
        model
    }

    /// To-one link; links are always nullable.
    #[must_use]
    pub fn link(name: impl Into<String>, column: u32, target: impl Into<String>) -> Self {
        let mut model = Self::nullable(name, column, ScalarKind::Object);
        model.info.linked_type = Some(target.into());
        model
    }

    /// Collection of scalars (or of links when `kind` is `Object`).
    #[must_use]
    pub fn collection(
        name: impl Into<String>,
        column: u32,
        kind: ScalarKind,
        collection: CollectionKind,
    ) -> Self {
        let mut model = Self::scalar(name, column, kind);
        model.info.collection = collection;
        model
    }

    #[must_use]
    pub fn linked_to(mut self, target: impl Into<String>) -> Self {
        self.info.linked_type = Some(target.into());
        self
    }
}
