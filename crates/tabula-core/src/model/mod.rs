//! Runtime schema metadata.
//!
//! The store reports its schema once when it is opened; `SchemaMetadata` is
//! the immutable per-type property map the translator resolves names against.
//! Nothing in the query engine mutates it.
pub mod entity;
pub mod field;


use crate::native::NativeStore;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

// re-exports
pub use entity::TypeSchema;
pub use field::{ColumnIndex, CollectionKind, PropertyInfo, PropertyModel, ScalarKind};

///
/// SchemaProvider
///
/// Read-only lookup surface for property metadata.
///

pub trait SchemaProvider {
    fn try_find_property(&self, type_name: &str, property: &str) -> Option<PropertyInfo>;

    fn has_type(&self, type_name: &str) -> bool;
}

///
/// SchemaMetadata
///
/// Property → column map for every record type in one open store.
///

#[derive(Clone, Debug, Default)]
pub struct SchemaMetadata {
    types: BTreeMap<String, BTreeMap<String, PropertyInfo>>,
}

impl SchemaMetadata {
    /// Build and validate metadata from declared type schemas.
    pub fn build<I>(types: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = TypeSchema>,
    {
        let mut out: BTreeMap<String, BTreeMap<String, PropertyInfo>> = BTreeMap::new();

        for ty in types {
            if out.contains_key(&ty.name) {
                return Err(SchemaError::DuplicateType { name: ty.name });
            }

            let mut props = BTreeMap::new();
            let mut columns = BTreeSet::new();
            for prop in ty.properties {
                if !columns.insert(prop.info.column) {
                    return Err(SchemaError::DuplicateColumn {
                        type_name: ty.name,
                        column: prop.info.column,
                    });
                }
                if prop.info.kind == ScalarKind::Object && prop.info.linked_type.is_none() {
                    return Err(SchemaError::MissingLinkTarget {
                        type_name: ty.name,
                        property: prop.name,
                    });
                }
                if props.contains_key(&prop.name) {
                    return Err(SchemaError::DuplicateProperty {
                        type_name: ty.name,
                        property: prop.name,
                    });
                }
                props.insert(prop.name, prop.info);
            }

            out.insert(ty.name, props);
        }

        // Links may only point at types declared in the same store.
        for (type_name, props) in &out {
            for (name, info) in props {
                if let Some(target) = &info.linked_type
                    && !out.contains_key(target)
                {
                    return Err(SchemaError::UnknownLinkTarget {
                        type_name: type_name.clone(),
                        property: name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(Self { types: out })
    }

    #[must_use]
    pub fn property(&self, type_name: &str, property: &str) -> Option<&PropertyInfo> {
        self.types.get(type_name)?.get(property)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Confirm every declared column agrees with the native store's own
    /// column numbering.
    pub fn verify_against<S>(&self, store: &S) -> Result<(), SchemaError>
    where
        S: NativeStore + ?Sized,
    {
        for (type_name, props) in &self.types {
            for (name, info) in props {
                match store.column_index(type_name, name) {
                    Some(column) if column == info.column => {}
                    found => {
                        return Err(SchemaError::ColumnMismatch {
                            type_name: type_name.clone(),
                            property: name.clone(),
                            declared: info.column,
                            native: found,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl SchemaProvider for SchemaMetadata {
    fn try_find_property(&self, type_name: &str, property: &str) -> Option<PropertyInfo> {
        self.property(type_name, property).cloned()
    }

    fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
}

///
/// SchemaError
/// Invalid schema contracts detected while building or verifying metadata.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("type '{name}' is declared more than once")]
    DuplicateType { name: String },

    #[error("property '{type_name}.{property}' is declared more than once")]
    DuplicateProperty { type_name: String, property: String },

    #[error("column {column} is assigned twice on '{type_name}'")]
    DuplicateColumn {
        type_name: String,
        column: ColumnIndex,
    },

    #[error("object property '{type_name}.{property}' has no link target")]
    MissingLinkTarget { type_name: String, property: String },

    #[error("property '{type_name}.{property}' links to unknown type '{target}'")]
    UnknownLinkTarget {
        type_name: String,
        property: String,
        target: String,
    },

    #[error(
        "property '{type_name}.{property}' declares {declared} but the store reports {native:?}"
    )]
    ColumnMismatch {
        type_name: String,
        property: String,
        declared: ColumnIndex,
        native: Option<ColumnIndex>,
    },
}
