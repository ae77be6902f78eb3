//! Client-side query translation and execution for schema-typed stores
//! reached through a native handle boundary: expression graphs, predicate
//! and sort translation, terminal reducers and the scoped native handles
//! they drive.

// public exports are one module level down
pub mod config;
pub mod error;
pub mod executor;
pub mod expr;
pub mod model;
pub mod native;
pub mod obs;
pub mod query;
pub mod session;
pub mod translate;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains the query-building vocabulary.
/// No executors, sinks or native handles are re-exported here.
///

pub mod prelude {
    pub use crate::{
        config::{LastStrategy, QueryConfig},
        error::QueryError,
        expr::{
            Expr, HostObject, HostValue, PropertyChain, StringComparison, field,
            is_null_or_empty, lit, null, object, param, static_member, string_equals,
        },
        model::{PropertyModel, ScalarKind, SchemaMetadata, TypeSchema},
        native::NativeStore,
        query::Query,
        session::Session,
        value::{Literal, RecordRef, RowKey, Timestamp},
    };
}
