//! In-memory reference engine for the tabula native store protocol.
//!
//! `MemoryStore` keeps typed rows per table, interprets the query-builder
//! opcode stream, sorts through to-one links and serves results views, so the
//! query layer can be driven end to end without a native library.
mod error;
mod program;
mod store;
mod text;
mod value;

pub use error::MemoryError;
pub use store::MemoryStore;
pub use value::StoredValue;
