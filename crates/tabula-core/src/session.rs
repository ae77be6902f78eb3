use crate::{
    config::QueryConfig,
    error::QueryError,
    expr::{HostValue, StaticRegistry},
    model::{SchemaMetadata, SchemaProvider},
    native::NativeStore,
    obs::{MetricsEvent, sink},
    query::Query,
};
use std::marker::PhantomData;

///
/// Session
///
/// Thread-affine view of one open store: the native boundary, its schema
/// metadata, registered statics and engine configuration. Queries borrow the
/// session; the session is neither `Send` nor `Sync`, so neither are the
/// queries and handles created from it.
///

pub struct Session<'s, S: NativeStore + ?Sized> {
    store: &'s S,
    schema: &'s SchemaMetadata,
    statics: StaticRegistry,
    config: QueryConfig,
    _not_send: PhantomData<*const ()>,
}

impl<'s, S: NativeStore + ?Sized> Session<'s, S> {
    /// Open a session after confirming the schema agrees with the store's own
    /// column numbering.
    pub fn open(
        store: &'s S,
        schema: &'s SchemaMetadata,
        config: QueryConfig,
    ) -> Result<Self, QueryError> {
        schema.verify_against(store)?;
        tracing::debug!(
            types = schema.type_names().count(),
            last_strategy = ?config.last_strategy,
            "opened query session"
        );

        Ok(Self {
            store,
            schema,
            statics: StaticRegistry::new(),
            config,
            _not_send: PhantomData,
        })
    }

    #[must_use]
    pub fn with_statics(mut self, statics: StaticRegistry) -> Self {
        self.statics = statics;
        self
    }

    pub fn register_static(
        &mut self,
        owner: impl Into<String>,
        member: impl Into<String>,
        value: impl Into<HostValue>,
    ) {
        self.statics.register(owner, member, value);
    }

    /// Start a query over one table.
    pub fn query(&self, table: &str) -> Result<Query<'_, S>, QueryError> {
        if !self.schema.has_type(table) {
            return Err(QueryError::unsupported(format!(
                "table '{table}' is not part of the schema"
            )));
        }

        Ok(Query::new(self, table))
    }

    #[must_use]
    pub const fn store(&self) -> &'s S {
        self.store
    }

    #[must_use]
    pub const fn schema(&self) -> &'s SchemaMetadata {
        self.schema
    }

    #[must_use]
    pub const fn statics(&self) -> &StaticRegistry {
        &self.statics
    }

    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub(crate) fn record(&self, event: MetricsEvent<'_>) {
        if self.config.metrics {
            sink::record(event);
        }
    }
}
