//! Query graph translation.
//!
//! Walks the accumulated filter and sort graph once and produces a fully
//! specified native call sequence. Translation is pure: it records opcodes
//! into a sink and resolves sort chains to column paths, and only once the
//! whole graph has succeeded does the executor open native handles and
//! replay it. A translation failure therefore never leaves partial native
//! state behind.
mod constant;
mod predicate;
mod sort;

#[cfg(test)]
mod tests;

pub use constant::ConstantEvaluator;
pub use predicate::PredicateTranslator;
pub use sort::{SortClause, SortClauseBuilder, SortOperator, SortPlan, SortRequest};

use crate::{
    config::QueryConfig,
    error::QueryError,
    expr::{Expr, StaticRegistry},
    model::SchemaProvider,
    native::{NativeStore, Opcode, QueryHandle},
};
use std::fmt;

///
/// PredicateSink
///
/// Accumulator the predicate translator emits into, in emission order.
///

pub trait PredicateSink {
    fn emit(&mut self, opcode: Opcode) -> Result<(), QueryError>;
}

///
/// RecordingSink
/// Collects opcodes in memory without touching any native handle.
///

#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    opcodes: Vec<Opcode>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn opcodes(&self) -> &[Opcode] {
        &self.opcodes
    }

    #[must_use]
    pub fn into_opcodes(self) -> Vec<Opcode> {
        self.opcodes
    }
}

impl PredicateSink for RecordingSink {
    fn emit(&mut self, opcode: Opcode) -> Result<(), QueryError> {
        self.opcodes.push(opcode);
        Ok(())
    }
}

impl<S: NativeStore + ?Sized> PredicateSink for QueryHandle<'_, S> {
    fn emit(&mut self, opcode: Opcode) -> Result<(), QueryError> {
        self.apply(&opcode).map_err(QueryError::from)
    }
}

///
/// TranslateContext
/// Read-only inputs shared by every translation step of one query.
///

#[derive(Clone, Copy)]
pub struct TranslateContext<'a> {
    pub schema: &'a dyn SchemaProvider,
    pub statics: &'a StaticRegistry,
    pub config: &'a QueryConfig,
    pub table: &'a str,
}

///
/// TranslatedQuery
/// Output of one successful translation pass.
///

#[derive(Clone, Debug, PartialEq)]
pub struct TranslatedQuery {
    pub table: String,
    pub opcodes: Vec<Opcode>,
    pub sort: Option<SortPlan>,
}

impl TranslatedQuery {
    #[must_use]
    pub const fn is_sorted(&self) -> bool {
        self.sort.is_some()
    }

    /// Replay the recorded opcodes onto a native query handle.
    pub fn replay<S>(&self, query: &mut QueryHandle<'_, S>) -> Result<(), QueryError>
    where
        S: NativeStore + ?Sized,
    {
        for opcode in &self.opcodes {
            query.emit(opcode.clone())?;
        }

        Ok(())
    }
}

impl fmt::Display for TranslatedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "query {}", self.table)?;
        for opcode in &self.opcodes {
            writeln!(f, "  {opcode}")?;
        }
        if let Some(sort) = &self.sort {
            for clause in &sort.clauses {
                writeln!(f, "  sort {clause}")?;
            }
        }

        Ok(())
    }
}

/// Translate every filter (implicitly AND-ed) and the sort request list.
pub fn translate_graph(
    ctx: TranslateContext<'_>,
    filters: &[Expr],
    ordering: &[SortRequest],
) -> Result<TranslatedQuery, QueryError> {
    if !ctx.schema.has_type(ctx.table) {
        return Err(QueryError::unsupported(format!(
            "table '{}' is not part of the schema",
            ctx.table
        )));
    }

    tracing::debug!(
        table = ctx.table,
        filters = filters.len(),
        sort_requests = ordering.len(),
        "translating query graph"
    );

    let translator = PredicateTranslator::new(ctx);
    let mut sink = RecordingSink::new();
    for filter in filters {
        translator.translate(filter, &mut sink)?;
    }

    let mut sorts = SortClauseBuilder::new(ctx.schema, ctx.table);
    for request in ordering {
        sorts.add_clause(request)?;
    }
    let sort = sorts.finish();

    let opcodes = sink.into_opcodes();
    tracing::debug!(
        table = ctx.table,
        opcodes = opcodes.len(),
        sort_clauses = sort.as_ref().map_or(0, |plan| plan.clauses.len()),
        "translated query graph"
    );

    Ok(TranslatedQuery {
        table: ctx.table.to_string(),
        opcodes,
        sort,
    })
}
