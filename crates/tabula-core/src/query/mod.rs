//! Chained query graph.
//!
//! A `Query` accumulates filters and orderings without touching the store.
//! Each terminal translates the whole graph once, then hands the result to
//! the executor.


use crate::{
    error::{InternalError, QueryError},
    executor::{Executor, ResultsView, Terminal, TerminalOutput},
    expr::{Expr, PropertyChain},
    native::NativeStore,
    obs::MetricsEvent,
    session::Session,
    translate::{SortOperator, SortRequest, TranslateContext, TranslatedQuery, translate_graph},
    value::RecordRef,
};

///
/// Query
///

pub struct Query<'q, S: NativeStore + ?Sized> {
    session: &'q Session<'q, S>,
    table: String,
    filters: Vec<Expr>,
    ordering: Vec<SortRequest>,
}

impl<S: NativeStore + ?Sized> Clone for Query<'_, S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            table: self.table.clone(),
            filters: self.filters.clone(),
            ordering: self.ordering.clone(),
        }
    }
}

impl<'q, S: NativeStore + ?Sized> Query<'q, S> {
    pub(crate) fn new(session: &'q Session<'q, S>, table: &str) -> Self {
        Self {
            session,
            table: table.to_string(),
            filters: Vec::new(),
            ordering: Vec::new(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    // ------------------------------------------------------------------
    // Chaining
    // ------------------------------------------------------------------

    /// Add a filter; successive filters AND together.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filters.push(predicate);
        self
    }

    #[must_use]
    pub fn order_by(self, chain: impl Into<PropertyChain>) -> Self {
        self.sort(chain, SortOperator::OrderBy)
    }

    #[must_use]
    pub fn order_by_descending(self, chain: impl Into<PropertyChain>) -> Self {
        self.sort(chain, SortOperator::OrderByDescending)
    }

    #[must_use]
    pub fn then_by(self, chain: impl Into<PropertyChain>) -> Self {
        self.sort(chain, SortOperator::ThenBy)
    }

    #[must_use]
    pub fn then_by_descending(self, chain: impl Into<PropertyChain>) -> Self {
        self.sort(chain, SortOperator::ThenByDescending)
    }

    // Ordering mistakes are recorded as-is and reported when a terminal runs.
    fn sort(mut self, chain: impl Into<PropertyChain>, operator: SortOperator) -> Self {
        self.ordering.push(SortRequest::new(chain, operator));
        self
    }

    // ------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------

    pub fn count(&self) -> Result<usize, QueryError> {
        match self.run(Terminal::Count)? {
            TerminalOutput::Count(count) => Ok(count),
            other => Err(unexpected(Terminal::Count, &other)),
        }
    }

    pub fn any(&self) -> Result<bool, QueryError> {
        match self.run(Terminal::Any)? {
            TerminalOutput::Any(found) => Ok(found),
            other => Err(unexpected(Terminal::Any, &other)),
        }
    }

    pub fn first(&self) -> Result<RecordRef, QueryError> {
        self.required(Terminal::First { or_default: false })
    }

    pub fn first_or_default(&self) -> Result<Option<RecordRef>, QueryError> {
        self.record(Terminal::First { or_default: true })
    }

    pub fn single(&self) -> Result<RecordRef, QueryError> {
        self.required(Terminal::Single { or_default: false })
    }

    pub fn single_or_default(&self) -> Result<Option<RecordRef>, QueryError> {
        self.record(Terminal::Single { or_default: true })
    }

    pub fn last(&self) -> Result<RecordRef, QueryError> {
        self.required(Terminal::Last { or_default: false })
    }

    pub fn last_or_default(&self) -> Result<Option<RecordRef>, QueryError> {
        self.record(Terminal::Last { or_default: true })
    }

    pub fn element_at(&self, index: usize) -> Result<RecordRef, QueryError> {
        self.required(Terminal::ElementAt {
            index,
            or_default: false,
        })
    }

    pub fn element_at_or_default(&self, index: usize) -> Result<Option<RecordRef>, QueryError> {
        self.record(Terminal::ElementAt {
            index,
            or_default: true,
        })
    }

    /// Materialize every match as an iterable view.
    pub fn results(&self) -> Result<ResultsView<'q, S>, QueryError> {
        let plan = self.translate()?;
        let session = self.session;

        Executor::new(session.store(), &plan, session.config()).results()
    }

    /// Translate without executing; the native store is not touched.
    pub fn explain(&self) -> Result<TranslatedQuery, QueryError> {
        self.translate()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn translate(&self) -> Result<TranslatedQuery, QueryError> {
        let session = self.session;
        session.record(MetricsEvent::TranslateStart { table: &self.table });

        let ctx = TranslateContext {
            schema: session.schema(),
            statics: session.statics(),
            config: session.config(),
            table: &self.table,
        };

        match translate_graph(ctx, &self.filters, &self.ordering) {
            Ok(plan) => {
                session.record(MetricsEvent::Translated {
                    table: &self.table,
                    opcodes: widen(plan.opcodes.len()),
                    sort_clauses: widen(plan.sort.as_ref().map_or(0, |s| s.clauses.len())),
                });
                Ok(plan)
            }
            Err(err) => {
                session.record(MetricsEvent::TranslateFailed {
                    table: &self.table,
                    class: err.class(),
                });
                Err(err)
            }
        }
    }

    fn run(&self, terminal: Terminal) -> Result<TerminalOutput, QueryError> {
        let plan = self.translate()?;
        let session = self.session;

        Executor::new(session.store(), &plan, session.config()).execute(terminal)
    }

    fn record(&self, terminal: Terminal) -> Result<Option<RecordRef>, QueryError> {
        match self.run(terminal)? {
            TerminalOutput::Record(record) => Ok(record),
            other => Err(unexpected(terminal, &other)),
        }
    }

    // Plain variants already fail inside the reducer when nothing matches.
    fn required(&self, terminal: Terminal) -> Result<RecordRef, QueryError> {
        self.record(terminal)?.ok_or_else(|| {
            InternalError::executor_invariant(format!(
                "{terminal:?} returned no record without failing"
            ))
            .into()
        })
    }
}

fn unexpected(terminal: Terminal, output: &TerminalOutput) -> QueryError {
    InternalError::executor_invariant(format!(
        "{terminal:?} produced {output:?}"
    ))
    .into()
}

fn widen(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
