//! Terminal execution.
//!
//! Opens the native handles for one translated query, replays its opcodes and
//! applies exactly one reducer. Handles are owned by this scope and released
//! on every exit path.
mod reducer;
mod results;


pub use results::{ResultsIter, ResultsView};

use crate::{
    config::QueryConfig,
    error::QueryError,
    native::{NativeStore, QueryHandle, ResultsHandle, SortHandle},
    obs::{
        TerminalKind,
        sink::{self, MetricsEvent, TerminalSpan},
    },
    translate::TranslatedQuery,
    value::{RecordRef, RowKey},
};

///
/// Terminal
/// One reducer applied at the end of a query graph.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Terminal {
    Count,
    Any,
    First { or_default: bool },
    Single { or_default: bool },
    Last { or_default: bool },
    ElementAt { index: usize, or_default: bool },
}

impl Terminal {
    #[must_use]
    pub const fn kind(self) -> TerminalKind {
        match self {
            Self::Count => TerminalKind::Count,
            Self::Any => TerminalKind::Any,
            Self::First { .. } => TerminalKind::First,
            Self::Single { .. } => TerminalKind::Single,
            Self::Last { .. } => TerminalKind::Last,
            Self::ElementAt { .. } => TerminalKind::ElementAt,
        }
    }
}

///
/// TerminalOutput
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TerminalOutput {
    Count(usize),
    Any(bool),
    /// `None` only for the `OrDefault` forms.
    Record(Option<RecordRef>),
}

impl TerminalOutput {
    const fn rows(&self) -> u64 {
        match self {
            Self::Count(_) | Self::Any(_) | Self::Record(None) => 0,
            Self::Record(Some(_)) => 1,
        }
    }
}

///
/// Executor
///

pub struct Executor<'p, 's, S: NativeStore + ?Sized> {
    store: &'s S,
    plan: &'p TranslatedQuery,
    config: &'p QueryConfig,
}

impl<'p, 's, S: NativeStore + ?Sized> Executor<'p, 's, S> {
    #[must_use]
    pub const fn new(store: &'s S, plan: &'p TranslatedQuery, config: &'p QueryConfig) -> Self {
        Self {
            store,
            plan,
            config,
        }
    }

    pub fn execute(&self, terminal: Terminal) -> Result<TerminalOutput, QueryError> {
        let mut span = TerminalSpan::new(terminal.kind(), &self.plan.table, self.config.metrics);
        let output = reducer::reduce(self, terminal)?;
        span.set_rows(output.rows());

        Ok(output)
    }

    /// Materialize the query as an index-addressable view.
    pub fn results(&self) -> Result<ResultsView<'s, S>, QueryError> {
        let mut span =
            TerminalSpan::new(TerminalKind::Results, &self.plan.table, self.config.metrics);
        let query = self.open_query()?;
        let sort = self.open_sort()?;
        let view = self.materialize(query, sort)?;
        span.set_rows(row_count(view.len()));

        Ok(view)
    }

    fn open_query(&self) -> Result<QueryHandle<'s, S>, QueryError> {
        let mut query = QueryHandle::create(self.store, &self.plan.table)?;
        self.plan.replay(&mut query)?;

        Ok(query)
    }

    // The descriptor exists iff at least one clause was requested.
    fn open_sort(&self) -> Result<Option<SortHandle<'s, S>>, QueryError> {
        let Some(plan) = &self.plan.sort else {
            return Ok(None);
        };

        let mut sort = SortHandle::create(self.store, &self.plan.table)?;
        for clause in &plan.clauses {
            sort.add_clause(&clause.columns, clause.ascending)?;
        }

        Ok(Some(sort))
    }

    fn materialize(
        &self,
        query: QueryHandle<'s, S>,
        sort: Option<SortHandle<'s, S>>,
    ) -> Result<ResultsView<'s, S>, QueryError> {
        let results = ResultsHandle::create(self.store, &query, sort.as_ref())?;
        let view = ResultsView::new(self.plan.table.clone(), results, sort, query)?;

        if self.config.metrics {
            sink::record(MetricsEvent::ResultsMaterialized {
                table: &self.plan.table,
                rows: row_count(view.len()),
            });
        }

        Ok(view)
    }

    fn record(&self, row: RowKey) -> RecordRef {
        RecordRef::new(self.plan.table.clone(), row)
    }
}

fn row_count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
