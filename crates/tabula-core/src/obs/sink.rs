//! Where metrics events go.
//!
//! Translation and execution emit `MetricsEvent`s through `record` and never
//! touch `obs::metrics` themselves. Events land in the thread-local global
//! counters unless a scoped sink has been pushed for the current thread.
use crate::{error::ErrorClass, obs::metrics};
use std::{cell::RefCell, rc::Rc, time::Instant};

thread_local! {
    static SCOPED_SINKS: RefCell<Vec<Rc<dyn MetricsSink>>> = const { RefCell::new(Vec::new()) };
}

///
/// TerminalKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TerminalKind {
    Count,
    Any,
    First,
    Single,
    Last,
    ElementAt,
    Results,
}

impl TerminalKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Any => "any",
            Self::First => "first",
            Self::Single => "single",
            Self::Last => "last",
            Self::ElementAt => "element_at",
            Self::Results => "results",
        }
    }
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    TranslateStart {
        table: &'a str,
    },
    Translated {
        table: &'a str,
        opcodes: u64,
        sort_clauses: u64,
    },
    TranslateFailed {
        table: &'a str,
        class: ErrorClass,
    },
    Terminal {
        kind: TerminalKind,
        table: &'a str,
        rows: u64,
        micros: u64,
    },
    ResultsMaterialized {
        table: &'a str,
        rows: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::TranslateStart { table } => {
                metrics::with_state_mut(|m| {
                    m.ops.translations = m.ops.translations.saturating_add(1);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.translations = entry.translations.saturating_add(1);
                });
            }

            MetricsEvent::Translated {
                table: _,
                opcodes,
                sort_clauses,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.opcodes_emitted = m.ops.opcodes_emitted.saturating_add(opcodes);
                    m.ops.sort_clauses = m.ops.sort_clauses.saturating_add(sort_clauses);
                });
            }

            MetricsEvent::TranslateFailed { table, class } => {
                tracing::debug!(table, %class, "query translation failed");
                metrics::with_state_mut(|m| {
                    m.ops.translate_failures = m.ops.translate_failures.saturating_add(1);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.translate_failures = entry.translate_failures.saturating_add(1);
                });
            }

            MetricsEvent::Terminal {
                kind,
                table,
                rows,
                micros,
            } => {
                metrics::with_state_mut(|m| {
                    let calls = match kind {
                        TerminalKind::Count => &mut m.ops.count_calls,
                        TerminalKind::Any => &mut m.ops.any_calls,
                        TerminalKind::First => &mut m.ops.first_calls,
                        TerminalKind::Single => &mut m.ops.single_calls,
                        TerminalKind::Last => &mut m.ops.last_calls,
                        TerminalKind::ElementAt => &mut m.ops.element_at_calls,
                        TerminalKind::Results => &mut m.ops.results_calls,
                    };
                    *calls = calls.saturating_add(1);
                    m.ops.rows_returned = m.ops.rows_returned.saturating_add(rows);
                    metrics::add_duration(
                        &mut m.perf.terminal_micros_total,
                        &mut m.perf.terminal_micros_max,
                        micros,
                    );

                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.terminal_calls = entry.terminal_calls.saturating_add(1);
                    entry.rows_returned = entry.rows_returned.saturating_add(rows);
                });
            }

            MetricsEvent::ResultsMaterialized { table, rows: _ } => {
                metrics::with_state_mut(|m| {
                    m.ops.results_materialized = m.ops.results_materialized.saturating_add(1);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.results_materialized = entry.results_materialized.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    // Take the sink out of the slot before calling it; a sink may record too.
    let scoped = SCOPED_SINKS.with(|stack| stack.borrow().last().cloned());

    match scoped {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state (counters + perf).
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Send this thread's events to `sink` while `f` runs. Scopes nest and the
/// innermost sink receives events; each scope is popped when `f` returns or
/// unwinds.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct PopOnDrop;

    impl Drop for PopOnDrop {
        fn drop(&mut self) {
            SCOPED_SINKS.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }

    SCOPED_SINKS.with(|stack| stack.borrow_mut().push(sink));
    let _pop = PopOnDrop;

    f()
}

///
/// TerminalSpan
///
/// RAII guard that emits one `Terminal` event per terminal operation,
/// including when the operation fails or unwinds. Disabled spans record
/// nothing.
///

pub(crate) struct TerminalSpan<'a> {
    kind: TerminalKind,
    table: &'a str,
    start: Instant,
    rows: u64,
    enabled: bool,
}

impl<'a> TerminalSpan<'a> {
    #[must_use]
    pub(crate) fn new(kind: TerminalKind, table: &'a str, enabled: bool) -> Self {
        tracing::debug!(table, terminal = kind.label(), "executing terminal");

        Self {
            kind,
            table,
            start: Instant::now(),
            rows: 0,
            enabled,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for TerminalSpan<'_> {
    fn drop(&mut self) {
        let micros = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);
        tracing::trace!(
            table = self.table,
            terminal = self.kind.label(),
            rows = self.rows,
            micros,
            "terminal finished"
        );

        if self.enabled {
            record(MetricsEvent::Terminal {
                kind: self.kind,
                table: self.table,
                rows: self.rows,
                micros,
            });
        }
    }
}

///
/// TESTS
///
