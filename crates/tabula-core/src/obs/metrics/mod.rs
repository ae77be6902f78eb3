use serde::{Deserialize, Serialize};
use std::{cell::RefCell, cmp::Ordering, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters and simple timing totals for query operations.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub tables: BTreeMap<String, TableCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            perf: EventPerf::default(),
            tables: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Translation
    pub translations: u64,
    pub translate_failures: u64,
    pub opcodes_emitted: u64,
    pub sort_clauses: u64,

    // Terminal entrypoints
    pub count_calls: u64,
    pub any_calls: u64,
    pub first_calls: u64,
    pub single_calls: u64,
    pub last_calls: u64,
    pub element_at_calls: u64,
    pub results_calls: u64,

    // Rows
    pub rows_returned: u64,
    pub results_materialized: u64,
}

///
/// TableCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableCounters {
    pub translations: u64,
    pub translate_failures: u64,
    pub terminal_calls: u64,
    pub rows_returned: u64,
    pub results_materialized: u64,
}

///
/// EventPerf
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventPerf {
    // Wall-clock totals across terminal operations, in microseconds
    pub terminal_micros_total: u128,

    // Maximum observed terminal duration
    pub terminal_micros_max: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all event state: counters, perf and per-table entries.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Accumulate a duration and track the max.
pub(crate) fn add_duration(total: &mut u128, max: &mut u64, delta_micros: u64) {
    *total = total.saturating_add(u128::from(delta_micros));
    if delta_micros > *max {
        *max = delta_micros;
    }
}

///
/// EventReport
/// Counter report for the current metrics window.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-table counters and averages.
    pub table_counters: Vec<TableSummary>,
}

///
/// TableSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub translations: u64,
    pub translate_failures: u64,
    pub terminal_calls: u64,
    pub rows_returned: u64,
    pub results_materialized: u64,
    pub avg_rows_per_terminal: f64,
}

/// Build a report from in-memory counters, or an empty one when the caller
/// asks for a window that starts after the current one.
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let current = with_state(|m| m.window_start_ms);
    if window_start_ms.is_some_and(|start| start > current) {
        return EventReport::default();
    }

    report()
}

/// Build a metrics report by inspecting in-memory counters only.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut table_counters: Vec<TableSummary> = snap
        .tables
        .iter()
        .map(|(table, c)| TableSummary {
            table: table.clone(),
            translations: c.translations,
            translate_failures: c.translate_failures,
            terminal_calls: c.terminal_calls,
            rows_returned: c.rows_returned,
            results_materialized: c.results_materialized,
            avg_rows_per_terminal: if c.terminal_calls > 0 {
                c.rows_returned as f64 / c.terminal_calls as f64
            } else {
                0.0
            },
        })
        .collect();

    table_counters.sort_by(|a, b| {
        match b
            .avg_rows_per_terminal
            .partial_cmp(&a.avg_rows_per_terminal)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => match b.terminal_calls.cmp(&a.terminal_calls) {
                Ordering::Equal => a.table.cmp(&b.table),
                other => other,
            },
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        table_counters,
    }
}

///
/// TESTS
///
