//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Translation and execution never touch `metrics` directly; every counter
//! update flows through a `MetricsEvent` recorded on the active sink.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventPerf, EventReport, EventState, TableCounters, TableSummary};
pub use sink::{
    MetricsEvent, MetricsSink, TerminalKind, metrics_report, metrics_reset_all, with_metrics_sink,
};
