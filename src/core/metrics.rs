//! Metrics collaborator boundary.
//!
//! The orchestrator depends on this trait, not a concrete exporter, so the
//! core stays free of any particular metrics backend. A production
//! deployment wires in whatever the surrounding service uses; tests wire in
//! [`NoopMetricsRecorder`] or a recording stub.

use crate::core::auction::revshare::MarginReport;

pub trait MetricsRecorder: Send + Sync {
    fn record_margin(&self, report: &MarginReport);
    fn record_floor_adjustment(&self, publisher_id: &str, raw_floor: f64, adjusted_floor: f64);
}

pub struct NoopMetricsRecorder;

impl MetricsRecorder for NoopMetricsRecorder {
    fn record_margin(&self, _report: &MarginReport) {}
    fn record_floor_adjustment(&self, _publisher_id: &str, _raw_floor: f64, _adjusted_floor: f64) {}
}
