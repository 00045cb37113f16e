//! Per-auction debug/diagnostic surfaces, aggregated by the orchestrator and
//! attached to the response for callers that opt in to verbose output.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::bidder::DemandType;
use crate::rtb::bid_response::Bid;

/// Per-bidder outcome summary, independent of how the dispatcher classified
/// the underlying HTTP call.
#[derive(Debug, Clone, Default)]
pub struct BidderResult {
    pub bidder: String,
    pub bids: Vec<Bid>,
    pub errors: Vec<String>,
    pub latency: Duration,
    pub timed_out: bool,
    pub selected: bool,
}

/// A bid that survived per-bid validation and dedup, tagged with the
/// bidder and demand type it came from.
#[derive(Debug, Clone)]
pub struct ValidatedBid {
    pub bid: Bid,
    pub bidder: String,
    pub demand_type: DemandType,
}

/// Aggregated diagnostic record for one auction. Access is serialized under
/// a lock since the dispatcher's concurrent bidder tasks each contribute a
/// `BidderResult` as they complete.
#[derive(Debug, Default)]
pub struct DebugInfo {
    inner: Mutex<DebugInfoInner>,
}

#[derive(Debug, Default)]
struct DebugInfoInner {
    total_latency: Duration,
    per_bidder_latency: HashMap<String, Duration>,
    selected_bidders: Vec<String>,
    excluded_bidders: Vec<String>,
    per_bidder_errors: HashMap<String, Vec<String>>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total_latency(&self, latency: Duration) {
        self.inner.lock().total_latency = latency;
    }

    pub fn set_selection(&self, selected: Vec<String>, excluded: Vec<String>) {
        let mut inner = self.inner.lock();
        inner.selected_bidders = selected;
        inner.excluded_bidders = excluded;
    }

    pub fn record_bidder_result(&self, result: &BidderResult) {
        let mut inner = self.inner.lock();
        inner.per_bidder_latency.insert(result.bidder.clone(), result.latency);
        if !result.errors.is_empty() {
            inner.per_bidder_errors.insert(result.bidder.clone(), result.errors.clone());
        }
    }

    pub fn record_bid_error(&self, bidder: &str, error: impl Into<String>) {
        self.inner.lock().per_bidder_errors.entry(bidder.to_string()).or_default().push(error.into());
    }

    pub fn snapshot(&self) -> DebugInfoSnapshot {
        let inner = self.inner.lock();
        DebugInfoSnapshot {
            total_latency: inner.total_latency,
            per_bidder_latency: inner.per_bidder_latency.clone(),
            selected_bidders: inner.selected_bidders.clone(),
            excluded_bidders: inner.excluded_bidders.clone(),
            per_bidder_errors: inner.per_bidder_errors.clone(),
        }
    }
}

/// An owned, lock-free copy of [`DebugInfo`] for serialization/inspection.
#[derive(Debug, Clone, Default)]
pub struct DebugInfoSnapshot {
    pub total_latency: Duration,
    pub per_bidder_latency: HashMap<String, Duration>,
    pub selected_bidders: Vec<String>,
    pub excluded_bidders: Vec<String>,
    pub per_bidder_errors: HashMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_snapshots_per_bidder_state() {
        let debug = DebugInfo::new();
        debug.set_total_latency(Duration::from_millis(50));
        debug.set_selection(vec!["a".into()], vec!["b".into()]);
        debug.record_bidder_result(&BidderResult {
            bidder: "a".into(),
            latency: Duration::from_millis(30),
            errors: vec!["boom".into()],
            ..Default::default()
        });
        debug.record_bid_error("a", "duplicate bid id");

        let snapshot = debug.snapshot();
        assert_eq!(snapshot.total_latency, Duration::from_millis(50));
        assert_eq!(snapshot.selected_bidders, vec!["a".to_string()]);
        assert_eq!(snapshot.excluded_bidders, vec!["b".to_string()]);
        assert_eq!(snapshot.per_bidder_latency["a"], Duration::from_millis(30));
        assert_eq!(snapshot.per_bidder_errors["a"].len(), 2);
    }
}
