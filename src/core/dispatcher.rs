//! Bounded-parallel fan-out to every candidate bidder under a shared
//! wall-clock deadline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::core::adapter::{Adapter, MockAdapter, OpenRtbAdapter, MOCK_URL};
use crate::core::bidder::Bidder;
use crate::core::circuit_breaker::CircuitBreaker;
use crate::core::privacy::{AllowAllGate, PrivacyGate};
use crate::rtb::bid_request::BidRequest;
use crate::rtb::bid_response::BidResponseState;

/// Bidder-call outcome as recorded for debug/metrics surfaces.
#[derive(Debug, Clone)]
pub enum BidderOutcome {
    Bid(BidResponseState),
    NoBid,
    Timeout,
    Error(String),
    CircuitOpen,
}

#[derive(Debug, Clone)]
pub struct BidderResult {
    pub bidder: String,
    pub outcome: BidderOutcome,
    pub elapsed: Duration,
}

/// Bidder-specific timeout, clamped to `[10ms, 5s]` and then to whatever
/// remains of the auction's overall deadline.
pub fn effective_timeout(bidder_timeout: Option<Duration>, default_timeout: Duration, remaining: Duration) -> Duration {
    const MIN: Duration = Duration::from_millis(10);
    const MAX: Duration = Duration::from_secs(5);

    let requested = bidder_timeout.unwrap_or(default_timeout).clamp(MIN, MAX);
    requested.min(remaining)
}

pub struct Dispatcher {
    http: reqwest::Client,
    max_concurrent: usize,
    default_timeout: Duration,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    privacy: Arc<dyn PrivacyGate>,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client, max_concurrent: usize, default_timeout: Duration) -> Self {
        Self { http, max_concurrent, default_timeout, breakers: DashMap::new(), privacy: Arc::new(AllowAllGate) }
    }

    /// Swaps in a real consent/geo gate in place of the permissive default.
    pub fn with_privacy_gate(mut self, privacy: Arc<dyn PrivacyGate>) -> Self {
        self.privacy = privacy;
        self
    }

    fn breaker_for(&self, bidder: &str) -> Arc<CircuitBreaker> {
        self.breakers.entry(bidder.to_string()).or_insert_with(|| Arc::new(CircuitBreaker::new(Default::default()))).clone()
    }

    /// Fan out to every bidder in `candidates`, each receiving its own
    /// isolated clone of `req` (callers are expected to have already cloned
    /// per-bidder via `cloner`). Bounded by `max_concurrent` in flight at
    /// once; each call races its effective timeout against `deadline`.
    pub async fn dispatch(
        &self,
        bidders: &HashMap<String, Bidder>,
        candidates: &[String],
        per_bidder_req: &HashMap<String, BidRequest>,
        deadline: Instant,
    ) -> Vec<BidderResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(candidates.len());

        let mut synthetic = Vec::new();

        for name in candidates {
            let Some(bidder) = bidders.get(name) else {
                warn!(bidder = name.as_str(), "candidate not present in registry, skipping");
                continue;
            };
            let Some(req) = per_bidder_req.get(name) else {
                warn!(bidder = name.as_str(), "no per-bidder request built, skipping");
                continue;
            };

            if !self.privacy.allow(name, req) {
                synthetic.push(BidderResult {
                    bidder: name.clone(),
                    outcome: BidderOutcome::Error("filtered by consent/geo gate".to_string()),
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let breaker = self.breaker_for(name);
            if !breaker.allow() {
                synthetic.push(BidderResult { bidder: name.clone(), outcome: BidderOutcome::CircuitOpen, elapsed: Duration::ZERO });
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                synthetic.push(BidderResult { bidder: name.clone(), outcome: BidderOutcome::Timeout, elapsed: Duration::ZERO });
                continue;
            }

            let timeout = effective_timeout(bidder.timeout, self.default_timeout, remaining);
            let permit = semaphore.clone();
            let http = self.http.clone();
            let bidder = bidder.clone();
            let req = req.clone();
            let breaker = breaker.clone();

            handles.push(tokio::spawn(Self::call_one(http, permit, bidder, req, timeout, breaker)));
        }

        let mut results = synthetic;
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_err) => {
                    warn!(error = %join_err, "bidder task panicked or was cancelled");
                }
            }
        }
        results
    }

    async fn call_one(
        http: reqwest::Client,
        semaphore: Arc<Semaphore>,
        bidder: Bidder,
        req: BidRequest,
        timeout: Duration,
        breaker: Arc<CircuitBreaker>,
    ) -> BidderResult {
        let _permit = semaphore.acquire_owned().await.ok();
        let start = Instant::now();

        let fut = Self::call_inner(&http, &bidder, &req);
        let outcome = match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(state)) => {
                breaker.record_success();
                match &state {
                    BidResponseState::Bid(_) => BidderOutcome::Bid(state),
                    _ => BidderOutcome::NoBid,
                }
            }
            Ok(Err(err)) => {
                breaker.record_failure();
                BidderOutcome::Error(err.to_string())
            }
            Err(_elapsed) => {
                breaker.record_failure();
                BidderOutcome::Timeout
            }
        };

        debug!(bidder = bidder.name.as_str(), elapsed_ms = start.elapsed().as_millis() as u64, "bidder call complete");
        BidderResult { bidder: bidder.name.clone(), outcome, elapsed: start.elapsed() }
    }

    async fn call_inner(http: &reqwest::Client, bidder: &Bidder, req: &BidRequest) -> anyhow::Result<BidResponseState> {
        if bidder.is_mock() {
            let adapter = MockAdapter;
            let outgoing = adapter.make_requests(MOCK_URL, req)?;
            return adapter.make_bids(req, 200, outgoing[0].body.to_string().as_bytes());
        }

        let adapter = OpenRtbAdapter;
        let outgoing = adapter.make_requests(&bidder.endpoint, req)?;
        let call = &outgoing[0];

        let mut builder = http.post(&call.url).json(&call.body);
        for (k, v) in &call.headers {
            builder = builder.header(k, v);
        }

        let res = builder.send().await?;
        let status = res.status().as_u16();
        let bytes = res.bytes().await?;

        adapter.make_bids(req, status, &bytes)
    }
}
