//! First-party-data (FPD) enrichment and EID filtering collaborator.
//!
//! Applied once to the request, after bidder selection and before any
//! per-bidder clone, and treated as best-effort: a failure here falls
//! back to the unmodified request rather than aborting the auction. The
//! concrete enrichment logic (publisher-supplied Site/App/User overrides,
//! an EID allowlist per bidder) lives with whichever system owns the
//! publisher relationship; this crate only depends on the trait boundary,
//! the same way it depends on `MetricsRecorder` rather than a concrete
//! exporter.

use crate::rtb::bid_request::BidRequest;

pub trait FpdProcessor: Send + Sync {
    /// Returns an FPD/EID-enriched copy of `req`. Errors are swallowed by
    /// the orchestrator — a failure here must never abort the auction.
    fn process(&self, req: &BidRequest) -> anyhow::Result<BidRequest>;
}

/// Default collaborator when no FPD processor is configured: the request
/// passes through unchanged.
pub struct NoopFpdProcessor;

impl FpdProcessor for NoopFpdProcessor {
    fn process(&self, req: &BidRequest) -> anyhow::Result<BidRequest> {
        Ok(req.clone())
    }
}

/// Applies `processor` to `req`, falling back to the original request on
/// any error and logging at debug level.
pub fn apply_fpd(processor: &dyn FpdProcessor, req: &BidRequest) -> BidRequest {
    match processor.process(req) {
        Ok(enriched) => enriched,
        Err(err) => {
            tracing::debug!(error = %err, "fpd processing failed, continuing with the unmodified request");
            req.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtb::bid_request::BidRequestBuilder;

    struct FailingProcessor;
    impl FpdProcessor for FailingProcessor {
        fn process(&self, _req: &BidRequest) -> anyhow::Result<BidRequest> {
            anyhow::bail!("enrichment service unavailable")
        }
    }

    #[test]
    fn noop_processor_passes_the_request_through_unchanged() {
        let req = BidRequestBuilder::default().id("r1".to_string()).build().unwrap();
        let processed = apply_fpd(&NoopFpdProcessor, &req);
        assert_eq!(processed.id, "r1");
    }

    #[test]
    fn a_failing_processor_does_not_abort_the_auction() {
        let req = BidRequestBuilder::default().id("r1".to_string()).build().unwrap();
        let processed = apply_fpd(&FailingProcessor, &req);
        assert_eq!(processed.id, "r1", "should fall back to the original request");
    }
}
