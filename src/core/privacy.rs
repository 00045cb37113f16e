//! Per-bidder consent/geo admission gate consulted by the dispatcher before
//! dispatch, via a vendor-ID lookup against the configured gate. A bidder
//! filtered here is recorded as errored, not timed out. The actual GDPR/
//! CCPA/COPPA gating and IP anonymization logic lives outside this crate —
//! it only owns the trait boundary the dispatcher calls through, exactly
//! as it owns `MetricsRecorder` and `FpdProcessor` rather than any concrete
//! implementation of those collaborators.

use crate::rtb::bid_request::BidRequest;

pub trait PrivacyGate: Send + Sync {
    /// May this bidder be called for this request? `bidder` is the
    /// registry name (used by the real system as the vendor-ID lookup key).
    fn allow(&self, bidder: &str, req: &BidRequest) -> bool;
}

/// Default gate when no privacy collaborator is configured: every bidder is
/// admitted. A deployment with real consent/geo gating swaps this for a
/// vendor-ID-aware implementation at `AppState` construction time.
pub struct AllowAllGate;

impl PrivacyGate for AllowAllGate {
    fn allow(&self, _bidder: &str, _req: &BidRequest) -> bool {
        true
    }
}
