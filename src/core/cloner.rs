//! Per-bidder request isolation.
//!
//! Two modes, both leaving the original `BidRequest` untouched:
//!
//! - [`selective_clone`] — the hot path. Clones only the fields a bidder
//!   call actually mutates downstream (currency, per-imp floor currency,
//!   optionally Site/App/User for FPD targeting). Device/Regs/Source are
//!   shared read-only via `Arc` at the call site, not touched here.
//! - [`bounded_deep_clone`] — used when full isolation is required (e.g. a
//!   bidder-specific FPD rewrite touching nested user data). Recursively
//!   copies nested vectors subject to [`CloneLimits`]; excess elements are
//!   truncated, never rejected.

use crate::core::clone_limits::CloneLimits;
use crate::rtb::bid_request::BidRequest;

/// Clone only what a bidder callout needs mutated: currency is pinned to
/// the exchange currency and each impression's floor currency follows. Does
/// not touch Site/App/User — callers that need FPD-aware cloning should
/// follow up with [`bounded_deep_clone`].
pub fn selective_clone(req: &BidRequest, exchange_currency: &str) -> BidRequest {
    let mut clone = req.clone();
    clone.cur = vec![exchange_currency.to_string()];

    for imp in clone.imp.iter_mut() {
        imp.bidfloorcur = exchange_currency.to_string();
    }

    clone
}

/// Overwrites each impression's floor with the revenue-share marked-up
/// value from `floor_map` (keyed by impression id), falling back to the
/// impression's existing floor if it has no entry. Bidders must see the
/// effective floor, not the raw publisher floor, or the exchange's cut is
/// never actually covered.
pub fn apply_marked_up_floors(req: &mut BidRequest, floor_map: &std::collections::HashMap<String, f64>) {
    for imp in req.imp.iter_mut() {
        if let Some(&floor) = floor_map.get(&imp.id) {
            imp.bidfloor = floor;
        }
    }
}

/// Full isolation clone, truncating nested collections to `limits`. Intended
/// for the case where FPD/EID targeting will actually mutate Site/App/User.
pub fn bounded_deep_clone(req: &BidRequest, exchange_currency: &str, limits: &CloneLimits) -> BidRequest {
    let mut clone = selective_clone(req, exchange_currency);

    if clone.imp.len() > limits.max_impressions {
        clone.imp.truncate(limits.max_impressions);
    }

    for imp in clone.imp.iter_mut() {
        if let Some(pmp) = imp.pmp.as_mut() {
            if pmp.deals.len() > limits.max_deals_per_imp {
                pmp.deals.truncate(limits.max_deals_per_imp);
            }
        }
    }

    if let Some(user) = clone.user.as_mut() {
        if user.eids.len() > limits.max_eids {
            user.eids.truncate(limits.max_eids);
        }
        if user.data.len() > limits.max_user_data_segments {
            user.data.truncate(limits.max_user_data_segments);
        }
    }

    if let Some(source) = clone.source.as_mut() {
        if let Some(schain) = source.schain.as_mut() {
            if schain.nodes.len() > limits.max_schain_nodes {
                schain.nodes.truncate(limits.max_schain_nodes);
            }
        }
    }

    clone
}

/// Outcome of validating a bidder's response-level currency/id echo.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelopeError {
    /// Response currency, after normalizing an empty value to USD, still
    /// differs from the exchange currency.
    CurrencyMismatch { got: String, expected: String },
    /// The bidder echoed a response id that doesn't match the request id.
    IdMismatch { got: String, expected: String },
}

/// Normalizes an empty bidder-echoed currency to USD, then checks it
/// against the exchange currency. All bids from a response that fails this
/// check must be dropped by the caller.
pub fn validate_response_currency(bidder_cur: &str, exchange_currency: &str) -> Result<(), ResponseEnvelopeError> {
    let normalized = if bidder_cur.is_empty() { "USD" } else { bidder_cur };

    if normalized != exchange_currency {
        Err(ResponseEnvelopeError::CurrencyMismatch {
            got: normalized.to_string(),
            expected: exchange_currency.to_string(),
        })
    } else {
        Ok(())
    }
}

/// All bids from a response whose echoed id doesn't match the request id
/// must be dropped by the caller.
pub fn validate_response_id(bidder_response_id: &str, request_id: &str) -> Result<(), ResponseEnvelopeError> {
    if bidder_response_id != request_id {
        Err(ResponseEnvelopeError::IdMismatch {
            got: bidder_response_id.to_string(),
            expected: request_id.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtb::bid_request::{BidRequestBuilder, Eid, ImpBuilder, SupplyChain, SupplyChainNode, User};

    fn req_with_imps(n: usize) -> BidRequest {
        let imps = (0..n)
            .map(|i| ImpBuilder::default().id(format!("imp{i}")).bidfloor(1.0).build().unwrap())
            .collect();

        BidRequestBuilder::default().id("r1".to_string()).imp(imps).cur(vec!["EUR".into()]).build().unwrap()
    }

    #[test]
    fn selective_clone_pins_currency_and_leaves_original_untouched() {
        let original = req_with_imps(2);
        let snapshot = original.clone();

        let cloned = selective_clone(&original, "USD");

        assert_eq!(cloned.cur, vec!["USD".to_string()]);
        assert!(cloned.imp.iter().all(|i| i.bidfloorcur == "USD"));
        assert_eq!(original.cur, snapshot.cur);
    }

    #[test]
    fn apply_marked_up_floors_overwrites_bidfloor_from_the_map() {
        let mut req = req_with_imps(2);
        let mut floor_map = std::collections::HashMap::new();
        floor_map.insert("imp0".to_string(), 1.05);

        apply_marked_up_floors(&mut req, &floor_map);

        assert_eq!(req.imp[0].bidfloor, 1.05, "marked-up floor must reach the outgoing request");
        assert_eq!(req.imp[1].bidfloor, 1.0, "impressions absent from the map keep their original floor");
    }

    #[test]
    fn bounded_deep_clone_truncates_impressions() {
        let original = req_with_imps(150);
        let limits = CloneLimits::default();

        let cloned = bounded_deep_clone(&original, "USD", &limits);

        assert_eq!(cloned.imp.len(), limits.max_impressions);
        assert_eq!(original.imp.len(), 150, "original must be untouched");
    }

    #[test]
    fn bounded_deep_clone_truncates_eids_to_configured_bound() {
        let mut req = req_with_imps(1);
        req.user = Some(User {
            eids: (0..10_000).map(|i| Eid { source: format!("src{i}"), uids: vec![] }).collect(),
            ..Default::default()
        });
        let limits = CloneLimits::default();

        let cloned = bounded_deep_clone(&req, "USD", &limits);

        assert_eq!(cloned.user.unwrap().eids.len(), 50);
    }

    #[test]
    fn bounded_deep_clone_truncates_schain_nodes() {
        let mut req = req_with_imps(1);
        req.source = Some(crate::rtb::bid_request::Source {
            schain: Some(SupplyChain {
                complete: 1,
                nodes: (0..500).map(|_| SupplyChainNode::default()).collect(),
            }),
        });
        let limits = CloneLimits::default();

        let cloned = bounded_deep_clone(&req, "USD", &limits);

        assert_eq!(cloned.source.unwrap().schain.unwrap().nodes.len(), limits.max_schain_nodes);
    }

    #[test]
    fn response_currency_empty_normalizes_to_usd() {
        assert!(validate_response_currency("", "USD").is_ok());
        assert!(validate_response_currency("", "EUR").is_err());
    }

    #[test]
    fn response_currency_mismatch_is_rejected() {
        let err = validate_response_currency("GBP", "USD").unwrap_err();
        assert_eq!(err, ResponseEnvelopeError::CurrencyMismatch { got: "GBP".into(), expected: "USD".into() });
    }

    #[test]
    fn response_id_mismatch_is_rejected() {
        assert!(validate_response_id("other", "r1").is_err());
        assert!(validate_response_id("r1", "r1").is_ok());
    }
}
