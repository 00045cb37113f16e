//! Per-bid validation against the originating request.
//!
//! Runs once per bid in a bidder's response, after the response envelope
//! (currency/id) has already passed `cloner::validate_response_*`. A
//! failing bid is dropped; it does not fail the whole response.

use std::collections::{HashMap, HashSet};

use crate::core::errors::BidValidationError;
use crate::rtb::bid_request::BidRequest;
use crate::rtb::bid_response::Bid;

/// Validates one bid against its originating request and the per-impression
/// *effective* floor map (raw floor with the publisher's bid multiplier
/// already applied — the same floor bidders were sent). `seen_bid_ids`
/// tracks ids already accepted from the *same* response, to catch a bidder
/// emitting duplicate bid ids within one reply.
pub fn validate_bid(
    req: &BidRequest,
    bid: &Bid,
    floor_map: &HashMap<String, f64>,
    min_bid_price: f64,
    seen_bid_ids: &mut HashSet<String>,
) -> Result<(), BidValidationError> {
    if bid.id.is_empty() {
        return Err(BidValidationError::MissingId);
    }
    if bid.impid.is_empty() {
        return Err(BidValidationError::MissingImpId);
    }
    if !req.imp.iter().any(|i| i.id == bid.impid) {
        return Err(BidValidationError::UnknownImpId(bid.impid.clone()));
    }
    if bid.price < 0.0 {
        return Err(BidValidationError::NegativePrice(bid.price));
    }
    if bid.price < min_bid_price {
        return Err(BidValidationError::BelowMinPrice { price: bid.price, min: min_bid_price });
    }

    let floor = floor_map.get(&bid.impid).copied().unwrap_or(0.0);
    if floor > 0.0 && bid.price < floor {
        return Err(BidValidationError::BelowFloor { price: bid.price, floor });
    }

    if bid.adm.is_empty() && bid.nurl.is_empty() {
        return Err(BidValidationError::MissingCreative);
    }

    if !seen_bid_ids.insert(bid.id.clone()) {
        return Err(BidValidationError::DuplicateBidId(bid.id.clone()));
    }

    Ok(())
}

/// Filters a bidder's bids down to the ones that pass validation, returning
/// both the survivors and the rejected bids paired with their reason (the
/// latter feeds the debug surface).
pub fn validate_bids(
    req: &BidRequest,
    bids: Vec<Bid>,
    floor_map: &HashMap<String, f64>,
    min_bid_price: f64,
) -> (Vec<Bid>, Vec<(Bid, BidValidationError)>) {
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for bid in bids {
        match validate_bid(req, &bid, floor_map, min_bid_price, &mut seen) {
            Ok(()) => accepted.push(bid),
            Err(err) => rejected.push((bid, err)),
        }
    }

    (accepted, rejected)
}
