//! Per-impression auction clearing: first-price or second-price.

use crate::core::auction::revshare::round_to_cents;
use crate::rtb::bid_response::Bid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuctionType {
    FirstPrice,
    SecondPrice,
}

impl Default for AuctionType {
    fn default() -> Self {
        AuctionType::FirstPrice
    }
}

pub fn sort_bids_by_price(bids: &mut [Bid]) {
    bids.sort_by(|a, b| b.price.total_cmp(&a.price));
}

/// Result of clearing one impression's candidate bids.
#[derive(Debug, Clone)]
pub enum ClearResult {
    /// A winner survived clearing, at its final (possibly adjusted) price.
    Won(Bid),
    /// No candidate bids at all.
    NoBids,
    /// The single candidate's price could not support the computed clearing
    /// price; the impression clears to no sale.
    Rejected,
}

/// Clears one impression's already-validated, already-sorted-by-price
/// candidate bids. `floor` is the impression's effective floor (after
/// revenue-share markup has already been applied), `increment` is the
/// configured price step (`Δ`), and `min_bid_price` is the exchange-wide
/// minimum used as the second-price single-bid fallback floor.
pub fn clear_impression(auction_type: AuctionType, mut bids: Vec<Bid>, floor: f64, increment: f64, min_bid_price: f64) -> ClearResult {
    if bids.is_empty() {
        return ClearResult::NoBids;
    }

    sort_bids_by_price(&mut bids);

    match auction_type {
        AuctionType::FirstPrice => ClearResult::Won(bids.into_iter().next().unwrap()),
        AuctionType::SecondPrice => clear_second_price(bids, floor, increment, min_bid_price),
    }
}

fn clear_second_price(bids: Vec<Bid>, floor: f64, increment: f64, min_bid_price: f64) -> ClearResult {
    let top_price = bids[0].price;

    let clearing_price = if bids.len() >= 2 {
        round_to_cents(bids[1].price + increment)
    } else if floor > 0.0 {
        round_to_cents(floor + increment)
    } else {
        round_to_cents(min_bid_price + increment)
    };

    if clearing_price > top_price {
        return ClearResult::Rejected;
    }

    let mut winner = bids.into_iter().next().unwrap();
    winner.price = clearing_price;
    ClearResult::Won(winner)
}
