//! Seat assembly: partitions surviving winners by demand type and computes
//! Prebid-style targeting keys.

use std::collections::HashMap;

use crate::core::bidder::DemandType;
use crate::rtb::bid_response::{Bid, SeatBid};

/// Literal seat name every platform-demand winner is collapsed under,
/// obscuring which real adapter actually won.
pub const PLATFORM_SEAT: &str = "thenexusengine";

/// One impression's winning bid plus the bidder that actually produced it
/// (needed post-collapse, since the seat name no longer reveals it).
#[derive(Debug, Clone)]
pub struct SeatWinner {
    pub impid: String,
    pub bidder: String,
    pub demand_type: DemandType,
    pub bid: Bid,
}

/// Price-bucket `hb_pb`: $0.01 steps below $5, $0.05 steps between $5 and
/// $10, $0.50 steps between $10 and $20, capped at $20.00.
pub fn price_bucket(price: f64) -> String {
    let capped = price.min(20.0);
    let bucketed = if capped < 5.0 {
        (capped / 0.01).floor() * 0.01
    } else if capped < 10.0 {
        (capped / 0.05).floor() * 0.05
    } else if capped < 20.0 {
        (capped / 0.50).floor() * 0.50
    } else {
        20.00
    };
    format!("{bucketed:.2}")
}

/// Targeting keys for one winner, keyed the way Prebid.js clients expect:
/// un-suffixed global keys plus `_<seat>`-suffixed per-bidder variants.
pub fn targeting_keys(seat: &str, winner: &Bid) -> HashMap<String, String> {
    let mut keys = HashMap::new();
    let pb = price_bucket(winner.price);
    let size = match (winner.w, winner.h) {
        (Some(w), Some(h)) => format!("{w}x{h}"),
        _ => "0x0".to_string(),
    };

    keys.insert("hb_bidder".to_string(), seat.to_string());
    keys.insert("hb_pb".to_string(), pb.clone());
    keys.insert("hb_size".to_string(), size.clone());
    if let Some(dealid) = &winner.dealid {
        keys.insert("hb_deal".to_string(), dealid.clone());
    }

    keys.insert(format!("hb_bidder_{seat}"), seat.to_string());
    keys.insert(format!("hb_pb_{seat}"), pb);
    keys.insert(format!("hb_size_{seat}"), size);
    if let Some(dealid) = &winner.dealid {
        keys.insert(format!("hb_deal_{seat}"), dealid.clone());
    }

    keys
}

/// Builds the final seatbid list: platform winners collapsed into one
/// `thenexusengine` seat (highest-priced platform bid per impression only),
/// publisher winners passed through one seat per bidder.
pub fn assemble_seats(winners: Vec<SeatWinner>) -> (Vec<SeatBid>, HashMap<(String, String), HashMap<String, String>>) {
    let mut platform_best: HashMap<String, SeatWinner> = HashMap::new();
    let mut publisher_seats: HashMap<String, Vec<Bid>> = HashMap::new();
    let mut targeting: HashMap<(String, String), HashMap<String, String>> = HashMap::new();

    for winner in winners {
        match winner.demand_type {
            DemandType::Platform => {
                let slot = platform_best.entry(winner.impid.clone()).or_insert_with(|| winner.clone());
                if winner.bid.price > slot.bid.price {
                    *slot = winner;
                }
            }
            DemandType::Publisher => {
                targeting.insert((winner.bidder.clone(), winner.impid.clone()), targeting_keys(&winner.bidder, &winner.bid));
                publisher_seats.entry(winner.bidder.clone()).or_default().push(winner.bid);
            }
        }
    }

    let mut seats = Vec::new();

    if !platform_best.is_empty() {
        let mut platform_bids = Vec::with_capacity(platform_best.len());
        for (impid, winner) in platform_best {
            targeting.insert((PLATFORM_SEAT.to_string(), impid), targeting_keys(PLATFORM_SEAT, &winner.bid));
            platform_bids.push(winner.bid);
        }
        seats.push(SeatBid { seat: PLATFORM_SEAT.to_string(), bid: platform_bids });
    }

    for (seat, bids) in publisher_seats {
        seats.push(SeatBid { seat, bid: bids });
    }

    (seats, targeting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtb::bid_response::BidBuilder;

    fn bid(id: &str, impid: &str, price: f64) -> Bid {
        BidBuilder::default().id(id.to_string()).impid(impid.to_string()).price(price).adm("x".to_string()).build().unwrap()
    }

    #[test]
    fn price_bucket_below_five_steps_by_one_cent() {
        assert_eq!(price_bucket(2.567), "2.56");
    }

    #[test]
    fn price_bucket_between_five_and_ten_steps_by_five_cents() {
        assert_eq!(price_bucket(7.23), "7.20");
    }

    #[test]
    fn price_bucket_between_ten_and_twenty_steps_by_fifty_cents() {
        assert_eq!(price_bucket(14.80), "14.50");
    }

    #[test]
    fn price_bucket_caps_at_twenty() {
        assert_eq!(price_bucket(45.0), "20.00");
    }

    #[test]
    fn platform_winners_collapse_to_the_literal_seat_keeping_only_the_highest_bid() {
        let winners = vec![
            SeatWinner { impid: "i1".into(), bidder: "realbidderA".into(), demand_type: DemandType::Platform, bid: bid("b1", "i1", 2.0) },
            SeatWinner { impid: "i1".into(), bidder: "realbidderB".into(), demand_type: DemandType::Platform, bid: bid("b2", "i1", 3.0) },
        ];

        let (seats, targeting) = assemble_seats(winners);
        assert_eq!(seats.len(), 1);
        assert_eq!(seats[0].seat, PLATFORM_SEAT);
        assert_eq!(seats[0].bid.len(), 1);
        assert_eq!(seats[0].bid[0].id, "b2");
        assert!(targeting.contains_key(&(PLATFORM_SEAT.to_string(), "i1".to_string())));
    }

    #[test]
    fn publisher_winners_pass_through_under_their_own_seat() {
        let winners = vec![SeatWinner {
            impid: "i1".into(),
            bidder: "directpub".into(),
            demand_type: DemandType::Publisher,
            bid: bid("b1", "i1", 2.0),
        }];

        let (seats, targeting) = assemble_seats(winners);
        assert_eq!(seats.len(), 1);
        assert_eq!(seats[0].seat, "directpub");
        assert!(targeting.contains_key(&("directpub".to_string(), "i1".to_string())));
    }

    #[test]
    fn targeting_keys_include_both_global_and_seat_suffixed_variants() {
        let keys = targeting_keys("thenexusengine", &bid("b1", "i1", 2.567));
        assert_eq!(keys["hb_bidder"], "thenexusengine");
        assert_eq!(keys["hb_bidder_thenexusengine"], "thenexusengine");
        assert_eq!(keys["hb_pb"], "2.56");
    }
}
