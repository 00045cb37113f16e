//! `run_auction`: the top-level sequence tying every collaborator together.
//!
//! Mirrors the control flow validator → selector → dispatcher → per-bid
//! validate/dedup → clearer → revenue-share → seat assembler → response.
//! Errors returned by this function are *only* request-validation errors;
//! every other failure mode (selector down, all bidders failing, deadline
//! hit) surfaces as a successful, possibly empty, response instead.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::ExchangeConfig;
use crate::core::auction::clearer::{clear_impression, ClearResult};
use crate::core::auction::revshare::{markup_floor, MarginReport};
use crate::core::auction::seats::{assemble_seats, SeatWinner};
use crate::core::bidder::{Bidder, BidderRegistry};
use crate::core::cloner::{apply_marked_up_floors, selective_clone, validate_response_currency, validate_response_id};
use crate::core::debug::{BidderResult as DebugBidderResult, DebugInfo};
use crate::core::dispatcher::{BidderOutcome, Dispatcher};
use crate::core::errors::ValidationError;
use crate::core::events::{BidEvent, EventRecorder, EventType};
use crate::core::fpd::{apply_fpd, FpdProcessor, NoopFpdProcessor};
use crate::core::metrics::MetricsRecorder;
use crate::core::partner_selector::{resolve_candidates, PartnerSelectorClient};
use crate::core::publisher::PublisherContext;
use crate::core::validate::bid::validate_bids;
use crate::core::validate::request::validate_request;
use crate::rtb::bid_request::BidRequest;
use crate::rtb::bid_response::{BidResponse, BidResponseState};
use crate::rtb::nobidreason;

const MAX_EFFECTIVE_TMAX: Duration = Duration::from_secs(10);

/// Collaborators `run_auction` needs, bundled so the call site doesn't have
/// to thread six parameters through every call.
pub struct AuctionDeps {
    pub config: Arc<ExchangeConfig>,
    pub registry: Arc<BidderRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub partner_selector: Option<Arc<PartnerSelectorClient>>,
    pub event_recorder: Option<Arc<EventRecorder>>,
    pub metrics: Arc<dyn MetricsRecorder>,
    pub fpd: Arc<dyn FpdProcessor>,
}

impl AuctionDeps {
    /// Convenience constructor for callers that don't need FPD enrichment —
    /// defaults `fpd` to the pass-through [`NoopFpdProcessor`].
    pub fn new(
        config: Arc<ExchangeConfig>,
        registry: Arc<BidderRegistry>,
        dispatcher: Arc<Dispatcher>,
        partner_selector: Option<Arc<PartnerSelectorClient>>,
        event_recorder: Option<Arc<EventRecorder>>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self { config, registry, dispatcher, partner_selector, event_recorder, metrics, fpd: Arc::new(NoopFpdProcessor) }
    }
}

pub struct AuctionOutcome {
    pub response: BidResponse,
    pub debug: DebugInfo,
}

pub async fn run_auction(
    req: &BidRequest,
    publisher: &dyn PublisherContext,
    deps: &AuctionDeps,
) -> Result<AuctionOutcome, ValidationError> {
    let start = Instant::now();
    let debug = DebugInfo::new();

    validate_request(req)?;

    let tmax = if req.tmax > 0 {
        Duration::from_millis(req.tmax as u64).min(MAX_EFFECTIVE_TMAX)
    } else {
        deps.config.default_timeout
    };
    let deadline = Instant::now() + tmax;

    let available: Vec<Bidder> = deps.registry.enabled();
    let available_names: Vec<String> = available.iter().map(|b| b.name.clone()).collect();

    let selected_names = match &deps.partner_selector {
        Some(client) => {
            let result = client.select(&req.id, &available_names).await;
            let resolved = resolve_candidates(result.as_ref(), &available_names);
            let excluded: Vec<String> = available_names.iter().filter(|n| !resolved.contains(n)).cloned().collect();
            debug.set_selection(resolved.clone(), excluded);
            resolved
        }
        None => {
            debug.set_selection(available_names.clone(), Vec::new());
            available_names
        }
    };

    let multiplier = publisher.effective_multiplier();
    let exchange_currency = &deps.config.default_currency;

    let device_country = req.device.as_ref().and_then(|d| d.geo.as_ref()).map(|g| g.country.clone()).filter(|c| !c.is_empty());
    let device_type = req.device.as_ref().map(|d| d.devicetype);

    let mut floor_map: HashMap<String, f64> = HashMap::new();
    for imp in &req.imp {
        let raw_floor = imp.pmp.as_ref().and_then(|pmp| pmp.deals.first()).map(|d| d.bidfloor).unwrap_or(imp.bidfloor);
        let adjusted = markup_floor(raw_floor, multiplier);
        deps.metrics.record_floor_adjustment(publisher.publisher_id(), raw_floor, adjusted);
        floor_map.insert(imp.id.clone(), adjusted);
    }

    // First-party-data processing and EID filtering, applied once to the
    // request ahead of per-bidder cloning. Best-effort: a failure here
    // falls back to the unmodified request rather than aborting the auction.
    let enriched_req = apply_fpd(deps.fpd.as_ref(), req);

    let bidders_by_name: HashMap<String, Bidder> = available.into_iter().map(|b| (b.name.clone(), b)).collect();
    let per_bidder_req: HashMap<String, BidRequest> = selected_names
        .iter()
        .map(|name| {
            let mut cloned = selective_clone(&enriched_req, exchange_currency);
            apply_marked_up_floors(&mut cloned, &floor_map);
            (name.clone(), cloned)
        })
        .collect();

    if Instant::now() >= deadline {
        return Ok(timeout_outcome(req, exchange_currency, debug, start));
    }

    let bidder_results = deps.dispatcher.dispatch(&bidders_by_name, &selected_names, &per_bidder_req, deadline).await;

    if Instant::now() >= deadline {
        return Ok(timeout_outcome(req, exchange_currency, debug, start));
    }

    if selected_names.is_empty() {
        return Ok(no_campaigns_outcome(req, exchange_currency, debug, start));
    }

    let mut seen_bid_ids = HashSet::new();
    let mut validated: Vec<SeatWinner> = Vec::new();
    let mut per_impid_candidates: HashMap<String, Vec<SeatWinner>> = HashMap::new();

    for result in &bidder_results {
        let bidder_name = result.bidder.clone();
        let demand_type = bidders_by_name.get(&bidder_name).map(|b| b.demand_type).unwrap_or_default();
        let mut debug_result =
            DebugBidderResult { bidder: bidder_name.clone(), latency: result.elapsed, selected: true, ..Default::default() };

        match &result.outcome {
            BidderOutcome::Bid(BidResponseState::Bid(response)) => {
                if let Err(err) = validate_response_id(&response.id, &req.id) {
                    debug_result.errors.push(format!("response envelope rejected: {err:?}"));
                    debug.record_bidder_result(&debug_result);
                    continue;
                }
                if let Err(err) = validate_response_currency(&response.cur, exchange_currency) {
                    debug_result.errors.push(format!("response envelope rejected: {err:?}"));
                    debug.record_bidder_result(&debug_result);
                    continue;
                }

                for seatbid in &response.seatbid {
                    let (accepted, rejected) = validate_bids(req, seatbid.bid.clone(), &floor_map, deps.config.min_bid_price);
                    for (_bid, err) in &rejected {
                        debug_result.errors.push(err.to_string());
                    }
                    for bid in accepted {
                        if !seen_bid_ids.insert(bid.id.clone()) {
                            debug_result.errors.push(format!("duplicate bid id across bidders: {}", bid.id));
                            continue;
                        }
                        debug_result.bids.push(bid.clone());
                        let winner = SeatWinner { impid: bid.impid.clone(), bidder: bidder_name.clone(), demand_type, bid };
                        per_impid_candidates.entry(winner.impid.clone()).or_default().push(winner);
                    }
                }
            }
            BidderOutcome::Bid(_) | BidderOutcome::NoBid => {}
            BidderOutcome::Timeout => {
                debug_result.timed_out = true;
                debug_result.errors.push("timeout".to_string());
            }
            BidderOutcome::Error(msg) => debug_result.errors.push(msg.clone()),
            BidderOutcome::CircuitOpen => debug_result.errors.push("circuit open".to_string()),
        }

        if let Some(recorder) = &deps.event_recorder {
            recorder.record(BidEvent {
                auction_id: req.id.clone(),
                bidder_code: bidder_name.clone(),
                event_type: Some(EventType::BidResponse),
                latency_ms: Some(debug_result.latency.as_millis() as u64),
                had_bid: Some(!debug_result.bids.is_empty()),
                bid_cpm: debug_result.bids.iter().map(|b| b.price).fold(None, |acc, p| Some(acc.map_or(p, |a: f64| a.max(p)))),
                country: device_country.clone(),
                device_type,
                publisher_id: Some(publisher.publisher_id().to_string()),
                timed_out: Some(debug_result.timed_out),
                had_error: Some(!debug_result.errors.is_empty()),
                error_message: debug_result.errors.first().cloned(),
                ..Default::default()
            });
        }

        debug.record_bidder_result(&debug_result);
    }

    for (impid, mut candidates) in per_impid_candidates {
        let floor = *floor_map.get(&impid).unwrap_or(&0.0);
        let bids: Vec<_> = candidates.drain(..).map(|w| (w.bidder, w.demand_type, w.bid)).collect();
        let bid_list = bids.iter().map(|(_, _, b)| b.clone()).collect();

        match clear_impression(deps.config.auction_type, bid_list, floor, deps.config.price_increment, deps.config.min_bid_price) {
            ClearResult::Won(winner_bid) => {
                let Some((bidder, demand_type, _)) = bids.into_iter().find(|(_, _, b)| b.id == winner_bid.id) else {
                    continue;
                };

                let report = MarginReport::new(publisher.publisher_id(), &bidder, winner_bid.mtype, winner_bid.price, multiplier);
                deps.metrics.record_margin(&report);

                let mut marked_down = winner_bid;
                marked_down.price = report.adjusted_price;

                if let Some(recorder) = &deps.event_recorder {
                    recorder.record(BidEvent {
                        auction_id: req.id.clone(),
                        bidder_code: bidder.clone(),
                        event_type: Some(EventType::Win),
                        win_cpm: Some(marked_down.price),
                        media_type: marked_down.mtype,
                        ad_size: match (marked_down.w, marked_down.h) {
                            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
                            _ => None,
                        },
                        floor_price: floor_map.get(&impid).copied(),
                        country: device_country.clone(),
                        device_type,
                        publisher_id: Some(publisher.publisher_id().to_string()),
                        ..Default::default()
                    });
                }

                validated.push(SeatWinner { impid, bidder, demand_type, bid: marked_down });
            }
            ClearResult::Rejected => {
                debug!(impid = impid.as_str(), "clearing price exceeded sole candidate bid, impression clears to no sale");
            }
            ClearResult::NoBids => {}
        }
    }

    if validated.is_empty() {
        return Ok(no_campaigns_outcome(req, exchange_currency, debug, start));
    }

    let (seats, _targeting) = assemble_seats(validated);

    let response = BidResponse { id: req.id.clone(), seatbid: seats, cur: exchange_currency.clone(), nbr: None };

    debug.set_total_latency(start.elapsed());
    Ok(AuctionOutcome { response, debug })
}

fn timeout_outcome(req: &BidRequest, cur: &str, debug: DebugInfo, start: Instant) -> AuctionOutcome {
    debug.set_total_latency(start.elapsed());
    warn!(request_id = req.id.as_str(), "auction deadline exceeded before dispatch");
    let response = BidResponseState::NoBidReason { reqid: req.id.clone(), nbr: nobidreason::TIMEOUT, desc: Some("deadline exceeded".into()) }
        .into_response(cur);
    AuctionOutcome { response, debug }
}

fn no_campaigns_outcome(req: &BidRequest, cur: &str, debug: DebugInfo, start: Instant) -> AuctionOutcome {
    debug.set_total_latency(start.elapsed());
    let response = BidResponseState::NoBidReason {
        reqid: req.id.clone(),
        nbr: nobidreason::NO_CAMPAIGNS_FOUND,
        desc: Some("no bids survived validation and clearing".into()),
    }
    .into_response(cur);
    AuctionOutcome { response, debug }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bidder::DemandType;
    use crate::core::publisher::Publisher;
    use crate::rtb::bid_request::{BannerBuilder, BidRequestBuilder, ImpBuilder};

    fn req_with_floor(floor: f64) -> BidRequest {
        let imp = ImpBuilder::default()
            .id("i1".to_string())
            .banner(Some(BannerBuilder::default().w(Some(300)).h(Some(250)).build().unwrap()))
            .bidfloor(floor)
            .build()
            .unwrap();
        BidRequestBuilder::default().id("r1".to_string()).imp(vec![imp]).tmax(200).build().unwrap()
    }

    fn deps_with_mock_bidder() -> AuctionDeps {
        let config = Arc::new(ExchangeConfig::default());
        let registry = Arc::new(BidderRegistry::new(vec![Bidder {
            name: "mockbidder".into(),
            endpoint: "MOCK".into(),
            demand_type: DemandType::Platform,
            enabled: true,
            timeout: None,
        }]));
        let dispatcher = Arc::new(Dispatcher::new(reqwest::Client::new(), 10, Duration::from_millis(300)));

        AuctionDeps::new(config, registry, dispatcher, None, None, Arc::new(crate::core::metrics::NoopMetricsRecorder))
    }

    #[tokio::test]
    async fn mock_bidder_produces_a_platform_seat_win() {
        let req = req_with_floor(0.10);
        let deps = deps_with_mock_bidder();
        let publisher = Publisher::default();

        let outcome = run_auction(&req, &publisher, &deps).await.unwrap();

        assert_eq!(outcome.response.seatbid.len(), 1);
        assert_eq!(outcome.response.seatbid[0].seat, "thenexusengine");
        assert_eq!(outcome.response.cur, "USD");
    }

    #[tokio::test]
    async fn a_failing_fpd_processor_does_not_abort_the_auction() {
        use crate::core::fpd::FpdProcessor;
        use crate::rtb::bid_request::BidRequest;

        struct AlwaysFails;
        impl FpdProcessor for AlwaysFails {
            fn process(&self, _req: &BidRequest) -> anyhow::Result<BidRequest> {
                anyhow::bail!("fpd service unreachable")
            }
        }

        let req = req_with_floor(0.10);
        let mut deps = deps_with_mock_bidder();
        deps.fpd = Arc::new(AlwaysFails);
        let publisher = Publisher::default();

        let outcome = run_auction(&req, &publisher, &deps).await.unwrap();

        assert_eq!(outcome.response.seatbid.len(), 1, "auction should still clear despite fpd failure");
    }

    #[tokio::test]
    async fn invalid_request_returns_a_validation_error() {
        let mut req = req_with_floor(0.10);
        req.id.clear();
        let deps = deps_with_mock_bidder();
        let publisher = Publisher::default();

        let result = run_auction(&req, &publisher, &deps).await;
        assert_eq!(result.unwrap_err(), ValidationError::MissingId);
    }

    #[tokio::test]
    async fn deadline_exceeded_during_dispatch_yields_timeout_not_no_campaigns() {
        let mut req = req_with_floor(1.0);
        req.tmax = 10;

        let config = Arc::new(ExchangeConfig::default());
        let registry = Arc::new(BidderRegistry::new(vec![Bidder {
            name: "deadbidder".into(),
            endpoint: "http://127.0.0.1:1".into(),
            demand_type: DemandType::Platform,
            enabled: true,
            timeout: None,
        }]));
        let dispatcher = Arc::new(Dispatcher::new(reqwest::Client::new(), 10, Duration::from_millis(300)));
        let deps = AuctionDeps::new(config, registry, dispatcher, None, None, Arc::new(crate::core::metrics::NoopMetricsRecorder));
        let publisher = Publisher::default();

        let outcome = run_auction(&req, &publisher, &deps).await.unwrap();

        assert!(outcome.response.seatbid.is_empty());
        assert_eq!(outcome.response.nbr, Some(nobidreason::TIMEOUT));
    }

    #[tokio::test]
    async fn no_enabled_bidders_yields_no_campaigns_found() {
        let req = req_with_floor(0.10);
        let mut deps = deps_with_mock_bidder();
        deps.registry = Arc::new(BidderRegistry::new(vec![]));

        let publisher = Publisher::default();
        let outcome = run_auction(&req, &publisher, &deps).await.unwrap();

        assert!(outcome.response.seatbid.is_empty());
        assert_eq!(outcome.response.nbr, Some(nobidreason::NO_CAMPAIGNS_FOUND));
    }
}
