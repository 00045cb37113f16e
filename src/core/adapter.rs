//! Adapter boundary: translates between the exchange's internal request and
//! whatever wire shape a given bidder endpoint expects.
//!
//! Real partners are expected to speak OpenRTB JSON directly, so the
//! default adapter is a pass-through. The `MOCK` pseudo-adapter (selected
//! when a bidder's endpoint is literally `"MOCK"`) never leaves the
//! process: it echoes the outgoing request back as a single bid, which
//! makes it useful for local development and the test suite without
//! standing up a real HTTP partner.

use async_trait::async_trait;

use crate::rtb::bid_request::BidRequest;
use crate::rtb::bid_response::BidResponseState;

/// A single HTTP call an adapter wants the dispatcher to make on its
/// behalf. Adapters that need more than one call per bidder (rare) return
/// more than one of these.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub url: String,
    pub body: serde_json::Value,
    pub headers: Vec<(String, String)>,
}

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Build the outgoing HTTP request(s) for this bidder given the
    /// (already cloned/isolated) per-bidder request.
    fn make_requests(&self, endpoint: &str, req: &BidRequest) -> anyhow::Result<Vec<OutgoingRequest>>;

    /// Parse a raw HTTP response body into bid-response state.
    fn make_bids(&self, req: &BidRequest, status: u16, body: &[u8]) -> anyhow::Result<BidResponseState>;
}

/// The default adapter: forwards the request as OpenRTB JSON and expects
/// an OpenRTB JSON response back.
pub struct OpenRtbAdapter;

#[async_trait]
impl Adapter for OpenRtbAdapter {
    fn make_requests(&self, endpoint: &str, req: &BidRequest) -> anyhow::Result<Vec<OutgoingRequest>> {
        let body = serde_json::to_value(req)?;
        Ok(vec![OutgoingRequest {
            url: endpoint.to_string(),
            body,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
        }])
    }

    fn make_bids(&self, req: &BidRequest, status: u16, body: &[u8]) -> anyhow::Result<BidResponseState> {
        if status == 204 || body.is_empty() {
            return Ok(BidResponseState::NoBid { desc: Some("no content".to_string()) });
        }
        if status != 200 {
            return Ok(BidResponseState::NoBid { desc: Some(format!("http status {status}")) });
        }

        let response: crate::rtb::bid_response::BidResponse = serde_json::from_slice(body)?;
        if response.id != req.id {
            return Ok(BidResponseState::NoBid { desc: Some("response id mismatch".to_string()) });
        }
        Ok(BidResponseState::Bid(response))
    }
}

/// Pseudo-adapter used by `bidder.endpoint == "MOCK"`. Never issues an HTTP
/// call; the dispatcher short-circuits on [`OutgoingRequest::url`] being the
/// literal string `"mock://echo"` and synthesizes a bid locally instead.
pub struct MockAdapter;

pub const MOCK_URL: &str = "mock://echo";

#[async_trait]
impl Adapter for MockAdapter {
    fn make_requests(&self, _endpoint: &str, req: &BidRequest) -> anyhow::Result<Vec<OutgoingRequest>> {
        let body = serde_json::to_value(req)?;
        Ok(vec![OutgoingRequest { url: MOCK_URL.to_string(), body, headers: vec![] }])
    }

    /// The mock bidder bids the impression's floor plus a cent on every
    /// impression that declares a media type, using `bid.{id,impid}` equal
    /// to the originating `imp.id` so downstream validation always matches.
    fn make_bids(&self, req: &BidRequest, _status: u16, _body: &[u8]) -> anyhow::Result<BidResponseState> {
        use crate::rtb::bid_response::{Bid, BidResponse, SeatBid};

        let bids: Vec<Bid> = req
            .imp
            .iter()
            .filter(|imp| imp.has_media_type())
            .map(|imp| Bid {
                id: format!("mock-{}", imp.id),
                impid: imp.id.clone(),
                price: imp.bidfloor + 0.01,
                adm: "<div>mock creative</div>".to_string(),
                nurl: String::new(),
                w: None,
                h: None,
                dealid: None,
                mtype: None,
            })
            .collect();

        if bids.is_empty() {
            return Ok(BidResponseState::NoBid { desc: Some("no impressions with a media type".to_string()) });
        }

        Ok(BidResponseState::Bid(BidResponse {
            id: req.id.clone(),
            seatbid: vec![SeatBid { seat: "mock".to_string(), bid: bids }],
            cur: String::new(),
            nbr: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtb::bid_request::{BidRequestBuilder, BannerBuilder, ImpBuilder};

    fn req_with_banner_imp() -> BidRequest {
        let imp = ImpBuilder::default()
            .id("imp1".to_string())
            .banner(Some(BannerBuilder::default().w(Some(300)).h(Some(250)).build().unwrap()))
            .bidfloor(0.5)
            .build()
            .unwrap();
        BidRequestBuilder::default().id("r1".to_string()).imp(vec![imp]).build().unwrap()
    }

    #[test]
    fn mock_adapter_bids_floor_plus_cent_on_every_media_imp() {
        let req = req_with_banner_imp();
        let state = MockAdapter.make_bids(&req, 200, b"").unwrap();
        match state {
            BidResponseState::Bid(resp) => {
                assert_eq!(resp.seatbid.len(), 1);
                assert_eq!(resp.seatbid[0].bid[0].price, 0.51);
                assert_eq!(resp.seatbid[0].bid[0].impid, "imp1");
            }
            other => panic!("expected a bid, got {other:?}"),
        }
    }

    #[test]
    fn mock_adapter_no_bids_on_imp_with_no_media_type() {
        let imp = crate::rtb::bid_request::ImpBuilder::default().id("imp1".to_string()).build().unwrap();
        let req = BidRequestBuilder::default().id("r1".to_string()).imp(vec![imp]).build().unwrap();

        let state = MockAdapter.make_bids(&req, 200, b"").unwrap();
        assert!(matches!(state, BidResponseState::NoBid { .. }));
    }

    #[test]
    fn openrtb_adapter_rejects_mismatched_response_id() {
        let req = req_with_banner_imp();
        let body = serde_json::json!({ "id": "other", "seatbid": [], "cur": "USD" });
        let state = OpenRtbAdapter.make_bids(&req, 200, body.to_string().as_bytes()).unwrap();
        assert!(matches!(state, BidResponseState::NoBid { .. }));
    }
}
