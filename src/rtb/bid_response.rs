use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Media type tag carried by a surviving bid, used for targeting keys and
/// metrics labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Banner,
    Video,
    Native,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct Bid {
    pub id: String,
    pub impid: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub adm: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nurl: String,
    pub w: Option<i32>,
    pub h: Option<i32>,
    pub dealid: Option<String>,
    pub mtype: Option<MediaType>,
}

impl Default for Bid {
    fn default() -> Self {
        Self {
            id: String::new(),
            impid: String::new(),
            price: 0.0,
            adm: String::new(),
            nurl: String::new(),
            w: None,
            h: None,
            dealid: None,
            mtype: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct SeatBid {
    pub seat: String,
    pub bid: Vec<Bid>,
}

impl Default for SeatBid {
    fn default() -> Self {
        Self { seat: String::new(), bid: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct BidResponse {
    pub id: String,
    pub seatbid: Vec<SeatBid>,
    pub cur: String,
    pub nbr: Option<i32>,
}

impl Default for BidResponse {
    fn default() -> Self {
        Self { id: String::new(), seatbid: Vec::new(), cur: String::new(), nbr: None }
    }
}

/// The final outcome of handling one auction, held in the auction context's
/// `OnceLock<BidResponseState>` slot until the orchestrator assigns it
/// exactly once.
#[derive(Debug, Clone)]
pub enum BidResponseState {
    /// At least one seat bid survived clearing.
    Bid(BidResponse),
    /// Request was well-formed but nothing survived; no specific NBR code
    /// applies.
    NoBid { desc: Option<String> },
    /// Request was well-formed but nothing survived for a reason the caller
    /// may want to branch on (timeout, no bidders available, ...).
    NoBidReason {
        reqid: String,
        nbr: i32,
        desc: Option<String>,
    },
}

impl BidResponseState {
    pub fn into_response(self, cur: &str) -> BidResponse {
        match self {
            BidResponseState::Bid(mut res) => {
                res.cur = cur.to_string();
                res
            }
            BidResponseState::NoBid { .. } => BidResponse {
                cur: cur.to_string(),
                ..Default::default()
            },
            BidResponseState::NoBidReason { reqid, nbr, .. } => BidResponse {
                id: reqid,
                cur: cur.to_string(),
                nbr: Some(nbr),
                ..Default::default()
            },
        }
    }
}
