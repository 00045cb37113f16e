use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// A third-party identity token attached to the user object (e.g. LiveRamp).
#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct EidUid {
    pub id: String,
    #[serde(default)]
    pub atype: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Eid {
    pub source: String,
    pub uids: Vec<EidUid>,
}

/// A first-party-data segment carried on `User.data` or `Site/App.content.data`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Data {
    pub id: String,
    pub name: String,
    pub segment: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct User {
    pub id: String,
    pub buyeruid: String,
    pub yob: i32,
    pub eids: Vec<Eid>,
    pub data: Vec<Data>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Geo {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub country: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Device {
    pub ua: String,
    pub ip: String,
    pub geo: Option<Geo>,
    pub devicetype: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Regs {
    pub coppa: i32,
    pub gdpr: Option<i32>,
    pub us_privacy: String,
}

/// One node in the OpenRTB supply-chain (schain) hop list.
#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct SupplyChainNode {
    pub asi: String,
    pub sid: String,
    pub hp: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct SupplyChain {
    pub complete: i32,
    pub nodes: Vec<SupplyChainNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Source {
    pub schain: Option<SupplyChain>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Site {
    pub id: String,
    pub domain: String,
    pub page: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct App {
    pub id: String,
    pub bundle: String,
    pub name: String,
}

/// Exactly one of `Site` or `App` is present on a valid request (enforced
/// by the bid-request validator, not by this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DistributionChannel {
    Site(Site),
    App(App),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Banner {
    pub w: Option<i32>,
    pub h: Option<i32>,
    pub format: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Video {
    pub w: Option<i32>,
    pub h: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Audio {}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Native {
    pub request: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Deal {
    pub id: String,
    pub bidfloor: f64,
    pub bidfloorcur: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Pmp {
    pub private_auction: i32,
    pub deals: Vec<Deal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct Imp {
    pub id: String,
    pub banner: Option<Banner>,
    pub video: Option<Video>,
    pub audio: Option<Audio>,
    pub native: Option<Native>,
    pub bidfloor: f64,
    pub bidfloorcur: String,
    pub pmp: Option<Pmp>,
    pub tagid: String,
}

impl Imp {
    /// Does this impression declare at least one of the four media types.
    pub fn has_media_type(&self) -> bool {
        self.banner.is_some() || self.video.is_some() || self.audio.is_some() || self.native.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct BidRequest {
    pub id: String,
    pub imp: Vec<Imp>,
    pub site: Option<Site>,
    pub app: Option<App>,
    pub user: Option<User>,
    pub device: Option<Device>,
    pub regs: Option<Regs>,
    pub source: Option<Source>,
    pub cur: Vec<String>,
    pub tmax: i64,
}

impl Default for BidRequest {
    fn default() -> Self {
        Self {
            id: String::new(),
            imp: Vec::new(),
            site: None,
            app: None,
            user: None,
            device: None,
            regs: None,
            source: None,
            cur: Vec::new(),
            tmax: 0,
        }
    }
}

impl BidRequest {
    pub fn channel(&self) -> Option<DistributionChannel> {
        match (&self.site, &self.app) {
            (Some(site), None) => Some(DistributionChannel::Site(site.clone())),
            (None, Some(app)) => Some(DistributionChannel::App(app.clone())),
            _ => None,
        }
    }
}
