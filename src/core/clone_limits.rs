use serde::{Deserialize, Serialize};

/// Hard upper bounds consulted by the request cloner's bounded deep clone.
/// Defense against pathological or hostile input sizes: a request with
/// 10,000 EIDs cannot force 10,000 allocations per bidder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneLimits {
    pub max_impressions: usize,
    pub max_eids: usize,
    pub max_user_data_segments: usize,
    pub max_deals_per_imp: usize,
    pub max_schain_nodes: usize,
}

impl Default for CloneLimits {
    fn default() -> Self {
        Self {
            max_impressions: 100,
            max_eids: 50,
            max_user_data_segments: 20,
            max_deals_per_imp: 50,
            max_schain_nodes: 20,
        }
    }
}
