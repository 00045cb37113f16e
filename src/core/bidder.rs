//! Bidder registry: the set of demand partners the dispatcher fans out to.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Whether a bidder's winning bids are aggregated under the exchange's own
/// seat or passed through under the publisher's own seat. A bidder with no
/// explicit classification defaults to `Platform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DemandType {
    #[default]
    Platform,
    Publisher,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bidder {
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub demand_type: DemandType,
    #[serde(default)]
    pub enabled: bool,
    /// Bidder-specific timeout override, clamped to `[10ms, 5s]` and to the
    /// auction's remaining deadline by the dispatcher. `None` means "use
    /// the exchange default".
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<std::time::Duration>,
}

impl Bidder {
    pub fn is_mock(&self) -> bool {
        self.endpoint == "MOCK"
    }
}

/// Shared, hot-swappable view of the configured bidder set. Dynamic bidder
/// updates (partner selector additions, config reloads) replace the whole
/// map atomically; readers on the hot path never block.
#[derive(Default)]
pub struct BidderRegistry {
    inner: ArcSwap<HashMap<String, Bidder>>,
}

impl BidderRegistry {
    pub fn new(bidders: Vec<Bidder>) -> Self {
        let map = bidders.into_iter().map(|b| (b.name.clone(), b)).collect();
        Self { inner: ArcSwap::from_pointee(map) }
    }

    pub fn get(&self, name: &str) -> Option<Bidder> {
        self.inner.load().get(name).cloned()
    }

    pub fn enabled(&self) -> Vec<Bidder> {
        self.inner.load().values().filter(|b| b.enabled).cloned().collect()
    }

    /// Atomically swap in a new bidder set, e.g. after a partner selector
    /// response or a config reload.
    pub fn replace(&self, bidders: Vec<Bidder>) {
        let map = bidders.into_iter().map(|b| (b.name.clone(), b)).collect();
        self.inner.store(Arc::new(map));
    }

    /// Merge dynamically-discovered bidders into the existing set without
    /// disturbing statically-configured ones of the same name.
    pub fn merge_dynamic(&self, bidders: Vec<Bidder>) {
        let mut map = (**self.inner.load()).clone();
        for b in bidders {
            map.insert(b.name.clone(), b);
        }
        self.inner.store(Arc::new(map));
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bidder(name: &str, demand_type: DemandType) -> Bidder {
        Bidder { name: name.to_string(), endpoint: "http://example.test".into(), demand_type, enabled: true, timeout: None }
    }

    #[test]
    fn unclassified_bidder_defaults_to_platform_demand() {
        assert_eq!(DemandType::default(), DemandType::Platform);
    }

    #[test]
    fn registry_replace_is_visible_to_subsequent_reads() {
        let reg = BidderRegistry::new(vec![bidder("a", DemandType::Platform)]);
        assert_eq!(reg.len(), 1);

        reg.replace(vec![bidder("b", DemandType::Publisher)]);
        assert!(reg.get("a").is_none());
        assert_eq!(reg.get("b").unwrap().demand_type, DemandType::Publisher);
    }

    #[test]
    fn merge_dynamic_preserves_existing_entries() {
        let reg = BidderRegistry::new(vec![bidder("a", DemandType::Platform)]);
        reg.merge_dynamic(vec![bidder("b", DemandType::Publisher)]);

        assert_eq!(reg.len(), 2);
        assert!(reg.get("a").is_some());
        assert!(reg.get("b").is_some());
    }

    #[test]
    fn mock_endpoint_is_recognized() {
        let b = Bidder { endpoint: "MOCK".into(), ..bidder("m", DemandType::Platform) };
        assert!(b.is_mock());
    }
}
