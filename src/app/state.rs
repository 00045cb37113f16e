//! Shared application state constructed once at startup and handed to every
//! request via actix's `web::Data`.

use std::sync::Arc;

use reqwest::{Client, redirect, retry};

use crate::config::ExchangeConfig;
use crate::core::bidder::BidderRegistry;
use crate::core::dispatcher::Dispatcher;
use crate::core::events::{EventRecorder, EventRecorderConfig};
use crate::core::fpd::{FpdProcessor, NoopFpdProcessor};
use crate::core::metrics::{MetricsRecorder, NoopMetricsRecorder};
use crate::core::orchestrator::AuctionDeps;
use crate::core::partner_selector::PartnerSelectorClient;

pub struct AppState {
    pub config: Arc<ExchangeConfig>,
    pub registry: Arc<BidderRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub partner_selector: Option<Arc<PartnerSelectorClient>>,
    pub event_recorder: Option<Arc<EventRecorder>>,
    pub metrics: Arc<dyn MetricsRecorder>,
    pub fpd: Arc<dyn FpdProcessor>,
}

impl AppState {
    pub fn build(config: ExchangeConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let http = Client::builder()
            .connect_timeout(std::time::Duration::from_millis(200))
            .retry(retry::never())
            .redirect(redirect::Policy::none())
            .gzip(true)
            .build()?;

        let registry = Arc::new(BidderRegistry::new(config.bidders.clone()));
        let dispatcher = Arc::new(Dispatcher::new(http.clone(), config.max_concurrent_bidders, config.default_timeout));

        let partner_selector = if config.partner_selector.enabled {
            Some(Arc::new(PartnerSelectorClient::new(
                config.partner_selector.url.clone(),
                config.partner_selector.api_key.clone(),
                true,
            )?))
        } else {
            None
        };

        let event_recorder = if config.event_recorder.enabled {
            Some(EventRecorder::new(
                EventRecorderConfig {
                    url: config.event_recorder.url.clone(),
                    buffer_size: config.event_recorder.buffer_size,
                    workers: config.event_recorder.workers,
                    queue_capacity: config.event_recorder.queue_capacity,
                    batch_deadline: std::time::Duration::from_secs(2),
                },
                http,
            ))
        } else {
            None
        };

        Ok(Self {
            config,
            registry,
            dispatcher,
            partner_selector,
            event_recorder,
            metrics: Arc::new(NoopMetricsRecorder),
            fpd: Arc::new(NoopFpdProcessor),
        })
    }

    pub fn auction_deps(&self) -> AuctionDeps {
        AuctionDeps {
            config: self.config.clone(),
            registry: self.registry.clone(),
            dispatcher: self.dispatcher.clone(),
            partner_selector: self.partner_selector.clone(),
            event_recorder: self.event_recorder.clone(),
            metrics: self.metrics.clone(),
            fpd: self.fpd.clone(),
        }
    }
}
