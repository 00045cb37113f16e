//! Exchange configuration: loaded once at startup from YAML, coerced to
//! sane defaults rather than rejected on bad input, then shared read-only
//! for the lifetime of the process.

use std::path::Path;
use std::time::Duration;

use config::Config;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::core::auction::clearer::AuctionType;
use crate::core::bidder::Bidder;
use crate::core::clone_limits::CloneLimits;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogType {
    Stdout {
        #[serde(default = "default_logtype_color")]
        color: bool,
        #[serde(default)]
        json: bool,
    },
    File {
        path: std::path::PathBuf,
        #[serde(default)]
        json: bool,
    },
}

fn default_logtype_color() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub span_sample_rate: f32,
    #[serde(default)]
    pub sink: LogType,
}

impl Default for LogType {
    fn default() -> Self {
        LogType::Stdout { color: true, json: false }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), span_sample_rate: 1.0, sink: LogType::default() }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| anyhow::anyhow!("invalid log level '{}': expected trace|debug|info|warn|error", self.level))?;

        if !(0.0..=1.0).contains(&self.span_sample_rate) {
            anyhow::bail!("span_sample_rate must be within [0.0, 1.0], got {}", self.span_sample_rate);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerSelectorConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Default for PartnerSelectorConfig {
    fn default() -> Self {
        Self { url: String::new(), api_key: String::new(), enabled: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecorderSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_event_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_event_workers")]
    pub workers: usize,
    #[serde(default = "default_event_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_event_buffer_size() -> usize {
    100
}
fn default_event_workers() -> usize {
    2
}
fn default_event_queue_capacity() -> usize {
    10
}

impl Default for EventRecorderSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            enabled: false,
            buffer_size: default_event_buffer_size(),
            workers: default_event_workers(),
            queue_capacity: default_event_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct ExchangeConfig {
    #[serde(default, with = "humantime_serde")]
    pub default_timeout: Duration,
    #[serde(default = "default_max_concurrent_bidders")]
    pub max_concurrent_bidders: usize,
    #[serde(default)]
    pub partner_selector: PartnerSelectorConfig,
    #[serde(default)]
    pub event_recorder: EventRecorderSettings,
    #[serde(default)]
    pub clone_limits: CloneLimits,
    #[serde(default)]
    pub dynamic_bidders_enabled: bool,
    #[serde(default)]
    pub auction_type: AuctionType,
    #[serde(default = "default_price_increment")]
    pub price_increment: f64,
    #[serde(default)]
    pub min_bid_price: f64,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default)]
    pub bidders: Vec<Bidder>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_concurrent_bidders() -> usize {
    10
}
fn default_price_increment() -> f64 {
    0.01
}
fn default_currency() -> String {
    "USD".to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(300),
            max_concurrent_bidders: default_max_concurrent_bidders(),
            partner_selector: PartnerSelectorConfig::default(),
            event_recorder: EventRecorderSettings::default(),
            clone_limits: CloneLimits::default(),
            dynamic_bidders_enabled: false,
            auction_type: AuctionType::default(),
            price_increment: default_price_increment(),
            min_bid_price: 0.0,
            default_currency: default_currency(),
            bidders: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ExchangeConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let cfg = Config::builder().add_source(config::File::from(path)).build()?;
        let mut exchange: ExchangeConfig = cfg.try_deserialize()?;
        exchange.sanitize();
        Ok(exchange)
    }

    /// Silently coerces out-of-range values to their defaults rather than
    /// rejecting the config outright. Runs once at construction.
    pub fn sanitize(&mut self) {
        if self.max_concurrent_bidders == 0 {
            self.max_concurrent_bidders = default_max_concurrent_bidders();
        }
        if self.price_increment <= 0.0 {
            self.price_increment = default_price_increment();
        }
        if self.min_bid_price < 0.0 {
            self.min_bid_price = 0.0;
        }
        if self.default_currency.is_empty() {
            self.default_currency = default_currency();
        }
        if self.default_timeout.is_zero() {
            self.default_timeout = Duration::from_millis(300);
        }

        if self.min_bid_price == 0.0 {
            tracing::warn!(
                "min_bid_price is 0; second-price single-bid clearing with no floor will clear at exactly price_increment ({})",
                self.price_increment
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_restores_default_max_concurrent_bidders_when_zero() {
        let mut cfg = ExchangeConfig { max_concurrent_bidders: 0, ..Default::default() };
        cfg.sanitize();
        assert_eq!(cfg.max_concurrent_bidders, 10);
    }

    #[test]
    fn sanitize_restores_default_price_increment_when_non_positive() {
        let mut cfg = ExchangeConfig { price_increment: -1.0, ..Default::default() };
        cfg.sanitize();
        assert_eq!(cfg.price_increment, 0.01);
    }

    #[test]
    fn sanitize_clamps_negative_min_bid_price_to_zero() {
        let mut cfg = ExchangeConfig { min_bid_price: -5.0, ..Default::default() };
        cfg.sanitize();
        assert_eq!(cfg.min_bid_price, 0.0);
    }

    #[test]
    fn logging_validate_rejects_unknown_level() {
        let cfg = LoggingConfig { level: "noisy".to_string(), ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn logging_validate_rejects_out_of_range_sample_rate() {
        let cfg = LoggingConfig { span_sample_rate: 2.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_config_is_internally_consistent() {
        let cfg = ExchangeConfig::default();
        assert!(cfg.logging.validate().is_ok());
        assert_eq!(cfg.default_currency, "USD");
    }
}
