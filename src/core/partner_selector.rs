//! Client for the (external, out-of-scope) partner selector service.
//!
//! The selector tells the dispatcher which configured bidders to call for a
//! given request and which to skip. It's treated as an optimization, not a
//! dependency: on timeout, error, or an open circuit the dispatcher falls
//! back to calling every enabled bidder (fail open).

use std::time::Duration;

use anyhow::anyhow;
use reqwest::{Client, redirect, retry};
use serde::Deserialize;
use tracing::debug;

use crate::core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};

/// 1MB cap on the selector's response body; a selector that returns more
/// than this is treated as failed rather than read to completion.
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct PartnerSelectorResponse {
    pub selected_bidders: Vec<String>,
    #[serde(default)]
    pub excluded_bidders: Vec<String>,
    pub mode: String,
    #[serde(default)]
    pub processing_time_ms: u64,
}

pub struct PartnerSelectorClient {
    client: Client,
    url: String,
    api_key: String,
    enabled: bool,
    breaker: CircuitBreaker,
}

impl PartnerSelectorClient {
    pub fn new(url: String, api_key: String, enabled: bool) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(200))
            .timeout(Duration::from_millis(500))
            .retry(retry::never())
            .redirect(redirect::Policy::none())
            .gzip(true)
            .build()
            .map_err(anyhow::Error::from)?;

        Ok(Self {
            client,
            url,
            api_key,
            enabled,
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
        })
    }

    /// Ask the selector which of `candidates` to call. Returns `None` on any
    /// failure mode (disabled, circuit open, timeout, bad body, oversized
    /// body) — callers treat `None` as "call everyone".
    pub async fn select(&self, request_id: &str, candidates: &[String]) -> Option<PartnerSelectorResponse> {
        if !self.enabled {
            return None;
        }
        if !self.breaker.allow() {
            debug!(request_id, "partner selector circuit open, failing open");
            return None;
        }

        match self.call(request_id, candidates).await {
            Ok(resp) => {
                self.breaker.record_success();
                Some(resp)
            }
            Err(err) => {
                debug!(request_id, error = %err, "partner selector call failed, failing open");
                self.breaker.record_failure();
                None
            }
        }
    }

    async fn call(&self, request_id: &str, candidates: &[String]) -> anyhow::Result<PartnerSelectorResponse> {
        let body = serde_json::json!({ "request_id": request_id, "candidates": candidates });

        let res = self
            .client
            .post(&self.url)
            .header("X-Internal-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("partner selector request failed: {e}"))?;

        if !res.status().is_success() {
            return Err(anyhow!("partner selector returned status {}", res.status()));
        }

        if let Some(len) = res.content_length() {
            if len as usize > MAX_RESPONSE_BYTES {
                return Err(anyhow!("partner selector response too large: {len} bytes"));
            }
        }

        let bytes = res.bytes().await.map_err(|e| anyhow!("failed reading partner selector body: {e}"))?;
        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(anyhow!("partner selector response exceeded 1MB cap"));
        }

        serde_json::from_slice(&bytes).map_err(|e| anyhow!("malformed partner selector response: {e}"))
    }
}

/// Resolve the final candidate set for a request: selector output when
/// available, otherwise every enabled bidder (fail open).
pub fn resolve_candidates(selector_result: Option<&PartnerSelectorResponse>, all_enabled: &[String]) -> Vec<String> {
    match selector_result {
        Some(resp) => resp.selected_bidders.clone(),
        None => all_enabled.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_candidates_uses_selector_output_when_present() {
        let resp = PartnerSelectorResponse {
            selected_bidders: vec!["a".into()],
            excluded_bidders: vec!["b".into()],
            mode: "live".into(),
            processing_time_ms: 3,
        };
        let resolved = resolve_candidates(Some(&resp), &["a".into(), "b".into()]);
        assert_eq!(resolved, vec!["a".to_string()]);
    }

    #[test]
    fn resolve_candidates_fails_open_to_all_enabled() {
        let all = vec!["a".to_string(), "b".to_string()];
        let resolved = resolve_candidates(None, &all);
        assert_eq!(resolved, all);
    }

    #[tokio::test]
    async fn disabled_client_short_circuits_without_network_call() {
        let client = PartnerSelectorClient::new("http://127.0.0.1:1".into(), "key".into(), false).unwrap();
        let result = client.select("req1", &["a".into()]).await;
        assert!(result.is_none());
    }
}
