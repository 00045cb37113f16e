//! `POST /openrtb2/auction` — the one inbound HTTP surface this exchange
//! exposes. Everything upstream of this handler (TLS, auth, rate limiting,
//! privacy-compliance gating) belongs to the surrounding system and is
//! modeled here only as trusted headers the gateway is assumed to inject.

use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{error, Instrument};

use crate::sample_or_attach_root_span;

use crate::app::state::AppState;
use crate::core::orchestrator::run_auction;
use crate::core::publisher::Publisher;
use crate::rtb::bid_request::BidRequest;

fn publisher_from_headers(req: &HttpRequest) -> Publisher {
    let header_str = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();

    let bid_multiplier = req
        .headers()
        .get("x-bid-multiplier")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(1.0);

    Publisher { id: header_str("x-publisher-id"), bid_multiplier, allowed_domains: header_str("x-allowed-domains") }
}

pub async fn auction(http_req: HttpRequest, state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let publisher = publisher_from_headers(&http_req);
    let span = sample_or_attach_root_span!(
        state.config.logging.span_sample_rate,
        "openrtb2_auction",
        publisher_id = publisher.id.as_str()
    );

    async move {
        let bid_request: BidRequest = match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(err) => {
                return HttpResponse::BadRequest().json(serde_json::json!({ "error": format!("malformed bid request: {err}") }));
            }
        };

        let deps = state.auction_deps();

        match run_auction(&bid_request, &publisher, &deps).await {
            Ok(outcome) => HttpResponse::Ok().json(outcome.response),
            Err(validation_err) => {
                error!(error = %validation_err, field = validation_err.field(), "request failed validation");
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": validation_err.to_string(),
                    "field": validation_err.field(),
                }))
            }
        }
    }
    .instrument(span)
    .await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/openrtb2/auction", web::post().to(auction));
}
