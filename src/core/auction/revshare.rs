//! Per-publisher revenue-share transformation.
//!
//! Floors are marked up before bidders ever see them (so the exchange can
//! take its cut without the publisher's true floor being violated); winning
//! prices are marked back down by the same multiplier before the publisher
//! sees them. The gap between the two is the platform margin, reported to
//! the metrics collaborator.

/// `round(x * 100) / 100`, banker's-adjacent nearest rounding with ties away
/// from zero. The only property that actually matters here is idempotence:
/// rounding an already-rounded value must be a no-op.
pub fn round_to_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Applies the revenue-share multiplier to a raw floor before it is sent to
/// bidders: `round_to_cents(raw_floor * m)`.
pub fn markup_floor(raw_floor: f64, multiplier: f64) -> f64 {
    round_to_cents(raw_floor * multiplier)
}

/// Applies the inverse of the revenue-share multiplier to a cleared price
/// before it is returned to the publisher: `round_to_cents(cleared / m)`.
pub fn markdown_price(cleared_price: f64, multiplier: f64) -> f64 {
    round_to_cents(cleared_price / multiplier)
}

/// One (publisher, bidder, media-type) margin observation, reported to the
/// metrics collaborator after a winning bid is marked down.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginReport {
    pub publisher_id: String,
    pub bidder: String,
    pub media_type: Option<crate::rtb::bid_response::MediaType>,
    pub original_price: f64,
    pub adjusted_price: f64,
    pub cut: f64,
}

impl MarginReport {
    pub fn new(
        publisher_id: impl Into<String>,
        bidder: impl Into<String>,
        media_type: Option<crate::rtb::bid_response::MediaType>,
        cleared_price: f64,
        multiplier: f64,
    ) -> Self {
        let adjusted_price = markdown_price(cleared_price, multiplier);
        Self {
            publisher_id: publisher_id.into(),
            bidder: bidder.into(),
            media_type,
            original_price: cleared_price,
            adjusted_price,
            cut: round_to_cents(cleared_price - adjusted_price),
        }
    }
}
