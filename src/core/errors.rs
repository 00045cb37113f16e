use thiserror::Error;

/// Structural validation failure against an inbound `BidRequest`. This is
/// the sole error class `run_auction` returns to its caller — every other
/// failure mode (partner selector down, all bidders failing, deadline hit)
/// surfaces as a successful, possibly empty, response instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("request is missing an id")]
    MissingId,
    #[error("request has no impressions")]
    NoImpressions,
    #[error("request has more than 100 impressions ({0})")]
    TooManyImpressions(usize),
    #[error("impression at index {0} has an empty id")]
    EmptyImpressionId(usize),
    #[error("duplicate impression id: {0}")]
    DuplicateImpressionId(String),
    #[error("impression {0} declares no media type")]
    NoMediaType(String),
    #[error("impression {0} banner has neither dimensions nor a format list")]
    BannerMissingSize(String),
    #[error("site/app: exactly one of site or app must be present")]
    SiteAppXor,
    #[error("tmax must be non-negative, got {0}")]
    NegativeTmax(i64),
    #[error("tmax must be 0 or at least 10ms, got {0}")]
    TmaxTooSmall(i64),
    #[error("tmax exceeds the 30000ms ceiling, got {0}")]
    TmaxTooLarge(i64),
}

impl ValidationError {
    /// Name of the offending field, for API/debug surfaces that want to
    /// report `{field, reason}` rather than a free-text message.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingId => "id",
            ValidationError::NoImpressions
            | ValidationError::TooManyImpressions(_)
            | ValidationError::EmptyImpressionId(_)
            | ValidationError::DuplicateImpressionId(_)
            | ValidationError::NoMediaType(_)
            | ValidationError::BannerMissingSize(_) => "imp",
            ValidationError::SiteAppXor => "site/app",
            ValidationError::NegativeTmax(_)
            | ValidationError::TmaxTooSmall(_)
            | ValidationError::TmaxTooLarge(_) => "tmax",
        }
    }
}

/// Per-bid validation failure. The offending bid is dropped and the reason
/// recorded in debug info; the auction proceeds without it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BidValidationError {
    #[error("bid is missing an id")]
    MissingId,
    #[error("bid is missing an impid")]
    MissingImpId,
    #[error("bid impid {0} does not match any impression on the request")]
    UnknownImpId(String),
    #[error("bid price {0} is negative")]
    NegativePrice(f64),
    #[error("bid price {price} is below the configured minimum of {min}")]
    BelowMinPrice { price: f64, min: f64 },
    #[error("bid price {price} is below the effective floor of {floor}")]
    BelowFloor { price: f64, floor: f64 },
    #[error("bid has neither adm nor nurl")]
    MissingCreative,
    #[error("duplicate bid id: {0}")]
    DuplicateBidId(String),
}
