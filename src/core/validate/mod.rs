pub mod bid;
pub mod request;

pub use bid::{validate_bid, validate_bids};
pub use request::validate_request;
