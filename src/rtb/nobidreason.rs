//! No-bid-reason (NBR) constants.
//!
//! The upstream `rtb-runtime` crate generates these via a `spec_list!` macro
//! driven off the OpenRTB NBR table; since that crate isn't available here,
//! this reimplements the same call-site idiom locally. Spec fixes only the
//! two core codes (`NO_BIDDERS_AVAILABLE`, `TIMEOUT`); the rest mirror the
//! surrounding system's own extended table.

macro_rules! nbr_list {
    ($($(#[$meta:meta])* $name:ident = $code:expr => $desc:literal),+ $(,)?) => {
        $(
            $(#[$meta])*
            pub const $name: i32 = $code;
        )+

        /// Human-readable description for a known NBR code, if any.
        pub fn describe(code: i32) -> Option<&'static str> {
            match code {
                $($code => Some($desc),)+
                _ => None,
            }
        }
    };
}

nbr_list! {
    /// No bidder adapters were available to dispatch to.
    NO_BIDDERS_AVAILABLE = 2 => "No Bidders Available",
    /// The auction's wall-clock deadline elapsed before clearing completed.
    TIMEOUT = 1 => "Timeout",
    /// The request failed structural/field validation.
    INVALID_REQUEST = 3 => "Invalid Request",
    /// Bidders were dispatched but none returned a surviving bid.
    NO_CAMPAIGNS_FOUND = 501 => "No Campaigns Found",
    /// An internal error occurred while assembling the response.
    TECHNICAL_ERROR = 100 => "Technical Error",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_known_codes() {
        assert_eq!(describe(TIMEOUT), Some("Timeout"));
        assert_eq!(describe(NO_BIDDERS_AVAILABLE), Some("No Bidders Available"));
    }

    #[test]
    fn unknown_code_has_no_description() {
        assert_eq!(describe(9999), None);
    }
}
