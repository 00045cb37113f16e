//! Bid-request structural validation.
//!
//! Runs once per inbound request, before any bidder is cloned or called.
//! The first violation found is returned; callers turn this into an
//! `NBR::InvalidRequest` no-bid rather than surfacing raw validation detail
//! to the caller.

use crate::core::errors::ValidationError;
use crate::rtb::bid_request::BidRequest;

const MAX_IMPRESSIONS: usize = 100;
const MIN_TMAX_MS: i64 = 10;
const MAX_TMAX_MS: i64 = 30_000;

pub fn validate_request(req: &BidRequest) -> Result<(), ValidationError> {
    if req.id.is_empty() {
        return Err(ValidationError::MissingId);
    }

    if req.imp.is_empty() {
        return Err(ValidationError::NoImpressions);
    }
    if req.imp.len() > MAX_IMPRESSIONS {
        return Err(ValidationError::TooManyImpressions(req.imp.len()));
    }

    let mut seen_ids = std::collections::HashSet::with_capacity(req.imp.len());
    for (idx, imp) in req.imp.iter().enumerate() {
        if imp.id.is_empty() {
            return Err(ValidationError::EmptyImpressionId(idx));
        }
        if !seen_ids.insert(imp.id.as_str()) {
            return Err(ValidationError::DuplicateImpressionId(imp.id.clone()));
        }
        if !imp.has_media_type() {
            return Err(ValidationError::NoMediaType(imp.id.clone()));
        }
        if let Some(banner) = &imp.banner {
            let has_dims = banner.w.is_some() && banner.h.is_some();
            if !has_dims && banner.format.is_empty() {
                return Err(ValidationError::BannerMissingSize(imp.id.clone()));
            }
        }
    }

    if req.channel().is_none() {
        return Err(ValidationError::SiteAppXor);
    }

    if req.tmax < 0 {
        return Err(ValidationError::NegativeTmax(req.tmax));
    }
    if req.tmax != 0 && req.tmax < MIN_TMAX_MS {
        return Err(ValidationError::TmaxTooSmall(req.tmax));
    }
    if req.tmax > MAX_TMAX_MS {
        return Err(ValidationError::TmaxTooLarge(req.tmax));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtb::bid_request::{AppBuilder, BannerBuilder, BidRequestBuilder, ImpBuilder, SiteBuilder};

    fn valid_request() -> BidRequest {
        let imp = ImpBuilder::default()
            .id("imp1".to_string())
            .banner(Some(BannerBuilder::default().w(Some(300)).h(Some(250)).build().unwrap()))
            .build()
            .unwrap();

        BidRequestBuilder::default()
            .id("req1".to_string())
            .imp(vec![imp])
            .site(Some(SiteBuilder::default().id("site1".to_string()).build().unwrap()))
            .tmax(200)
            .build()
            .unwrap()
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate_request(&valid_request()).is_ok());
    }

    #[test]
    fn rejects_missing_id() {
        let mut req = valid_request();
        req.id.clear();
        assert_eq!(validate_request(&req), Err(ValidationError::MissingId));
    }

    #[test]
    fn rejects_empty_impressions() {
        let mut req = valid_request();
        req.imp.clear();
        assert_eq!(validate_request(&req), Err(ValidationError::NoImpressions));
    }

    #[test]
    fn rejects_more_than_one_hundred_impressions() {
        let mut req = valid_request();
        req.imp = (0..101)
            .map(|i| {
                ImpBuilder::default()
                    .id(format!("imp{i}"))
                    .banner(Some(BannerBuilder::default().w(Some(1)).h(Some(1)).build().unwrap()))
                    .build()
                    .unwrap()
            })
            .collect();
        assert_eq!(validate_request(&req), Err(ValidationError::TooManyImpressions(101)));
    }

    #[test]
    fn rejects_duplicate_impression_ids() {
        let mut req = valid_request();
        let dup = req.imp[0].clone();
        req.imp.push(dup);
        assert_eq!(validate_request(&req), Err(ValidationError::DuplicateImpressionId("imp1".to_string())));
    }

    #[test]
    fn rejects_impression_with_no_media_type() {
        let mut req = valid_request();
        req.imp[0].banner = None;
        assert_eq!(validate_request(&req), Err(ValidationError::NoMediaType("imp1".to_string())));
    }

    #[test]
    fn rejects_banner_with_no_size_and_no_format_list() {
        let mut req = valid_request();
        req.imp[0].banner = Some(crate::rtb::bid_request::Banner { w: None, h: None, format: vec![] });
        assert_eq!(validate_request(&req), Err(ValidationError::BannerMissingSize("imp1".to_string())));
    }

    #[test]
    fn accepts_banner_sized_only_via_format_list() {
        let mut req = valid_request();
        req.imp[0].banner = Some(crate::rtb::bid_request::Banner { w: None, h: None, format: vec![(320, 50)] });
        assert!(validate_request(&req).is_ok());
    }

    #[test]
    fn rejects_both_site_and_app_present() {
        let mut req = valid_request();
        req.app = Some(AppBuilder::default().id("app1".to_string()).build().unwrap());
        assert_eq!(validate_request(&req), Err(ValidationError::SiteAppXor));
    }

    #[test]
    fn rejects_neither_site_nor_app_present() {
        let mut req = valid_request();
        req.site = None;
        assert_eq!(validate_request(&req), Err(ValidationError::SiteAppXor));
    }

    #[test]
    fn rejects_negative_tmax() {
        let mut req = valid_request();
        req.tmax = -1;
        assert_eq!(validate_request(&req), Err(ValidationError::NegativeTmax(-1)));
    }

    #[test]
    fn zero_tmax_is_allowed_as_unset() {
        let mut req = valid_request();
        req.tmax = 0;
        assert!(validate_request(&req).is_ok());
    }

    #[test]
    fn rejects_tmax_below_minimum_when_nonzero() {
        let mut req = valid_request();
        req.tmax = 5;
        assert_eq!(validate_request(&req), Err(ValidationError::TmaxTooSmall(5)));
    }

    #[test]
    fn rejects_tmax_above_ceiling() {
        let mut req = valid_request();
        req.tmax = 60_000;
        assert_eq!(validate_request(&req), Err(ValidationError::TmaxTooLarge(60_000)));
    }
}
