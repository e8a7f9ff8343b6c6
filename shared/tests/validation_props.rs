//! Property tests for report and account validation

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    is_valid_coordinate, normalize_email, quantize_coordinate, validate_title, BadgeRank,
    COORDINATE_DECIMAL_PLACES,
};

proptest! {
    /// Badge tier never decreases as the post count grows
    #[test]
    fn badge_rank_is_monotonic(count in 0i64..1000, extra in 0i64..100) {
        prop_assert!(BadgeRank::for_post_count(count) <= BadgeRank::for_post_count(count + extra));
    }

    /// Each completed block of ten posts is one tier, capped at rainbow
    #[test]
    fn badge_rank_matches_tier(count in 0i64..100) {
        let expected = match count / 10 {
            0 => BadgeRank::None,
            1 => BadgeRank::Bronze,
            2 => BadgeRank::Silver,
            3 => BadgeRank::Gold,
            _ => BadgeRank::Rainbow,
        };
        prop_assert_eq!(BadgeRank::for_post_count(count), expected);
    }

    /// Quantized coordinates keep at most 13 decimal places and move by at
    /// most half a unit in the last place
    #[test]
    fn quantize_bounds(mantissa in -180_000_000_000_000_000i64..180_000_000_000_000_000i64) {
        let value = Decimal::new(mantissa, 15);
        let rounded = quantize_coordinate(value);
        prop_assert!(rounded.scale() <= COORDINATE_DECIMAL_PLACES);
        let half_unit = Decimal::new(5, COORDINATE_DECIMAL_PLACES + 1);
        prop_assert!((rounded - value).abs() <= half_unit);
    }

    /// Any coordinate comfortably away from zero counts as captured
    #[test]
    fn nonzero_coordinates_are_valid(deg in 1i64..90, frac in 0i64..1_000_000) {
        let value = Decimal::new(deg * 1_000_000 + frac, 6);
        prop_assert!(is_valid_coordinate(Some(value)));
        prop_assert!(is_valid_coordinate(Some(-value)));
    }

    /// Titles up to 100 characters are accepted, longer ones rejected
    #[test]
    fn title_length_limit(len in 1usize..150) {
        let title = "報".repeat(len);
        prop_assert_eq!(validate_title(&title).is_ok(), len <= 100);
    }

    /// Normalizing is idempotent
    #[test]
    fn normalize_email_idempotent(local in "[A-Za-z0-9.]{1,12}", domain in "[A-Za-z]{2,10}\\.(COM|jp|Org)") {
        let email = format!("{}@{}", local, domain);
        let once = normalize_email(&email);
        prop_assert_eq!(normalize_email(&once), once.clone());
        prop_assert!(once.ends_with(&domain.to_lowercase()));
    }
}
