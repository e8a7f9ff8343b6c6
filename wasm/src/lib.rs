//! WebAssembly module for the Machirepo platform
//!
//! Provides client-side computation for:
//! - Report form validation before upload
//! - Geolocation checks for the location step
//! - Badge rank display

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Validate the step-1 report form.
///
/// Returns `null` when the form is acceptable, otherwise a JSON object
/// `{ field, message, message_ja }` for the first failing field.
#[wasm_bindgen]
pub fn validate_report_form(title: &str, comment: &str, has_tag: bool, photo_size: u32) -> JsValue {
    let result = validate_title(title)
        .and_then(|_| {
            if has_tag {
                Ok(())
            } else {
                Err(FieldError {
                    field: "tag_id",
                    message: "Please choose a category",
                    message_ja: "カテゴリーを選択してください",
                })
            }
        })
        .and_then(|_| validate_comment(comment))
        .and_then(|_| validate_photo_size(photo_size as usize, MAX_PHOTO_BYTES));

    match result {
        Ok(()) => JsValue::NULL,
        Err(err) => JsValue::from_str(&field_error_json(&err)),
    }
}

/// Largest photo the browser should attempt to upload
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

fn field_error_json(err: &FieldError) -> String {
    serde_json::json!({
        "field": err.field,
        "message": err.message,
        "message_ja": err.message_ja,
    })
    .to_string()
}

/// Whether the browser geolocation result is usable, so the manual
/// location step can be skipped
#[wasm_bindgen]
pub fn has_usable_geolocation(latitude: f64, longitude: f64) -> bool {
    let lat = Decimal::try_from(latitude).ok();
    let lng = Decimal::try_from(longitude).ok();
    is_valid_coordinate(lat)
        && is_valid_coordinate(lng)
        && lat
            .zip(lng)
            .map(|(lat, lng)| GpsCoordinates::new(lat, lng).is_in_range())
            .unwrap_or(false)
}

/// Badge earned for a post count, as its Japanese label
#[wasm_bindgen]
pub fn badge_label_for_post_count(count: u32) -> String {
    BadgeRank::for_post_count(i64::from(count)).label_ja().to_string()
}

/// Posts still needed to reach the next badge tier (0 at the top tier)
#[wasm_bindgen]
pub fn posts_until_next_badge(count: u32) -> u32 {
    let current = BadgeRank::for_post_count(i64::from(count));
    if current == BadgeRank::Rainbow {
        return 0;
    }
    let per_tier = POSTS_PER_BADGE_TIER as u32;
    per_tier - (count % per_tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_usable_geolocation() {
        assert!(has_usable_geolocation(35.6812, 139.7671));
        assert!(!has_usable_geolocation(0.0, 0.0));
        assert!(!has_usable_geolocation(35.6812, 0.0));
        assert!(!has_usable_geolocation(95.0, 139.7));
    }

    #[test]
    fn test_badge_label() {
        assert_eq!(badge_label_for_post_count(0), "なし");
        assert_eq!(badge_label_for_post_count(12), "銅バッジ");
        assert_eq!(badge_label_for_post_count(45), "虹バッジ");
    }

    #[test]
    fn test_posts_until_next_badge() {
        assert_eq!(posts_until_next_badge(0), 10);
        assert_eq!(posts_until_next_badge(17), 3);
        assert_eq!(posts_until_next_badge(40), 0);
    }

    #[test]
    fn test_field_error_json() {
        let err = validate_title("").unwrap_err();
        let json: serde_json::Value = serde_json::from_str(&field_error_json(&err)).unwrap();
        assert_eq!(json["field"], "title");
        assert_eq!(json["message_ja"], "報告のタイトルは必須です。");
    }
}
