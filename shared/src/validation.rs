//! Validation utilities for the Machirepo platform
//!
//! Field checks return a [`FieldError`] carrying English and Japanese text so
//! the backend and the browser (via WASM) reject input with the same wording.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{LOCATION_NAME_MAX_LEN, TAG_NAME_MAX_LEN, TITLE_MAX_LEN};
use crate::types::{GpsCoordinates, ImageFormat};

/// Decimal places kept for stored coordinates
pub const COORDINATE_DECIMAL_PLACES: u32 = 13;

/// Maximum length of a signup username (used as the display name)
pub const USERNAME_MAX_LEN: usize = 50;

/// Maximum length of an email address
pub const EMAIL_MAX_LEN: usize = 254;

/// Minimum password length
pub const PASSWORD_MIN_LEN: usize = 8;

/// A rejected form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
    pub message_ja: &'static str,
}

impl FieldError {
    const fn new(field: &'static str, message: &'static str, message_ja: &'static str) -> Self {
        Self {
            field,
            message,
            message_ja,
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate the signup username (shown as the resident's name)
pub fn validate_username(username: &str) -> Result<(), FieldError> {
    if username.trim().is_empty() {
        return Err(FieldError::new("username", "Name is required", "氏名は必須です。"));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(FieldError::new(
            "username",
            "Name must be at most 50 characters",
            "氏名は50文字以内で入力してください。",
        ));
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), FieldError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FieldError::new(
            "email",
            "Email address is required",
            "メールアドレスは必須です。",
        ));
    }
    if email.len() > EMAIL_MAX_LEN {
        return Err(FieldError::new(
            "email",
            "Email address is too long",
            "メールアドレスが長すぎます。",
        ));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FieldError::new(
            "email",
            "Invalid email format",
            "有効なメールアドレスを入力してください。",
        ))
    }
}

/// Trim the address and lower-case its domain part
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), FieldError> {
    if password.is_empty() {
        return Err(FieldError::new(
            "password",
            "Password is required",
            "パスワードは必須です。",
        ));
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(FieldError::new(
            "password",
            "Password must be at least 8 characters",
            "パスワードは8文字以上で入力してください。",
        ));
    }
    Ok(())
}

// ============================================================================
// Report Validations
// ============================================================================

/// Validate the report title
pub fn validate_title(title: &str) -> Result<(), FieldError> {
    if title.trim().is_empty() {
        return Err(FieldError::new(
            "title",
            "Report title is required",
            "報告のタイトルは必須です。",
        ));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(FieldError::new(
            "title",
            "Title must be at most 100 characters",
            "タイトルは100文字以内で入力してください。",
        ));
    }
    Ok(())
}

/// Validate the situation description
pub fn validate_comment(comment: &str) -> Result<(), FieldError> {
    if comment.trim().is_empty() {
        return Err(FieldError::new(
            "comment",
            "A description of the situation is required",
            "状況説明は必須です。",
        ));
    }
    Ok(())
}

/// Validate the optional free-text place name
pub fn validate_location_name(name: &str) -> Result<(), FieldError> {
    if name.chars().count() > LOCATION_NAME_MAX_LEN {
        return Err(FieldError::new(
            "location_name",
            "Place name must be at most 255 characters",
            "入力された地名が正しくありません。",
        ));
    }
    Ok(())
}

/// Validate a tag name
pub fn validate_tag_name(name: &str) -> Result<(), FieldError> {
    if name.trim().is_empty() {
        return Err(FieldError::new("name", "Tag name is required", "タグ名は必須です。"));
    }
    if name.chars().count() > TAG_NAME_MAX_LEN {
        return Err(FieldError::new(
            "name",
            "Tag name must be at most 50 characters",
            "タグ名は50文字以内で入力してください。",
        ));
    }
    Ok(())
}

/// Validate the decoded size of an uploaded photo
pub fn validate_photo_size(len: usize, max_bytes: usize) -> Result<(), FieldError> {
    if len == 0 {
        return Err(FieldError::new(
            "photo",
            "Please upload a photo",
            "写真をアップロードしてください。",
        ));
    }
    if len > max_bytes {
        return Err(FieldError::new(
            "photo",
            "Photo exceeds the maximum file size (5MB)",
            "写真のファイルサイズが上限（最大5MB）を超えています。",
        ));
    }
    Ok(())
}

/// Identify an image by its magic bytes
pub fn detect_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

// ============================================================================
// Coordinate Validations
// ============================================================================

/// A coordinate counts as captured when present and not the `0.0` placeholder
/// the browser submits when geolocation failed
pub fn is_valid_coordinate(value: Option<Decimal>) -> bool {
    let threshold = Decimal::new(1, 6);
    value.is_some_and(|v| v.abs() > threshold)
}

/// Leniently parse a coordinate sent by a browser; blank means absent
pub fn parse_coordinate(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}

/// Round a coordinate half-up to the stored precision
pub fn quantize_coordinate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(
        COORDINATE_DECIMAL_PLACES,
        RoundingStrategy::MidpointAwayFromZero,
    )
}

/// Validate a latitude/longitude pair when both are provided
pub fn validate_coordinates(
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
) -> Result<(), FieldError> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => {
            if GpsCoordinates::new(lat, lng).is_in_range() {
                Ok(())
            } else {
                Err(FieldError::new(
                    "latitude",
                    "Coordinates are out of range",
                    "位置情報の値が範囲外です。",
                ))
            }
        }
        (None, None) => Ok(()),
        (Some(lat), None) if lat.abs() <= Decimal::from(90) => Ok(()),
        (None, Some(lng)) if lng.abs() <= Decimal::from(180) => Ok(()),
        _ => Err(FieldError::new(
            "latitude",
            "Coordinates are out of range",
            "位置情報の値が範囲外です。",
        )),
    }
}
