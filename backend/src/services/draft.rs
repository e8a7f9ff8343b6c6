//! Report submission wizard
//!
//! Residents submit a report in three steps. The partially filled report is
//! kept in `report_drafts`, one row per user, together with the path of the
//! temporary photo upload. Confirming the draft copies the photo into
//! permanent storage and creates the report.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    quantize_coordinate, ImageFormat, PhotoPost, PhotoUpload, ReportDraft, Tag, WizardStep,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::post::{NewPost, PostService};
use crate::services::storage::{missing_temp_photo, photo_required, PhotoStorage};
use crate::services::tag::TagService;
use crate::services::user::UserService;

/// Where the owner fetches the photo of their open draft; temporary uploads
/// are not served from the public media root
pub const DRAFT_PHOTO_URL: &str = "/api/v1/reports/draft/photo";

const DRAFT_COLUMNS: &str = "user_id, title, comment, tag_id, photo_path, latitude, longitude, \
     location_name, updated_at";

#[derive(Debug, FromRow)]
struct DraftRow {
    user_id: Uuid,
    title: String,
    comment: String,
    tag_id: Option<Uuid>,
    photo_path: Option<String>,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
    location_name: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<DraftRow> for ReportDraft {
    fn from(row: DraftRow) -> Self {
        ReportDraft {
            user_id: row.user_id,
            title: row.title,
            comment: row.comment,
            tag_id: row.tag_id,
            photo_path: row.photo_path,
            latitude: row.latitude,
            longitude: row.longitude,
            location_name: row.location_name,
            updated_at: row.updated_at,
        }
    }
}

/// A coordinate as sent by a browser: a JSON number or a form string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoordinateValue {
    Number(f64),
    Text(String),
}

impl CoordinateValue {
    /// `None` when blank or unparseable
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            CoordinateValue::Number(n) => Decimal::from_f64(*n),
            CoordinateValue::Text(s) => shared::parse_coordinate(s),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, CoordinateValue::Text(s) if s.trim().is_empty())
    }
}

/// Step 1: photo and report details
#[derive(Debug, Deserialize)]
pub struct DetailsInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    pub tag_id: Option<Uuid>,
    pub photo: Option<PhotoUpload>,
    pub latitude: Option<CoordinateValue>,
    pub longitude: Option<CoordinateValue>,
}

/// Step 2: manual location
#[derive(Debug, Deserialize)]
pub struct LocationInput {
    pub location_name: Option<String>,
    pub latitude: Option<CoordinateValue>,
    pub longitude: Option<CoordinateValue>,
}

/// Draft state returned after each step
#[derive(Debug, Serialize)]
pub struct DraftStep {
    pub draft: ReportDraft,
    pub photo_url: Option<String>,
    pub next_step: WizardStep,
    pub step_number: u8,
}

impl DraftStep {
    fn new(draft: ReportDraft, next_step: WizardStep) -> Self {
        Self {
            photo_url: draft.photo_path.as_ref().map(|_| DRAFT_PHOTO_URL.to_string()),
            draft,
            next_step,
            step_number: next_step.number(),
        }
    }
}

/// Step 3 preview
#[derive(Debug, Serialize)]
pub struct ConfirmPreview {
    pub draft: ReportDraft,
    pub tag: Option<Tag>,
    pub photo_url: String,
    pub step_number: u8,
}

/// A submitted report
#[derive(Debug, Serialize)]
pub struct SubmittedReport {
    pub post: PhotoPost,
    pub next_step: WizardStep,
    pub message: String,
    pub message_ja: String,
}

#[derive(Clone)]
pub struct DraftService {
    db: PgPool,
    storage: PhotoStorage,
}

impl DraftService {
    pub fn new(db: PgPool, storage: PhotoStorage) -> Self {
        Self { db, storage }
    }

    pub async fn find_draft(&self, user_id: Uuid) -> AppResult<Option<ReportDraft>> {
        let row = sqlx::query_as::<_, DraftRow>(&format!(
            "SELECT {} FROM report_drafts WHERE user_id = $1",
            DRAFT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(ReportDraft::from))
    }

    pub async fn get_draft(&self, user_id: Uuid) -> AppResult<ReportDraft> {
        self.find_draft(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Report draft"))
    }

    /// Step 1: validate the details form, store the photo and start or
    /// replace the draft
    pub async fn save_details(&self, user_id: Uuid, input: DetailsInput) -> AppResult<DraftStep> {
        shared::validate_title(&input.title)?;

        let tag_id = input.tag_id.ok_or_else(|| AppError::Validation {
            field: "tag_id".to_string(),
            message: "Please choose a category".to_string(),
            message_ja: "カテゴリを選択してください。".to_string(),
        })?;
        if TagService::new(self.db.clone()).find_tag(tag_id).await?.is_none() {
            return Err(AppError::Validation {
                field: "tag_id".to_string(),
                message: "The selected category does not exist".to_string(),
                message_ja: "選択されたカテゴリは存在しません。".to_string(),
            });
        }

        shared::validate_comment(&input.comment)?;

        let existing = self.find_draft(user_id).await?;
        let previous_photo = existing.and_then(|d| d.photo_path);

        let photo_path = match &input.photo {
            Some(upload) => {
                let decoded = self.storage.decode_upload(upload)?;
                self.storage.save_temp(&decoded).await?
            }
            None => match &previous_photo {
                Some(path) if self.storage.exists(path).await => path.clone(),
                _ => return Err(photo_required()),
            },
        };

        let (latitude, longitude) = browser_location(input.latitude.as_ref(), input.longitude.as_ref());

        let row = sqlx::query_as::<_, DraftRow>(&format!(
            r#"
            INSERT INTO report_drafts
                (user_id, title, comment, tag_id, photo_path, latitude, longitude, location_name, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                title = EXCLUDED.title,
                comment = EXCLUDED.comment,
                tag_id = EXCLUDED.tag_id,
                photo_path = EXCLUDED.photo_path,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                location_name = NULL,
                updated_at = NOW()
            RETURNING {}
            "#,
            DRAFT_COLUMNS
        ))
        .bind(user_id)
        .bind(input.title.trim())
        .bind(input.comment.trim())
        .bind(tag_id)
        .bind(&photo_path)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(&self.db)
        .await?;

        if let Some(old) = previous_photo.filter(|old| *old != photo_path) {
            tracing::info!(%user_id, path = %old, "replaced temporary photo removed");
            self.storage.remove(&old).await;
        }

        let draft: ReportDraft = row.into();
        let next_step = draft.step_after_details();
        if next_step == WizardStep::Confirm {
            tracing::info!(%user_id, "browser geolocation present, skipping location step");
        }

        Ok(DraftStep::new(draft, next_step))
    }

    /// Discard the draft and its temporary photo
    pub async fn discard(&self, user_id: Uuid) -> AppResult<bool> {
        let photo_path = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM report_drafts WHERE user_id = $1 RETURNING photo_path",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        match photo_path {
            Some(path) => {
                if let Some(path) = path {
                    tracing::info!(%user_id, path = %path, "temporary photo cleaned up");
                    self.storage.remove(&path).await;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The temporary photo of the caller's draft and its image type
    pub async fn draft_photo(&self, user_id: Uuid) -> AppResult<(ImageFormat, Vec<u8>)> {
        let path = self
            .get_draft(user_id)
            .await?
            .photo_path
            .ok_or_else(|| AppError::not_found("Report draft"))?;
        if !self.storage.exists(&path).await {
            return Err(missing_temp_photo());
        }
        let bytes = self.storage.read(&path).await?;
        let format = shared::detect_image_format(&bytes).ok_or_else(|| {
            AppError::StorageError(format!("stored draft photo is not an image: {}", path))
        })?;
        Ok((format, bytes))
    }

    /// Step 2: decide whether the manual location form is needed
    pub async fn location_step(&self, user_id: Uuid) -> AppResult<DraftStep> {
        let draft = self.get_draft(user_id).await?;
        let next_step = if draft.has_geolocation() {
            tracing::info!(%user_id, "location already captured, skipping manual entry");
            WizardStep::Confirm
        } else {
            WizardStep::Location
        };
        Ok(DraftStep::new(draft, next_step))
    }

    /// Step 2: merge a manually entered location into the draft
    pub async fn update_location(&self, user_id: Uuid, input: LocationInput) -> AppResult<DraftStep> {
        let draft = self.get_draft(user_id).await?;

        let location_name = input
            .location_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        if let Some(name) = &location_name {
            shared::validate_location_name(name)?;
        }

        let latitude = parse_manual_coordinate("latitude", input.latitude.as_ref())?;
        let longitude = parse_manual_coordinate("longitude", input.longitude.as_ref())?;
        shared::validate_coordinates(latitude, longitude)?;

        let row = sqlx::query_as::<_, DraftRow>(&format!(
            r#"
            UPDATE report_drafts
            SET location_name = $2, latitude = $3, longitude = $4, updated_at = NOW()
            WHERE user_id = $1
            RETURNING {}
            "#,
            DRAFT_COLUMNS
        ))
        .bind(user_id)
        .bind(&location_name)
        .bind(latitude.or(draft.latitude))
        .bind(longitude.or(draft.longitude))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Report draft"))?;

        Ok(DraftStep::new(row.into(), WizardStep::Confirm))
    }

    /// Step 3 preview
    pub async fn confirm_preview(&self, user_id: Uuid) -> AppResult<ConfirmPreview> {
        let draft = self.confirmable_draft(user_id).await?;
        let tag = match draft.tag_id {
            Some(tag_id) => TagService::new(self.db.clone()).find_tag(tag_id).await?,
            None => None,
        };
        let photo_url = DRAFT_PHOTO_URL.to_string();

        Ok(ConfirmPreview {
            draft,
            tag,
            photo_url,
            step_number: WizardStep::Confirm.number(),
        })
    }

    /// Step 3: create the report from the draft
    pub async fn confirm(&self, user_id: Uuid) -> AppResult<SubmittedReport> {
        let draft = self.confirmable_draft(user_id).await?;
        let temp_path = draft.photo_path.clone().unwrap_or_default();

        if !self.storage.exists(&temp_path).await {
            tracing::warn!(%user_id, path = %temp_path, "temporary photo missing at confirmation");
            return Err(missing_temp_photo());
        }

        let tag_id = match draft.tag_id {
            Some(tag_id) => {
                let tag = TagService::new(self.db.clone()).find_tag(tag_id).await?;
                if tag.is_none() {
                    tracing::warn!(%user_id, %tag_id, "tag removed before confirmation, saving without tag");
                }
                tag.map(|t| t.id)
            }
            None => None,
        };

        let posted_at = Utc::now();
        let photo_path = self.storage.promote(&temp_path, posted_at).await?;

        let new_post = NewPost {
            user_id,
            title: draft.title,
            comment: draft.comment,
            photo_path: photo_path.clone(),
            tag_id,
            latitude: draft.latitude.map(quantize_coordinate),
            longitude: draft.longitude.map(quantize_coordinate),
            location_name: draft.location_name,
            posted_at,
        };

        // The temporary upload stays until the report is committed, so a
        // failed attempt can be retried from the same draft
        let post_id = match self.save_report(user_id, &new_post).await {
            Ok(post_id) => post_id,
            Err(e) => {
                tracing::warn!(%user_id, "report could not be saved, keeping draft photo: {}", e);
                self.storage.remove(&photo_path).await;
                return Err(e);
            }
        };

        self.storage.remove(&temp_path).await;

        UserService::new(self.db.clone())
            .refresh_badge_rank(user_id)
            .await?;

        let post = PostService::new(self.db.clone()).get_post(post_id).await?;

        Ok(SubmittedReport {
            post,
            next_step: WizardStep::Done,
            message: "Thank you, your report has been received".to_string(),
            message_ja: "ご報告ありがとうございました。".to_string(),
        })
    }

    /// Insert the report and drop the draft in one transaction
    async fn save_report(&self, user_id: Uuid, new_post: &NewPost) -> AppResult<Uuid> {
        let mut tx = self.db.begin().await?;
        let post_id = PostService::insert_post(&mut tx, new_post).await?;
        sqlx::query("DELETE FROM report_drafts WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(post_id)
    }

    async fn confirmable_draft(&self, user_id: Uuid) -> AppResult<ReportDraft> {
        match self.find_draft(user_id).await? {
            Some(draft) if draft.is_confirmable() => Ok(draft),
            Some(_) => Err(AppError::DraftIncomplete("Report draft has no photo".to_string())),
            None => Err(AppError::DraftIncomplete("No report draft to confirm".to_string())),
        }
    }
}

/// Browser geolocation for step 1. Unparseable or out-of-range values are
/// dropped, which sends the resident to the manual location step.
fn browser_location(
    latitude: Option<&CoordinateValue>,
    longitude: Option<&CoordinateValue>,
) -> (Option<Decimal>, Option<Decimal>) {
    let latitude = parse_browser_coordinate("latitude", latitude)
        .filter(|lat| in_range("latitude", Some(*lat), None));
    let longitude = parse_browser_coordinate("longitude", longitude)
        .filter(|lng| in_range("longitude", None, Some(*lng)));
    (latitude, longitude)
}

fn in_range(field: &str, latitude: Option<Decimal>, longitude: Option<Decimal>) -> bool {
    let ok = shared::validate_coordinates(latitude, longitude).is_ok();
    if !ok {
        tracing::warn!(field, ?latitude, ?longitude, "discarding out-of-range coordinate");
    }
    ok
}

/// Browser geolocation is best effort: unusable values become `None`
fn parse_browser_coordinate(field: &str, value: Option<&CoordinateValue>) -> Option<Decimal> {
    let value = value?;
    if value.is_blank() {
        return None;
    }
    let parsed = value.to_decimal();
    if parsed.is_none() {
        tracing::warn!(field, ?value, "discarding unparseable coordinate");
    }
    parsed
}

/// Manually entered coordinates must parse when given
fn parse_manual_coordinate(
    field: &str,
    value: Option<&CoordinateValue>,
) -> AppResult<Option<Decimal>> {
    match value {
        None => Ok(None),
        Some(v) if v.is_blank() => Ok(None),
        Some(v) => v.to_decimal().map(Some).ok_or_else(|| AppError::Validation {
            field: field.to_string(),
            message: "Enter the coordinate as a number".to_string(),
            message_ja: "座標は数値で入力してください。".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_coordinate_value_from_json() {
        let n: CoordinateValue = serde_json::from_str("35.6812").unwrap();
        assert_eq!(n.to_decimal(), Some(Decimal::from_str("35.6812").unwrap()));

        let s: CoordinateValue = serde_json::from_str("\"139.7671\"").unwrap();
        assert_eq!(s.to_decimal(), Some(Decimal::from_str("139.7671").unwrap()));

        let blank: CoordinateValue = serde_json::from_str("\"  \"").unwrap();
        assert!(blank.is_blank());
        assert_eq!(blank.to_decimal(), None);
    }

    #[test]
    fn test_browser_coordinate_is_lenient() {
        let junk = CoordinateValue::Text("abc".to_string());
        assert_eq!(parse_browser_coordinate("latitude", Some(&junk)), None);
        assert_eq!(parse_browser_coordinate("latitude", None), None);
    }

    fn draft_at(latitude: Option<Decimal>, longitude: Option<Decimal>) -> ReportDraft {
        ReportDraft {
            user_id: Uuid::nil(),
            title: "t".to_string(),
            comment: "c".to_string(),
            tag_id: None,
            photo_path: Some("tmp/a.jpg".to_string()),
            latitude,
            longitude,
            location_name: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_browser_location_keeps_valid_pair() {
        let lat = CoordinateValue::Number(35.6812);
        let lng = CoordinateValue::Text("139.7671".to_string());
        let (latitude, longitude) = browser_location(Some(&lat), Some(&lng));
        assert_eq!(latitude, Some(Decimal::from_str("35.6812").unwrap()));
        assert_eq!(longitude, Some(Decimal::from_str("139.7671").unwrap()));
        assert_eq!(
            draft_at(latitude, longitude).step_after_details(),
            WizardStep::Confirm
        );
    }

    #[test]
    fn test_out_of_range_browser_location_needs_manual_step() {
        let cases = [
            ("12345678", "139.7671"),
            ("500", "139.7671"),
            ("35.6812", "-181"),
            ("35.6812", "1e9"),
        ];
        for (lat, lng) in cases {
            let lat = CoordinateValue::Text(lat.to_string());
            let lng = CoordinateValue::Text(lng.to_string());
            let (latitude, longitude) = browser_location(Some(&lat), Some(&lng));
            assert!(latitude.is_none() || longitude.is_none());
            assert_eq!(
                draft_at(latitude, longitude).step_after_details(),
                WizardStep::Location
            );
        }
    }

    #[test]
    fn test_browser_location_accepts_bounds() {
        let lat = CoordinateValue::Number(-90.0);
        let lng = CoordinateValue::Number(180.0);
        let (latitude, longitude) = browser_location(Some(&lat), Some(&lng));
        assert_eq!(latitude, Some(Decimal::from(-90)));
        assert_eq!(longitude, Some(Decimal::from(180)));
    }

    #[test]
    fn test_manual_coordinate_is_strict() {
        let junk = CoordinateValue::Text("abc".to_string());
        let err = parse_manual_coordinate("longitude", Some(&junk)).unwrap_err();
        let (_, detail) = err.status_and_detail();
        assert_eq!(detail.field.as_deref(), Some("longitude"));

        let blank = CoordinateValue::Text(String::new());
        assert_eq!(parse_manual_coordinate("longitude", Some(&blank)).unwrap(), None);
    }

    #[test]
    fn test_details_input_accepts_missing_photo() {
        let input: DetailsInput = serde_json::from_str(
            r#"{"title":"街灯が消えている","comment":"夜は真っ暗です","tag_id":null}"#,
        )
        .unwrap();
        assert!(input.photo.is_none());
        assert!(input.tag_id.is_none());
        assert!(input.latitude.is_none());
    }

    #[test]
    fn test_draft_step_carries_photo_url() {
        let draft = ReportDraft {
            user_id: Uuid::nil(),
            title: "t".to_string(),
            comment: "c".to_string(),
            tag_id: None,
            photo_path: Some("tmp/a.jpg".to_string()),
            latitude: None,
            longitude: None,
            location_name: None,
            updated_at: Utc::now(),
        };
        let step = DraftStep::new(draft, WizardStep::Location);
        assert_eq!(step.photo_url.as_deref(), Some(DRAFT_PHOTO_URL));
        assert_eq!(step.step_number, 2);
    }
}
