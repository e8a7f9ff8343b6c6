//! Photo storage on the local media root
//!
//! Uploads land in `tmp/` while a report draft is open and are copied under
//! `photos/YYYY/MM/DD/` once the report is confirmed. Stored paths are
//! relative to the media root and served from `/media`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Datelike, Utc};
use shared::{ImageFormat, PhotoUpload};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::{AppError, AppResult};

const TEMP_DIR: &str = "tmp";

/// Directory of accepted report photos, the only part of the media root
/// served publicly
pub const PHOTO_DIR: &str = "photos";

/// URL prefix the media root maps to
pub const MEDIA_URL_PREFIX: &str = "/media";

/// A decoded, validated upload
#[derive(Debug)]
pub struct DecodedPhoto {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

#[derive(Clone, Debug)]
pub struct PhotoStorage {
    root: PathBuf,
    max_upload_bytes: usize,
}

impl PhotoStorage {
    pub fn new(root: impl Into<PathBuf>, max_upload_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(&config.root, config.max_upload_bytes)
    }

    /// Directory served under `/media/photos`
    pub fn public_dir(&self) -> PathBuf {
        self.root.join(PHOTO_DIR)
    }

    /// Public URL of a stored photo
    pub fn url_for(relative_path: &str) -> String {
        format!("{}/{}", MEDIA_URL_PREFIX, relative_path.trim_start_matches('/'))
    }

    /// Decode a base64 upload and check its size and image type
    pub fn decode_upload(&self, upload: &PhotoUpload) -> AppResult<DecodedPhoto> {
        // Accept data URLs as produced by FileReader.readAsDataURL
        let data = match upload.data_base64.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => upload.data_base64.as_str(),
        };

        let bytes = BASE64.decode(data.trim()).map_err(|e| {
            tracing::warn!(filename = %upload.filename, "photo upload is not valid base64: {}", e);
            AppError::Validation {
                field: "photo".to_string(),
                message: "Photo data could not be read".to_string(),
                message_ja: "写真データを読み込めませんでした。".to_string(),
            }
        })?;

        shared::validate_photo_size(bytes.len(), self.max_upload_bytes)?;

        let format = shared::detect_image_format(&bytes).ok_or_else(|| AppError::Validation {
            field: "photo".to_string(),
            message: "Upload a JPEG, PNG, GIF or WebP image".to_string(),
            message_ja: "JPEG、PNG、GIF、WebP形式の画像をアップロードしてください。".to_string(),
        })?;

        Ok(DecodedPhoto { bytes, format })
    }

    /// Write an upload to the temporary area and return its relative path
    pub async fn save_temp(&self, photo: &DecodedPhoto) -> AppResult<String> {
        let relative = format!(
            "{}/{}.{}",
            TEMP_DIR,
            Uuid::new_v4(),
            photo.format.extension()
        );
        let path = self.resolve(&relative)?;
        self.write_file(&path, &photo.bytes).await?;

        tracing::debug!(path = %relative, size = photo.bytes.len(), "temporary photo saved");
        Ok(relative)
    }

    /// Whether a stored file is still present
    pub async fn exists(&self, relative_path: &str) -> bool {
        match self.resolve(relative_path) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Copy a temporary upload to its permanent dated location.
    ///
    /// The temporary file is left in place; the caller removes it once the
    /// report referencing the new path has been saved.
    pub async fn promote(&self, temp_path: &str, posted_at: DateTime<Utc>) -> AppResult<String> {
        let source = self.resolve(temp_path)?;
        let extension = Path::new(temp_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg");

        let relative = format!(
            "{}/{:04}/{:02}/{:02}/{}.{}",
            PHOTO_DIR,
            posted_at.year(),
            posted_at.month(),
            posted_at.day(),
            Uuid::new_v4(),
            extension
        );
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageError(format!("create {}: {}", parent.display(), e)))?;
        }

        match tokio::fs::copy(&source, &target).await {
            Ok(_) => {
                tracing::info!(from = %temp_path, to = %relative, "photo stored");
                Ok(relative)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(missing_temp_photo()),
            Err(e) => {
                // Drop a partially written copy
                self.remove(&relative).await;
                Err(AppError::StorageError(format!("copy {}: {}", temp_path, e)))
            }
        }
    }

    /// Read a stored file
    pub async fn read(&self, relative_path: &str) -> AppResult<Vec<u8>> {
        let path = self.resolve(relative_path)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::StorageError(format!("read {}: {}", relative_path, e)))
    }

    /// Delete a stored file; failures are logged and reported as `false`
    pub async fn remove(&self, relative_path: &str) -> bool {
        let path = match self.resolve(relative_path) {
            Ok(path) => path,
            Err(_) => return false,
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %relative_path, "photo file deleted");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %relative_path, "photo file already gone");
                false
            }
            Err(e) => {
                tracing::warn!(path = %relative_path, "could not delete photo file: {}", e);
                false
            }
        }
    }

    async fn write_file(&self, path: &Path, bytes: &[u8]) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageError(format!("create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("write {}: {}", path.display(), e)))
    }

    /// Join a stored relative path onto the root, refusing anything that
    /// could escape it
    fn resolve(&self, relative_path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(relative_path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative_path.is_empty() {
            return Err(AppError::StorageError(format!(
                "refusing path outside media root: {}",
                relative_path
            )));
        }
        Ok(self.root.join(relative))
    }
}

/// No photo was uploaded and the draft holds none
pub fn photo_required() -> AppError {
    AppError::Validation {
        field: "photo".to_string(),
        message: "Please upload a photo".to_string(),
        message_ja: "写真をアップロードしてください。".to_string(),
    }
}

/// The draft points at a temporary photo that no longer exists
pub fn missing_temp_photo() -> AppError {
    AppError::Validation {
        field: "photo".to_string(),
        message: "The temporary photo is missing or expired".to_string(),
        message_ja: "一時的な写真ファイルが見つからないか、有効期限切れです。最初からやり直してください。"
            .to_string(),
    }
}
