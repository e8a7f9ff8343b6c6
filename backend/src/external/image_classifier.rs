//! Image Classifier Client
//!
//! Client for the hosted image classification service used on the staff
//! report detail screen to suggest a category for a photo.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{match_tag_by_label, Tag};

use crate::config::ClassifierConfig;
use crate::error::{AppError, AppResult};

/// Client for the image classification microservice
#[derive(Clone)]
pub struct ImageClassifierClient {
    api_endpoint: String,
    api_key: Option<String>,
    http_client: Client,
}

/// Request to classify an image
#[derive(Debug, Serialize)]
pub struct ClassifyRequest {
    pub image_base64: String,
    pub filename: String,
}

/// One candidate label with its score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f32,
}

/// Response from the classification API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub request_id: String,
    pub label: String,
    pub confidence: f32,
    #[serde(default)]
    pub candidates: Vec<LabelScore>,
}

impl Classification {
    /// Tag whose name matches the top label
    pub fn suggested_tag<'a>(&self, tags: &'a [Tag]) -> Option<&'a Tag> {
        match_tag_by_label(tags, &self.label)
    }
}

impl ImageClassifierClient {
    /// Create a new image classifier client
    pub fn new(api_endpoint: String, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_endpoint,
            api_key,
            http_client,
        })
    }

    /// Build a client when an endpoint is configured
    pub fn from_config(config: &ClassifierConfig) -> AppResult<Option<Self>> {
        match config.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Self::new(
                endpoint.to_string(),
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    /// Classify raw image bytes
    pub async fn classify_image(&self, filename: &str, bytes: &[u8]) -> AppResult<Classification> {
        let request = ClassifyRequest {
            image_base64: BASE64.encode(bytes),
            filename: filename.to_string(),
        };

        let mut builder = self
            .http_client
            .post(&self.api_endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::ClassifierError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ClassifierError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let result: Classification = response
            .json()
            .await
            .map_err(|e| AppError::ClassifierError(format!("Failed to parse response: {}", e)))?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn tag(name: &str) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{
            "request_id": "req-1",
            "label": "Pothole",
            "confidence": 0.91,
            "candidates": [{"label": "Pothole", "confidence": 0.91}, {"label": "Graffiti", "confidence": 0.05}]
        }"#;
        let result: Classification = serde_json::from_str(json).unwrap();
        assert_eq!(result.label, "Pothole");
        assert_eq!(result.candidates.len(), 2);
    }

    #[test]
    fn test_candidates_default_to_empty() {
        let json = r#"{"request_id": "req-2", "label": "Litter", "confidence": 0.4}"#;
        let result: Classification = serde_json::from_str(json).unwrap();
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_suggested_tag_matches_case_insensitively() {
        let tags = vec![tag("Graffiti"), tag("pothole")];
        let result = Classification {
            request_id: "r".to_string(),
            label: " POTHOLE ".to_string(),
            confidence: 0.8,
            candidates: vec![],
        };
        assert_eq!(result.suggested_tag(&tags).map(|t| t.name.as_str()), Some("pothole"));
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        let mut config = ClassifierConfig::default();
        assert!(ImageClassifierClient::from_config(&config).unwrap().is_none());

        config.endpoint = Some("  ".to_string());
        assert!(ImageClassifierClient::from_config(&config).unwrap().is_none());

        config.endpoint = Some("http://localhost:9000/classify".to_string());
        assert!(ImageClassifierClient::from_config(&config).unwrap().is_some());
    }
}
