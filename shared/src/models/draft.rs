//! Report submission wizard state
//!
//! A resident builds a report in three steps: photo and details, location,
//! then confirmation. The partially filled report lives in a per-user draft
//! between requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::is_valid_coordinate;

/// The pending report of one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDraft {
    pub user_id: Uuid,
    pub title: String,
    pub comment: String,
    pub tag_id: Option<Uuid>,
    /// Path of the uploaded photo relative to the media root
    pub photo_path: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub location_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ReportDraft {
    /// True when the browser supplied usable coordinates in step 1
    pub fn has_geolocation(&self) -> bool {
        is_valid_coordinate(self.latitude) && is_valid_coordinate(self.longitude)
    }

    /// A draft can be confirmed once it carries a photo
    pub fn is_confirmable(&self) -> bool {
        self.photo_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Step the resident should be sent to after the details step
    pub fn step_after_details(&self) -> WizardStep {
        if self.has_geolocation() {
            WizardStep::Confirm
        } else {
            WizardStep::Location
        }
    }
}

/// Steps of the submission wizard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Details,
    Location,
    Confirm,
    Done,
}

impl WizardStep {
    /// 1-based step number shown in the progress indicator
    pub fn number(&self) -> u8 {
        match self {
            WizardStep::Details => 1,
            WizardStep::Location => 2,
            WizardStep::Confirm => 3,
            WizardStep::Done => 4,
        }
    }
}
