use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// CORE THERAPY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapy {
    pub id: Uuid,
    pub name: String,
    pub sanskrit_name: Option<String>,
    pub category: TherapyCategory,
    pub therapy_type: TherapyType,
    pub description: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub indications: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    pub duration_minutes: i32,
    pub sessions: SessionPlan,
    pub pricing: TherapyPricing,
    pub status: TherapyStatus,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Therapy {
    pub fn effective_price(&self) -> f64 {
        self.pricing.base_price * (1.0 - self.pricing.package_discount / 100.0)
    }

    /// `45 minutes`, `1 hour`, `2 hours` or `1h 30m`.
    pub fn formatted_duration(&self) -> String {
        let hours = self.duration_minutes / 60;
        let minutes = self.duration_minutes % 60;

        match (hours, minutes) {
            (0, m) => format!("{} minutes", m),
            (1, 0) => "1 hour".to_string(),
            (h, 0) => format!("{} hours", h),
            (h, m) => format!("{}h {}m", h, m),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TherapyStatus::Active
    }
}

/// Therapy plus the values derived from it, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct TherapyView {
    #[serde(flatten)]
    pub therapy: Therapy,
    pub effective_price: f64,
    pub formatted_duration: String,
}

impl From<Therapy> for TherapyView {
    fn from(therapy: Therapy) -> Self {
        Self {
            effective_price: therapy.effective_price(),
            formatted_duration: therapy.formatted_duration(),
            therapy,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TherapyCategory {
    Purvakarma,
    Pradhanakarma,
    Paschatkarma,
    Kayachikitsa,
    Bahyachikitsa,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TherapyType {
    Vamana,
    Virechana,
    Basti,
    Nasya,
    Raktamokshana,
    Abhyanga,
    Shirodhara,
    Pizhichil,
    Udvartana,
    Kizhi,
    Steam,
    Consultation,
    Other,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionFrequency {
    #[default]
    Daily,
    AlternateDays,
    TwiceWeekly,
    Weekly,
    AsNeeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionPlan {
    pub recommended: i32,
    pub maximum: i32,
    #[serde(default)]
    pub frequency: SessionFrequency,
}

impl Default for SessionPlan {
    fn default() -> Self {
        Self {
            recommended: 1,
            maximum: 21,
            frequency: SessionFrequency::Daily,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TherapyPricing {
    pub base_price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Percentage, 0..=50.
    #[serde(default)]
    pub package_discount: f64,
}

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TherapyStatus {
    #[default]
    Active,
    Inactive,
    Seasonal,
    Discontinued,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTherapyRequest {
    pub name: String,
    pub sanskrit_name: Option<String>,
    pub category: TherapyCategory,
    pub therapy_type: TherapyType,
    pub description: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub indications: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    pub duration_minutes: i32,
    #[serde(default)]
    pub sessions: SessionPlan,
    pub pricing: TherapyPricing,
    #[serde(default)]
    pub status: TherapyStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TherapyListQuery {
    pub category: Option<TherapyCategory>,
    pub limit: Option<usize>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum TherapyError {
    #[error("Therapy not found: {0}")]
    NotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TherapyError {
    pub fn kind(&self) -> &'static str {
        match self {
            TherapyError::NotFound(_) => "not_found_error",
            TherapyError::Validation(_) => "validation_error",
            TherapyError::Storage(_) => "storage_error",
        }
    }
}

impl From<TherapyError> for AppError {
    fn from(err: TherapyError) -> Self {
        match err {
            TherapyError::NotFound(_) => AppError::NotFound(err.to_string()),
            TherapyError::Validation(msg) => AppError::ValidationError(msg),
            TherapyError::Storage(msg) => AppError::Database(msg),
        }
    }
}
