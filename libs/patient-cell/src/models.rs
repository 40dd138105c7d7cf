use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// CORE PATIENT MODELS
// ==============================================================================

/// A patient profile. `id` is the patient's account id (the token subject);
/// each account has at most one profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub address: Address,
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    #[serde(default)]
    pub ayurvedic_profile: AyurvedicProfile,
    #[serde(default)]
    pub preferences: PatientPreferences,
    pub status: PatientStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Completed years on `today`.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let mut age = today.year() - self.date_of_birth.year();
        if (today.month(), today.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }

    pub fn is_active(&self) -> bool {
        self.status == PatientStatus::Active
    }
}

/// Patient plus the values derived from it, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct PatientView {
    #[serde(flatten)]
    pub patient: Patient,
    pub full_name: String,
    pub age: u32,
    pub dominant_constitution: Dosha,
}

impl PatientView {
    pub fn new(patient: Patient, today: NaiveDate) -> Self {
        Self {
            full_name: patient.full_name(),
            age: patient.age_on(today),
            dominant_constitution: patient.ayurvedic_profile.constitution.dominant(),
            patient,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientStatus::Active => write!(f, "active"),
            PatientStatus::Inactive => write!(f, "inactive"),
            PatientStatus::Suspended => write!(f, "suspended"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

// ==============================================================================
// MEDICAL HISTORY
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicalHistory {
    #[serde(default)]
    pub allergies: Vec<Allergy>,
    #[serde(default)]
    pub current_conditions: Vec<Condition>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub surgical_history: Vec<Surgery>,
    #[serde(default)]
    pub family_history: Vec<FamilyCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allergy {
    pub allergen: String,
    #[serde(default)]
    pub severity: AllergySeverity,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AllergySeverity {
    Mild,
    #[default]
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Condition {
    pub condition: String,
    pub diagnosed_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ConditionStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConditionStatus {
    #[default]
    Active,
    Resolved,
    Managed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medication {
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub prescribed_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Surgery {
    pub procedure: String,
    pub date: NaiveDate,
    pub hospital: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyCondition {
    pub condition: String,
    pub relationship: String,
    pub notes: Option<String>,
}

// ==============================================================================
// AYURVEDIC PROFILE
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Dosha {
    Vata,
    Pitta,
    Kapha,
}

/// Prakriti percentages, 0..=100 each.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constitution {
    pub vata: u8,
    pub pitta: u8,
    pub kapha: u8,
}

impl Constitution {
    /// Ties go to vata, then pitta.
    pub fn dominant(&self) -> Dosha {
        if self.vata >= self.pitta && self.vata >= self.kapha {
            Dosha::Vata
        } else if self.pitta >= self.kapha {
            Dosha::Pitta
        } else {
            Dosha::Kapha
        }
    }

    /// An unassessed constitution is all zeros; otherwise the shares must add up
    /// to 100 within five points.
    pub fn validate(&self) -> Result<(), PatientError> {
        if self.vata > 100 || self.pitta > 100 || self.kapha > 100 {
            return Err(PatientError::Validation(
                "constitution percentages must be between 0 and 100".to_string(),
            ));
        }
        let total = u32::from(self.vata) + u32::from(self.pitta) + u32::from(self.kapha);
        if total > 0 && total.abs_diff(100) > 5 {
            return Err(PatientError::Validation(
                "constitution percentages should sum to approximately 100%".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Imbalance {
    Vata,
    Pitta,
    Kapha,
    Mixed,
    #[default]
    Balanced,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AyurvedicProfile {
    #[serde(default)]
    pub constitution: Constitution,
    #[serde(default)]
    pub current_imbalance: Imbalance,
    pub pulse_reading: Option<String>,
    pub tongue_examination: Option<String>,
    pub last_assessment_date: Option<NaiveDate>,
    pub assessed_by: Option<Uuid>,
}

// ==============================================================================
// PREFERENCES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CommunicationMethod {
    #[default]
    Email,
    Sms,
    Phone,
    InApp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientPreferences {
    pub preferred_practitioner: Option<Uuid>,
    #[serde(default)]
    pub preferred_time_slots: Vec<TimeSlot>,
    #[serde(default = "default_language")]
    pub language_preference: String,
    #[serde(default)]
    pub communication_method: CommunicationMethod,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
}

fn default_language() -> String {
    "english".to_string()
}

impl Default for PatientPreferences {
    fn default() -> Self {
        Self {
            preferred_practitioner: None,
            preferred_time_slots: Vec::new(),
            language_preference: default_language(),
            communication_method: CommunicationMethod::default(),
            dietary_restrictions: Vec::new(),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    /// Account the profile belongs to; becomes the patient id.
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub address: Address,
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    #[serde(default)]
    pub ayurvedic_profile: AyurvedicProfile,
    #[serde(default)]
    pub preferences: PatientPreferences,
    pub notes: Option<String>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub address: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_history: Option<MedicalHistory>,
    pub ayurvedic_profile: Option<AyurvedicProfile>,
    pub preferences: Option<PatientPreferences>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientListQuery {
    pub preferred_practitioner: Option<Uuid>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found: {0}")]
    NotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl PatientError {
    pub fn kind(&self) -> &'static str {
        match self {
            PatientError::NotFound(_) => "not_found_error",
            PatientError::Validation(_) => "validation_error",
            PatientError::Storage(_) => "storage_error",
        }
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound(_) => AppError::NotFound(err.to_string()),
            PatientError::Validation(msg) => AppError::ValidationError(msg),
            PatientError::Storage(msg) => AppError::Database(msg),
        }
    }
}
