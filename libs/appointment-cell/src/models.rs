// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use patient_cell::PatientError;
use practitioner_cell::{PractitionerError, RatingBreakdownInput};
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub practitioner_id: Uuid,
    pub therapy_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// Always `start_time + duration_minutes`; stored so range queries can filter on it.
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub session_number: i32,
    pub total_sessions: i32,
    pub pricing: Pricing,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub notes: AppointmentNotes,
    #[serde(default)]
    pub reminders_sent: RemindersSent,
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub rescheduling_history: Vec<ReschedulingEntry>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn time_range(&self) -> crate::services::conflict::TimeRange {
        crate::services::conflict::TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Moves the appointment, keeping its duration.
    pub fn move_to(&mut self, start_time: DateTime<Utc>) {
        self.start_time = start_time;
        self.end_time = start_time + Duration::minutes(self.duration_minutes as i64);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    pub const ACTIVE: [AppointmentStatus; 3] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
    ];

    /// Statuses that occupy the practitioner's time.
    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in-progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub discount_applied: f64,
}

fn default_currency() -> String {
    "INR".to_string()
}

impl Pricing {
    pub fn net_amount(&self) -> f64 {
        self.amount - self.discount_applied
    }

    pub fn validate(&self) -> Result<(), AppointmentError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AppointmentError::Validation("pricing amount cannot be negative".to_string()));
        }
        if !self.discount_applied.is_finite() || self.discount_applied < 0.0 {
            return Err(AppointmentError::Validation("discount cannot be negative".to_string()));
        }
        if self.discount_applied > self.amount {
            return Err(AppointmentError::Validation("discount cannot exceed the amount".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(AppointmentError::Validation("currency is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentNotes {
    pub practitioner: Option<String>,
    pub patient: Option<String>,
    pub admin: Option<String>,
}

/// Reminder bookkeeping; anchored to `start_time`, so cleared whenever it moves.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemindersSent {
    pub email_24h: bool,
    pub email_2h: bool,
    pub sms_1h: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub rating: u8,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReschedulingEntry {
    pub original_time: DateTime<Utc>,
    pub new_time: DateTime<Utc>,
    pub reason: Option<String>,
    pub rescheduled_by: Uuid,
    pub rescheduled_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub practitioner_id: Uuid,
    pub therapy_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub pricing: Pricing,
    pub session_number: Option<i32>,
    pub total_sessions: Option<i32>,
    pub notes: Option<AppointmentNotes>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub practitioner_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub rating: u8,
    pub comment: Option<String>,
    #[serde(default)]
    pub breakdown: RatingBreakdownInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCheckQuery {
    pub practitioner_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCheckResponse {
    pub available: bool,
    pub within_schedule: bool,
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot {operation} an appointment that is {from}")]
    InvalidStateTransition {
        from: AppointmentStatus,
        operation: &'static str,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppointmentError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppointmentError::Validation(_) => "validation_error",
            AppointmentError::Conflict(_) => "conflict_error",
            AppointmentError::InvalidStateTransition { .. } => "invalid_state_transition",
            AppointmentError::NotFound(_) => "not_found_error",
            AppointmentError::Storage(_) => "storage_error",
        }
    }
}

impl From<PractitionerError> for AppointmentError {
    fn from(err: PractitionerError) -> Self {
        match err {
            PractitionerError::NotFound(_) => AppointmentError::NotFound(err.to_string()),
            PractitionerError::Validation(msg) => AppointmentError::Validation(msg),
            PractitionerError::Storage(msg) => AppointmentError::Storage(msg),
        }
    }
}

impl From<PatientError> for AppointmentError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound(_) => AppointmentError::NotFound(err.to_string()),
            PatientError::Validation(msg) => AppointmentError::Validation(msg),
            PatientError::Storage(msg) => AppointmentError::Storage(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::Conflict(msg) => AppError::Conflict(msg),
            AppointmentError::InvalidStateTransition { .. } => AppError::InvalidStateTransition(err.to_string()),
            AppointmentError::NotFound(msg) => AppError::NotFound(msg),
            AppointmentError::Storage(msg) => AppError::Database(msg),
        }
    }
}
