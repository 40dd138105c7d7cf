use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// CORE PRACTITIONER MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub title: PractitionerTitle,
    pub specializations: Vec<Specialization>,
    pub experience_years: i32,
    pub bio: Option<String>,
    #[serde(default)]
    pub languages: Vec<Language>,
    pub status: PractitionerStatus,
    #[serde(default)]
    pub availability: WeeklyAvailability,
    #[serde(default)]
    pub session_settings: SessionSettings,
    #[serde(default)]
    pub ratings: Ratings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Practitioner {
    pub fn full_name(&self) -> String {
        format!("{} {} {}", self.title, self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == PractitionerStatus::Active
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PractitionerTitle {
    #[serde(rename = "Dr.")]
    Dr,
    Vaidya,
    Therapist,
    Consultant,
    Specialist,
}

impl Default for PractitionerTitle {
    fn default() -> Self {
        PractitionerTitle::Therapist
    }
}

impl fmt::Display for PractitionerTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PractitionerTitle::Dr => write!(f, "Dr."),
            PractitionerTitle::Vaidya => write!(f, "Vaidya"),
            PractitionerTitle::Therapist => write!(f, "Therapist"),
            PractitionerTitle::Consultant => write!(f, "Consultant"),
            PractitionerTitle::Specialist => write!(f, "Specialist"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Panchakarma,
    Abhyanga,
    Shirodhara,
    Basti,
    Vamana,
    Virechana,
    Nasya,
    Raktamokshana,
    Kayachikitsa,
    Bahyachikitsa,
    GeneralConsultation,
    PulseDiagnosis,
    ConstitutionAnalysis,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hindi,
    English,
    Sanskrit,
    Tamil,
    Telugu,
    Bengali,
    Gujarati,
    Marathi,
    Punjabi,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PractitionerStatus {
    Active,
    Inactive,
    Suspended,
    OnLeave,
}

impl fmt::Display for PractitionerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PractitionerStatus::Active => write!(f, "active"),
            PractitionerStatus::Inactive => write!(f, "inactive"),
            PractitionerStatus::Suspended => write!(f, "suspended"),
            PractitionerStatus::OnLeave => write!(f, "on-leave"),
        }
    }
}

// ==============================================================================
// WEEKLY AVAILABILITY TEMPLATE
// ==============================================================================

/// Working hours for one weekday. Times are zone-naive wall-clock values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySchedule {
    pub available: bool,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub break_start: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub break_end: Option<NaiveTime>,
}

impl DaySchedule {
    pub fn working(start: (u32, u32), end: (u32, u32), break_window: Option<((u32, u32), (u32, u32))>) -> Self {
        Self {
            available: true,
            start_time: hm(start),
            end_time: hm(end),
            break_start: break_window.map(|(from, _)| hm(from)),
            break_end: break_window.map(|(_, to)| hm(to)),
        }
    }

    pub fn day_off() -> Self {
        Self {
            available: false,
            ..Self::working((9, 0), (15, 0), Some(((12, 0), (13, 0))))
        }
    }

    /// The break window, when both ends are configured.
    pub fn break_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.break_start.zip(self.break_end)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.available {
            return Ok(());
        }
        if self.start_time >= self.end_time {
            return Err("start_time must be before end_time".to_string());
        }
        match (self.break_start, self.break_end) {
            (None, None) => Ok(()),
            (Some(from), Some(to)) if from < to => Ok(()),
            (Some(_), Some(_)) => Err("break_start must be before break_end".to_string()),
            _ => Err("break_start and break_end must be set together".to_string()),
        }
    }
}

fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyAvailability {
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
}

impl WeeklyAvailability {
    pub fn for_weekday(&self, weekday: Weekday) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn days(&self) -> [(Weekday, &DaySchedule); 7] {
        [
            (Weekday::Mon, &self.monday),
            (Weekday::Tue, &self.tuesday),
            (Weekday::Wed, &self.wednesday),
            (Weekday::Thu, &self.thursday),
            (Weekday::Fri, &self.friday),
            (Weekday::Sat, &self.saturday),
            (Weekday::Sun, &self.sunday),
        ]
    }

    pub fn validate(&self) -> Result<(), PractitionerError> {
        for (weekday, schedule) in self.days() {
            schedule
                .validate()
                .map_err(|msg| PractitionerError::Validation(format!("{}: {}", weekday, msg)))?;
        }
        Ok(())
    }
}

impl Default for WeeklyAvailability {
    fn default() -> Self {
        let weekday = DaySchedule::working((9, 0), (18, 0), Some(((13, 0), (14, 0))));
        Self {
            monday: weekday,
            tuesday: weekday,
            wednesday: weekday,
            thursday: weekday,
            friday: weekday,
            saturday: DaySchedule::working((9, 0), (15, 0), Some(((12, 0), (13, 0)))),
            sunday: DaySchedule::day_off(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSettings {
    pub default_duration: i32,
    pub buffer_time: i32,
    pub max_patients_per_day: i32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_duration: 60,
            buffer_time: 15,
            max_patients_per_day: 8,
        }
    }
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), PractitionerError> {
        if !(15..=180).contains(&self.default_duration) {
            return Err(PractitionerError::Validation(
                "default_duration must be between 15 and 180 minutes".to_string(),
            ));
        }
        if !(0..=60).contains(&self.buffer_time) {
            return Err(PractitionerError::Validation(
                "buffer_time must be between 0 and 60 minutes".to_string(),
            ));
        }
        if !(1..=20).contains(&self.max_patients_per_day) {
            return Err(PractitionerError::Validation(
                "max_patients_per_day must be between 1 and 20".to_string(),
            ));
        }
        Ok(())
    }
}

// ==============================================================================
// RATINGS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Ratings {
    pub average_rating: f64,
    pub total_reviews: u32,
    pub breakdown: RatingBreakdown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RatingBreakdown {
    pub professionalism: f64,
    pub expertise: f64,
    pub communication: f64,
    pub punctuality: f64,
}

/// Sub-ratings supplied with a review; absent dimensions are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RatingBreakdownInput {
    pub professionalism: Option<f64>,
    pub expertise: Option<f64>,
    pub communication: Option<f64>,
    pub punctuality: Option<f64>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePractitionerRequest {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub title: PractitionerTitle,
    pub specializations: Vec<Specialization>,
    pub experience_years: i32,
    pub bio: Option<String>,
    #[serde(default)]
    pub languages: Vec<Language>,
    pub availability: Option<WeeklyAvailability>,
    pub session_settings: Option<SessionSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRatingRequest {
    pub rating: f64,
    #[serde(default)]
    pub breakdown: RatingBreakdownInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailablePractitionersQuery {
    pub date: chrono::NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCheckQuery {
    pub date_time: DateTime<Utc>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum PractitionerError {
    #[error("Practitioner not found: {0}")]
    NotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl PractitionerError {
    pub fn kind(&self) -> &'static str {
        match self {
            PractitionerError::NotFound(_) => "not_found_error",
            PractitionerError::Validation(_) => "validation_error",
            PractitionerError::Storage(_) => "storage_error",
        }
    }
}

impl From<PractitionerError> for AppError {
    fn from(err: PractitionerError) -> Self {
        match err {
            PractitionerError::NotFound(_) => AppError::NotFound(err.to_string()),
            PractitionerError::Validation(msg) => AppError::ValidationError(msg),
            PractitionerError::Storage(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// WALL-CLOCK SERDE HELPERS
// ==============================================================================

/// `HH:MM` wall-clock times (seconds accepted on input).
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid HH:MM time '{}'", raw)))
    }
}

pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => super::hhmm::serialize(time, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::hhmm::parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid HH:MM time '{}'", raw))),
        }
    }
}
