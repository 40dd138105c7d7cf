use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::conflict::TimeRange;

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Active appointments of the practitioner overlapping `window`, minus `exclude_id`.
    async fn find_active_for_practitioner(
        &self,
        practitioner_id: Uuid,
        window: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError>;

    /// All appointments of the practitioner, ascending by start time.
    async fn list_for_practitioner(&self, practitioner_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    /// All appointments of the patient, most recent start first.
    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    async fn count_for_therapy(
        &self,
        therapy_id: Uuid,
        statuses: &[AppointmentStatus],
    ) -> Result<u64, AppointmentError>;
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn find_active_for_practitioner(
        &self,
        practitioner_id: Uuid,
        window: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .appointments
            .read()
            .await
            .values()
            .filter(|apt| apt.practitioner_id == practitioner_id)
            .filter(|apt| apt.status.is_active())
            .filter(|apt| Some(apt.id) != exclude_id)
            .filter(|apt| apt.start_time < window.end && apt.end_time > window.start)
            .cloned()
            .collect())
    }

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn list_for_practitioner(&self, practitioner_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|apt| apt.practitioner_id == practitioner_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|apt| apt.start_time);
        Ok(appointments)
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|apt| apt.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(appointments)
    }

    async fn count_for_therapy(
        &self,
        therapy_id: Uuid,
        statuses: &[AppointmentStatus],
    ) -> Result<u64, AppointmentError> {
        Ok(self
            .appointments
            .read()
            .await
            .values()
            .filter(|apt| apt.therapy_id == therapy_id && statuses.contains(&apt.status))
            .count() as u64)
    }
}

// ==============================================================================
// SUPABASE / POSTGREST
// ==============================================================================

pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    const TABLE: &'static str = "appointments";

    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }
}

fn storage_error(err: anyhow::Error) -> AppointmentError {
    AppointmentError::Storage(err.to_string())
}

/// `Z`-suffixed so the value survives query-string decoding. Sub-second digits
/// are kept: stored times are not rounded, so truncating a bound would drop
/// rows that overlap by less than a second.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn status_list(statuses: &[AppointmentStatus]) -> String {
    statuses
        .iter()
        .map(AppointmentStatus::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// PostgREST filter for active appointments overlapping `[start, end)`:
/// `start_time < end AND end_time > start`, so touching appointments are not returned.
pub fn active_overlap_query(practitioner_id: Uuid, window: &TimeRange, exclude_id: Option<Uuid>) -> String {
    let mut query = format!(
        "practitioner_id=eq.{}&status=in.({})&start_time=lt.{}&end_time=gt.{}",
        practitioner_id,
        status_list(&AppointmentStatus::ACTIVE),
        timestamp(window.end),
        timestamp(window.start),
    );
    if let Some(id) = exclude_id {
        query.push_str(&format!("&id=neq.{}", id));
    }
    query
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let mut rows: Vec<Appointment> = self
            .supabase
            .select(Self::TABLE, &format!("id=eq.{}", id))
            .await
            .map_err(storage_error)?;
        Ok(rows.pop())
    }

    async fn find_active_for_practitioner(
        &self,
        practitioner_id: Uuid,
        window: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.supabase
            .select(Self::TABLE, &active_overlap_query(practitioner_id, window, exclude_id))
            .await
            .map_err(storage_error)
    }

    async fn save(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        self.supabase
            .upsert(Self::TABLE, appointment)
            .await
            .map_err(storage_error)
    }

    async fn list_for_practitioner(&self, practitioner_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.supabase
            .select(
                Self::TABLE,
                &format!("practitioner_id=eq.{}&order=start_time.asc", practitioner_id),
            )
            .await
            .map_err(storage_error)
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.supabase
            .select(
                Self::TABLE,
                &format!("patient_id=eq.{}&order=start_time.desc", patient_id),
            )
            .await
            .map_err(storage_error)
    }

    async fn count_for_therapy(
        &self,
        therapy_id: Uuid,
        statuses: &[AppointmentStatus],
    ) -> Result<u64, AppointmentError> {
        let rows: Vec<Value> = self
            .supabase
            .select(
                Self::TABLE,
                &format!("therapy_id=eq.{}&status=in.({})&select=id", therapy_id, status_list(statuses)),
            )
            .await
            .map_err(storage_error)?;
        Ok(rows.len() as u64)
    }
}
