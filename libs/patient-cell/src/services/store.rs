use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Patient, PatientError};

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError>;

    async fn list(&self) -> Result<Vec<Patient>, PatientError>;

    async fn save(&self, patient: &Patient) -> Result<Patient, PatientError>;
}

#[derive(Default)]
pub struct InMemoryPatientStore {
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError> {
        Ok(self.patients.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Patient>, PatientError> {
        Ok(self.patients.read().await.values().cloned().collect())
    }

    async fn save(&self, patient: &Patient) -> Result<Patient, PatientError> {
        self.patients.write().await.insert(patient.id, patient.clone());
        Ok(patient.clone())
    }
}

/// Profiles in the `patients` table; history, profile and preferences are jsonb.
pub struct SupabasePatientStore {
    supabase: SupabaseClient,
}

impl SupabasePatientStore {
    const TABLE: &'static str = "patients";

    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }
}

fn storage_error(err: anyhow::Error) -> PatientError {
    PatientError::Storage(err.to_string())
}

#[async_trait]
impl PatientStore for SupabasePatientStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError> {
        let mut rows: Vec<Patient> = self
            .supabase
            .select(Self::TABLE, &format!("id=eq.{}", id))
            .await
            .map_err(storage_error)?;
        Ok(rows.pop())
    }

    async fn list(&self) -> Result<Vec<Patient>, PatientError> {
        self.supabase
            .select(Self::TABLE, "order=created_at.desc")
            .await
            .map_err(storage_error)
    }

    async fn save(&self, patient: &Patient) -> Result<Patient, PatientError> {
        self.supabase
            .upsert(Self::TABLE, patient)
            .await
            .map_err(storage_error)
    }
}
