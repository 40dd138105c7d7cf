use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Practitioner, PractitionerError};

#[async_trait]
pub trait PractitionerStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Practitioner>, PractitionerError>;

    async fn list(&self) -> Result<Vec<Practitioner>, PractitionerError>;

    /// Inserts or replaces the practitioner and returns what was stored.
    async fn save(&self, practitioner: &Practitioner) -> Result<Practitioner, PractitionerError>;
}

#[derive(Default)]
pub struct InMemoryPractitionerStore {
    practitioners: RwLock<HashMap<Uuid, Practitioner>>,
}

impl InMemoryPractitionerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PractitionerStore for InMemoryPractitionerStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Practitioner>, PractitionerError> {
        Ok(self.practitioners.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Practitioner>, PractitionerError> {
        Ok(self.practitioners.read().await.values().cloned().collect())
    }

    async fn save(&self, practitioner: &Practitioner) -> Result<Practitioner, PractitionerError> {
        self.practitioners
            .write()
            .await
            .insert(practitioner.id, practitioner.clone());
        Ok(practitioner.clone())
    }
}

/// Practitioners stored in the `practitioners` table; nested documents live in jsonb columns.
pub struct SupabasePractitionerStore {
    supabase: SupabaseClient,
}

impl SupabasePractitionerStore {
    const TABLE: &'static str = "practitioners";

    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }
}

fn storage_error(err: anyhow::Error) -> PractitionerError {
    PractitionerError::Storage(err.to_string())
}

#[async_trait]
impl PractitionerStore for SupabasePractitionerStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Practitioner>, PractitionerError> {
        let mut rows: Vec<Practitioner> = self
            .supabase
            .select(Self::TABLE, &format!("id=eq.{}", id))
            .await
            .map_err(storage_error)?;
        Ok(rows.pop())
    }

    async fn list(&self) -> Result<Vec<Practitioner>, PractitionerError> {
        self.supabase
            .select(Self::TABLE, "order=created_at.asc")
            .await
            .map_err(storage_error)
    }

    async fn save(&self, practitioner: &Practitioner) -> Result<Practitioner, PractitionerError> {
        self.supabase
            .upsert(Self::TABLE, practitioner)
            .await
            .map_err(storage_error)
    }
}
