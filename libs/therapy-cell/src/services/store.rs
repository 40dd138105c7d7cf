use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Therapy, TherapyError};

#[async_trait]
pub trait TherapyStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Therapy>, TherapyError>;

    async fn list(&self) -> Result<Vec<Therapy>, TherapyError>;

    async fn save(&self, therapy: &Therapy) -> Result<Therapy, TherapyError>;
}

#[derive(Default)]
pub struct InMemoryTherapyStore {
    therapies: RwLock<HashMap<Uuid, Therapy>>,
}

impl InMemoryTherapyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TherapyStore for InMemoryTherapyStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Therapy>, TherapyError> {
        Ok(self.therapies.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Therapy>, TherapyError> {
        Ok(self.therapies.read().await.values().cloned().collect())
    }

    async fn save(&self, therapy: &Therapy) -> Result<Therapy, TherapyError> {
        self.therapies.write().await.insert(therapy.id, therapy.clone());
        Ok(therapy.clone())
    }
}

pub struct SupabaseTherapyStore {
    supabase: SupabaseClient,
}

impl SupabaseTherapyStore {
    const TABLE: &'static str = "therapies";

    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }
}

fn storage_error(err: anyhow::Error) -> TherapyError {
    TherapyError::Storage(err.to_string())
}

#[async_trait]
impl TherapyStore for SupabaseTherapyStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Therapy>, TherapyError> {
        let mut rows: Vec<Therapy> = self
            .supabase
            .select(Self::TABLE, &format!("id=eq.{}", id))
            .await
            .map_err(storage_error)?;
        Ok(rows.pop())
    }

    async fn list(&self) -> Result<Vec<Therapy>, TherapyError> {
        self.supabase
            .select(Self::TABLE, "order=popularity.desc")
            .await
            .map_err(storage_error)
    }

    async fn save(&self, therapy: &Therapy) -> Result<Therapy, TherapyError> {
        self.supabase
            .upsert(Self::TABLE, therapy)
            .await
            .map_err(storage_error)
    }
}
