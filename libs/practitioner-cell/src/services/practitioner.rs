use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{
    CreatePractitionerRequest, Practitioner, PractitionerError, PractitionerStatus, Ratings,
    Specialization, WeeklyAvailability,
};
use crate::services::store::PractitionerStore;

pub struct PractitionerService {
    store: Arc<dyn PractitionerStore>,
    clock: Arc<dyn Clock>,
    // shared with RatingService; every whole-document write goes through it
    write_lock: Arc<Mutex<()>>,
}

impl PractitionerService {
    pub fn new(store: Arc<dyn PractitionerStore>, clock: Arc<dyn Clock>, write_lock: Arc<Mutex<()>>) -> Self {
        Self {
            store,
            clock,
            write_lock,
        }
    }

    pub async fn create_practitioner(
        &self,
        request: CreatePractitionerRequest,
    ) -> Result<Practitioner, PractitionerError> {
        debug!("Creating practitioner profile for user {}", request.user_id);

        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(PractitionerError::Validation("first_name and last_name are required".to_string()));
        }
        if first_name.len() > 50 || last_name.len() > 50 {
            return Err(PractitionerError::Validation("names cannot exceed 50 characters".to_string()));
        }
        if request.specializations.is_empty() {
            return Err(PractitionerError::Validation("at least one specialization is required".to_string()));
        }
        if !(0..=50).contains(&request.experience_years) {
            return Err(PractitionerError::Validation("experience_years must be between 0 and 50".to_string()));
        }
        if request.bio.as_ref().is_some_and(|bio| bio.len() > 1000) {
            return Err(PractitionerError::Validation("bio cannot exceed 1000 characters".to_string()));
        }

        let availability = request.availability.unwrap_or_default();
        availability.validate()?;
        let session_settings = request.session_settings.unwrap_or_default();
        session_settings.validate()?;

        let now = self.clock.now();
        let practitioner = Practitioner {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            first_name,
            last_name,
            title: request.title,
            specializations: request.specializations,
            experience_years: request.experience_years,
            bio: request.bio.map(|bio| bio.trim().to_string()),
            languages: request.languages,
            status: PractitionerStatus::Active,
            availability,
            session_settings,
            ratings: Ratings::default(),
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.save(&practitioner).await?;
        info!("Practitioner {} created ({})", saved.id, saved.full_name());
        Ok(saved)
    }

    pub async fn get_practitioner(&self, id: Uuid) -> Result<Practitioner, PractitionerError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(PractitionerError::NotFound(id))
    }

    /// Active practitioners, best rated and most experienced first.
    pub async fn list_active(&self) -> Result<Vec<Practitioner>, PractitionerError> {
        let mut practitioners: Vec<Practitioner> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(Practitioner::is_active)
            .collect();

        sort_by_reputation(&mut practitioners);
        Ok(practitioners)
    }

    pub async fn find_by_specialization(
        &self,
        specialization: Specialization,
    ) -> Result<Vec<Practitioner>, PractitionerError> {
        let mut practitioners: Vec<Practitioner> = self
            .list_active()
            .await?
            .into_iter()
            .filter(|p| p.specializations.contains(&specialization))
            .collect();

        sort_by_reputation(&mut practitioners);
        Ok(practitioners)
    }

    /// Replaces the weekly template. Existing appointments are left as they are.
    pub async fn update_availability(
        &self,
        id: Uuid,
        availability: WeeklyAvailability,
    ) -> Result<Practitioner, PractitionerError> {
        availability.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut practitioner = self.get_practitioner(id).await?;
        practitioner.availability = availability;
        practitioner.updated_at = self.clock.now();

        let saved = self.store.save(&practitioner).await?;
        info!("Practitioner {} availability updated", id);
        Ok(saved)
    }

    /// Soft delete: the profile stays but is no longer listed or bookable.
    pub async fn deactivate(&self, id: Uuid) -> Result<Practitioner, PractitionerError> {
        let _guard = self.write_lock.lock().await;
        let mut practitioner = self.get_practitioner(id).await?;
        practitioner.status = PractitionerStatus::Inactive;
        practitioner.updated_at = self.clock.now();

        let saved = self.store.save(&practitioner).await?;
        info!("Practitioner {} deactivated", id);
        Ok(saved)
    }
}

fn sort_by_reputation(practitioners: &mut [Practitioner]) {
    practitioners.sort_by(|a, b| {
        b.ratings
            .average_rating
            .total_cmp(&a.ratings.average_rating)
            .then(b.experience_years.cmp(&a.experience_years))
    });
}
