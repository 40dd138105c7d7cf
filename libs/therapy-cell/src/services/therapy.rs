use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{CreateTherapyRequest, Therapy, TherapyCategory, TherapyError};
use crate::services::popularity::{recompute_popularity, BookingCounter};
use crate::services::store::TherapyStore;

const DEFAULT_LIST_LIMIT: usize = 50;

fn validation(msg: &str) -> TherapyError {
    TherapyError::Validation(msg.to_string())
}

fn clean_list(items: Vec<String>, what: &str) -> Result<Vec<String>, TherapyError> {
    let items: Vec<String> = items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    if items.iter().any(|item| item.chars().count() > 200) {
        return Err(TherapyError::Validation(format!("each {} cannot exceed 200 characters", what)));
    }
    Ok(items)
}

pub struct TherapyService {
    store: Arc<dyn TherapyStore>,
    bookings: Arc<dyn BookingCounter>,
    clock: Arc<dyn Clock>,
    // popularity is read-modify-write
    write_lock: Mutex<()>,
}

impl TherapyService {
    pub fn new(store: Arc<dyn TherapyStore>, bookings: Arc<dyn BookingCounter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            bookings,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn create_therapy(&self, request: CreateTherapyRequest, created_by: Uuid) -> Result<Therapy, TherapyError> {
        debug!("Creating therapy {}", request.name);

        let name = request.name.trim().to_string();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(validation("name is required and cannot exceed 100 characters"));
        }
        let description = request.description.trim().to_string();
        if description.is_empty() || description.chars().count() > 1000 {
            return Err(validation("description is required and cannot exceed 1000 characters"));
        }
        if !(15..=480).contains(&request.duration_minutes) {
            return Err(validation("duration must be between 15 and 480 minutes"));
        }
        if request.sessions.recommended < 1 || request.sessions.maximum < 1 {
            return Err(validation("sessions must be at least 1"));
        }
        if request.sessions.maximum < request.sessions.recommended {
            return Err(validation("maximum sessions cannot be less than recommended sessions"));
        }
        if !request.pricing.base_price.is_finite() || request.pricing.base_price < 0.0 {
            return Err(validation("price cannot be negative"));
        }
        if !(0.0..=50.0).contains(&request.pricing.package_discount) {
            return Err(validation("package discount must be between 0 and 50 percent"));
        }

        let _guard = self.write_lock.lock().await;
        let taken = self
            .store
            .list()
            .await?
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(&name));
        if taken {
            return Err(TherapyError::Validation(format!("a therapy named '{}' already exists", name)));
        }

        let now = self.clock.now();
        let therapy = Therapy {
            id: Uuid::new_v4(),
            name,
            sanskrit_name: request
                .sanskrit_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            category: request.category,
            therapy_type: request.therapy_type,
            description,
            benefits: clean_list(request.benefits, "benefit")?,
            indications: clean_list(request.indications, "indication")?,
            contraindications: clean_list(request.contraindications, "contraindication")?,
            duration_minutes: request.duration_minutes,
            sessions: request.sessions,
            pricing: request.pricing,
            status: request.status,
            popularity: 0.0,
            average_rating: 0.0,
            total_reviews: 0,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.save(&therapy).await?;
        info!("Therapy {} created ({})", saved.id, saved.name);
        Ok(saved)
    }

    pub async fn get_therapy(&self, id: Uuid) -> Result<Therapy, TherapyError> {
        self.store.find_by_id(id).await?.ok_or(TherapyError::NotFound(id))
    }

    /// Active therapies, most popular then best rated first.
    pub async fn list_active(
        &self,
        category: Option<TherapyCategory>,
        limit: Option<usize>,
    ) -> Result<Vec<Therapy>, TherapyError> {
        let mut therapies: Vec<Therapy> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(Therapy::is_active)
            .filter(|t| category.map_or(true, |c| t.category == c))
            .collect();

        therapies.sort_by(|a, b| {
            b.popularity
                .total_cmp(&a.popularity)
                .then(b.average_rating.total_cmp(&a.average_rating))
        });
        therapies.truncate(limit.unwrap_or(DEFAULT_LIST_LIMIT));
        Ok(therapies)
    }

    pub async fn update_popularity(&self, id: Uuid) -> Result<Therapy, TherapyError> {
        let _guard = self.write_lock.lock().await;

        let mut therapy = self.get_therapy(id).await?;
        let bookings = self.bookings.count_qualifying_bookings(id).await?;

        therapy.popularity = recompute_popularity(&therapy, bookings);
        therapy.updated_at = self.clock.now();

        let saved = self.store.save(&therapy).await?;
        info!("Therapy {} popularity now {} ({} bookings)", id, saved.popularity, bookings);
        Ok(saved)
    }
}
