use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{Practitioner, PractitionerError, RatingBreakdownInput, Ratings};
use crate::services::store::PractitionerStore;

const MIN_RATING: f64 = 1.0;
const MAX_RATING: f64 = 5.0;

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn fold(old: f64, old_count: u32, new_value: f64, new_count: u32) -> f64 {
    (old * old_count as f64 + new_value) / new_count as f64
}

fn check_range(name: &str, value: f64) -> Result<(), PractitionerError> {
    if value.is_finite() && (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(())
    } else {
        Err(PractitionerError::Validation(format!(
            "{} must be between {} and {}",
            name, MIN_RATING, MAX_RATING
        )))
    }
}

/// Folds one review into the running aggregate.
///
/// The overall average is rounded to one decimal after every review and the
/// rounded value is what the next review builds on. Sub-ratings are only
/// touched when supplied and are kept unrounded.
pub fn update_rating(
    ratings: &Ratings,
    new_rating: f64,
    breakdown: &RatingBreakdownInput,
) -> Result<Ratings, PractitionerError> {
    check_range("rating", new_rating)?;
    let dimensions = [
        ("professionalism", breakdown.professionalism),
        ("expertise", breakdown.expertise),
        ("communication", breakdown.communication),
        ("punctuality", breakdown.punctuality),
    ];
    for (name, value) in dimensions {
        if let Some(value) = value {
            check_range(name, value)?;
        }
    }

    let old_count = ratings.total_reviews;
    let new_count = old_count + 1;

    let mut updated = ratings.clone();
    updated.average_rating = round_one_decimal(fold(ratings.average_rating, old_count, new_rating, new_count));
    updated.total_reviews = new_count;

    let current = &ratings.breakdown;
    if let Some(value) = breakdown.professionalism {
        updated.breakdown.professionalism = fold(current.professionalism, old_count, value, new_count);
    }
    if let Some(value) = breakdown.expertise {
        updated.breakdown.expertise = fold(current.expertise, old_count, value, new_count);
    }
    if let Some(value) = breakdown.communication {
        updated.breakdown.communication = fold(current.communication, old_count, value, new_count);
    }
    if let Some(value) = breakdown.punctuality {
        updated.breakdown.punctuality = fold(current.punctuality, old_count, value, new_count);
    }

    Ok(updated)
}

pub struct RatingService {
    store: Arc<dyn PractitionerStore>,
    clock: Arc<dyn Clock>,
    // serialises read-modify-write of aggregates against profile edits
    write_lock: Arc<Mutex<()>>,
}

impl RatingService {
    pub fn new(store: Arc<dyn PractitionerStore>, clock: Arc<dyn Clock>, write_lock: Arc<Mutex<()>>) -> Self {
        Self {
            store,
            clock,
            write_lock,
        }
    }

    pub async fn submit_rating(
        &self,
        practitioner_id: Uuid,
        rating: f64,
        breakdown: &RatingBreakdownInput,
    ) -> Result<Practitioner, PractitionerError> {
        debug!("Submitting rating {} for practitioner {}", rating, practitioner_id);

        let _guard = self.write_lock.lock().await;

        let mut practitioner = self
            .store
            .find_by_id(practitioner_id)
            .await?
            .ok_or(PractitionerError::NotFound(practitioner_id))?;

        practitioner.ratings = update_rating(&practitioner.ratings, rating, breakdown)?;
        practitioner.updated_at = self.clock.now();

        let saved = self.store.save(&practitioner).await?;
        info!(
            "Practitioner {} rating now {:.1} over {} reviews",
            practitioner_id, saved.ratings.average_rating, saved.ratings.total_reviews
        );

        Ok(saved)
    }
}
