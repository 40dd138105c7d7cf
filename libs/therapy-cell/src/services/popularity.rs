use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Therapy, TherapyError};

const BOOKING_WEIGHT: f64 = 2.0;

/// Source of booking counts for a therapy. Implemented by whoever owns appointments.
#[async_trait]
pub trait BookingCounter: Send + Sync {
    /// Bookings that still count towards popularity (completed or upcoming).
    async fn count_qualifying_bookings(&self, therapy_id: Uuid) -> Result<u64, TherapyError>;
}

/// `average_rating * total_reviews + 2 * qualifying_bookings`
pub fn recompute_popularity(therapy: &Therapy, qualifying_bookings: u64) -> f64 {
    let rating_weight = therapy.average_rating * therapy.total_reviews as f64;
    let booking_weight = qualifying_bookings as f64 * BOOKING_WEIGHT;
    rating_weight + booking_weight
}
