use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use therapy_cell::{BookingCounter, TherapyError};

use crate::models::AppointmentStatus;
use crate::services::store::AppointmentStore;

/// Statuses that count towards a therapy's popularity.
pub const POPULARITY_STATUSES: [AppointmentStatus; 3] = [
    AppointmentStatus::Completed,
    AppointmentStatus::Scheduled,
    AppointmentStatus::Confirmed,
];

/// Feeds therapy popularity from the appointment store.
pub struct AppointmentBookingCounter {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentBookingCounter {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BookingCounter for AppointmentBookingCounter {
    async fn count_qualifying_bookings(&self, therapy_id: Uuid) -> Result<u64, TherapyError> {
        self.store
            .count_for_therapy(therapy_id, &POPULARITY_STATUSES)
            .await
            .map_err(|e| TherapyError::Storage(e.to_string()))
    }
}
