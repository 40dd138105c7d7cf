pub mod availability;
pub mod bookings;
pub mod conflict;
pub mod lifecycle;
pub mod locks;
pub mod store;

pub use availability::BookingAvailabilityService;
pub use bookings::AppointmentBookingCounter;
pub use conflict::{find_conflicts, has_conflict, TimeRange};
pub use lifecycle::AppointmentLifecycleService;
pub use locks::SchedulingLocks;
pub use store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
