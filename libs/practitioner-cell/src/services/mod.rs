pub mod availability;
pub mod practitioner;
pub mod rating;
pub mod store;

pub use availability::AvailabilityService;
pub use practitioner::PractitionerService;
pub use rating::RatingService;
pub use store::{InMemoryPractitionerStore, PractitionerStore, SupabasePractitionerStore};
