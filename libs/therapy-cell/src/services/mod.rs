pub mod popularity;
pub mod store;
pub mod therapy;

pub use popularity::{recompute_popularity, BookingCounter};
pub use store::{InMemoryTherapyStore, SupabaseTherapyStore, TherapyStore};
pub use therapy::TherapyService;
