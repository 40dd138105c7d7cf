pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{therapy_routes, TherapyState};
pub use services::*;
