use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use tokio::sync::Mutex;

use shared_config::AppConfig;
use shared_utils::clock::Clock;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{AvailabilityService, PractitionerService, PractitionerStore, RatingService};

#[derive(Clone)]
pub struct PractitionerState {
    pub config: Arc<AppConfig>,
    pub practitioners: Arc<PractitionerService>,
    pub availability: Arc<AvailabilityService>,
    pub ratings: Arc<RatingService>,
}

impl PractitionerState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn PractitionerStore>, clock: Arc<dyn Clock>) -> Self {
        let write_lock = Arc::new(Mutex::new(()));
        Self {
            practitioners: Arc::new(PractitionerService::new(store.clone(), clock.clone(), write_lock.clone())),
            availability: Arc::new(AvailabilityService::new(store.clone(), config.clinic_utc_offset)),
            ratings: Arc::new(RatingService::new(store, clock, write_lock)),
            config,
        }
    }
}

pub fn practitioner_routes(state: PractitionerState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_practitioners))
        .route("/available", get(handlers::find_available_practitioners))
        .route("/specialization/{specialization}", get(handlers::find_by_specialization))
        .route("/{practitioner_id}", get(handlers::get_practitioner))
        .route("/{practitioner_id}/availability", get(handlers::check_practitioner_availability));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_practitioner))
        .route("/{practitioner_id}", delete(handlers::deactivate_practitioner))
        .route("/{practitioner_id}/availability", put(handlers::update_availability))
        .route("/{practitioner_id}/ratings", post(handlers::submit_rating))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
