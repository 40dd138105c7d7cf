use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::clock::Clock;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{PatientService, PatientStore};

#[derive(Clone)]
pub struct PatientState {
    pub config: Arc<AppConfig>,
    pub patients: Arc<PatientService>,
}

impl PatientState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn PatientStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            patients: Arc::new(PatientService::new(store, clock)),
        }
    }
}

/// Every patient route needs a token; profiles hold medical history.
pub fn patient_routes(state: PatientState) -> Router {
    Router::new()
        .route("/", get(handlers::list_patients).post(handlers::create_patient))
        .route(
            "/{patient_id}",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::deactivate_patient),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
