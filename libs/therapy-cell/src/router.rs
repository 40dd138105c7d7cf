use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::TherapyService;

#[derive(Clone)]
pub struct TherapyState {
    pub config: Arc<AppConfig>,
    pub therapies: Arc<TherapyService>,
}

pub fn therapy_routes(state: TherapyState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_therapies))
        .route("/{therapy_id}", get(handlers::get_therapy));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_therapy))
        .route("/{therapy_id}/popularity", post(handlers::update_popularity))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
