use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use appointment_cell::{
    appointment_routes, patient_appointment_routes, AppointmentBookingCounter, AppointmentState,
    AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore,
};
use patient_cell::{
    patient_routes, InMemoryPatientStore, PatientState, PatientStore, SupabasePatientStore,
};
use practitioner_cell::{
    practitioner_routes, InMemoryPractitionerStore, PractitionerState, PractitionerStore,
    SupabasePractitionerStore,
};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_utils::clock::{Clock, SystemClock};
use therapy_cell::{
    therapy_routes, InMemoryTherapyStore, SupabaseTherapyStore, TherapyService, TherapyState,
    TherapyStore,
};

pub struct Stores {
    pub appointments: Arc<dyn AppointmentStore>,
    pub practitioners: Arc<dyn PractitionerStore>,
    pub patients: Arc<dyn PatientStore>,
    pub therapies: Arc<dyn TherapyStore>,
}

impl Stores {
    pub fn from_config(config: &AppConfig) -> Self {
        match config.storage_backend {
            StorageBackend::Memory => Self::in_memory(),
            StorageBackend::Supabase => {
                let supabase = SupabaseClient::new(config);
                Self {
                    appointments: Arc::new(SupabaseAppointmentStore::new(supabase.clone())),
                    practitioners: Arc::new(SupabasePractitionerStore::new(supabase.clone())),
                    patients: Arc::new(SupabasePatientStore::new(supabase.clone())),
                    therapies: Arc::new(SupabaseTherapyStore::new(supabase)),
                }
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            practitioners: Arc::new(InMemoryPractitionerStore::new()),
            patients: Arc::new(InMemoryPatientStore::new()),
            therapies: Arc::new(InMemoryTherapyStore::new()),
        }
    }
}

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let stores = Stores::from_config(&config);
    build_router(config, stores)
}

pub fn build_router(config: Arc<AppConfig>, stores: Stores) -> Router {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let practitioner_state = PractitionerState::new(config.clone(), stores.practitioners, clock.clone());
    let patient_state = PatientState::new(config.clone(), stores.patients, clock.clone());
    let appointment_state = AppointmentState::new(
        config.clone(),
        stores.appointments.clone(),
        clock.clone(),
        &practitioner_state,
        &patient_state,
    );
    let therapy_state = TherapyState {
        config,
        therapies: Arc::new(TherapyService::new(
            stores.therapies,
            Arc::new(AppointmentBookingCounter::new(stores.appointments)),
            clock,
        )),
    };

    let patients = patient_routes(patient_state).merge(patient_appointment_routes(appointment_state.clone()));

    let api = Router::new()
        .nest("/appointments", appointment_routes(appointment_state))
        .nest("/patients", patients)
        .nest("/practitioners", practitioner_routes(practitioner_state))
        .nest("/therapies", therapy_routes(therapy_state));

    Router::new()
        .route(
            "/",
            get(|| async {
                Json(json!({
                    "success": true,
                    "message": "Ayurveda clinic API is running!"
                }))
            }),
        )
        .nest("/api/v1", api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(TestConfig::default().to_arc(), Stores::in_memory())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_running() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_cells_are_mounted_under_api_v1() {
        let response = app()
            .oneshot(Request::builder().uri("/api/v1/therapies").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(Request::builder().uri("/api/v1/practitioners").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let user = TestUser::patient("patient@example.com");
        let token = JwtTestUtils::create_test_token(&user, &TestConfig::default().jwt_secret, Some(1));
        let response = app()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/appointments/patients/{}", user.id))
                    .header("Authorization", JwtTestUtils::bearer(&token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["count"], 0);
    }

    #[tokio::test]
    async fn test_patient_routes_are_mounted() {
        let router = app();
        let admin = TestUser::admin("admin@example.com");
        let token = JwtTestUtils::bearer(&JwtTestUtils::create_test_token(
            &admin,
            &TestConfig::default().jwt_secret,
            Some(1),
        ));

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/patients")
                    .header("Authorization", &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["count"], 0);

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/patients/{}/appointments", admin.id))
                    .header("Authorization", &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_popularity_counts_bookings_across_cells() {
        let stores = Stores::in_memory();
        let therapies = stores.therapies.clone();
        let router = build_router(TestConfig::default().to_arc(), stores);

        let admin = TestUser::admin("admin@example.com");
        let token = JwtTestUtils::bearer(&JwtTestUtils::create_test_token(
            &admin,
            &TestConfig::default().jwt_secret,
            Some(1),
        ));

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/therapies")
                    .header("Authorization", &token)
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        json!({
                            "name": "Virechana",
                            "category": "pradhanakarma",
                            "therapy_type": "virechana",
                            "description": "Therapeutic purgation",
                            "duration_minutes": 120,
                            "pricing": { "base_price": 4000.0 }
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let therapy_id = body_json(response).await["data"]["id"].as_str().unwrap().to_string();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/therapies/{}/popularity", therapy_id))
                    .header("Authorization", &token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["popularity"], 0.0);
        assert_eq!(therapies.list().await.unwrap().len(), 1);
    }
}
