use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use therapy_cell::{
    therapy_routes, BookingCounter, CreateTherapyRequest, InMemoryTherapyStore, SessionPlan,
    SupabaseTherapyStore, TherapyCategory, TherapyError, TherapyPricing, TherapyService,
    TherapyState, TherapyStatus, TherapyStore, TherapyType,
};

struct FixedBookings(u64);

#[async_trait]
impl BookingCounter for FixedBookings {
    async fn count_qualifying_bookings(&self, _therapy_id: Uuid) -> Result<u64, TherapyError> {
        Ok(self.0)
    }
}

fn request(name: &str, category: TherapyCategory) -> CreateTherapyRequest {
    CreateTherapyRequest {
        name: name.to_string(),
        sanskrit_name: None,
        category,
        therapy_type: TherapyType::Abhyanga,
        description: "Warm herbal oil massage".to_string(),
        benefits: vec!["Improves circulation".to_string(), "  ".to_string()],
        indications: vec![],
        contraindications: vec![],
        duration_minutes: 90,
        sessions: SessionPlan::default(),
        pricing: TherapyPricing {
            base_price: 2500.0,
            currency: "INR".to_string(),
            package_discount: 20.0,
        },
        status: TherapyStatus::Active,
    }
}

fn clinic_opening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap()
}

fn service(store: Arc<dyn TherapyStore>, bookings: u64) -> TherapyService {
    TherapyService::new(
        store,
        Arc::new(FixedBookings(bookings)),
        Arc::new(FixedClock::new(clinic_opening())),
    )
}

#[tokio::test]
async fn test_create_therapy_validates_sessions_and_discount() {
    let service = service(Arc::new(InMemoryTherapyStore::new()), 0);

    let mut bad_sessions = request("Abhyanga", TherapyCategory::Bahyachikitsa);
    bad_sessions.sessions = SessionPlan {
        recommended: 7,
        maximum: 3,
        ..SessionPlan::default()
    };
    assert_matches!(
        service.create_therapy(bad_sessions, Uuid::new_v4()).await,
        Err(TherapyError::Validation(_))
    );

    let mut bad_discount = request("Abhyanga", TherapyCategory::Bahyachikitsa);
    bad_discount.pricing.package_discount = 60.0;
    assert_matches!(
        service.create_therapy(bad_discount, Uuid::new_v4()).await,
        Err(TherapyError::Validation(_))
    );

    let created = service
        .create_therapy(request("Abhyanga", TherapyCategory::Bahyachikitsa), Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(created.benefits, vec!["Improves circulation".to_string()]);

    let duplicate = service
        .create_therapy(request("abhyanga", TherapyCategory::Bahyachikitsa), Uuid::new_v4())
        .await;
    assert_matches!(duplicate, Err(TherapyError::Validation(_)));
}

#[tokio::test]
async fn test_update_popularity_counts_bookings() {
    let store: Arc<dyn TherapyStore> = Arc::new(InMemoryTherapyStore::new());
    let service = service(store.clone(), 3);

    let mut therapy = service
        .create_therapy(request("Shirodhara", TherapyCategory::Bahyachikitsa), Uuid::new_v4())
        .await
        .unwrap();
    therapy.average_rating = 4.0;
    therapy.total_reviews = 5;
    store.save(&therapy).await.unwrap();

    assert_eq!(therapy.created_at, clinic_opening());

    let updated = service.update_popularity(therapy.id).await.unwrap();
    assert_eq!(updated.popularity, 26.0);
    assert_eq!(updated.updated_at, clinic_opening());

    let missing = service.update_popularity(Uuid::new_v4()).await;
    assert_matches!(missing, Err(TherapyError::NotFound(_)));
}

#[tokio::test]
async fn test_list_active_filters_and_orders() {
    let store: Arc<dyn TherapyStore> = Arc::new(InMemoryTherapyStore::new());
    let service = service(store.clone(), 0);
    let author = Uuid::new_v4();

    let mut basti = service
        .create_therapy(request("Basti", TherapyCategory::Pradhanakarma), author)
        .await
        .unwrap();
    basti.popularity = 10.0;
    store.save(&basti).await.unwrap();

    let mut nasya = service
        .create_therapy(request("Nasya", TherapyCategory::Pradhanakarma), author)
        .await
        .unwrap();
    nasya.popularity = 30.0;
    store.save(&nasya).await.unwrap();

    let mut retired = request("Kizhi", TherapyCategory::Pradhanakarma);
    retired.status = TherapyStatus::Discontinued;
    service.create_therapy(retired, author).await.unwrap();

    service
        .create_therapy(request("Udvartana", TherapyCategory::Purvakarma), author)
        .await
        .unwrap();

    let names: Vec<String> = service
        .list_active(Some(TherapyCategory::Pradhanakarma), None)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["Nasya".to_string(), "Basti".to_string()]);

    assert_eq!(service.list_active(None, Some(1)).await.unwrap().len(), 1);
}

// ==============================================================================
// ROUTER
// ==============================================================================

fn app(store: Arc<dyn TherapyStore>) -> Router {
    therapy_routes(TherapyState {
        config: TestConfig::default().to_arc(),
        therapies: Arc::new(service(store, 2)),
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_admin_creates_and_public_reads_therapy() {
    let store: Arc<dyn TherapyStore> = Arc::new(InMemoryTherapyStore::new());
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &TestConfig::default().jwt_secret, Some(1));

    let response = app(store.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", JwtTestUtils::bearer(&token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&request("Abhyanga", TherapyCategory::Bahyachikitsa)).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["data"]["created_by"], admin.id);
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = app(store)
        .oneshot(Request::builder().uri(format!("/{}", id)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["formatted_duration"], "1h 30m");
    assert_eq!(body["data"]["effective_price"], 2000.0);
}

#[tokio::test]
async fn test_popularity_route_requires_token() {
    let store: Arc<dyn TherapyStore> = Arc::new(InMemoryTherapyStore::new());

    let response = app(store)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}/popularity", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_route_accepts_category_filter() {
    let store: Arc<dyn TherapyStore> = Arc::new(InMemoryTherapyStore::new());
    let service = service(store.clone(), 0);
    service
        .create_therapy(request("Vamana", TherapyCategory::Pradhanakarma), Uuid::new_v4())
        .await
        .unwrap();

    let response = app(store)
        .oneshot(
            Request::builder()
                .uri("/?category=purvakarma")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 0);
}

#[tokio::test]
async fn test_supabase_store_upserts_therapy() {
    let server = MockServer::start().await;
    let config = AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        ..AppConfig::default()
    };

    let local = service(Arc::new(InMemoryTherapyStore::new()), 0);
    let therapy = local
        .create_therapy(request("Pizhichil", TherapyCategory::Bahyachikitsa), Uuid::new_v4())
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/rest/v1/therapies"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([therapy])))
        .mount(&server)
        .await;

    let store = SupabaseTherapyStore::new(SupabaseClient::new(&config));
    let saved = store.save(&therapy).await.unwrap();
    assert_eq!(saved.id, therapy.id);
    assert_eq!(saved.name, "Pizhichil");
}
