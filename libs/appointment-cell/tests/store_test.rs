use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{AppointmentStatus, AppointmentStore, SupabaseAppointmentStore, TimeRange};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

fn store_for(server: &MockServer) -> SupabaseAppointmentStore {
    let config = AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        ..AppConfig::default()
    };
    SupabaseAppointmentStore::new(SupabaseClient::new(&config))
}

#[tokio::test]
async fn test_overlap_query_uses_strict_bounds() {
    let server = MockServer::start().await;
    let practitioner_id = Uuid::new_v4();
    let excluded = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("practitioner_id", format!("eq.{}", practitioner_id)))
        .and(query_param("status", "in.(scheduled,confirmed,in-progress)"))
        .and(query_param("start_time", "lt.2030-01-07T11:00:00Z"))
        .and(query_param("end_time", "gt.2030-01-07T10:00:00Z"))
        .and(query_param("id", format!("neq.{}", excluded)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let window = TimeRange::of(Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap(), 60).unwrap();
    let found = store_for(&server)
        .find_active_for_practitioner(practitioner_id, &window, Some(excluded))
        .await
        .unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn test_count_for_therapy_counts_returned_rows() {
    let server = MockServer::start().await;
    let therapy_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("therapy_id", format!("eq.{}", therapy_id)))
        .and(query_param("status", "in.(completed,scheduled,confirmed)"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() }
        ])))
        .mount(&server)
        .await;

    let count = store_for(&server)
        .count_for_therapy(
            therapy_id,
            &[AppointmentStatus::Completed, AppointmentStatus::Scheduled, AppointmentStatus::Confirmed],
        )
        .await
        .unwrap();

    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_storage_failures_become_storage_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = store_for(&server).find_by_id(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), "storage_error");
}
