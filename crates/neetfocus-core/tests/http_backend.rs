//! HTTP backend against a mocked study API.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use mockito::{Matcher, Server};
use neetfocus_core::session::GoalSettingsBackend;
use neetfocus_core::{
    BackendError, Difficulty, FixedClock, HttpBackend, SessionBackend, SessionStore, StoreError,
    StreakTracker, StudySessionDraft, Subject,
};
use serde_json::json;
use url::Url;

fn backend(server: &Server, token: Option<&str>) -> HttpBackend {
    let base = Url::parse(&format!("{}/api", server.url())).unwrap();
    HttpBackend::new(base, token.map(String::from), Duration::from_secs(5)).unwrap()
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
}

#[tokio::test]
async fn list_maps_server_records() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/study-logs/")
        .match_header("authorization", "Bearer secret")
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"id": 1, "date": "2026-04-09", "minutes": 25, "subject": "Physics", "topic": "Optics"},
                {"id": 2, "date": "2026-04-10", "minutes": 2, "duration_seconds": 90,
                 "subject": "General Study", "topic": "Revision", "difficulty": "Hard"}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let sessions = backend(&server, Some("secret")).list().await.unwrap();
    mock.assert_async().await;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].duration_secs, 1500);
    assert_eq!(sessions[0].subject, Subject::Physics);
    assert_eq!(sessions[1].duration_secs, 90);
    assert_eq!(sessions[1].subject, Subject::General);
    assert_eq!(sessions[1].difficulty, Difficulty::Hard);
}

#[tokio::test]
async fn create_keeps_exact_seconds_when_server_rounds() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/study-logs/")
        .match_body(Matcher::PartialJson(json!({"minutes": 2, "duration_seconds": 61})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": 5, "date": "2026-04-10", "minutes": 2, "subject": "Chemistry"}).to_string())
        .create_async()
        .await;

    let draft = StudySessionDraft {
        subject: Some(Subject::Chemistry),
        topic: "Equilibrium".into(),
        duration_secs: 61,
        difficulty: Difficulty::Easy,
        date: date(10),
    };
    let stored = backend(&server, None)
        .create(&draft.validate().unwrap())
        .await
        .unwrap();
    assert_eq!(stored.id, 5);
    assert_eq!(stored.duration_secs, 61);
    assert_eq!(stored.topic, "Equilibrium");
    assert_eq!(stored.difficulty, Difficulty::Easy);
}

#[tokio::test]
async fn status_codes_map_to_backend_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/study-logs/")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("DELETE", "/api/study-logs/3/")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("DELETE", "/api/study-logs/4/")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let backend = backend(&server, Some("expired"));
    assert_eq!(backend.list().await.unwrap_err(), BackendError::Unauthorized);
    assert_eq!(backend.delete(3).await.unwrap_err(), BackendError::NotFound);
    assert_eq!(
        backend.delete(4).await.unwrap_err(),
        BackendError::Status {
            status: 503,
            body: "maintenance".into()
        }
    );
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let backend = HttpBackend::new(
        Url::parse("http://127.0.0.1:9/api").unwrap(),
        None,
        Duration::from_secs(2),
    )
    .unwrap();
    assert!(matches!(
        backend.list().await,
        Err(BackendError::Transport(_))
    ));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/study-logs/")
        .with_header("content-type", "application/json")
        .with_body("{\"not\": \"a list\"}")
        .create_async()
        .await;
    assert!(matches!(
        backend(&server, None).list().await,
        Err(BackendError::Decode(_))
    ));
}

#[tokio::test]
async fn daily_goal_roundtrip_merges_settings() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/user-storage/")
        .with_header("content-type", "application/json")
        .with_body(json!({"timer_settings": {"sound": true, "dailyGoal": 14400.0}}).to_string())
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", "/api/user-storage/")
        .match_body(Matcher::Json(json!({"timer_settings": {"sound": true, "dailyGoal": 7200}})))
        .with_body("{}")
        .create_async()
        .await;

    let backend = backend(&server, None);
    assert_eq!(backend.load_daily_goal().await.unwrap(), Some(14400));
    backend.save_daily_goal(7200).await.unwrap();
    patch.assert_async().await;
}

#[tokio::test]
async fn missing_daily_goal_is_none() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/user-storage/")
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;
    assert_eq!(backend(&server, None).load_daily_goal().await.unwrap(), None);
}

#[tokio::test]
async fn pomodoro_count_uses_its_own_storage_key() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/user-storage/")
        .with_header("content-type", "application/json")
        .with_body(json!({"timer_pomo_count": {"count": 7}}).to_string())
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", "/api/user-storage/")
        .match_body(Matcher::Json(json!({"timer_pomo_count": {"count": 8}})))
        .with_body("{}")
        .create_async()
        .await;

    let backend = backend(&server, None);
    assert_eq!(backend.load_pomodoro_count().await.unwrap(), Some(7));
    backend.save_pomodoro_count(8).await.unwrap();
    patch.assert_async().await;
}

#[tokio::test]
async fn list_tolerates_odd_minute_values() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/study-logs/")
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"id": 1, "date": "2026-04-09", "minutes": -5, "subject": "Physics"},
                {"id": 2, "date": "2026-04-10", "minutes": i64::MAX, "subject": "Biology"}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let sessions = backend(&server, None).list().await.unwrap();
    assert_eq!(sessions[0].duration_secs, 0);
    assert_eq!(sessions[1].duration_secs, u64::MAX);
}

#[tokio::test]
async fn store_reports_expired_login_on_record() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/study-logs/")
        .with_status(401)
        .create_async()
        .await;

    let mut store = SessionStore::new(
        backend(&server, Some("stale")),
        Arc::new(FixedClock::new(date(10))),
        StreakTracker::default(),
    );
    let draft = StudySessionDraft {
        subject: Some(Subject::Biology),
        topic: "Genetics".into(),
        duration_secs: 600,
        difficulty: Difficulty::Medium,
        date: date(10),
    };
    let err = store.record(draft).await.unwrap_err();
    assert!(matches!(err, StoreError::AuthExpired));
    assert!(store.sessions().is_empty());
}
