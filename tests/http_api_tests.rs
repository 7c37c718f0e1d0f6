#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use timetable_tool::{ScheduleEntry, Timetable, TimetableMetadata, ValidationOutcome, http_api};
use tower::util::ServiceExt;

fn new_router() -> axum::Router {
    let timetable = Timetable::new();
    let state = http_api::AppState::new(timetable);
    http_api::router(state)
}

fn draft(id: Option<&str>, day: &str, start: &str, end: &str, room: &str) -> Value {
    let mut body = json!({
        "day": day,
        "start": start,
        "end": end,
        "course": {
            "code": "CS101",
            "name": "Programming Fundamentals",
            "course_type": "3_credit_theory",
            "duration_minutes": 90
        },
        "instructor": { "id": "I1" },
        "room": { "id": room, "capacity": 50 },
        "group": { "id": "G1", "size": 30 }
    });
    if let Some(id) = id {
        body["id"] = json!(id);
    }
    body
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn entry_lifecycle_via_http_api() {
    let app = new_router();

    // Create entry
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("cs101-mon"), "Mon", "09:00", "10:30", "R101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: ScheduleEntry = read_json(response).await;
    assert_eq!(created.id, "cs101-mon");

    // Fetch created entry
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/entries/cs101-mon"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: ScheduleEntry = read_json(response).await;
    assert_eq!(fetched, created);

    // Move it to the afternoon
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/entries/cs101-mon",
            &draft(None, "Mon", "14:00", "15:30", "R101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let moved: ScheduleEntry = read_json(response).await;
    assert_eq!(moved.slot.start().to_string(), "14:00");

    // Delete the entry
    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/entries/cs101-mon"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/entries/cs101-mon"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conflicting_entry_is_rejected_with_reason() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("a"), "Mon", "09:00", "10:30", "R101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("b"), "Mon", "10:00", "11:00", "R101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "rejected");
    assert_eq!(body["reason"], "instructor_conflict");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("c"), "Mon", "9:00", "10:30", "R101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await;
    assert_eq!(body["reason"], "invalid_time_format");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("a"), "Tue", "09:00", "10:30", "R202"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn validate_endpoint_does_not_commit() {
    let app = new_router();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("a"), "Mon", "09:00", "10:30", "R101"),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/validate",
            &draft(None, "Mon", "10:30", "12:00", "R101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: ValidationOutcome = read_json(response).await;
    assert!(outcome.valid);

    let mut undersized = draft(None, "Tue", "09:00", "10:30", "R303");
    undersized["room"]["capacity"] = json!(20);
    undersized["group"]["size"] = json!(25);
    let response = app
        .clone()
        .oneshot(json_request("POST", "/validate", &undersized))
        .await
        .unwrap();
    let body: Value = read_json(response).await;
    assert_eq!(body, json!({"valid": false, "reason": "capacity_exceeded"}));

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/entries"))
        .await
        .unwrap();
    let entries: Vec<ScheduleEntry> = read_json(response).await;
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn metadata_audit_summary_and_next_slot() {
    let app = new_router();

    let mut metadata = TimetableMetadata::default();
    metadata.name = "EE Fall".into();
    metadata.semester = 5;
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/metadata",
            &serde_json::to_value(&metadata).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    metadata.semester = 0;
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/metadata",
            &serde_json::to_value(&metadata).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/metadata"))
        .await
        .unwrap();
    let current: TimetableMetadata = read_json(response).await;
    assert_eq!(current.name, "EE Fall");
    assert_eq!(current.semester, 5);

    app.clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("a"), "Wed", "09:00", "10:30", "R101"),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/audit"))
        .await
        .unwrap();
    let audit: Value = read_json(response).await;
    assert_eq!(audit, json!({"findings": [], "clusters": []}));

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/summary"))
        .await
        .unwrap();
    let summary: Value = read_json(response).await;
    assert_eq!(summary["entry_count"], 1);
    assert_eq!(summary["rooms"][0]["minutes"], 90);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/next-slot",
            &json!({"day": "Sat", "time": "16:00", "duration_minutes": 90}),
        ))
        .await
        .unwrap();
    let next: Value = read_json(response).await;
    assert_eq!(next, json!({"next": null, "exhausted": true}));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/next-slot",
            &json!({"day": "Mon", "time": "09:00", "duration_minutes": 90}),
        ))
        .await
        .unwrap();
    let next: Value = read_json(response).await;
    assert_eq!(next["next"]["time"], "10:30");
    assert_eq!(next["exhausted"], false);

    let response = app
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn committed_changes_are_saved_to_the_store() {
    use std::sync::Arc;
    use timetable_tool::{SqliteTimetableStore, TimetableStore};

    let file = tempfile::NamedTempFile::new().unwrap();
    let store = Arc::new(SqliteTimetableStore::new(file.path()).unwrap());
    let app = http_api::router(http_api::AppState::with_store(Timetable::new(), store.clone()));

    for id in ["keep", "drop"] {
        let day = if id == "keep" { "Mon" } else { "Tue" };
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/entries",
                &draft(Some(id), day, "09:00", "10:30", "R101"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/entries/drop"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // A rejected candidate leaves the stored snapshot alone.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("clash"), "Mon", "10:00", "11:00", "R101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let reopened = SqliteTimetableStore::new(file.path()).unwrap();
    let stored = reopened
        .load_timetable()
        .expect("load")
        .expect("snapshot saved after POST");
    assert_eq!(stored.len(), 1);
    assert!(stored.contains("keep"));
    assert!(!stored.contains("drop"));
    assert!(!stored.contains("clash"));
}

#[tokio::test]
async fn generate_places_sessions_without_conflicts() {
    let app = new_router();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/entries",
            &draft(Some("existing"), "Mon", "09:00", "10:30", "R101"),
        ))
        .await
        .unwrap();

    let request = json!({
        "rooms": [
            { "id": "R101", "capacity": 50 },
            { "id": "LAB1", "capacity": 40, "room_type": "lab" }
        ],
        "courses": [
            {
                "course": {
                    "code": "CS101",
                    "name": "Programming Fundamentals",
                    "course_type": "3_credit_theory",
                    "duration_minutes": 90
                },
                "instructor": { "id": "I2" },
                "group": { "id": "G2", "size": 35 }
            },
            {
                "course": {
                    "code": "CS101L",
                    "name": "Programming Lab",
                    "course_type": "lab",
                    "duration_minutes": 180
                },
                "instructor": { "id": "I3" },
                "group": { "id": "G2", "size": 35 }
            }
        ]
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/generate", &request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: Value = read_json(response).await;
    assert_eq!(report["unplaced"], json!([]));
    let placed = report["placed"].as_array().unwrap();
    assert_eq!(placed.len(), 3);
    assert_eq!(placed[0]["course"]["code"], "CS101L");
    assert_eq!(placed[0]["room"]["id"], "LAB1");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/audit"))
        .await
        .unwrap();
    let audit: Value = read_json(response).await;
    assert_eq!(audit["findings"], json!([]));

    let response = app
        .oneshot(empty_request("GET", "/entries"))
        .await
        .unwrap();
    let entries: Vec<ScheduleEntry> = read_json(response).await;
    assert_eq!(entries.len(), 4);
}
