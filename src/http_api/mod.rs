use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Weekday;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    ConflictFinding, ConflictReason, GenerationReport, GenerationRequest, ScheduleEntry,
    ScheduleEntryDraft, SlotPosition, TimeOfDay, Timetable, TimetableError, TimetableMetadata,
    TimetableStore, TimetableSummary, ValidationOutcome, conflict, generator,
};

pub type SharedStore = Arc<dyn TimetableStore + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    timetable: Arc<RwLock<Timetable>>,
    store: Option<SharedStore>,
}

impl AppState {
    pub fn new(timetable: Timetable) -> Self {
        Self {
            timetable: Arc::new(RwLock::new(timetable)),
            store: None,
        }
    }

    /// Committed changes are written to `store` while the write lock is
    /// still held, so snapshots land in commit order.
    pub fn with_store(timetable: Timetable, store: SharedStore) -> Self {
        Self {
            store: Some(store),
            ..Self::new(timetable)
        }
    }

    fn timetable(&self) -> Arc<RwLock<Timetable>> {
        self.timetable.clone()
    }

    fn persist(&self, timetable: &Timetable) -> Result<(), ApiError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.save_timetable(timetable).map_err(|err| {
            error!(error = %err, revision = timetable.revision(), "timetable snapshot not saved");
            ApiError::internal(format!("change applied but not saved: {err}"))
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<ConflictReason>,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Rejected(ConflictReason),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<TimetableError> for ApiError {
    fn from(value: TimetableError) -> Self {
        match value {
            TimetableError::Rejected(reason) => ApiError::Rejected(reason),
            TimetableError::DuplicateId(_) | TimetableError::StaleRevision { .. } => {
                ApiError::Conflict(value.to_string())
            }
            TimetableError::NotFound(_) => ApiError::NotFound(value.to_string()),
            TimetableError::Frame(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message, reason) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message, None),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message, None),
            ApiError::Rejected(reason) => {
                let status = match reason {
                    ConflictReason::InvalidTimeFormat | ConflictReason::MalformedEntry => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => StatusCode::CONFLICT,
                };
                (status, "rejected", reason.message().to_string(), Some(reason))
            }
            ApiError::Invalid(message) => {
                (StatusCode::BAD_REQUEST, "invalid_request", message, None)
            }
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                None,
            ),
        };
        let body = Json(ErrorBody {
            error,
            message,
            reason,
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct NextSlotPayload {
    day: Weekday,
    time: TimeOfDay,
    duration_minutes: u16,
}

#[derive(Debug, Serialize)]
struct NextSlotResponse {
    next: Option<SlotPosition>,
    exhausted: bool,
}

#[derive(Debug, Serialize)]
struct AuditResponse {
    findings: Vec<ConflictFinding>,
    clusters: Vec<Vec<String>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metadata", get(get_metadata).put(update_metadata))
        .route("/entries", get(list_entries).post(create_entry))
        .route(
            "/entries/:id",
            get(get_entry).put(replace_entry).delete(delete_entry),
        )
        .route("/validate", post(validate_entry))
        .route("/audit", get(audit))
        .route("/summary", get(summary))
        .route("/next-slot", post(next_slot))
        .route("/generate", post(generate_timetable))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_metadata(State(state): State<AppState>) -> Json<TimetableMetadata> {
    let timetable = state.timetable();
    let metadata = {
        let guard = timetable.read();
        guard.metadata().clone()
    };
    Json(metadata)
}

async fn update_metadata(
    State(state): State<AppState>,
    Json(metadata): Json<TimetableMetadata>,
) -> Result<Json<TimetableMetadata>, ApiError> {
    let timetable = state.timetable();
    let current = {
        let mut guard = timetable.write();
        guard
            .set_metadata(metadata)
            .map_err(|err| ApiError::invalid(err.to_string()))?;
        state.persist(&guard)?;
        guard.metadata().clone()
    };
    Ok(Json(current))
}

async fn list_entries(State(state): State<AppState>) -> Json<Vec<ScheduleEntry>> {
    let timetable = state.timetable();
    let entries = {
        let guard = timetable.read();
        guard.entries().into_iter().cloned().collect()
    };
    Json(entries)
}

async fn get_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<ScheduleEntry>, ApiError> {
    let timetable = state.timetable();
    let entry = {
        let guard = timetable.read();
        guard.get(&entry_id).cloned()
    };
    entry
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("entry {entry_id} not found")))
}

async fn create_entry(
    State(state): State<AppState>,
    Json(draft): Json<ScheduleEntryDraft>,
) -> Result<(StatusCode, Json<ScheduleEntry>), ApiError> {
    let entry = draft.into_entry().map_err(ApiError::Rejected)?;
    let timetable = state.timetable();
    {
        let mut guard = timetable.write();
        if let Err(err) = guard.insert(entry.clone()) {
            warn!(entry_id = %entry.id, error = %err, "entry not committed");
            return Err(ApiError::from(err));
        }
        state.persist(&guard)?;
    }
    info!(entry_id = %entry.id, day = %entry.day, slot = %entry.slot, "entry committed");
    let created = {
        let guard = timetable.read();
        guard
            .get(&entry.id)
            .cloned()
            .ok_or_else(|| ApiError::internal("entry not found after creation"))?
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn replace_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Json(mut draft): Json<ScheduleEntryDraft>,
) -> Result<Json<ScheduleEntry>, ApiError> {
    match draft.id.as_deref() {
        Some(id) if id != entry_id => {
            return Err(ApiError::invalid(
                "entry id in payload does not match path parameter",
            ));
        }
        _ => draft.id = Some(entry_id.clone()),
    }
    let entry = draft.into_entry().map_err(ApiError::Rejected)?;
    let timetable = state.timetable();
    {
        let mut guard = timetable.write();
        if let Err(err) = guard.replace(entry.clone()) {
            warn!(entry_id = %entry_id, error = %err, "entry not replaced");
            return Err(ApiError::from(err));
        }
        state.persist(&guard)?;
    }
    info!(entry_id = %entry_id, day = %entry.day, slot = %entry.slot, "entry replaced");
    Ok(Json(entry))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let timetable = state.timetable();
    let removed = {
        let mut guard = timetable.write();
        let removed = guard.remove(&entry_id);
        if removed.is_some() {
            state.persist(&guard)?;
        }
        removed
    };
    if removed.is_none() {
        return Err(ApiError::not_found(format!("entry {entry_id} not found")));
    }
    info!(entry_id = %entry_id, "entry removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn validate_entry(
    State(state): State<AppState>,
    Json(draft): Json<ScheduleEntryDraft>,
) -> Json<ValidationOutcome> {
    let timetable = state.timetable();
    let result = {
        let guard = timetable.read();
        conflict::validate_draft(draft, &*guard).map(|_| ())
    };
    Json(ValidationOutcome::from(result))
}

async fn audit(State(state): State<AppState>) -> Json<AuditResponse> {
    let timetable = state.timetable();
    let response = {
        let guard = timetable.read();
        AuditResponse {
            findings: guard.audit(),
            clusters: guard.conflict_clusters(),
        }
    };
    Json(response)
}

async fn summary(State(state): State<AppState>) -> Result<Json<TimetableSummary>, ApiError> {
    let timetable = state.timetable();
    let summary = {
        let guard = timetable.read();
        guard.summary()?
    };
    Ok(Json(summary))
}

async fn next_slot(
    State(state): State<AppState>,
    Json(payload): Json<NextSlotPayload>,
) -> Json<NextSlotResponse> {
    let timetable = state.timetable();
    let next = {
        let guard = timetable.read();
        guard
            .week()
            .next_slot(SlotPosition::new(payload.day, payload.time), payload.duration_minutes)
    };
    Json(NextSlotResponse {
        next,
        exhausted: next.is_none(),
    })
}

async fn generate_timetable(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationReport>, ApiError> {
    let timetable = state.timetable();
    let report = {
        let mut guard = timetable.write();
        let before = guard.revision();
        let report = generator::generate(&mut guard, &request);
        if guard.revision() != before {
            state.persist(&guard)?;
        }
        report
    };
    for session in &report.unplaced {
        warn!(
            course = %session.course,
            group = %session.group,
            session = session.session,
            reason = %session.reason,
            "session not placed"
        );
    }
    info!(
        placed = report.placed.len(),
        unplaced = report.unplaced.len(),
        "timetable generated"
    );
    Ok(Json(report))
}
