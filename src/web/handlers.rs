//! HTTP request handlers.

use super::AppState;
use crate::check::CheckOutcome;
use crate::db::{
    DbError, HistoryEntry, IdeaStatus, IdeaUpdate, Lane, NewIdea, NewTicket, Priority,
    TicketUpdate,
};
use crate::gpu::GpuSweep;
use crate::uptime::{self, Segment};

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_HISTORY_HOURS: i64 = 24;
const DEFAULT_ALERT_LIMIT: i64 = 50;

fn internal_error(e: DbError) -> Response {
    tracing::error!("Storage error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
        .into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("{} not found", what)})),
    )
        .into_response()
}

fn validation_errors(errors: Vec<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"errors": errors}))).into_response()
}

// ============================================================================
// Health
// ============================================================================

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok", "timestamp": Utc::now()}))
}

// ============================================================================
// Services
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<CheckOutcome>,
    pub cached: bool,
}

pub async fn handle_get_services(State(state): State<AppState>) -> impl IntoResponse {
    let (services, cached) = state.monitor.services().await;
    Json(ServicesResponse { services, cached })
}

pub async fn handle_get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.monitor.check_one(&id).await {
        Some(outcome) => Json(outcome).into_response(),
        None => not_found("Service"),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub service_id: String,
    pub service_name: String,
    pub hours: i64,
    pub entries: usize,
    pub history: Vec<HistoryEntry>,
}

pub async fn handle_get_service_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let Some(target) = state.monitor.registry().get(&id) else {
        return not_found("Service");
    };
    let hours = query.hours.unwrap_or(DEFAULT_HISTORY_HOURS).clamp(1, 168);

    match state.monitor.store().history(&id, hours) {
        Ok(history) => Json(HistoryResponse {
            service_id: id,
            service_name: target.display_name.clone(),
            hours,
            entries: history.len(),
            history,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeResponse {
    pub service_id: String,
    pub service_name: String,
    pub hours: i64,
    pub percent_up: Option<f64>,
    pub segments: Vec<Segment>,
}

pub async fn handle_get_service_uptime(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let Some(target) = state.monitor.registry().get(&id) else {
        return not_found("Service");
    };
    let hours = query.hours.unwrap_or(DEFAULT_HISTORY_HOURS).clamp(1, 168);

    match state.monitor.store().history(&id, hours) {
        Ok(history) => {
            let summary = uptime::summarize(&history);
            Json(UptimeResponse {
                service_id: id,
                service_name: target.display_name.clone(),
                hours,
                percent_up: summary.percent_up,
                segments: summary.segments,
            })
            .into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// GPU
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GpuResponse {
    #[serde(flatten)]
    pub sweep: GpuSweep,
    pub cached: bool,
}

pub async fn handle_get_gpu(State(state): State<AppState>) -> impl IntoResponse {
    let (sweep, cached) = state.monitor.gpu().await;
    Json(GpuResponse { sweep, cached })
}

// ============================================================================
// Alerts & agents
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<i64>,
    pub service: Option<String>,
}

pub async fn handle_get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT).max(1);
    let result = match &query.service {
        Some(service) => state.monitor.store().alerts_for_target(service, limit),
        None => state.monitor.store().recent_alerts(limit),
    };

    match result {
        Ok(alerts) => {
            let count = alerts.len();
            Json(json!({"alerts": alerts, "count": count})).into_response()
        }
        Err(e) => internal_error(e),
    }
}

pub async fn handle_get_agents(State(state): State<AppState>) -> Response {
    match state.monitor.store().agents() {
        Ok(agents) => Json(json!({"agents": agents})).into_response(),
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Tickets
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TicketsQuery {
    pub lane: Option<String>,
    pub assignee: Option<String>,
}

pub async fn handle_list_tickets(
    State(state): State<AppState>,
    Query(query): Query<TicketsQuery>,
) -> Response {
    match state
        .monitor
        .store()
        .list_tickets(query.lane.as_deref(), query.assignee.as_deref())
    {
        Ok(tickets) => {
            let total = tickets.len();
            Json(json!({"tickets": tickets, "total": total})).into_response()
        }
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lane: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub branch: Option<String>,
}

fn parse_lane(raw: &Option<String>, errors: &mut Vec<String>) -> Option<Lane> {
    let raw = raw.as_deref()?;
    match Lane::parse(raw) {
        Some(lane) => Some(lane),
        None => {
            errors.push(format!("Lane must be one of: {}", Lane::VARIANTS.join(", ")));
            None
        }
    }
}

fn parse_priority(raw: &Option<String>, errors: &mut Vec<String>) -> Option<Priority> {
    let raw = raw.as_deref()?;
    match Priority::parse(raw) {
        Some(priority) => Some(priority),
        None => {
            errors.push(format!(
                "Priority must be one of: {}",
                Priority::VARIANTS.join(", ")
            ));
            None
        }
    }
}

pub async fn handle_create_ticket(
    State(state): State<AppState>,
    Json(req): Json<TicketRequest>,
) -> Response {
    let mut errors = Vec::new();

    let title = req.title.unwrap_or_default().trim().to_string();
    if title.is_empty() {
        errors.push("Title is required".to_string());
    }
    let lane = parse_lane(&req.lane, &mut errors).unwrap_or(Lane::Backlog);
    let priority = parse_priority(&req.priority, &mut errors).unwrap_or(Priority::Medium);

    if !errors.is_empty() {
        return validation_errors(errors);
    }

    let new = NewTicket {
        title,
        description: req.description.unwrap_or_default(),
        lane,
        priority,
        assignee: req.assignee,
        branch: req.branch,
    };

    match state.monitor.store().create_ticket(&new) {
        Ok(ticket) => (StatusCode::CREATED, Json(ticket)).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_get_ticket(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.monitor.store().get_ticket(&id) {
        Ok(Some(ticket)) => Json(ticket).into_response(),
        Ok(None) => not_found("Ticket"),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_update_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TicketRequest>,
) -> Response {
    let mut errors = Vec::new();

    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            errors.push("Title cannot be empty".to_string());
        }
    }
    let lane = parse_lane(&req.lane, &mut errors);
    let priority = parse_priority(&req.priority, &mut errors);

    if !errors.is_empty() {
        return validation_errors(errors);
    }

    let update = TicketUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        lane,
        priority,
        assignee: req.assignee,
        branch: req.branch,
    };

    match state.monitor.store().update_ticket(&id, &update) {
        Ok(Some(ticket)) => Json(ticket).into_response(),
        Ok(None) => not_found("Ticket"),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.monitor.store().delete_ticket(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("Ticket"),
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Ideas
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IdeasQuery {
    pub status: Option<String>,
    pub tag: Option<String>,
}

pub async fn handle_list_ideas(
    State(state): State<AppState>,
    Query(query): Query<IdeasQuery>,
) -> Response {
    match state
        .monitor
        .store()
        .list_ideas(query.status.as_deref(), query.tag.as_deref())
    {
        Ok(ideas) => {
            let total = ideas.len();
            Json(json!({"ideas": ideas, "total": total})).into_response()
        }
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IdeaRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(alias = "submittedBy")]
    pub submitted_by: Option<String>,
}

fn parse_idea_status(raw: &Option<String>, errors: &mut Vec<String>) -> Option<IdeaStatus> {
    let raw = raw.as_deref()?;
    match IdeaStatus::parse(raw) {
        Some(status) => Some(status),
        None => {
            errors.push(format!(
                "Status must be one of: {}",
                IdeaStatus::VARIANTS.join(", ")
            ));
            None
        }
    }
}

pub async fn handle_create_idea(
    State(state): State<AppState>,
    Json(req): Json<IdeaRequest>,
) -> Response {
    let mut errors = Vec::new();

    let title = req.title.unwrap_or_default().trim().to_string();
    if title.len() < 3 {
        errors.push("Title must be at least 3 characters".to_string());
    }
    let status = parse_idea_status(&req.status, &mut errors).unwrap_or(IdeaStatus::Proposed);

    if !errors.is_empty() {
        return validation_errors(errors);
    }

    let new = NewIdea {
        title,
        description: req.description.unwrap_or_default(),
        status,
        tags: req.tags.unwrap_or_default(),
        submitted_by: req.submitted_by.unwrap_or_else(|| "anonymous".to_string()),
    };

    match state.monitor.store().create_idea(&new) {
        Ok(idea) => (StatusCode::CREATED, Json(idea)).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_get_idea(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.monitor.store().get_idea(&id) {
        Ok(Some(idea)) => Json(idea).into_response(),
        Ok(None) => not_found("Idea"),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_update_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<IdeaRequest>,
) -> Response {
    let mut errors = Vec::new();

    if let Some(title) = &req.title {
        if title.trim().len() < 3 {
            errors.push("Title must be at least 3 characters".to_string());
        }
    }
    let status = parse_idea_status(&req.status, &mut errors);

    if !errors.is_empty() {
        return validation_errors(errors);
    }

    let update = IdeaUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        status,
        tags: req.tags,
        submitted_by: req.submitted_by,
    };

    match state.monitor.store().update_idea(&id, &update) {
        Ok(Some(idea)) => Json(idea).into_response(),
        Ok(None) => not_found("Idea"),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_delete_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.monitor.store().delete_idea(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("Idea"),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_convert_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.monitor.store().convert_idea(&id) {
        Ok(ticket) => (StatusCode::CREATED, Json(json!({"ticket": ticket}))).into_response(),
        Err(DbError::NotFound) => not_found("Idea"),
        Err(DbError::Conflict(msg)) => {
            (StatusCode::CONFLICT, Json(json!({"error": msg}))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Fallback
// ============================================================================

pub async fn handle_api_fallback(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}
