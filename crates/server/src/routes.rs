//! Questionnaire lifecycle and admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use enquiry_agent::{AgentRuntime, ReplyKind, RuntimeError};
use enquiry_core::audit::AuditContext;
use enquiry_core::{
    ApplicationError, Character, CollectedSlots, DomainError, InterfaceError, SessionId,
    SessionStatus, Turn,
};
use enquiry_store::{RepositoryError, SessionRepository};

/// File types the client may attach alongside an answer.
pub const MEDIA_TYPES: [&str; 4] = ["png", "jpeg", "jpg", "pdf"];

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    runtime: Arc<AgentRuntime>,
    sessions: Arc<dyn SessionRepository>,
}

impl AppState {
    pub fn new(runtime: Arc<AgentRuntime>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self { runtime, sessions }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/questionnaires", post(start_questionnaire))
        .route("/questionnaires/{id}", get(get_questionnaire))
        .route("/questionnaires/{id}/messages", post(post_message))
        .route("/admin/characters", get(list_characters))
        .route("/admin/characters/reload", post(reload_characters))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub service: Option<String>,
    pub channel: Option<String>,
    #[serde(alias = "user_ref")]
    pub user_ref: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub id: String,
    pub service: String,
    pub character: String,
    pub next_question: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub id: String,
    pub asked_param: String,
    pub next_question: String,
    pub expected_format: String,
    pub parameter_label: String,
    pub options: Vec<String>,
    pub allow_multiple: bool,
    pub media_upload: bool,
    pub media_types: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPayload {
    pub id: String,
    pub status: &'static str,
    pub parameters: CollectedSlots,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageResponse {
    Question(QuestionPayload),
    Completed(CompletedPayload),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub service: String,
    pub character_id: String,
    pub channel: Option<String>,
    pub user_ref: Option<String>,
    pub status: SessionStatus,
    pub parameters: CollectedSlots,
    pub next_parameter: Option<String>,
    pub transcript: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub status: &'static str,
    pub count: usize,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    correlation_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: &'a str,
    correlation_id: &'a str,
}

impl ApiError {
    fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        let interface = error.into_interface(correlation_id);
        let status = match &interface {
            InterfaceError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: interface.user_message().to_owned(),
            correlation_id: interface.correlation_id().to_owned(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: &self.message, correlation_id: &self.correlation_id };
        (self.status, Json(body)).into_response()
    }
}

async fn start_questionnaire(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StartRequest>,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let correlation_id = correlation_id(&headers);
    let service = request
        .service
        .as_deref()
        .map(str::trim)
        .filter(|service| !service.is_empty())
        .ok_or_else(|| missing_field("service", &correlation_id))?;

    let start = state
        .runtime
        .start(service, request.channel, request.user_ref)
        .map_err(|error| runtime_error(error, &correlation_id))?;
    state
        .sessions
        .save(start.session.clone())
        .await
        .map_err(|error| store_error(error, &correlation_id))?;

    Ok((
        StatusCode::CREATED,
        Json(StartResponse {
            id: start.session.id.0,
            service: start.session.service,
            character: start.character_name,
            next_question: start.opening,
        }),
    ))
}

async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let session_id = SessionId(id);

    let _turn = state.sessions.lock_turn(&session_id).await;
    let session = load_session(&state, &session_id, &correlation_id).await?;
    let text = request
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| missing_field("text", &correlation_id))?;

    let audit =
        AuditContext::new(Some(session.id.clone()), session.channel.clone(), &correlation_id, "http");
    let reply = state
        .runtime
        .handle_message(&session, &text, &audit)
        .await
        .map_err(|error| runtime_error(error, &correlation_id))?;
    state
        .sessions
        .save(reply.session.clone())
        .await
        .map_err(|error| store_error(error, &correlation_id))?;

    let id = reply.session.id.0.clone();
    let response = match reply.kind {
        ReplyKind::Question { parameter, text } => MessageResponse::Question(QuestionPayload {
            id,
            asked_param: parameter.id,
            next_question: text,
            expected_format: parameter.expected_format.unwrap_or_default(),
            parameter_label: parameter.label,
            options: parameter.options,
            allow_multiple: parameter.allow_multiple,
            media_upload: true,
            media_types: MEDIA_TYPES.iter().map(|kind| (*kind).to_owned()).collect(),
        }),
        ReplyKind::Completed { .. } => MessageResponse::Completed(CompletedPayload {
            id,
            status: "completed",
            parameters: reply.session.parameters,
        }),
    };
    Ok(Json(response))
}

async fn get_questionnaire(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let session = load_session(&state, &SessionId(id), &correlation_id).await?;
    let next_parameter = if session.is_completed() {
        None
    } else {
        state.runtime.machine().next_parameter(&session).map(|parameter| parameter.id.clone())
    };

    Ok(Json(SessionView {
        id: session.id.0,
        service: session.service,
        character_id: session.character_id,
        channel: session.channel,
        user_ref: session.user_ref,
        status: session.status,
        parameters: session.parameters,
        next_parameter,
        transcript: session.transcript,
        created_at: session.created_at,
        updated_at: session.updated_at,
    }))
}

async fn list_characters(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Character>>, ApiError> {
    let correlation_id = correlation_id(&headers);
    state.runtime.characters().list().map(Json).map_err(|error| {
        error!(
            event_name = "admin.characters.list_failed",
            correlation_id = %correlation_id,
            error = %error,
            "character registry unavailable"
        );
        ApiError::from_application(ApplicationError::Configuration(error.to_string()), &correlation_id)
    })
}

async fn reload_characters(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReloadResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    match state.runtime.characters().reload() {
        Ok(count) => {
            info!(
                event_name = "admin.characters.reloaded",
                correlation_id = %correlation_id,
                count,
                "character registry reloaded"
            );
            Ok(Json(ReloadResponse { status: "reloaded", count }))
        }
        Err(error) => {
            error!(
                event_name = "admin.characters.reload_failed",
                correlation_id = %correlation_id,
                error = %error,
                "character registry reload failed"
            );
            Err(ApiError::from_application(
                ApplicationError::Configuration(error.to_string()),
                &correlation_id,
            ))
        }
    }
}

async fn load_session(
    state: &AppState,
    id: &SessionId,
    correlation_id: &str,
) -> Result<enquiry_core::DialogueSession, ApiError> {
    state
        .sessions
        .find_by_id(id)
        .await
        .map_err(|error| store_error(error, correlation_id))?
        .ok_or_else(|| {
            ApiError::from_application(DomainError::SessionNotFound(id.0.clone()).into(), correlation_id)
        })
}

fn missing_field(field: &'static str, correlation_id: &str) -> ApiError {
    ApiError::from_application(DomainError::MissingField(field).into(), correlation_id)
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4().simple()))
}

fn runtime_error(error: RuntimeError, correlation_id: &str) -> ApiError {
    let application = match error {
        RuntimeError::EmptyMessage => return missing_field("text", correlation_id),
        RuntimeError::UnknownService(service) => {
            ApplicationError::from(DomainError::UnknownService(service))
        }
        RuntimeError::Flow(flow) => ApplicationError::from(DomainError::FlowTransition(flow)),
        RuntimeError::Registry(registry) => ApplicationError::Configuration(registry.to_string()),
        RuntimeError::Generation(generation) => {
            ApplicationError::Integration(generation.to_string())
        }
    };

    warn!(
        event_name = "questionnaire.turn.failed",
        correlation_id = %correlation_id,
        error = %application,
        "turn could not be completed"
    );
    ApiError::from_application(application, correlation_id)
}

fn store_error(error: RepositoryError, correlation_id: &str) -> ApiError {
    error!(
        event_name = "questionnaire.store.failed",
        correlation_id = %correlation_id,
        error = %error,
        "session store failure"
    );
    ApiError::from_application(ApplicationError::Persistence(error.to_string()), correlation_id)
}
