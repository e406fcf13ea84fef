use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AnswerMap, FlowId, FlowInstanceId, SessionHandle, WizardError};
use super::repository::{ResultStore, StoreError};
use super::service::{WizardService, WizardServiceError};

/// Body accepted by the submission endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub session: Option<SessionHandle>,
    #[serde(default)]
    pub answers: AnswerMap,
}

impl SubmissionRequest {
    fn into_parts(self) -> (SessionHandle, AnswerMap) {
        (
            self.session.unwrap_or_else(SessionHandle::anonymous),
            self.answers,
        )
    }
}

/// Body accepted when a student cancels a booking.
#[derive(Debug, Clone, Deserialize)]
pub struct CancellationRequest {
    pub owner: SessionHandle,
}

/// Router builder exposing catalog discovery, submissions, and stored results.
pub fn wizard_router<S>(service: Arc<WizardService<S>>) -> Router
where
    S: ResultStore + 'static,
{
    Router::new()
        .route("/api/v1/assessments", get(catalogs_handler::<S>))
        .route("/api/v1/assessments/:flow_id", get(catalog_handler::<S>))
        .route(
            "/api/v1/assessments/:flow_id/submissions",
            post(assessment_handler::<S>),
        )
        .route("/api/v1/bookings", post(booking_handler::<S>))
        .route(
            "/api/v1/bookings/:instance_id/cancel",
            put(cancel_booking_handler::<S>),
        )
        .route(
            "/api/v1/students/:user_id/bookings",
            get(student_bookings_handler::<S>),
        )
        .route("/api/v1/results/:instance_id", get(result_handler::<S>))
        .with_state(service)
}

pub(crate) async fn catalogs_handler<S>(State(service): State<Arc<WizardService<S>>>) -> Response
where
    S: ResultStore + 'static,
{
    (StatusCode::OK, axum::Json(service.catalogs())).into_response()
}

pub(crate) async fn catalog_handler<S>(
    State(service): State<Arc<WizardService<S>>>,
    Path(flow_id): Path<String>,
) -> Response
where
    S: ResultStore + 'static,
{
    match service.catalog(&FlowId(flow_id)) {
        Ok(catalog) => (StatusCode::OK, axum::Json(catalog.as_ref().clone())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assessment_handler<S>(
    State(service): State<Arc<WizardService<S>>>,
    Path(flow_id): Path<String>,
    axum::Json(request): axum::Json<SubmissionRequest>,
) -> Response
where
    S: ResultStore + 'static,
{
    let (owner, answers) = request.into_parts();
    match service.submit_assessment(&FlowId(flow_id), owner, answers) {
        Ok(presentation) => (StatusCode::ACCEPTED, axum::Json(presentation)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn booking_handler<S>(
    State(service): State<Arc<WizardService<S>>>,
    axum::Json(request): axum::Json<SubmissionRequest>,
) -> Response
where
    S: ResultStore + 'static,
{
    let (owner, answers) = request.into_parts();
    match service.submit_booking(owner, answers) {
        Ok(presentation) => (StatusCode::ACCEPTED, axum::Json(presentation)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn result_handler<S>(
    State(service): State<Arc<WizardService<S>>>,
    Path(instance_id): Path<String>,
) -> Response
where
    S: ResultStore + 'static,
{
    match service.result(&FlowInstanceId(instance_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_booking_handler<S>(
    State(service): State<Arc<WizardService<S>>>,
    Path(instance_id): Path<String>,
    axum::Json(request): axum::Json<CancellationRequest>,
) -> Response
where
    S: ResultStore + 'static,
{
    match service.cancel_booking(&FlowInstanceId(instance_id), &request.owner) {
        Ok(record) => (StatusCode::OK, axum::Json(record.booking_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn student_bookings_handler<S>(
    State(service): State<Arc<WizardService<S>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: ResultStore + 'static,
{
    match service.bookings_for(&user_id) {
        Ok(schedule) => (StatusCode::OK, axum::Json(schedule)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: WizardServiceError) -> Response {
    let status = match &err {
        WizardServiceError::Wizard(WizardError::UnknownFlow(_))
        | WizardServiceError::Wizard(WizardError::FlowKindMismatch { .. })
        | WizardServiceError::Wizard(WizardError::NotABooking(_))
        | WizardServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        WizardServiceError::Wizard(WizardError::NotOwner(_)) => StatusCode::FORBIDDEN,
        WizardServiceError::Wizard(WizardError::AlreadyCancelled(_)) => StatusCode::CONFLICT,
        WizardServiceError::Wizard(WizardError::InvalidConfiguration(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        WizardServiceError::Wizard(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WizardServiceError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        WizardServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let mut payload = json!({ "error": err.to_string() });
    if let WizardServiceError::Wizard(WizardError::IncompleteFlow { missing }) = &err {
        payload["missing_steps"] = json!(missing);
    }
    (status, axum::Json(payload)).into_response()
}
