use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::assignment::BankDirectory;
use super::domain::{Actor, ApplicationId, ApplicationState, CallerContext};
use super::repository::{LendingRepository, RepositoryError};
use super::service::{
    ApplicationSubmission, ApplicationUpdate, LendingWorkflowService, WorkflowError,
};

#[derive(Debug, Deserialize)]
pub(crate) struct CreateApplicationRequest {
    pub(crate) actor: Actor,
    pub(crate) submission: ApplicationSubmission,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) actor: Actor,
    pub(crate) bank_product_id: String,
    pub(crate) branch_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) actor: Actor,
    pub(crate) target: ApplicationState,
    #[serde(default)]
    pub(crate) comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateRequest {
    pub(crate) actor: Actor,
    pub(crate) update: ApplicationUpdate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorRequest {
    pub(crate) actor: Actor,
}

/// Router builder exposing the pipeline operations to UI and reporting
/// collaborators.
pub fn application_router<R, D>(service: Arc<LendingWorkflowService<R, D>>) -> Router
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    Router::new()
        .route("/api/v1/lending/applications", post(create_handler::<R, D>))
        .route(
            "/api/v1/lending/applications/:application_id",
            get(status_handler::<R, D>)
                .patch(update_handler::<R, D>)
                .delete(delete_handler::<R, D>),
        )
        .route(
            "/api/v1/lending/applications/:application_id/assignment",
            post(assign_handler::<R, D>).get(assignment_handler::<R, D>),
        )
        .route(
            "/api/v1/lending/applications/:application_id/transition",
            post(transition_handler::<R, D>),
        )
        .route(
            "/api/v1/lending/applications/:application_id/integrity",
            get(integrity_handler::<R, D>),
        )
        .route(
            "/api/v1/lending/applications/:application_id/audit",
            get(audit_handler::<R, D>),
        )
        .with_state(service)
}

fn caller_context(headers: &HeaderMap) -> CallerContext {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };

    CallerContext {
        ip: header_text("x-forwarded-for"),
        user_agent: header_text("user-agent"),
    }
}

fn error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::Validation(_) | WorkflowError::ReferenceNotFound { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::InvalidTransition { .. } | WorkflowError::AlreadyAssigned(_) => {
            StatusCode::CONFLICT
        }
        WorkflowError::ImmutableRecord(_) => StatusCode::LOCKED,
        WorkflowError::ApplicationNotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::RoleDenied { .. } => StatusCode::FORBIDDEN,
        WorkflowError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        WorkflowError::Repository(
            RepositoryError::Conflict | RepositoryError::StaleState { .. },
        ) => StatusCode::CONFLICT,
        WorkflowError::Repository(RepositoryError::Unavailable(_))
        | WorkflowError::Integrity(_)
        | WorkflowError::TransactionId(_)
        | WorkflowError::AuditSnapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = axum::Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}

pub(crate) async fn create_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CreateApplicationRequest>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let context = caller_context(&headers);
    match service.create(request.submission, request.actor, context) {
        Ok(application) => {
            (StatusCode::CREATED, axum::Json(application.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(application) => {
            (StatusCode::OK, axum::Json(application.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assign_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<AssignRequest>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let id = ApplicationId(application_id);
    let context = caller_context(&headers);
    match service.assign_to_branch(
        &id,
        &request.bank_product_id,
        &request.branch_id,
        request.actor,
        context,
    ) {
        Ok(assignment) => (StatusCode::CREATED, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assignment_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let id = ApplicationId(application_id);
    match service.assignment_for(&id) {
        Ok(Some(assignment)) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Ok(None) => {
            let body = axum::Json(json!({ "error": "application has no branch assignment" }));
            (StatusCode::NOT_FOUND, body).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let id = ApplicationId(application_id);
    let context = caller_context(&headers);
    match service.transition(&id, request.target, request.actor, request.comments, context) {
        Ok(application) => {
            (StatusCode::OK, axum::Json(application.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<UpdateRequest>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let id = ApplicationId(application_id);
    let context = caller_context(&headers);
    match service.update_fields(&id, request.update, request.actor, context) {
        Ok(application) => {
            (StatusCode::OK, axum::Json(application.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let id = ApplicationId(application_id);
    let context = caller_context(&headers);
    match service.delete(&id, request.actor, context) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn integrity_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let id = ApplicationId(application_id);
    match service.verify_integrity(&id) {
        // A mismatch is an audit finding carried in the body, not a request
        // failure; the caller checks `is_valid`.
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn audit_handler<R, D>(
    State(service): State<Arc<LendingWorkflowService<R, D>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: LendingRepository + 'static,
    D: BankDirectory + 'static,
{
    let id = ApplicationId(application_id);
    match service.audit_trail(&id) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}
