//! Route handlers for the webhook and admin/test endpoints.

use crate::task::domain::{GithubLogin, RepositoryName};
use crate::task::ports::{ForgeError, RepositoryForge, TaskStore};
use crate::webhook::{SIGNATURE_HEADER, WebhookOutcome, WebhookService};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Json;
use mockable::Clock;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared state behind every route.
pub struct AppState<S, F, C>
where
    S: TaskStore,
    F: RepositoryForge,
    C: Clock + Send + Sync,
{
    /// Webhook ingestion service.
    pub webhook: WebhookService<S, C>,
    /// Forge used by the admin/test endpoints.
    pub forge: Arc<F>,
}

/// Builds the application router.
pub fn router<S, F, C>(state: Arc<AppState<S, F, C>>) -> Router
where
    S: TaskStore + 'static,
    F: RepositoryForge + 'static,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/api/webhooks/github", post(github_webhook::<S, F, C>))
        .route(
            "/api/test/github-connection",
            post(test_github_connection::<S, F, C>),
        )
        .route(
            "/api/test/github-repository",
            post(test_github_repository::<S, F, C>),
        )
        .with_state(state)
}

async fn github_webhook<S, F, C>(
    State(state): State<Arc<AppState<S, F, C>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: TaskStore + 'static,
    F: RepositoryForge + 'static,
    C: Clock + Send + Sync + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = state.webhook.handle(signature, &body).await;

    let (status, payload) = match outcome {
        WebhookOutcome::Flipped {
            task_id,
            pull_request_number,
        } => (
            StatusCode::OK,
            json!({
                "status": "pending_approval",
                "task_id": task_id,
                "pull_request_number": pull_request_number,
            }),
        ),
        WebhookOutcome::AlreadyPending { task_id } => (
            StatusCode::OK,
            json!({ "status": "already_pending", "task_id": task_id }),
        ),
        WebhookOutcome::Ignored(reason) => (
            StatusCode::OK,
            json!({ "status": "ignored", "reason": format!("{reason:?}") }),
        ),
        WebhookOutcome::InvalidSignature => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": "invalid signature" }),
        ),
        WebhookOutcome::AuthorMismatch { expected, actual } => (
            StatusCode::FORBIDDEN,
            json!({
                "error": "pull request author does not match assigned developer",
                "expected": expected,
                "actual": actual,
            }),
        ),
        WebhookOutcome::UnknownTask(message) => {
            (StatusCode::NOT_FOUND, json!({ "error": message }))
        }
        WebhookOutcome::StoreFailure(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": message }),
        ),
    };
    (status, Json(payload)).into_response()
}

async fn test_github_connection<S, F, C>(
    State(state): State<Arc<AppState<S, F, C>>>,
) -> Response
where
    S: TaskStore + 'static,
    F: RepositoryForge + 'static,
    C: Clock + Send + Sync + 'static,
{
    match state.forge.verify_connection().await {
        Ok(login) => (
            StatusCode::OK,
            Json(json!({ "connected": true, "login": login })),
        )
            .into_response(),
        Err(err) => forge_error_response(&err),
    }
}

/// Actions supported by the repository test endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum TestAction {
    Create,
    Check,
    AddCollaborator,
    RemoveCollaborator,
    Delete,
}

/// Task metadata accepted by the create action.
#[derive(Debug, Clone, Default, Deserialize)]
struct TestTaskData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

/// Request body of the repository test endpoint.
#[derive(Debug, Deserialize)]
struct TestRepositoryRequest {
    action: TestAction,
    repository_name: String,
    #[serde(default)]
    task_data: Option<TestTaskData>,
    #[serde(default)]
    developer_username: Option<String>,
}

async fn test_github_repository<S, F, C>(
    State(state): State<Arc<AppState<S, F, C>>>,
    Json(request): Json<TestRepositoryRequest>,
) -> Response
where
    S: TaskStore + 'static,
    F: RepositoryForge + 'static,
    C: Clock + Send + Sync + 'static,
{
    let name = match RepositoryName::new(request.repository_name.clone()) {
        Ok(name) => name,
        Err(err) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response();
        }
    };

    let result: Result<Value, ForgeError> = match request.action {
        TestAction::Create => {
            let task_data = request.task_data.unwrap_or_default();
            let description = if task_data.description.is_empty() {
                task_data.title
            } else {
                task_data.description
            };
            state
                .forge
                .create_repository(&name, &description)
                .await
                .map(|created| {
                    json!({
                        "created": true,
                        "repository": created.name,
                        "url": created.url,
                        "github_repo_id": created.github_repo_id,
                    })
                })
        }
        TestAction::Check => state
            .forge
            .repository_exists(&name)
            .await
            .map(|exists| json!({ "exists": exists })),
        TestAction::AddCollaborator => match parse_login(request.developer_username) {
            Ok(login) => state
                .forge
                .add_collaborator(&name, &login)
                .await
                .map(|()| json!({ "collaborator_added": login })),
            Err(response) => return response,
        },
        TestAction::RemoveCollaborator => match parse_login(request.developer_username) {
            Ok(login) => state
                .forge
                .remove_collaborator(&name, &login)
                .await
                .map(|()| json!({ "collaborator_removed": login })),
            Err(response) => return response,
        },
        TestAction::Delete => state
            .forge
            .delete_repository(&name)
            .await
            .map(|()| json!({ "deleted": true })),
    };

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => forge_error_response(&err),
    }
}

fn parse_login(raw: Option<String>) -> Result<GithubLogin, Response> {
    let Some(value) = raw else {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "developer_username is required for this action" })),
        )
            .into_response());
    };
    GithubLogin::new(value).map_err(|err| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response()
    })
}

fn forge_error_response(err: &ForgeError) -> Response {
    let status = match err {
        ForgeError::Permission(_) => StatusCode::FORBIDDEN,
        ForgeError::NotFound(_) => StatusCode::NOT_FOUND,
        ForgeError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ForgeError::Network(_) => StatusCode::BAD_GATEWAY,
        ForgeError::Api { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
