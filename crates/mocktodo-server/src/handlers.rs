use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use mocktodo_auth::{AuthError, MaybePrincipal, http::json_body};
use mocktodo_storage::{ANONYMOUS_USER_ID, NewTask, RecordSet, Task};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::AppState;

/// Body of `POST /tasks` and `PUT /tasks/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub title: String,
}

/// Resolves the acting user. `None` means owner checks are skipped.
fn acting_user(state: &AppState, principal: MaybePrincipal) -> Result<Option<i64>, ApiError> {
    if !state.auth_required {
        return Ok(None);
    }
    principal
        .0
        .map(|p| Some(p.user_id))
        .ok_or_else(|| AuthError::unauthorized("User not authenticated").into())
}

fn parse_task_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::bad_request("Invalid task ID"))
}

/// Loads a task and checks it belongs to `user` when one is given.
async fn load_owned_task(state: &AppState, id: i64, user: Option<i64>) -> Result<Task, ApiError> {
    let task = state
        .stores
        .tasks
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    if let Some(user_id) = user
        && !task.is_owned_by(user_id)
    {
        return Err(ApiError::forbidden("Access denied"));
    }
    Ok(task)
}

pub async fn list_tasks(
    State(state): State<AppState>,
    principal: MaybePrincipal,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = match acting_user(&state, principal)? {
        Some(user_id) => state.stores.tasks.list_by_owner(user_id).await?,
        None => state.stores.tasks.list().await?,
    };
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = acting_user(&state, principal)?.unwrap_or(ANONYMOUS_USER_ID);
    let request = json_body(body)?;

    let task = state
        .stores
        .tasks
        .create(NewTask::new(request.title, owner))
        .await?;
    tracing::debug!(task_id = task.id, owner, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    let user = acting_user(&state, principal)?;
    Ok(Json(load_owned_task(&state, id, user).await?))
}

/// Replaces the title. With auth the owner stays the caller; without auth
/// the stored owner is kept.
pub async fn update_task(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<String>,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    let user = acting_user(&state, principal)?;
    let existing = load_owned_task(&state, id, user).await?;
    let request = json_body(body)?;

    let owner = user.unwrap_or(existing.owner_user_id);
    let task = state
        .stores
        .tasks
        .update(id, NewTask::new(request.title, owner))
        .await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_task_id(&id)?;
    let user = acting_user(&state, principal)?;
    if user.is_some() {
        load_owned_task(&state, id, user).await?;
    }

    state.stores.tasks.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /internal/memory-state`: every task and user, hashes included.
pub async fn memory_state(State(state): State<AppState>) -> Result<Json<RecordSet>, ApiError> {
    Ok(Json(state.stores.snapshot().await?))
}
