use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::app::AppState;
use crate::auth::require_user;
use crate::error::DeskError;
use crate::storage::*;
use marketdesk_models::*;

fn task_not_found() -> DeskError {
    DeskError::NotFound("Task not found".into())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    identity: Identity,
    Query(filters): Query<TaskFilters>,
) -> Result<Json<Vec<Task>>, DeskError> {
    require_user(&identity)?;
    Ok(Json(state.storage.list_tasks(&filters)?))
}

pub async fn create_task(
    State(state): State<AppState>,
    identity: Identity,
    Json(input): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), DeskError> {
    let user_id = require_user(&identity)?;
    let task = state.storage.create_task(&input, user_id)?;
    tracing::info!(task_id = %task.id, user_id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<Task>, DeskError> {
    require_user(&identity)?;
    state
        .storage
        .get_task(&id)?
        .map(Json)
        .ok_or_else(task_not_found)
}

pub async fn update_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(input): Json<UpdateTask>,
) -> Result<Json<Task>, DeskError> {
    let user_id = require_user(&identity)?;
    let task = state
        .storage
        .update_task(&id, &input)?
        .ok_or_else(task_not_found)?;
    if input.status.is_some() {
        tracing::info!(task_id = %task.id, user_id, status = task.status.as_str(), "task status set");
    }
    Ok(Json(task))
}

pub async fn list_comments(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<Vec<TaskComment>>, DeskError> {
    require_user(&identity)?;
    state.storage.get_task(&id)?.ok_or_else(task_not_found)?;
    Ok(Json(state.storage.list_comments(&id)?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(input): Json<CreateComment>,
) -> Result<(StatusCode, Json<TaskComment>), DeskError> {
    let user_id = require_user(&identity)?;
    state.storage.get_task(&id)?.ok_or_else(task_not_found)?;
    let comment = state.storage.add_comment(&id, user_id, &input)?;
    Ok((StatusCode::CREATED, Json(comment)))
}
