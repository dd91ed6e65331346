//! Task endpoints, keyed by calendar date

use axum::{
    extract::{Path, State},
    routing::{patch, post},
    Json, Router,
};
use serde::Serialize;

use crate::application::commands::{self, NewTask};
use crate::domain::models::{Task, TaskPatch};
use crate::http::routes::AppError;
use crate::http::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/schedules/{date}/tasks", post(create_task))
        .route(
            "/api/schedules/{date}/tasks/{id}",
            patch(update_task).delete(delete_task),
        )
        .route("/api/schedules/{date}/tasks/{id}/toggle", post(toggle_task))
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: Option<Task>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub completed: Option<bool>,
}

/// POST /api/schedules/{date}/tasks - Append a task to a day
async fn create_task(
    State(state): State<SharedState>,
    Path(date): Path<String>,
    Json(request): Json<NewTask>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = commands::add_task(&state, &date, request)
        .map_err(|error| state.command_error("add_task", error))?;
    Ok(Json(TaskResponse { task: Some(task) }))
}

/// PATCH /api/schedules/{date}/tasks/{id} - `task` is null for unknown ids
async fn update_task(
    State(state): State<SharedState>,
    Path((date, task_id)): Path<(String, String)>,
    Json(request): Json<TaskPatch>,
) -> Result<Json<TaskResponse>, AppError> {
    let task = commands::update_task(&state, &date, &task_id, request)
        .map_err(|error| state.command_error("update_task", error))?;
    Ok(Json(TaskResponse { task }))
}

async fn delete_task(
    State(state): State<SharedState>,
    Path((date, task_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = commands::delete_task(&state, &date, &task_id)
        .map_err(|error| state.command_error("delete_task", error))?;
    Ok(Json(DeleteResponse { deleted }))
}

async fn toggle_task(
    State(state): State<SharedState>,
    Path((date, task_id)): Path<(String, String)>,
) -> Result<Json<ToggleResponse>, AppError> {
    let completed = commands::toggle_task_complete(&state, &date, &task_id)
        .map_err(|error| state.command_error("toggle_task_complete", error))?;
    Ok(Json(ToggleResponse { completed }))
}
