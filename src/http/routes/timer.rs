//! Pomodoro timer and focus mode endpoints

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::application::commands::{self, TimerView};
use crate::http::routes::AppError;
use crate::http::SharedState;
use crate::infrastructure::error::InfraError;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/timer", get(get_timer))
        .route("/api/timer/start", post(start_timer))
        .route("/api/timer/pause", post(pause_timer))
        .route("/api/timer/reset", post(reset_timer))
        .route("/api/timer/durations", put(set_durations))
        .route("/api/timer/task", put(set_current_task))
        .route("/api/focus/toggle", post(toggle_focus))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSelection {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationsRequest {
    pub work_seconds: u32,
    pub break_seconds: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusResponse {
    pub focus_mode_active: bool,
}

async fn get_timer(State(state): State<SharedState>) -> Result<Json<TimerView>, AppError> {
    Ok(Json(commands::timer_view(&state)?))
}

/// POST /api/timer/start - Optional body `{"taskId": ...}`; an empty body or
/// `{}` starts without a task
async fn start_timer(State(state): State<SharedState>, body: Bytes) -> Result<Json<TimerView>, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        TaskSelection::default()
    } else {
        serde_json::from_slice::<TaskSelection>(&body).map_err(|error| {
            state.command_error(
                "start_timer",
                InfraError::InvalidInput(format!("invalid timer start body: {error}")),
            )
        })?
    };
    Ok(Json(commands::start_timer(&state, request.task_id)?))
}

async fn pause_timer(State(state): State<SharedState>) -> Result<Json<TimerView>, AppError> {
    Ok(Json(commands::pause_timer(&state)?))
}

async fn reset_timer(State(state): State<SharedState>) -> Result<Json<TimerView>, AppError> {
    Ok(Json(commands::reset_timer(&state)?))
}

async fn set_durations(
    State(state): State<SharedState>,
    Json(request): Json<DurationsRequest>,
) -> Result<Json<TimerView>, AppError> {
    let view = commands::set_timer_durations(&state, request.work_seconds, request.break_seconds)
        .map_err(|error| state.command_error("set_timer_durations", error))?;
    Ok(Json(view))
}

async fn set_current_task(
    State(state): State<SharedState>,
    Json(request): Json<TaskSelection>,
) -> Result<Json<TimerView>, AppError> {
    Ok(Json(commands::set_current_task(&state, request.task_id)?))
}

async fn toggle_focus(State(state): State<SharedState>) -> Result<Json<FocusResponse>, AppError> {
    Ok(Json(FocusResponse {
        focus_mode_active: commands::toggle_focus_mode(&state)?,
    }))
}
