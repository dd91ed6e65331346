//! Raw load/save against the persistence gateway

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use crate::application::commands;
use crate::application::persistence::{LoadResponse, SaveOutcome};
use crate::domain::models::Settings;
use crate::domain::schedule::ScheduleMap;
use crate::http::routes::AppError;
use crate::http::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/api/data", get(load_data).post(save_data))
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub schedules: Option<ScheduleMap>,
    #[serde(default)]
    pub settings: Option<Settings>,
}

/// GET /api/data - 401 without a signed-in user
async fn load_data(State(state): State<SharedState>) -> Result<Json<LoadResponse>, AppError> {
    let response = commands::load_data(&state)
        .await
        .map_err(|error| state.command_error("load_data", error))?;
    Ok(Json(response))
}

/// POST /api/data - Writes only the documents present in the body
async fn save_data(
    State(state): State<SharedState>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveOutcome>, AppError> {
    let outcome = commands::save_data(&state, request.schedules, request.settings)
        .await
        .map_err(|error| state.command_error("save_data", error))?;
    Ok(Json(outcome))
}
