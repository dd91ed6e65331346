//! Selected date, zoom, timezone and grid endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::application::commands::{
    self, DayGridView, SidebarDay, StateResponse, TimezoneClock,
};
use crate::domain::models::{TimezoneList, ZoomLevel};
use crate::http::routes::AppError;
use crate::http::SharedState;
use crate::infrastructure::error::InfraError;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/selected-date", put(set_selected_date))
        .route("/api/selected-date/step", post(step_selected_date))
        .route("/api/selected-date/today", post(select_today))
        .route("/api/grid", get(get_grid))
        .route("/api/days", get(get_days))
        .route("/api/zoom", post(set_zoom))
        .route("/api/zoom/in", post(zoom_in))
        .route("/api/zoom/out", post(zoom_out))
        .route("/api/timezones", get(get_timezones).post(add_timezone))
        .route("/api/timezones/{*name}", delete(remove_timezone))
}

#[derive(Debug, Deserialize)]
pub struct SelectedDateRequest {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub days: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedDateResponse {
    pub selected_date: String,
}

#[derive(Debug, Deserialize)]
pub struct GridQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ZoomRequest {
    pub level: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomResponse {
    pub zoom_level: ZoomLevel,
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct TimezoneRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TimezonesResponse {
    pub timezones: TimezoneList,
    pub clocks: Vec<TimezoneClock>,
    pub available: Vec<String>,
}

fn selected_date_response(date: chrono::NaiveDate) -> Json<SelectedDateResponse> {
    Json(SelectedDateResponse {
        selected_date: date.format("%Y-%m-%d").to_string(),
    })
}

fn zoom_response(level: ZoomLevel) -> Json<ZoomResponse> {
    Json(ZoomResponse {
        zoom_level: level,
        label: level.label(),
    })
}

fn timezones_response(state: &SharedState) -> Result<Json<TimezonesResponse>, AppError> {
    let snapshot = commands::snapshot(state)?;
    Ok(Json(TimezonesResponse {
        timezones: snapshot.timezones,
        clocks: commands::timezone_clocks(state)?,
        available: commands::available_timezones(state)?,
    }))
}

/// GET /api/state - Full planner state
async fn get_state(State(state): State<SharedState>) -> Result<Json<StateResponse>, AppError> {
    Ok(Json(commands::snapshot(&state)?))
}

async fn set_selected_date(
    State(state): State<SharedState>,
    Json(request): Json<SelectedDateRequest>,
) -> Result<Json<SelectedDateResponse>, AppError> {
    let date = commands::set_selected_date(&state, &request.date)
        .map_err(|error| state.command_error("set_selected_date", error))?;
    Ok(selected_date_response(date))
}

async fn step_selected_date(
    State(state): State<SharedState>,
    Json(request): Json<StepRequest>,
) -> Result<Json<SelectedDateResponse>, AppError> {
    let date = commands::step_selected_date(&state, request.days)
        .map_err(|error| state.command_error("step_selected_date", error))?;
    Ok(selected_date_response(date))
}

async fn select_today(State(state): State<SharedState>) -> Result<Json<SelectedDateResponse>, AppError> {
    let date = commands::select_today(&state)
        .map_err(|error| state.command_error("select_today", error))?;
    Ok(selected_date_response(date))
}

/// GET /api/grid?date=YYYY-MM-DD - Blocks for a day at the current zoom
async fn get_grid(
    State(state): State<SharedState>,
    Query(query): Query<GridQuery>,
) -> Result<Json<DayGridView>, AppError> {
    Ok(Json(commands::day_grid(&state, query.date.as_deref())?))
}

/// GET /api/days - Sidebar dates around today
async fn get_days(State(state): State<SharedState>) -> Result<Json<Vec<SidebarDay>>, AppError> {
    Ok(Json(commands::sidebar_days(&state)?))
}

async fn set_zoom(
    State(state): State<SharedState>,
    Json(request): Json<ZoomRequest>,
) -> Result<Json<ZoomResponse>, AppError> {
    let level = ZoomLevel::from_minutes(request.level).ok_or_else(|| {
        state.command_error(
            "set_zoom_level",
            InfraError::InvalidInput(format!("unsupported zoom level: {}", request.level)),
        )
    })?;
    let level = commands::set_zoom_level(&state, level)
        .map_err(|error| state.command_error("set_zoom_level", error))?;
    Ok(zoom_response(level))
}

async fn zoom_in(State(state): State<SharedState>) -> Result<Json<ZoomResponse>, AppError> {
    let level = commands::zoom_in(&state).map_err(|error| state.command_error("zoom_in", error))?;
    Ok(zoom_response(level))
}

async fn zoom_out(State(state): State<SharedState>) -> Result<Json<ZoomResponse>, AppError> {
    let level = commands::zoom_out(&state).map_err(|error| state.command_error("zoom_out", error))?;
    Ok(zoom_response(level))
}

async fn get_timezones(State(state): State<SharedState>) -> Result<Json<TimezonesResponse>, AppError> {
    timezones_response(&state)
}

async fn add_timezone(
    State(state): State<SharedState>,
    Json(request): Json<TimezoneRequest>,
) -> Result<Json<TimezonesResponse>, AppError> {
    commands::add_timezone(&state, &request.name)
        .map_err(|error| state.command_error("add_timezone", error))?;
    timezones_response(&state)
}

/// DELETE /api/timezones/{*name} - Zone names contain slashes
async fn remove_timezone(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<TimezonesResponse>, AppError> {
    commands::remove_timezone(&state, &name)
        .map_err(|error| state.command_error("remove_timezone", error))?;
    timezones_response(&state)
}
