use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use time::Date;
use tracing::instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::LogStore;
use crate::types::{MacroTargets, UserProfile, WeightEntry};

use super::service::{self, BmiHistory, DayProgress};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/:uid/profile", get(get_profile).put(put_profile))
        .route("/users/:uid/targets", put(put_targets))
        .route("/users/:uid/weights", get(get_weights))
        .route("/users/:uid/bmi", get(get_bmi))
        .route("/users/:uid/logs/:date/progress", get(get_progress))
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state
        .store
        .get_profile(uid)
        .await?
        .ok_or(AppError::NotFound("profile"))?;
    Ok(Json(profile))
}

#[instrument(skip(state, body))]
async fn put_profile(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
    Json(body): Json<UserProfile>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(service::save_profile(&state, uid, body).await?))
}

#[instrument(skip(state, body))]
async fn put_targets(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
    Json(body): Json<MacroTargets>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(service::update_targets(&state, uid, body).await?))
}

#[instrument(skip(state))]
async fn get_weights(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> Result<Json<Vec<WeightEntry>>, AppError> {
    Ok(Json(state.store.list_weights(uid).await?))
}

#[instrument(skip(state))]
async fn get_bmi(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> Result<Json<BmiHistory>, AppError> {
    Ok(Json(service::bmi_history(&state, uid).await?))
}

#[instrument(skip(state))]
async fn get_progress(
    State(state): State<AppState>,
    Path((uid, date)): Path<(Uuid, Date)>,
) -> Result<Json<DayProgress>, AppError> {
    Ok(Json(service::day_progress(&state, uid, date).await?))
}
