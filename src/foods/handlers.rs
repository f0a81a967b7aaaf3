use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

use super::client::{FoodCatalog, FoodHit};
use super::service;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/foods/search", get(search_foods))
        .route("/foods/detect", post(detect_foods))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub image_b64: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub labels: Vec<String>,
}

#[instrument(skip(state))]
async fn search_foods(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<FoodHit>>, AppError> {
    if params.q.trim().is_empty() {
        return Err(AppError::invalid("query must not be empty"));
    }
    Ok(Json(state.foods.search(&params.q).await?))
}

#[instrument(skip(state, body))]
async fn detect_foods(
    State(state): State<AppState>,
    Json(body): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, AppError> {
    let image = BASE64_STANDARD
        .decode(body.image_b64.as_bytes())
        .map_err(|_| AppError::invalid("invalid base64 image"))?;
    if image.is_empty() {
        return Err(AppError::invalid("image must not be empty"));
    }
    let labels = service::detect_verified_labels(&state, Bytes::from(image)).await?;
    Ok(Json(DetectResponse { labels }))
}
