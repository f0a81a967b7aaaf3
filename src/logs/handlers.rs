use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use time::Date;
use tracing::instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::LogStore;
use crate::types::MealSlot;

use super::dto::{
    AddFoodRequest, AddFoodResponse, DailyTotalsResponse, DayLogResponse, DeleteRecordResponse,
    EditRecordResponse, NoteRequest, SlotLog, TotalsEnvelope,
};
use super::service::{self, TotalsOutcome};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:uid/logs/:date", get(get_day))
        .route("/users/:uid/logs/:date/totals", get(get_totals))
        .route("/users/:uid/logs/:date/:slot", get(get_slot))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:uid/logs/:date/:slot/records", post(add_food))
        .route(
            "/users/:uid/logs/:date/:slot/records/:id/increment",
            post(increment_record),
        )
        .route(
            "/users/:uid/logs/:date/:slot/records/:id/decrement",
            post(decrement_record),
        )
        .route("/users/:uid/logs/:date/:slot/records/:id", delete(delete_record))
        .route("/users/:uid/logs/:date/:slot/note", put(put_note))
}

#[instrument(skip(state))]
async fn get_day(
    State(state): State<AppState>,
    Path((uid, date)): Path<(Uuid, Date)>,
) -> Result<Json<DayLogResponse>, AppError> {
    Ok(Json(service::load_day(&state, uid, date).await?))
}

/// Pull path of the aggregator: recompute, persist, return.
#[instrument(skip(state))]
async fn get_totals(
    State(state): State<AppState>,
    Path((uid, date)): Path<(Uuid, Date)>,
) -> Result<Json<DailyTotalsResponse>, AppError> {
    let totals = service::recompute_daily_total(&state, uid, date).await?;
    Ok(Json(totals.into()))
}

#[instrument(skip(state))]
async fn get_slot(
    State(state): State<AppState>,
    Path((uid, date, slot)): Path<(Uuid, Date, MealSlot)>,
) -> Result<Json<SlotLog>, AppError> {
    let records = state.store.list_records(uid, date, slot).await?;
    let mut notes = state.store.get_notes(uid, date).await?;
    Ok(Json(SlotLog {
        slot,
        note: notes.remove(&slot).unwrap_or_default(),
        records,
    }))
}

#[instrument(skip(state, body))]
async fn add_food(
    State(state): State<AppState>,
    Path((uid, date, slot)): Path<(Uuid, Date, MealSlot)>,
    Json(body): Json<AddFoodRequest>,
) -> Result<(StatusCode, Json<AddFoodResponse>), AppError> {
    let outcome = service::add_or_merge(&state, uid, date, slot, body).await?;
    let status = if outcome.merged {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(AddFoodResponse {
            record: outcome.record,
            merged: outcome.merged,
            totals: envelope(outcome.totals),
        }),
    ))
}

#[instrument(skip(state))]
async fn increment_record(
    State(state): State<AppState>,
    Path((uid, date, slot, id)): Path<(Uuid, Date, MealSlot, Uuid)>,
) -> Result<Json<EditRecordResponse>, AppError> {
    let outcome = service::increment_quantity(&state, uid, date, slot, id).await?;
    Ok(Json(EditRecordResponse {
        record: outcome.record,
        totals: envelope(outcome.totals),
    }))
}

#[instrument(skip(state))]
async fn decrement_record(
    State(state): State<AppState>,
    Path((uid, date, slot, id)): Path<(Uuid, Date, MealSlot, Uuid)>,
) -> Result<Json<EditRecordResponse>, AppError> {
    let outcome = service::decrement_quantity(&state, uid, date, slot, id).await?;
    Ok(Json(EditRecordResponse {
        record: outcome.record,
        totals: envelope(outcome.totals),
    }))
}

#[instrument(skip(state))]
async fn delete_record(
    State(state): State<AppState>,
    Path((uid, date, slot, id)): Path<(Uuid, Date, MealSlot, Uuid)>,
) -> Result<Json<DeleteRecordResponse>, AppError> {
    let totals = service::delete_record(&state, uid, date, slot, id).await?;
    Ok(Json(DeleteRecordResponse {
        totals: envelope(totals),
    }))
}

#[instrument(skip(state, body))]
async fn put_note(
    State(state): State<AppState>,
    Path((uid, date, slot)): Path<(Uuid, Date, MealSlot)>,
    Json(body): Json<NoteRequest>,
) -> Result<StatusCode, AppError> {
    service::set_note(&state, uid, date, slot, &body.text).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn envelope(outcome: TotalsOutcome) -> TotalsEnvelope {
    TotalsEnvelope {
        totals: outcome.totals,
        totals_stale: outcome.stale,
    }
}
