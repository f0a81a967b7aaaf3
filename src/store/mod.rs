use std::collections::HashMap;

use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use crate::error::AppError;
use crate::types::{FoodRecord, Macros, MealSlot, UserProfile, WeightEntry};

mod memory;
mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

/// Fields for a record about to be inserted; the id and timestamp are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub name: String,
    pub quantity: i64,
    pub macros: Macros,
}

/// The backing document store for meal logs, summaries, and profiles.
///
/// Everything the services persist goes through this trait so the production
/// Postgres implementation and the in-memory one used by tests are
/// interchangeable behind `AppState`.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn insert_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        new: NewRecord,
    ) -> Result<FoodRecord, AppError>;

    /// Case-sensitive exact-name lookup inside one slot. Returns the oldest
    /// match when duplicates exist.
    async fn find_record_by_name(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        name: &str,
    ) -> Result<Option<FoodRecord>, AppError>;

    async fn get_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        id: Uuid,
    ) -> Result<Option<FoodRecord>, AppError>;

    /// Overwrite quantity and scaled totals. Errors with `NotFound` when the
    /// record is gone.
    async fn update_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        id: Uuid,
        quantity: i64,
        macros: Macros,
    ) -> Result<FoodRecord, AppError>;

    /// Returns whether a record was actually removed.
    async fn delete_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        id: Uuid,
    ) -> Result<bool, AppError>;

    /// Records for one slot, ordered by creation time.
    async fn list_records(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
    ) -> Result<Vec<FoodRecord>, AppError>;

    async fn set_note(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        note: &str,
    ) -> Result<(), AppError>;

    async fn get_notes(
        &self,
        user_id: Uuid,
        date: Date,
    ) -> Result<HashMap<MealSlot, String>, AppError>;

    /// Unconditionally overwrite the cached daily summary.
    async fn put_summary(&self, user_id: Uuid, date: Date, totals: Macros)
        -> Result<(), AppError>;

    async fn get_summary(&self, user_id: Uuid, date: Date) -> Result<Option<Macros>, AppError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError>;

    async fn put_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError>;

    async fn put_weight(&self, user_id: Uuid, date: Date, weight_kg: f64)
        -> Result<(), AppError>;

    /// Weight history ordered by date ascending.
    async fn list_weights(&self, user_id: Uuid) -> Result<Vec<WeightEntry>, AppError>;
}
