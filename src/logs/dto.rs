use serde::{Deserialize, Serialize};
use time::Date;

use crate::types::{FoodRecord, Macros, MealSlot};

/// Body for logging a food into a slot. `per_unit` carries the values for a
/// single unit as returned by the food search; the service scales them.
#[derive(Debug, Clone, Deserialize)]
pub struct AddFoodRequest {
    pub name: String,
    pub quantity: i64,
    pub per_unit: Macros,
}

#[derive(Debug, Serialize)]
pub struct AddFoodResponse {
    pub record: FoodRecord,
    /// `true` when the add merged into an existing record ("Updated" in the
    /// client) rather than inserting a fresh one ("Added").
    pub merged: bool,
    #[serde(flatten)]
    pub totals: TotalsEnvelope,
}

#[derive(Debug, Serialize)]
pub struct EditRecordResponse {
    pub record: FoodRecord,
    #[serde(flatten)]
    pub totals: TotalsEnvelope,
}

#[derive(Debug, Serialize)]
pub struct DeleteRecordResponse {
    #[serde(flatten)]
    pub totals: TotalsEnvelope,
}

/// Fresh daily totals after a mutation, or `totals: null` with
/// `totals_stale: true` when the recompute failed and the cached summary may
/// lag the ledger.
#[derive(Debug, Serialize)]
pub struct TotalsEnvelope {
    pub totals: Option<Macros>,
    pub totals_stale: bool,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SlotLog {
    pub slot: MealSlot,
    pub note: String,
    pub records: Vec<FoodRecord>,
}

#[derive(Debug, Serialize)]
pub struct DayLogResponse {
    pub date: Date,
    pub slots: Vec<SlotLog>,
    /// Cached summary; may momentarily lag a just-committed mutation.
    pub totals: Option<Macros>,
}

#[derive(Debug, Serialize)]
pub struct DailyTotalsResponse {
    pub total_calories: i64,
    pub total_protein: i64,
    pub total_carbs: i64,
    pub total_fat: i64,
}

impl From<Macros> for DailyTotalsResponse {
    fn from(m: Macros) -> Self {
        Self {
            total_calories: m.calories,
            total_protein: m.protein,
            total_carbs: m.carbs,
            total_fat: m.fat,
        }
    }
}
