use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// The four fixed meal slots a day is partitioned into.
///
/// The lowercase label doubles as the storage key and the path segment in
/// the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snacks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snacks => "snacks",
        }
    }

    pub fn from_label(label: &str) -> Option<MealSlot> {
        MealSlot::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl std::fmt::Display for MealSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One set of the four tracked macro values, in kcal / grams.
///
/// Used both for per-record totals (already quantity-scaled at rest) and for
/// daily aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

impl Macros {
    pub const ZERO: Macros = Macros {
        calories: 0,
        protein: 0,
        carbs: 0,
        fat: 0,
    };

    pub fn new(calories: i64, protein: i64, carbs: i64, fat: i64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }

    /// Per-unit values multiplied out to a quantity.
    pub fn scaled_by(&self, quantity: i64) -> Macros {
        Macros {
            calories: self.calories * quantity,
            protein: self.protein * quantity,
            carbs: self.carbs * quantity,
            fat: self.fat * quantity,
        }
    }

    /// Rescale stored totals from one quantity to another.
    ///
    /// The per-unit basis is re-derived as `total / old_qty` with integer
    /// division, so repeated edits can accumulate rounding drift when totals
    /// are not exact multiples of the quantity. Committed behavior.
    pub fn rescaled(&self, old_qty: i64, new_qty: i64) -> Macros {
        Macros {
            calories: self.calories / old_qty * new_qty,
            protein: self.protein / old_qty * new_qty,
            carbs: self.carbs / old_qty * new_qty,
            fat: self.fat / old_qty * new_qty,
        }
    }
}

impl std::ops::Add for Macros {
    type Output = Macros;

    fn add(self, rhs: Macros) -> Macros {
        Macros {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl std::ops::AddAssign for Macros {
    fn add_assign(&mut self, rhs: Macros) {
        *self = *self + rhs;
    }
}

/// One logged food instance inside a meal slot.
///
/// The macro fields hold totals for the whole quantity, not per-unit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub id: Uuid,
    pub name: String,
    pub quantity: i64,
    #[serde(flatten)]
    pub macros: Macros,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// User identity plus daily macro targets, editable from settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub surname: String,
    pub age: i64,
    pub email: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    #[serde(flatten)]
    pub targets: MacroTargets,
}

/// Daily goal values per macro field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub target_calories: i64,
    pub target_protein: i64,
    pub target_carbs: i64,
    pub target_fat: i64,
}

impl Default for MacroTargets {
    fn default() -> Self {
        Self {
            target_calories: 2000,
            target_protein: 100,
            target_carbs: 250,
            target_fat: 70,
        }
    }
}

/// One weight-history entry, last-writer-wins per (user, date).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: Date,
    pub weight_kg: f64,
}
