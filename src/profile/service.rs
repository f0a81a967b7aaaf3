use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::LogStore;
use crate::types::{MacroTargets, Macros, UserProfile};

/// Body-mass index from kilograms and centimeters; `None` without a usable
/// height.
pub fn bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if height_cm <= 0.0 {
        return None;
    }
    let meters = height_cm / 100.0;
    Some(weight_kg / (meters * meters))
}

pub fn bmi_category(bmi: f64) -> &'static str {
    if bmi < 18.5 {
        "Underweight"
    } else if bmi < 25.0 {
        "Normal"
    } else if bmi < 30.0 {
        "Overweight"
    } else {
        "Obese"
    }
}

/// Share of a daily target consumed so far, clamped to [0, 1]. An unset
/// target reads as zero progress rather than dividing by zero.
pub fn progress_ratio(current: i64, target: i64) -> f64 {
    if target <= 0 {
        return 0.0;
    }
    (current as f64 / target as f64).clamp(0.0, 1.0)
}

fn validate(profile: &UserProfile) -> Result<(), AppError> {
    if profile.age < 0 {
        return Err(AppError::invalid("age must not be negative"));
    }
    if profile.height_cm < 0.0 || profile.weight_kg < 0.0 {
        return Err(AppError::invalid("height and weight must not be negative"));
    }
    let t = &profile.targets;
    if t.target_calories < 0 || t.target_protein < 0 || t.target_carbs < 0 || t.target_fat < 0 {
        return Err(AppError::invalid("targets must not be negative"));
    }
    Ok(())
}

/// Upsert the profile; a usable current weight also lands in today's weight
/// log, the way the settings screen keeps the history current.
pub async fn save_profile(
    state: &AppState,
    user_id: Uuid,
    profile: UserProfile,
) -> Result<UserProfile, AppError> {
    validate(&profile)?;
    state.store.put_profile(user_id, &profile).await?;
    if profile.weight_kg > 0.0 {
        let today = OffsetDateTime::now_utc().date();
        state
            .store
            .put_weight(user_id, today, profile.weight_kg)
            .await?;
    }
    Ok(profile)
}

/// Replace just the macro targets, keeping identity fields. Without an
/// existing profile the defaults fill in the rest.
pub async fn update_targets(
    state: &AppState,
    user_id: Uuid,
    targets: MacroTargets,
) -> Result<UserProfile, AppError> {
    let mut profile = state
        .store
        .get_profile(user_id)
        .await?
        .unwrap_or_default();
    profile.targets = targets;
    validate(&profile)?;
    state.store.put_profile(user_id, &profile).await?;
    Ok(profile)
}

#[derive(Debug, serde::Serialize)]
pub struct MacroProgress {
    pub current: i64,
    pub target: i64,
    pub ratio: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct DayProgress {
    pub date: Date,
    pub calories: MacroProgress,
    pub protein: MacroProgress,
    pub carbs: MacroProgress,
    pub fat: MacroProgress,
}

/// Fresh totals (the aggregator's pull path) against the user's targets;
/// default targets apply when no profile exists yet.
pub async fn day_progress(
    state: &AppState,
    user_id: Uuid,
    date: Date,
) -> Result<DayProgress, AppError> {
    let targets = state
        .store
        .get_profile(user_id)
        .await?
        .map(|p| p.targets)
        .unwrap_or_default();
    let totals = crate::logs::service::recompute_daily_total(state, user_id, date).await?;
    Ok(progress_for(date, totals, targets))
}

fn progress_for(date: Date, totals: Macros, targets: MacroTargets) -> DayProgress {
    let entry = |current: i64, target: i64| MacroProgress {
        current,
        target,
        ratio: progress_ratio(current, target),
    };
    DayProgress {
        date,
        calories: entry(totals.calories, targets.target_calories),
        protein: entry(totals.protein, targets.target_protein),
        carbs: entry(totals.carbs, targets.target_carbs),
        fat: entry(totals.fat, targets.target_fat),
    }
}

#[derive(Debug, serde::Serialize)]
pub struct BmiEntry {
    pub date: Date,
    pub bmi: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct BmiHistory {
    pub entries: Vec<BmiEntry>,
    pub latest: Option<f64>,
    pub category: Option<&'static str>,
}

/// BMI per logged weight, using the profile's current height for the whole
/// series (the history stores weights only).
pub async fn bmi_history(state: &AppState, user_id: Uuid) -> Result<BmiHistory, AppError> {
    let profile = state
        .store
        .get_profile(user_id)
        .await?
        .ok_or(AppError::NotFound("profile"))?;
    if profile.height_cm <= 0.0 {
        return Err(AppError::NotFound("profile height"));
    }

    let entries: Vec<BmiEntry> = state
        .store
        .list_weights(user_id)
        .await?
        .into_iter()
        .filter_map(|w| {
            bmi(w.weight_kg, profile.height_cm).map(|value| BmiEntry {
                date: w.date,
                bmi: value,
            })
        })
        .collect();

    let latest = entries.last().map(|e| e.bmi);
    Ok(BmiHistory {
        entries,
        latest,
        category: latest.map(bmi_category),
    })
}
