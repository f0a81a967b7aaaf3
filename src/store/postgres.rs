use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;
use crate::types::{FoodRecord, MacroTargets, Macros, MealSlot, UserProfile, WeightEntry};

use super::{LogStore, NewRecord};

/// Postgres-backed [`LogStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct FoodRecordRow {
    id: Uuid,
    name: String,
    quantity: i64,
    calories: i64,
    protein: i64,
    carbs: i64,
    fat: i64,
    created_at: OffsetDateTime,
}

impl From<FoodRecordRow> for FoodRecord {
    fn from(r: FoodRecordRow) -> Self {
        FoodRecord {
            id: r.id,
            name: r.name,
            quantity: r.quantity,
            macros: Macros::new(r.calories, r.protein, r.carbs, r.fat),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct NoteRow {
    slot: String,
    note: String,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    total_calories: i64,
    total_protein: i64,
    total_carbs: i64,
    total_fat: i64,
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    name: String,
    surname: String,
    age: i64,
    email: String,
    height_cm: f64,
    weight_kg: f64,
    target_calories: i64,
    target_protein: i64,
    target_carbs: i64,
    target_fat: i64,
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        UserProfile {
            name: r.name,
            surname: r.surname,
            age: r.age,
            email: r.email,
            height_cm: r.height_cm,
            weight_kg: r.weight_kg,
            targets: MacroTargets {
                target_calories: r.target_calories,
                target_protein: r.target_protein,
                target_carbs: r.target_carbs,
                target_fat: r.target_fat,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct WeightRow {
    log_date: Date,
    weight_kg: f64,
}

#[async_trait]
impl LogStore for PgStore {
    async fn insert_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        new: NewRecord,
    ) -> Result<FoodRecord, AppError> {
        let row = sqlx::query_as::<_, FoodRecordRow>(
            r#"
            INSERT INTO food_records (user_id, log_date, slot, name, quantity, calories, protein, carbs, fat)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, quantity, calories, protein, carbs, fat, created_at
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(slot.as_str())
        .bind(&new.name)
        .bind(new.quantity)
        .bind(new.macros.calories)
        .bind(new.macros.protein)
        .bind(new.macros.carbs)
        .bind(new.macros.fat)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_record_by_name(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        name: &str,
    ) -> Result<Option<FoodRecord>, AppError> {
        let row = sqlx::query_as::<_, FoodRecordRow>(
            r#"
            SELECT id, name, quantity, calories, protein, carbs, fat, created_at
            FROM food_records
            WHERE user_id = $1 AND log_date = $2 AND slot = $3 AND name = $4
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(slot.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn get_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        id: Uuid,
    ) -> Result<Option<FoodRecord>, AppError> {
        let row = sqlx::query_as::<_, FoodRecordRow>(
            r#"
            SELECT id, name, quantity, calories, protein, carbs, fat, created_at
            FROM food_records
            WHERE id = $1 AND user_id = $2 AND log_date = $3 AND slot = $4
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(date)
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        id: Uuid,
        quantity: i64,
        macros: Macros,
    ) -> Result<FoodRecord, AppError> {
        let row = sqlx::query_as::<_, FoodRecordRow>(
            r#"
            UPDATE food_records
            SET quantity = $5, calories = $6, protein = $7, carbs = $8, fat = $9
            WHERE id = $1 AND user_id = $2 AND log_date = $3 AND slot = $4
            RETURNING id, name, quantity, calories, protein, carbs, fat, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(date)
        .bind(slot.as_str())
        .bind(quantity)
        .bind(macros.calories)
        .bind(macros.protein)
        .bind(macros.carbs)
        .bind(macros.fat)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Into::into).ok_or(AppError::NotFound("record"))
    }

    async fn delete_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM food_records
            WHERE id = $1 AND user_id = $2 AND log_date = $3 AND slot = $4
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(date)
        .bind(slot.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_records(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
    ) -> Result<Vec<FoodRecord>, AppError> {
        let rows = sqlx::query_as::<_, FoodRecordRow>(
            r#"
            SELECT id, name, quantity, calories, protein, carbs, fat, created_at
            FROM food_records
            WHERE user_id = $1 AND log_date = $2 AND slot = $3
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(slot.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_note(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        note: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO meal_notes (user_id, log_date, slot, note, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (user_id, log_date, slot)
            DO UPDATE SET note = EXCLUDED.note, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(slot.as_str())
        .bind(note)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_notes(
        &self,
        user_id: Uuid,
        date: Date,
    ) -> Result<HashMap<MealSlot, String>, AppError> {
        let rows = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT slot, note
            FROM meal_notes
            WHERE user_id = $1 AND log_date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| MealSlot::from_label(&r.slot).map(|s| (s, r.note)))
            .collect())
    }

    async fn put_summary(
        &self,
        user_id: Uuid,
        date: Date,
        totals: Macros,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO daily_summaries (user_id, log_date, total_calories, total_protein, total_carbs, total_fat, computed_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (user_id, log_date)
            DO UPDATE SET total_calories = EXCLUDED.total_calories,
                          total_protein = EXCLUDED.total_protein,
                          total_carbs = EXCLUDED.total_carbs,
                          total_fat = EXCLUDED.total_fat,
                          computed_at = now()
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(totals.calories)
        .bind(totals.protein)
        .bind(totals.carbs)
        .bind(totals.fat)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_summary(&self, user_id: Uuid, date: Date) -> Result<Option<Macros>, AppError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT total_calories, total_protein, total_carbs, total_fat
            FROM daily_summaries
            WHERE user_id = $1 AND log_date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| Macros::new(r.total_calories, r.total_protein, r.total_carbs, r.total_fat)))
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT name, surname, age, email, height_cm, weight_kg,
                   target_calories, target_protein, target_carbs, target_fat
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn put_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, name, surname, age, email, height_cm, weight_kg,
                                  target_calories, target_protein, target_carbs, target_fat, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now())
            ON CONFLICT (user_id)
            DO UPDATE SET name = EXCLUDED.name,
                          surname = EXCLUDED.surname,
                          age = EXCLUDED.age,
                          email = EXCLUDED.email,
                          height_cm = EXCLUDED.height_cm,
                          weight_kg = EXCLUDED.weight_kg,
                          target_calories = EXCLUDED.target_calories,
                          target_protein = EXCLUDED.target_protein,
                          target_carbs = EXCLUDED.target_carbs,
                          target_fat = EXCLUDED.target_fat,
                          updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(&profile.name)
        .bind(&profile.surname)
        .bind(profile.age)
        .bind(&profile.email)
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(profile.targets.target_calories)
        .bind(profile.targets.target_protein)
        .bind(profile.targets.target_carbs)
        .bind(profile.targets.target_fat)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_weight(&self, user_id: Uuid, date: Date, weight_kg: f64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO weight_logs (user_id, log_date, weight_kg)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, log_date)
            DO UPDATE SET weight_kg = EXCLUDED.weight_kg
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(weight_kg)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_weights(&self, user_id: Uuid) -> Result<Vec<WeightEntry>, AppError> {
        let rows = sqlx::query_as::<_, WeightRow>(
            r#"
            SELECT log_date, weight_kg
            FROM weight_logs
            WHERE user_id = $1
            ORDER BY log_date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| WeightEntry {
                date: r.log_date,
                weight_kg: r.weight_kg,
            })
            .collect())
    }
}
