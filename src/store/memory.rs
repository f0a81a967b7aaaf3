use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::AppError;
use crate::types::{FoodRecord, Macros, MealSlot, UserProfile, WeightEntry};

use super::{LogStore, NewRecord};

type SlotKey = (Uuid, Date, MealSlot);
type DayKey = (Uuid, Date);

/// In-memory [`LogStore`] backing `AppState::fake()` and the unit tests.
///
/// Records keep insertion order per slot, mirroring the creation-time
/// ordering of the Postgres implementation. `set_failing(true)` makes every
/// call return a transport error, for exercising failure paths.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
    failing: AtomicBool,
    failing_summary_writes: AtomicBool,
}

#[derive(Default)]
struct Inner {
    records: HashMap<SlotKey, Vec<FoodRecord>>,
    notes: HashMap<SlotKey, String>,
    summaries: HashMap<DayKey, Macros>,
    profiles: HashMap<Uuid, UserProfile>,
    weights: HashMap<Uuid, BTreeMap<Date, f64>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only summary writes, leaving record mutations healthy. Lets
    /// tests commit a mutation and then watch its recompute fail.
    pub fn set_failing_summary_writes(&self, failing: bool) {
        self.failing_summary_writes.store(failing, Ordering::SeqCst);
    }

    fn guard(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Transport(anyhow::anyhow!(
                "in-memory store marked unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LogStore for MemStore {
    async fn insert_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        new: NewRecord,
    ) -> Result<FoodRecord, AppError> {
        self.guard()?;
        let record = FoodRecord {
            id: Uuid::new_v4(),
            name: new.name,
            quantity: new.quantity,
            macros: new.macros,
            created_at: OffsetDateTime::now_utc(),
        };
        let mut inner = self.inner.write().unwrap();
        inner
            .records
            .entry((user_id, date, slot))
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn find_record_by_name(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        name: &str,
    ) -> Result<Option<FoodRecord>, AppError> {
        self.guard()?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .records
            .get(&(user_id, date, slot))
            .and_then(|records| records.iter().find(|r| r.name == name))
            .cloned())
    }

    async fn get_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        id: Uuid,
    ) -> Result<Option<FoodRecord>, AppError> {
        self.guard()?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .records
            .get(&(user_id, date, slot))
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
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
        self.guard()?;
        let mut inner = self.inner.write().unwrap();
        let record = inner
            .records
            .get_mut(&(user_id, date, slot))
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or(AppError::NotFound("record"))?;
        record.quantity = quantity;
        record.macros = macros;
        Ok(record.clone())
    }

    async fn delete_record(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        id: Uuid,
    ) -> Result<bool, AppError> {
        self.guard()?;
        let mut inner = self.inner.write().unwrap();
        let Some(records) = inner.records.get_mut(&(user_id, date, slot)) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn list_records(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
    ) -> Result<Vec<FoodRecord>, AppError> {
        self.guard()?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .records
            .get(&(user_id, date, slot))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_note(
        &self,
        user_id: Uuid,
        date: Date,
        slot: MealSlot,
        note: &str,
    ) -> Result<(), AppError> {
        self.guard()?;
        let mut inner = self.inner.write().unwrap();
        inner.notes.insert((user_id, date, slot), note.to_string());
        Ok(())
    }

    async fn get_notes(
        &self,
        user_id: Uuid,
        date: Date,
    ) -> Result<HashMap<MealSlot, String>, AppError> {
        self.guard()?;
        let inner = self.inner.read().unwrap();
        Ok(MealSlot::ALL
            .into_iter()
            .filter_map(|slot| {
                inner
                    .notes
                    .get(&(user_id, date, slot))
                    .map(|note| (slot, note.clone()))
            })
            .collect())
    }

    async fn put_summary(
        &self,
        user_id: Uuid,
        date: Date,
        totals: Macros,
    ) -> Result<(), AppError> {
        self.guard()?;
        if self.failing_summary_writes.load(Ordering::SeqCst) {
            return Err(AppError::Transport(anyhow::anyhow!(
                "summary write rejected"
            )));
        }
        let mut inner = self.inner.write().unwrap();
        inner.summaries.insert((user_id, date), totals);
        Ok(())
    }

    async fn get_summary(&self, user_id: Uuid, date: Date) -> Result<Option<Macros>, AppError> {
        self.guard()?;
        let inner = self.inner.read().unwrap();
        Ok(inner.summaries.get(&(user_id, date)).copied())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        self.guard()?;
        let inner = self.inner.read().unwrap();
        Ok(inner.profiles.get(&user_id).cloned())
    }

    async fn put_profile(&self, user_id: Uuid, profile: &UserProfile) -> Result<(), AppError> {
        self.guard()?;
        let mut inner = self.inner.write().unwrap();
        inner.profiles.insert(user_id, profile.clone());
        Ok(())
    }

    async fn put_weight(&self, user_id: Uuid, date: Date, weight_kg: f64) -> Result<(), AppError> {
        self.guard()?;
        let mut inner = self.inner.write().unwrap();
        inner
            .weights
            .entry(user_id)
            .or_default()
            .insert(date, weight_kg);
        Ok(())
    }

    async fn list_weights(&self, user_id: Uuid) -> Result<Vec<WeightEntry>, AppError> {
        self.guard()?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .weights
            .get(&user_id)
            .map(|by_date| {
                by_date
                    .iter()
                    .map(|(date, kg)| WeightEntry {
                        date: *date,
                        weight_kg: *kg,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
