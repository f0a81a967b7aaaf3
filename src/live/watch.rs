use std::sync::{Arc, Mutex};

use serde::Serialize;
use time::Date;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::LogStore;
use crate::types::{FoodRecord, Macros, MealSlot};

/// Lifecycle of one day subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unsubscribed,
    Subscribing,
    Active,
    /// A refresh hit a store failure; the stream has stopped and a new
    /// session must be opened to resume.
    Error,
}

/// Current records for all four slots of one day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SlotLists {
    pub breakfast: Vec<FoodRecord>,
    pub lunch: Vec<FoodRecord>,
    pub dinner: Vec<FoodRecord>,
    pub snacks: Vec<FoodRecord>,
}

impl SlotLists {
    fn set(&mut self, slot: MealSlot, records: Vec<FoodRecord>) {
        match slot {
            MealSlot::Breakfast => self.breakfast = records,
            MealSlot::Lunch => self.lunch = records,
            MealSlot::Dinner => self.dinner = records,
            MealSlot::Snacks => self.snacks = records,
        }
    }
}

/// One push to a live observer: the whole day, lists replaced wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct DaySnapshot {
    pub date: Date,
    pub slots: SlotLists,
    /// Cached summary as of this snapshot; `None` when no summary has been
    /// computed for the day yet.
    pub totals: Option<Macros>,
}

/// A live subscription to one (user, date) partition.
///
/// Opening the watch subscribes to the change bus *before* the initial load,
/// so a mutation racing the open is never missed — at worst a slot is read
/// twice. Each matching [`LedgerChange`](super::bus::LedgerChange) re-reads
/// the affected slot and the cached summary and emits a fresh
/// [`DaySnapshot`]. Dropping (or closing) the watch aborts the background
/// task and releases the bus subscription on every exit path.
pub struct DayWatch {
    rx: mpsc::Receiver<DaySnapshot>,
    status: Arc<Mutex<WatchState>>,
    task: JoinHandle<()>,
}

impl DayWatch {
    pub async fn open(state: &AppState, user_id: Uuid, date: Date) -> Result<DayWatch, AppError> {
        let status = Arc::new(Mutex::new(WatchState::Subscribing));
        let mut events = state.changes.subscribe();

        let store = state.store.clone();
        let mut slots = SlotLists::default();
        for slot in MealSlot::ALL {
            slots.set(slot, store.list_records(user_id, date, slot).await?);
        }
        let mut totals = store.get_summary(user_id, date).await?;

        let (tx, rx) = mpsc::channel(16);
        tx.send(DaySnapshot {
            date,
            slots: slots.clone(),
            totals,
        })
        .await
        .ok();

        *status.lock().unwrap() = WatchState::Active;
        let task_status = status.clone();

        let task = tokio::spawn(async move {
            loop {
                let refresh = match events.recv().await {
                    Ok(change) if change.user_id == user_id && change.date == date => {
                        vec![change.slot]
                    }
                    Ok(_) => continue,
                    // The ring buffer wrapped; re-read everything rather
                    // than guess what was dropped.
                    Err(RecvError::Lagged(_)) => MealSlot::ALL.to_vec(),
                    Err(RecvError::Closed) => break,
                };

                let mut failed = false;
                for slot in refresh {
                    match store.list_records(user_id, date, slot).await {
                        Ok(records) => slots.set(slot, records),
                        Err(e) => {
                            tracing::warn!(error = %e, %user_id, %date, %slot, "live refresh failed");
                            failed = true;
                            break;
                        }
                    }
                }
                if !failed {
                    match store.get_summary(user_id, date).await {
                        Ok(t) => totals = t,
                        Err(e) => {
                            tracing::warn!(error = %e, %user_id, %date, "live summary read failed");
                            failed = true;
                        }
                    }
                }
                if failed {
                    *task_status.lock().unwrap() = WatchState::Error;
                    break;
                }

                let snapshot = DaySnapshot {
                    date,
                    slots: slots.clone(),
                    totals,
                };
                if tx.send(snapshot).await.is_err() {
                    // Observer went away; treat as a dispose.
                    *task_status.lock().unwrap() = WatchState::Unsubscribed;
                    break;
                }
            }
        });

        Ok(DayWatch { rx, status, task })
    }

    /// Next snapshot, or `None` once the session has stopped.
    pub async fn next(&mut self) -> Option<DaySnapshot> {
        self.rx.recv().await
    }

    pub fn state(&self) -> WatchState {
        *self.status.lock().unwrap()
    }

    pub fn close(self) {
        *self.status.lock().unwrap() = WatchState::Unsubscribed;
        // Drop runs next and aborts the task.
    }
}

impl Drop for DayWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
