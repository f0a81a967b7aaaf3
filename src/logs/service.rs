use time::Date;
use tracing::error;
use uuid::Uuid;

use crate::error::AppError;
use crate::live::bus::LedgerChange;
use crate::logs::dto::{AddFoodRequest, DayLogResponse, SlotLog};
use crate::state::AppState;
use crate::store::{LogStore, NewRecord};
use crate::types::{FoodRecord, Macros, MealSlot};

/// Outcome of the mandatory recompute that follows every committed ledger
/// mutation. `stale` means the mutation itself succeeded but the recompute
/// failed, so the cached summary lags the ledger until the next one lands.
#[derive(Debug, Clone, Copy)]
pub struct TotalsOutcome {
    pub totals: Option<Macros>,
    pub stale: bool,
}

#[derive(Debug)]
pub struct AddOutcome {
    pub record: FoodRecord,
    pub merged: bool,
    pub totals: TotalsOutcome,
}

#[derive(Debug)]
pub struct EditOutcome {
    pub record: FoodRecord,
    pub totals: TotalsOutcome,
}

/// Log a food into a slot, merging with an existing record of the same name.
///
/// On merge the incoming per-unit values become the new basis: totals are
/// `per_unit * (old_qty + qty)`, not a re-derivation from the stored record.
pub async fn add_or_merge(
    state: &AppState,
    user_id: Uuid,
    date: Date,
    slot: MealSlot,
    req: AddFoodRequest,
) -> Result<AddOutcome, AppError> {
    if req.name.is_empty() {
        return Err(AppError::invalid("name must not be empty"));
    }
    if req.quantity < 1 {
        return Err(AppError::invalid("quantity must be at least 1"));
    }
    if req.per_unit.calories < 0
        || req.per_unit.protein < 0
        || req.per_unit.carbs < 0
        || req.per_unit.fat < 0
    {
        return Err(AppError::invalid("macro values must not be negative"));
    }

    let existing = state
        .store
        .find_record_by_name(user_id, date, slot, &req.name)
        .await?;

    let (record, merged) = match existing {
        None => {
            let record = state
                .store
                .insert_record(
                    user_id,
                    date,
                    slot,
                    NewRecord {
                        name: req.name,
                        quantity: req.quantity,
                        macros: req.per_unit.scaled_by(req.quantity),
                    },
                )
                .await?;
            (record, false)
        }
        Some(existing) => {
            let new_qty = existing.quantity + req.quantity;
            let record = state
                .store
                .update_record(
                    user_id,
                    date,
                    slot,
                    existing.id,
                    new_qty,
                    req.per_unit.scaled_by(new_qty),
                )
                .await?;
            (record, true)
        }
    };

    let totals = settle_totals(state, user_id, date).await;
    publish(state, user_id, date, slot);
    Ok(AddOutcome {
        record,
        merged,
        totals,
    })
}

/// Bump a record's quantity by one, rescaling its stored totals.
pub async fn increment_quantity(
    state: &AppState,
    user_id: Uuid,
    date: Date,
    slot: MealSlot,
    id: Uuid,
) -> Result<EditOutcome, AppError> {
    let record = state
        .store
        .get_record(user_id, date, slot, id)
        .await?
        .ok_or(AppError::NotFound("record"))?;

    let new_qty = record.quantity + 1;
    let updated = state
        .store
        .update_record(
            user_id,
            date,
            slot,
            id,
            new_qty,
            record.macros.rescaled(record.quantity, new_qty),
        )
        .await?;

    let totals = settle_totals(state, user_id, date).await;
    publish(state, user_id, date, slot);
    Ok(EditOutcome {
        record: updated,
        totals,
    })
}

/// Lower a record's quantity by one, flooring at 1. At the floor this is a
/// no-op: nothing is written, no recompute runs, no change is published.
pub async fn decrement_quantity(
    state: &AppState,
    user_id: Uuid,
    date: Date,
    slot: MealSlot,
    id: Uuid,
) -> Result<EditOutcome, AppError> {
    let record = state
        .store
        .get_record(user_id, date, slot, id)
        .await?
        .ok_or(AppError::NotFound("record"))?;

    if record.quantity <= 1 {
        let totals = state.store.get_summary(user_id, date).await?;
        return Ok(EditOutcome {
            record,
            totals: TotalsOutcome {
                totals,
                stale: false,
            },
        });
    }

    let new_qty = record.quantity - 1;
    let updated = state
        .store
        .update_record(
            user_id,
            date,
            slot,
            id,
            new_qty,
            record.macros.rescaled(record.quantity, new_qty),
        )
        .await?;

    let totals = settle_totals(state, user_id, date).await;
    publish(state, user_id, date, slot);
    Ok(EditOutcome {
        record: updated,
        totals,
    })
}

pub async fn delete_record(
    state: &AppState,
    user_id: Uuid,
    date: Date,
    slot: MealSlot,
    id: Uuid,
) -> Result<TotalsOutcome, AppError> {
    let removed = state.store.delete_record(user_id, date, slot, id).await?;
    if !removed {
        return Err(AppError::NotFound("record"));
    }

    let totals = settle_totals(state, user_id, date).await;
    publish(state, user_id, date, slot);
    Ok(totals)
}

/// Overwrite the slot's note wholesale. Notes carry no macro data, so no
/// recompute follows and no change event fires.
pub async fn set_note(
    state: &AppState,
    user_id: Uuid,
    date: Date,
    slot: MealSlot,
    text: &str,
) -> Result<(), AppError> {
    state.store.set_note(user_id, date, slot, text).await
}

/// Sum every record across the four slots, overwrite the cached summary,
/// and return the fresh total. Idempotent for a stable ledger.
pub async fn recompute_daily_total(
    state: &AppState,
    user_id: Uuid,
    date: Date,
) -> Result<Macros, AppError> {
    let mut total = Macros::ZERO;
    for slot in MealSlot::ALL {
        for record in state.store.list_records(user_id, date, slot).await? {
            total += record.macros;
        }
    }
    state.store.put_summary(user_id, date, total).await?;
    Ok(total)
}

/// Whole-day read: per-slot records and notes plus the cached summary.
pub async fn load_day(
    state: &AppState,
    user_id: Uuid,
    date: Date,
) -> Result<DayLogResponse, AppError> {
    let mut notes = state.store.get_notes(user_id, date).await?;
    let mut slots = Vec::with_capacity(MealSlot::ALL.len());
    for slot in MealSlot::ALL {
        slots.push(SlotLog {
            slot,
            note: notes.remove(&slot).unwrap_or_default(),
            records: state.store.list_records(user_id, date, slot).await?,
        });
    }
    let totals = state.store.get_summary(user_id, date).await?;
    Ok(DayLogResponse {
        date,
        slots,
        totals,
    })
}

async fn settle_totals(state: &AppState, user_id: Uuid, date: Date) -> TotalsOutcome {
    match recompute_daily_total(state, user_id, date).await {
        Ok(totals) => TotalsOutcome {
            totals: Some(totals),
            stale: false,
        },
        Err(e) => {
            error!(error = %e, %user_id, %date, "summary recompute failed after mutation");
            TotalsOutcome {
                totals: None,
                stale: true,
            }
        }
    }
}

fn publish(state: &AppState, user_id: Uuid, date: Date, slot: MealSlot) {
    state.changes.publish(LedgerChange {
        user_id,
        date,
        slot,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const DAY: Date = date!(2025 - 05 - 01);

    fn add(name: &str, quantity: i64, per_unit: Macros) -> AddFoodRequest {
        AddFoodRequest {
            name: name.into(),
            quantity,
            per_unit,
        }
    }

    #[tokio::test]
    async fn duplicate_add_merges_into_one_record() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        let apple = Macros::new(100, 0, 25, 0);

        let first = add_or_merge(&state, uid, DAY, MealSlot::Snacks, add("Apple", 1, apple))
            .await
            .unwrap();
        assert!(!first.merged);

        let second = add_or_merge(&state, uid, DAY, MealSlot::Snacks, add("Apple", 2, apple))
            .await
            .unwrap();
        assert!(second.merged);
        assert_eq!(second.record.quantity, 3);
        assert_eq!(second.record.macros.calories, 300);

        let records = state
            .store
            .list_records(uid, DAY, MealSlot::Snacks)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn merge_takes_the_incoming_per_unit_basis() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();

        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Lunch,
            add("Yogurt", 1, Macros::new(100, 10, 8, 3)),
        )
        .await
        .unwrap();

        // Re-adding with different per-unit values rebases the whole record.
        let merged = add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Lunch,
            add("Yogurt", 1, Macros::new(110, 11, 9, 4)),
        )
        .await
        .unwrap();

        assert_eq!(merged.record.quantity, 2);
        assert_eq!(merged.record.macros, Macros::new(220, 22, 18, 8));
    }

    #[tokio::test]
    async fn name_match_is_case_sensitive() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        let per_unit = Macros::new(50, 1, 12, 0);

        add_or_merge(&state, uid, DAY, MealSlot::Snacks, add("apple", 1, per_unit))
            .await
            .unwrap();
        let second = add_or_merge(&state, uid, DAY, MealSlot::Snacks, add("Apple", 1, per_unit))
            .await
            .unwrap();

        assert!(!second.merged);
        let records = state
            .store
            .list_records(uid, DAY, MealSlot::Snacks)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn invalid_adds_are_rejected_before_any_write() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();

        for req in [
            add("", 1, Macros::ZERO),
            add("Egg", 0, Macros::ZERO),
            add("Egg", -2, Macros::ZERO),
            add("Egg", 1, Macros::new(-1, 0, 0, 0)),
        ] {
            let err = add_or_merge(&state, uid, DAY, MealSlot::Breakfast, req)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidArgument(_)));
        }

        assert!(state
            .store
            .list_records(uid, DAY, MealSlot::Breakfast)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(state.store.get_summary(uid, DAY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn increment_rescales_totals() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        let added = add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Breakfast,
            add("Egg", 2, Macros::new(70, 6, 1, 5)),
        )
        .await
        .unwrap();

        let edited = increment_quantity(&state, uid, DAY, MealSlot::Breakfast, added.record.id)
            .await
            .unwrap();
        assert_eq!(edited.record.quantity, 3);
        assert_eq!(edited.record.macros, Macros::new(210, 18, 3, 15));
        assert_eq!(edited.totals.totals, Some(Macros::new(210, 18, 3, 15)));
    }

    #[tokio::test]
    async fn decrement_floors_at_one() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        let added = add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Dinner,
            add("Steak", 1, Macros::new(400, 40, 0, 25)),
        )
        .await
        .unwrap();

        let edited = decrement_quantity(&state, uid, DAY, MealSlot::Dinner, added.record.id)
            .await
            .unwrap();
        assert_eq!(edited.record.quantity, 1);
        assert_eq!(edited.record.macros.calories, 400);

        // Still exactly one record; nothing was deleted or zeroed.
        let records = state
            .store
            .list_records(uid, DAY, MealSlot::Dinner)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, 1);
    }

    #[tokio::test]
    async fn missing_record_updates_are_not_found() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        let ghost = Uuid::new_v4();

        for result in [
            increment_quantity(&state, uid, DAY, MealSlot::Lunch, ghost)
                .await
                .map(|_| ()),
            decrement_quantity(&state, uid, DAY, MealSlot::Lunch, ghost)
                .await
                .map(|_| ()),
            delete_record(&state, uid, DAY, MealSlot::Lunch, ghost)
                .await
                .map(|_| ()),
        ] {
            assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn recompute_sums_every_slot() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();

        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Breakfast,
            add("Egg", 2, Macros::new(70, 6, 1, 5)),
        )
        .await
        .unwrap();
        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Lunch,
            add("Rice", 1, Macros::new(200, 4, 45, 0)),
        )
        .await
        .unwrap();
        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Snacks,
            add("Apple", 1, Macros::new(100, 0, 25, 0)),
        )
        .await
        .unwrap();

        let total = recompute_daily_total(&state, uid, DAY).await.unwrap();
        assert_eq!(total, Macros::new(440, 16, 72, 15));
        assert_eq!(state.store.get_summary(uid, DAY).await.unwrap(), Some(total));
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Breakfast,
            add("Egg", 2, Macros::new(70, 6, 1, 5)),
        )
        .await
        .unwrap();

        let first = recompute_daily_total(&state, uid, DAY).await.unwrap();
        let second = recompute_daily_total(&state, uid, DAY).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(state.store.get_summary(uid, DAY).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn single_breakfast_scenario_totals() {
        // breakfast: Egg x2 = 140/12/2/10, every other slot empty.
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Breakfast,
            add("Egg", 2, Macros::new(70, 6, 1, 5)),
        )
        .await
        .unwrap();

        let total = recompute_daily_total(&state, uid, DAY).await.unwrap();
        assert_eq!(total, Macros::new(140, 12, 2, 10));
    }

    #[tokio::test]
    async fn delete_removes_exactly_its_contribution() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Lunch,
            add("Rice", 1, Macros::new(200, 4, 45, 0)),
        )
        .await
        .unwrap();
        let soup = add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Lunch,
            add("Soup", 1, Macros::new(200, 8, 20, 6)),
        )
        .await
        .unwrap();
        assert_eq!(
            state.store.get_summary(uid, DAY).await.unwrap().unwrap().calories,
            400
        );

        let outcome = delete_record(&state, uid, DAY, MealSlot::Lunch, soup.record.id)
            .await
            .unwrap();
        assert_eq!(outcome.totals, Some(Macros::new(200, 4, 45, 0)));
    }

    #[tokio::test]
    async fn mutations_publish_a_change_for_their_slot() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        let mut rx = state.changes.subscribe();

        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Snacks,
            add("Apple", 1, Macros::new(100, 0, 25, 0)),
        )
        .await
        .unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.user_id, uid);
        assert_eq!(change.date, DAY);
        assert_eq!(change.slot, MealSlot::Snacks);
    }

    #[tokio::test]
    async fn recompute_failure_surfaces_staleness_not_an_error() {
        let (state, store) = AppState::fake_with_store();
        let uid = Uuid::new_v4();
        let added = add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Breakfast,
            add("Egg", 1, Macros::new(70, 6, 1, 5)),
        )
        .await
        .unwrap();
        assert!(!added.totals.stale);

        // Mutation commits, then its dependent summary write fails.
        store.set_failing_summary_writes(true);
        let outcome = increment_quantity(&state, uid, DAY, MealSlot::Breakfast, added.record.id)
            .await
            .unwrap();
        assert_eq!(outcome.record.quantity, 2);
        assert!(outcome.totals.stale);
        assert_eq!(outcome.totals.totals, None);

        // The cache still holds the pre-mutation summary until something
        // recomputes successfully again.
        assert_eq!(
            state.store.get_summary(uid, DAY).await.unwrap(),
            Some(Macros::new(70, 6, 1, 5))
        );
        store.set_failing_summary_writes(false);
        let healed = recompute_daily_total(&state, uid, DAY).await.unwrap();
        assert_eq!(healed, Macros::new(140, 12, 2, 10));
    }

    #[tokio::test]
    async fn note_is_last_writer_wins_and_triggers_no_recompute() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        let mut rx = state.changes.subscribe();

        set_note(&state, uid, DAY, MealSlot::Breakfast, "oatmeal day").await.unwrap();
        set_note(&state, uid, DAY, MealSlot::Breakfast, "eggs instead").await.unwrap();

        let notes = state.store.get_notes(uid, DAY).await.unwrap();
        assert_eq!(
            notes.get(&MealSlot::Breakfast).map(String::as_str),
            Some("eggs instead")
        );
        assert_eq!(state.store.get_summary(uid, DAY).await.unwrap(), None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn load_day_groups_records_notes_and_summary() {
        let state = AppState::fake();
        let uid = Uuid::new_v4();
        add_or_merge(
            &state,
            uid,
            DAY,
            MealSlot::Breakfast,
            add("Egg", 2, Macros::new(70, 6, 1, 5)),
        )
        .await
        .unwrap();
        set_note(&state, uid, DAY, MealSlot::Breakfast, "early start").await.unwrap();

        let day = load_day(&state, uid, DAY).await.unwrap();
        assert_eq!(day.slots.len(), 4);
        assert_eq!(day.slots[0].slot, MealSlot::Breakfast);
        assert_eq!(day.slots[0].records.len(), 1);
        assert_eq!(day.slots[0].note, "early start");
        assert!(day.slots[1].records.is_empty());
        assert_eq!(day.totals, Some(Macros::new(140, 12, 2, 10)));
    }
}
