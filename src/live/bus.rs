use time::Date;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::MealSlot;

/// A committed ledger mutation, published after its dependent summary
/// recompute has settled so observers re-reading the cache see fresh totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerChange {
    pub user_id: Uuid,
    pub date: Date,
    pub slot: MealSlot,
}

const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out of [`LedgerChange`] events, shared as
/// `Arc<ChangeBus>` on the application state.
///
/// Slow receivers observe `RecvError::Lagged` once the ring buffer wraps;
/// watchers treat that as a cue to do a full refresh rather than miss edits.
pub struct ChangeBus {
    sender: broadcast::Sender<LedgerChange>,
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. With zero receivers the event is
    /// dropped, which is fine: nobody was watching that day.
    pub fn publish(&self, change: LedgerChange) {
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn change(slot: MealSlot) -> LedgerChange {
        LedgerChange {
            user_id: Uuid::new_v4(),
            date: date!(2025 - 05 - 01),
            slot,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_change() {
        let bus = ChangeBus::default();
        let mut rx = bus.subscribe();

        let sent = change(MealSlot::Breakfast);
        bus.publish(sent);

        let received = rx.recv().await.expect("should receive the change");
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_change() {
        let bus = ChangeBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(change(MealSlot::Dinner));

        assert_eq!(rx1.recv().await.unwrap().slot, MealSlot::Dinner);
        assert_eq!(rx2.recv().await.unwrap().slot, MealSlot::Dinner);
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = ChangeBus::default();
        bus.publish(change(MealSlot::Snacks));
    }

    #[test]
    fn dropping_receivers_releases_them() {
        let bus = ChangeBus::default();
        let rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        drop(rx);
        assert_eq!(bus.receiver_count(), 0);
    }
}
