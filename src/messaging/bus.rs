//! Sound event bus
//!
//! Fan-out of [`SoundEvent`]s from game and UI code to any number of
//! listeners. A listener stays registered for as long as its
//! [`Subscription`] is alive; listeners whose channel has gone away are
//! pruned on the next publish.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{
    unbounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError, TrySendError,
};
use parking_lot::RwLock;

use super::events::SoundEvent;

/// Identifies one listener on a [`SoundBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Listener {
    id: SubscriberId,
    sender: Sender<SoundEvent>,
}

#[derive(Default)]
struct Shared {
    listeners: RwLock<Vec<Listener>>,
    next_id: AtomicUsize,
}

/// Broadcasts sound events to every live subscription. Clones share the
/// same listeners.
#[derive(Clone, Default)]
pub struct SoundBus {
    shared: Arc<Shared>,
}

impl SoundBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Dropping the returned subscription removes it.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = unbounded();
        let id = SubscriberId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.write().push(Listener { id, sender });

        Subscription {
            bus: self.clone(),
            id,
            receiver,
            detached: false,
        }
    }

    /// Remove a listener; its receiver disconnects once drained
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.shared.listeners.write().retain(|l| l.id != id);
    }

    /// Deliver `event` to every listener and return how many received it.
    /// Listeners whose receiver is gone are dropped.
    pub fn publish(&self, event: SoundEvent) -> usize {
        let mut listeners = self.shared.listeners.write();
        listeners.retain(|listener| match listener.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Dropping disconnected sound listener {:?}", listener.id);
                false
            }
            // Unbounded channels are never full
            Err(TrySendError::Full(_)) => true,
        });
        listeners.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.listeners.read().len()
    }

    /// Remove every listener
    pub fn clear(&self) {
        self.shared.listeners.write().clear();
    }
}

/// A registered listener on a [`SoundBus`]; unsubscribes on drop.
pub struct Subscription {
    bus: SoundBus,
    id: SubscriberId,
    receiver: Receiver<SoundEvent>,
    detached: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn recv(&self) -> Result<SoundEvent, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<SoundEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<SoundEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Blocking iterator that ends when the listener is unsubscribed
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, SoundEvent> {
        self.receiver.iter()
    }

    /// Keep the listener registered for as long as the returned receiver
    /// lives, instead of for the lifetime of this guard
    pub fn into_receiver(mut self) -> Receiver<SoundEvent> {
        self.detached = true;
        self.receiver.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.bus.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::events::{GameEvent, UiAction};

    #[test]
    fn test_subscribe_and_drop() {
        let bus = SoundBus::new();
        let subscription = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_disconnects() {
        let bus = SoundBus::new();
        let subscription = bus.subscribe();

        bus.unsubscribe(subscription.id());
        assert_eq!(bus.subscriber_count(), 0);
        assert!(subscription.recv().is_err());
    }

    #[test]
    fn test_publish_reaches_every_listener() {
        let bus = SoundBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        assert_eq!(bus.publish(SoundEvent::Game(GameEvent::LevelUp)), 2);

        match first.try_recv().unwrap() {
            SoundEvent::Game(GameEvent::LevelUp) => {}
            other => panic!("Wrong event received: {:?}", other),
        }
        assert!(second.try_recv().is_ok());
    }

    #[test]
    fn test_dropped_subscriptions_leave_no_listeners() {
        let bus = SoundBus::new();
        for _ in 0..100 {
            drop(bus.subscribe());
        }

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(SoundEvent::Ui(UiAction::ButtonPressed)), 0);
    }

    #[test]
    fn test_publish_prunes_dropped_receivers() {
        let bus = SoundBus::new();
        let receivers: Vec<_> = (0..100).map(|_| bus.subscribe().into_receiver()).collect();
        let kept = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 101);

        drop(receivers);
        assert_eq!(bus.publish(SoundEvent::Ui(UiAction::NotificationShown)), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn test_detached_receiver_keeps_listening() {
        let bus = SoundBus::new();
        let receiver = bus.subscribe().into_receiver();

        bus.publish(SoundEvent::Push {
            delta: 12.0,
            cursed: false,
        });
        assert!(receiver.try_recv().is_ok());
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_clone_shares_listeners() {
        let bus = SoundBus::new();
        let publisher = bus.clone();
        let subscription = bus.subscribe();

        publisher.publish(SoundEvent::Push {
            delta: -3.0,
            cursed: true,
        });
        assert!(subscription.try_recv().is_ok());

        publisher.clear();
        assert_eq!(bus.subscriber_count(), 0);
        assert!(subscription.recv().is_err());
    }
}
