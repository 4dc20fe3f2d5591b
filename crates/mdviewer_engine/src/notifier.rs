//! "Content invalidated" signal channel between the watcher's context and
//! the presentation context.
//!
//! Every subscriber owns a single pending slot that is overwritten by newer
//! signals, so a busy consumer sees one signal for many changes and the
//! channel never queues without bound. Delivery is at-least-once: consumers
//! must treat a signal as "something may have changed".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use mdviewer_logging::viewer_trace;
use tokio::sync::Notify;

use crate::ChangeSignal;

type SubscriberId = u64;

#[derive(Default)]
struct Slot {
    pending: Mutex<Option<ChangeSignal>>,
    closed: AtomicBool,
    wake: Notify,
}

impl Slot {
    fn offer(&self, signal: ChangeSignal) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(signal);
        self.wake.notify_one();
    }

    fn take(&self) -> Option<ChangeSignal> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct Registry {
    subscribers: HashMap<SubscriberId, Arc<Slot>>,
    next_id: SubscriberId,
    last_signal: Option<ChangeSignal>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    registry: Mutex<Registry>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer side. Cheap to clone; all clones feed the same subscribers.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    shared: Arc<Shared>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let slot = Arc::new(Slot::default());
        let mut registry = self.shared.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        if registry.closed {
            slot.close();
        } else {
            registry.subscribers.insert(id, slot.clone());
        }
        Subscription {
            id,
            slot,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Offers `signal` to every subscriber and returns how many took it.
    ///
    /// A signal that repeats the last one from the same watcher is dropped.
    pub fn notify(&self, signal: ChangeSignal) -> usize {
        let mut registry = self.shared.registry();
        if registry.closed {
            return 0;
        }
        if let Some(last) = registry.last_signal {
            if last.watcher == signal.watcher && signal.seq <= last.seq {
                viewer_trace!("dropping duplicate signal {:?}", signal);
                return 0;
            }
        }
        registry.last_signal = Some(signal);
        for slot in registry.subscribers.values() {
            slot.offer(signal);
        }
        registry.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.registry().subscribers.len()
    }

    /// Ends the channel. Subscribers drain what is pending, then see `None`.
    pub fn close(&self) {
        let mut registry = self.shared.registry();
        registry.closed = true;
        for (_, slot) in registry.subscribers.drain() {
            slot.close();
        }
    }
}

/// Consumer side. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    slot: Arc<Slot>,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Waits for the next signal. `None` once the notifier is closed.
    pub async fn recv(&mut self) -> Option<ChangeSignal> {
        loop {
            if let Some(signal) = self.slot.take() {
                return Some(signal);
            }
            if self.slot.is_closed() {
                return None;
            }
            self.slot.wake.notified().await;
        }
    }

    pub fn try_recv(&mut self) -> Option<ChangeSignal> {
        self.slot.take()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.slot.close();
        if let Some(shared) = self.shared.upgrade() {
            shared.registry().subscribers.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
