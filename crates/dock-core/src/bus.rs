//! In-process event bus carrying dock events to subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use dock_types::DockEvent;
use tracing::{debug, error};

/// Callback invoked for each published event.
pub type EventHandler = Box<dyn Fn(&DockEvent) + Send + Sync + 'static>;

type SharedHandler = Arc<dyn Fn(&DockEvent) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Source of external dock events.
///
/// Handlers run on the publisher's thread; subscribers that own state on
/// another context must hand the event over themselves. A handler may
/// subscribe or unsubscribe on the same bus; the change applies from the
/// next publish.
pub trait EventBus: Send + Sync {
    fn subscribe(&self, handler: EventHandler) -> SubscriptionId;

    /// Returns false if `id` was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Deliver `event` to every subscriber. Returns how many received it.
    fn publish(&self, event: &DockEvent) -> usize;
}

/// Default bus used by the daemon.
#[derive(Default)]
pub struct LocalBus {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<SubscriptionId, SharedHandler>>,
}

impl LocalBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().map_or(0, |handlers| handlers.len())
    }
}

impl EventBus for LocalBus {
    fn subscribe(&self, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.handlers.lock() {
            Ok(mut handlers) => {
                handlers.insert(id, Arc::from(handler));
                debug!("Bus subscriber {:?} added", id);
            }
            Err(_) => error!("[bus] Handler mutex poisoned, subscription {:?} dropped", id),
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut handlers) = self.handlers.lock() else {
            error!("[bus] Handler mutex poisoned, cannot unsubscribe {:?}", id);
            return false;
        };
        let removed = handlers.remove(&id).is_some();
        if removed {
            debug!("Bus subscriber {:?} removed", id);
        }
        removed
    }

    fn publish(&self, event: &DockEvent) -> usize {
        let snapshot: Vec<SharedHandler> = match self.handlers.lock() {
            Ok(handlers) => handlers.values().cloned().collect(),
            Err(_) => {
                error!("[bus] Handler mutex poisoned, dropping {} event", event.name());
                return 0;
            }
        };
        for handler in &snapshot {
            handler(event);
        }
        debug!("Published {} to {} subscriber(s)", event.name(), snapshot.len());
        snapshot.len()
    }
}
