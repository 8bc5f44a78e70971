//! The global constraint bus (GlobalConstraintBus).
//!
//! Process-wide, advisory-only: it never holds bindings, it only
//! multicasts events so cross-branch observers -- chiefly the tabling
//! engine's FD-invalidation subscriber -- can react without
//! polling. Subscribers must be `Send + Sync` since branches (and their
//! domain narrowings) run on separate worker threads.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::fd::domain::DomainSnapshot;

/// Events multicast on the bus. Only domain narrowing exists today; the
/// type is deliberately open (`#[non_exhaustive]`) since the bus is meant
/// for more than the FD-to-tabling invalidation channel it currently
/// carries, and future event kinds shouldn't need a breaking change.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum BusEvent {
    DomainNarrowed { var_id: u64, domain: DomainSnapshot },
}

pub trait BusSubscriber: Send + Sync {
    fn on_event(&self, event: &BusEvent);
}

#[derive(Default)]
struct BusInner {
    subscribers: Vec<Arc<dyn BusSubscriber>>,
}

/// A handle to the bus. Cheap to clone (`Arc` to the shared subscriber
/// list); every `State` in a run holds one.
#[derive(Clone)]
pub struct GlobalConstraintBus {
    inner: Arc<RwLock<BusInner>>,
}

impl std::fmt::Debug for GlobalConstraintBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalConstraintBus")
        .field("subscribers", &self.inner.read().subscribers.len())
        .finish()
    }
}

impl Default for GlobalConstraintBus {
    fn default() -> GlobalConstraintBus {
        GlobalConstraintBus {
            inner: Arc::new(RwLock::new(BusInner::default())),
        }
    }
}

impl GlobalConstraintBus {
    pub fn new() -> GlobalConstraintBus {
        GlobalConstraintBus::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn BusSubscriber>) {
        self.inner.write().subscribers.push(subscriber);
    }

    pub fn publish(&self, event: BusEvent) {
        for subscriber in self.inner.read().subscribers.iter() {
            subscriber.on_event(&event);
        }
    }

    /// Drops every subscriber. Used by `reset_global_engine` (Global state... must be explicitly constructible).
    pub fn reset(&self) {
        self.inner.write().subscribers.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fd::domain::Domain;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);
    impl BusSubscriber for Counter {
        fn on_event(&self, _event: &BusEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn publish_reaches_every_subscriber() {
        let bus = GlobalConstraintBus::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bus.subscribe(counter.clone());
        bus.subscribe(counter.clone());
        bus.publish(BusEvent::DomainNarrowed {
                var_id: 1,
                domain: Domain::range(1, 5).snapshot(),
        });
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reset_clears_subscribers() {
        let bus = GlobalConstraintBus::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bus.subscribe(counter.clone());
        bus.reset();
        bus.publish(BusEvent::DomainNarrowed {
                var_id: 1,
                domain: Domain::range(1, 5).snapshot(),
        });
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }
}
