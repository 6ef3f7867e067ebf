// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed publish/subscribe primitive connecting pipeline stages.
//
// Publication is a synchronous hand-off, not a best-effort broadcast:
// observers run in registration order on the publishing thread, and an
// observer that blocks delays everything behind it. Each stage owns one
// `Publisher` by composition.

use std::sync::{Arc, Mutex, MutexGuard};

/// A callback registered with a [`Publisher`].
///
/// Observers receive the published value mutably, in registration order, so
/// an early observer (e.g. the output-name allocator) can annotate a record
/// before a later one forwards it downstream.
pub trait Observer<T>: Send + Sync {
    fn notify(&self, value: &mut T);
}

/// Adapter turning a closure into an [`Observer`].
pub struct FnObserver<F>(F);

impl<F> FnObserver<F> {
    pub fn new<T>(f: F) -> Arc<Self>
    where
        F: Fn(&mut T) + Send + Sync,
    {
        Arc::new(Self(f))
    }
}

impl<T, F> Observer<T> for FnObserver<F>
where
    F: Fn(&mut T) + Send + Sync,
{
    fn notify(&self, value: &mut T) {
        (self.0)(value)
    }
}

/// Ordered, synchronous fan-out of completed work to registered observers.
pub struct Publisher<T> {
    observers: Mutex<Vec<Arc<dyn Observer<T>>>>,
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Publisher<T> {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// The registration list. A poisoned lock is still usable: the list is
    /// only ever mutated by whole Vec operations, so no panic can leave it
    /// half-updated.
    fn registry(&self) -> MutexGuard<'_, Vec<Arc<dyn Observer<T>>>> {
        match self.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register `observer` at the end of the notification order.
    ///
    /// Idempotent: a second registration of the same observer (same `Arc`)
    /// is a no-op and returns `None`. Otherwise an unsubscribe handle is
    /// returned.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Option<Subscription<'_, T>> {
        let mut observers = self.registry();
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return None;
        }
        observers.push(Arc::clone(&observer));
        Some(Subscription {
            publisher: self,
            observer,
        })
    }

    /// Remove `observer` if registered; reports whether a removal occurred.
    pub fn unsubscribe(&self, observer: &Arc<dyn Observer<T>>) -> bool {
        let mut observers = self.registry();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() < before
    }

    /// Invoke every registered observer, in registration order, on the
    /// calling thread, then return the (possibly annotated) value.
    pub fn publish(&self, mut value: T) -> T {
        // Snapshot under the lock so an observer may (un)subscribe freely.
        let snapshot: Vec<Arc<dyn Observer<T>>> = self.registry().clone();

        for observer in snapshot {
            observer.notify(&mut value);
        }
        value
    }

    pub fn observer_count(&self) -> usize {
        self.registry().len()
    }
}

/// Handle returned by [`Publisher::subscribe`]; cancelling it removes the
/// registration.
pub struct Subscription<'a, T> {
    publisher: &'a Publisher<T>,
    observer: Arc<dyn Observer<T>>,
}

impl<T> Subscription<'_, T> {
    /// Unsubscribe the observer this handle was created for.
    pub fn cancel(self) -> bool {
        self.publisher.unsubscribe(&self.observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Arc<dyn Observer<u32>> {
        let log = Arc::clone(log);
        FnObserver::new(move |_: &mut u32| log.lock().unwrap().push(tag))
    }

    #[test]
    fn observers_run_in_registration_order() {
        let publisher = Publisher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        publisher.subscribe(recorder(&log, "first"));
        publisher.subscribe(recorder(&log, "second"));
        publisher.subscribe(recorder(&log, "third"));

        publisher.publish(0u32);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn subscribe_is_idempotent() {
        let publisher = Publisher::new();
        let observer: Arc<dyn Observer<u32>> = FnObserver::new(|_: &mut u32| {});

        assert!(publisher.subscribe(Arc::clone(&observer)).is_some());
        assert!(publisher.subscribe(Arc::clone(&observer)).is_none());
        assert_eq!(publisher.observer_count(), 1);
    }

    #[test]
    fn unsubscribe_removes_exactly_one_registration() {
        let publisher = Publisher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let kept = recorder(&log, "kept");
        let removed = recorder(&log, "removed");
        publisher.subscribe(Arc::clone(&kept));
        publisher.subscribe(Arc::clone(&removed));

        assert!(publisher.unsubscribe(&removed));
        assert!(!publisher.unsubscribe(&removed));

        publisher.publish(0u32);
        assert_eq!(*log.lock().unwrap(), vec!["kept"]);
    }

    #[test]
    fn cancelling_a_subscription_unsubscribes() {
        let publisher = Publisher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handle = publisher.subscribe(recorder(&log, "gone")).expect("fresh");
        assert!(handle.cancel());

        publisher.publish(0u32);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn publish_returns_the_value_after_observer_mutation() {
        let publisher = Publisher::new();
        publisher.subscribe(FnObserver::new(|value: &mut u32| *value += 1));
        publisher.subscribe(FnObserver::new(|value: &mut u32| *value *= 10));

        // Observers see each other's mutations, in order.
        assert_eq!(publisher.publish(4u32), 50);
    }

    #[test]
    fn publish_with_no_observers_is_a_pass_through() {
        let publisher: Publisher<u32> = Publisher::new();
        assert_eq!(publisher.publish(7), 7);
    }

    #[test]
    fn a_panicking_observer_does_not_corrupt_the_registry() {
        let publisher = Publisher::new();
        let failing = publisher
            .subscribe(FnObserver::new(|_: &mut u32| panic!("observer failure")))
            .expect("fresh");

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            publisher.publish(1u32);
        }));
        assert!(outcome.is_err());

        // The registry is still usable: the failing observer can be removed
        // and publishing resumes.
        assert!(failing.cancel());
        assert_eq!(publisher.publish(4u32), 4);
    }
}
