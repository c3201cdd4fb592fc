//! Signal traits and the thread-safe `ValueSignal` implementation.

use crate::error::{Emission, SignalError};
use crate::storage::{Listeners, Unsubscribe};
use parking_lot::{ReentrantMutex, RwLock};
use std::fmt;
use std::sync::Arc;

/// An observable value container.
///
/// `value` never blocks on emission; `subscribe` registers a listener that is
/// called with every later emission, on whatever thread produced it.
pub trait Signal<T>: Send + Sync {
    /// Read the current value.
    fn value(&self) -> T;

    /// Register a listener for every later emission.
    fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Emission<T>) + Send + Sync + 'static;
}

/// A signal whose value can be written, notifying its listeners.
pub trait MutableSignal<T>: Signal<T> {
    fn set(&self, value: T);
}

struct SignalInner<T> {
    value: RwLock<T>,
    listeners: Listeners<Emission<T>>,
    /// Serializes emissions so every listener observes them in write order.
    emitting: ReentrantMutex<()>,
}

/// A reactive signal that holds a value of type `T`.
///
/// Handles are cheap to clone and share the same value. Writes may come from
/// any thread.
///
/// ```rust,no_run
/// use attach_signals::prelude::*;
///
/// let count = ValueSignal::new(0);
/// let _unsubscribe = count.subscribe(|emission| println!("{emission:?}"));
/// count.set(1);
/// ```
pub struct ValueSignal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for ValueSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for ValueSignal<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for ValueSignal<T> {}

impl ValueSignal<bool> {
    /// Toggle the boolean value of the signal.
    pub fn toggle(&self) {
        self.update(|v| *v = !*v);
    }
}

impl<T: Clone + Send + Sync + 'static> ValueSignal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                value: RwLock::new(value),
                listeners: Listeners::new(),
                emitting: ReentrantMutex::new(()),
            }),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Set the signal to a new value and notify all listeners.
    pub fn set(&self, value: T) {
        let _emitting = self.inner.emitting.lock();
        *self.inner.value.write() = value.clone();
        self.inner.listeners.notify(&Ok(value));
    }

    /// Set the signal only if the value has changed.
    ///
    /// Returns true if the value was updated.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let _emitting = self.inner.emitting.lock();
        let should_update = self.with(|current| current != &value);
        if should_update {
            self.set(value);
        }
        should_update
    }

    /// Update the value in place and notify all listeners.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.update_with(f);
    }

    /// Update the value in place, notify, and return the closure's result.
    pub fn update_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _emitting = self.inner.emitting.lock();
        let (result, value) = {
            let mut guard = self.inner.value.write();
            let result = f(&mut guard);
            (result, guard.clone())
        };
        self.inner.listeners.notify(&Ok(value));
        result
    }

    /// Emit a failure to all listeners. The current value is kept.
    pub fn fail(&self, error: SignalError) {
        let _emitting = self.inner.emitting.lock();
        self.inner.listeners.notify(&Err(error));
    }

    /// Read the value with a closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Convert this signal to a read-only signal.
    pub fn read_only(&self) -> ReadOnlySignal<T> {
        ReadOnlySignal {
            inner: self.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> for ValueSignal<T> {
    fn value(&self) -> T {
        self.get()
    }

    fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Emission<T>) + Send + Sync + 'static,
    {
        self.inner.listeners.insert(listener)
    }
}

impl<T: Clone + Send + Sync + 'static> MutableSignal<T> for ValueSignal<T> {
    fn set(&self, value: T) {
        ValueSignal::set(self, value);
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for ValueSignal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + fmt::Debug + 'static> fmt::Debug for ValueSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSignal")
            .field("value", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A read-only view of a signal.
///
/// This prevents accidental writes while still allowing reads and subscriptions.
pub struct ReadOnlySignal<T> {
    inner: ValueSignal<T>,
}

impl<T> Clone for ReadOnlySignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for ReadOnlySignal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Eq for ReadOnlySignal<T> {}

impl<T: Clone + Send + Sync + 'static> ReadOnlySignal<T> {
    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> for ReadOnlySignal<T> {
    fn value(&self) -> T {
        self.inner.get()
    }

    fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&Emission<T>) + Send + Sync + 'static,
    {
        self.inner.subscribe(listener)
    }
}

impl<T: Clone + Send + Sync + fmt::Debug + 'static> fmt::Debug for ReadOnlySignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlySignal")
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::thread;

    fn record<T: Clone + Send + Sync + 'static>(
        signal: &impl Signal<T>,
    ) -> (Arc<Mutex<Vec<Emission<T>>>>, Unsubscribe) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let unsubscribe =
            signal.subscribe(move |emission| seen_clone.lock().push(emission.clone()));
        (seen, unsubscribe)
    }

    #[test]
    fn test_signal_creation() {
        let signal = ValueSignal::new(42);
        assert_eq!(signal.get(), 42);
        assert_eq!(signal.value(), 42);
    }

    #[test]
    fn test_signal_set_notifies() {
        let signal = ValueSignal::new(0);
        let (seen, _unsubscribe) = record(&signal);

        signal.set(1);
        signal.set(2);
        signal.set(3);

        assert_eq!(*seen.lock(), vec![Ok(1), Ok(2), Ok(3)]);
    }

    #[test]
    fn test_signal_update_with() {
        let signal = ValueSignal::new(5);
        let result = signal.update_with(|n| {
            *n += 2;
            *n
        });
        assert_eq!(result, 7);
        assert_eq!(signal.get(), 7);
    }

    #[test]
    fn test_signal_with() {
        let signal = ValueSignal::new(String::from("hello"));
        assert_eq!(signal.with(|s| s.len()), 5);
    }

    #[test]
    fn test_signal_fail_keeps_value() {
        let signal = ValueSignal::new(1);
        let (seen, _unsubscribe) = record(&signal);

        signal.fail(SignalError::new("boom"));

        assert_eq!(*seen.lock(), vec![Err(SignalError::new("boom"))]);
        assert_eq!(signal.get(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let signal = ValueSignal::new(0);
        let (seen, mut unsubscribe) = record(&signal);

        signal.set(1);
        unsubscribe.remove();
        signal.set(2);

        assert_eq!(*seen.lock(), vec![Ok(1)]);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_listener_can_set_reentrantly() {
        let signal = ValueSignal::new(0);
        let echo = signal.clone();
        let _unsubscribe = signal.subscribe(move |emission| {
            if let Ok(1) = emission {
                echo.set(2);
            }
        });

        signal.set(1);
        assert_eq!(signal.get(), 2);
    }

    #[test]
    fn test_set_from_other_thread() {
        let signal = ValueSignal::new(0);
        let (seen, _unsubscribe) = record(&signal);

        let writer = signal.clone();
        thread::spawn(move || {
            for i in 1..=100 {
                writer.set(i);
            }
        })
        .join()
        .unwrap();

        let expected: Vec<Emission<i32>> = (1..=100).map(Ok).collect();
        assert_eq!(*seen.lock(), expected);
    }

    #[test]
    fn test_read_only_signal() {
        let signal = ValueSignal::new(42);
        let read_only = signal.read_only();
        let (seen, _unsubscribe) = record(&read_only);

        signal.set(43);
        assert_eq!(read_only.get(), 43);
        assert_eq!(*seen.lock(), vec![Ok(43)]);
    }

    #[test]
    fn test_signal_toggle() {
        let signal = ValueSignal::new(false);
        signal.toggle();
        assert!(signal.get());
        signal.toggle();
        assert!(!signal.get());
    }

    #[test]
    fn test_signal_set_if_changed() {
        let signal = ValueSignal::new(5);
        let (seen, _unsubscribe) = record(&signal);

        assert!(!signal.set_if_changed(5));
        assert!(signal.set_if_changed(6));
        assert_eq!(signal.get(), 6);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_signal_eq() {
        let s1 = ValueSignal::new(10);
        let s2 = s1.clone();
        let s3 = ValueSignal::new(10);

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
    }
}
