//! Listener registries and disposer handles.
//!
//! Listeners live in a slot map with generational keys, so a stale
//! [`Registration`] can never remove a listener that reused its slot.
//! Notification snapshots the listeners and calls them with the registry
//! unlocked, which lets a listener register or remove listeners re-entrantly.

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use std::fmt;
use std::sync::{Arc, Weak};

new_key_type! {
    /// Unique identifier for a listener in a registry.
    struct ListenerId;
}

/// Listener callback shared between the registry and notification snapshots.
pub(crate) type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

type Slots<A> = Mutex<SlotMap<ListenerId, Listener<A>>>;

/// A registry of listeners receiving `&A`.
pub(crate) struct Listeners<A> {
    slots: Arc<Slots<A>>,
}

impl<A: 'static> Listeners<A> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Register a listener; the returned handle removes it.
    pub fn insert(&self, listener: impl Fn(&A) + Send + Sync + 'static) -> Registration {
        let id = self.slots.lock().insert(Arc::new(listener));
        let slots: Weak<Slots<A>> = Arc::downgrade(&self.slots);
        Registration::new(move || {
            if let Some(slots) = slots.upgrade() {
                slots.lock().remove(id);
            }
        })
    }

    /// Call every listener registered at the time of the call.
    pub fn notify(&self, arg: &A) {
        let callbacks: Vec<Listener<A>> = self.slots.lock().values().cloned().collect();
        for callback in callbacks {
            callback(arg);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

impl<A: 'static> Default for Listeners<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for a registered listener.
///
/// Disposal is explicit: dropping a `Registration` leaves the listener in
/// place. [`Registration::remove`] may be called any number of times; only the
/// first call has an effect.
#[must_use = "dropping a Registration does not remove the listener"]
pub struct Registration {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

/// Handle returned by [`Signal::subscribe`](crate::Signal::subscribe).
pub type Unsubscribe = Registration;

impl Registration {
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// A handle that does nothing when removed.
    pub fn noop() -> Self {
        Self { remove: None }
    }

    /// Remove the listener. Later calls are no-ops.
    pub fn remove(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Whether [`remove`](Self::remove) still has something to do.
    pub fn is_active(&self) -> bool {
        self.remove.is_some()
    }
}

impl Default for Registration {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("active", &self.is_active())
            .finish()
    }
}
