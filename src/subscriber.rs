//! Lifecycle-aware subscriptions.
//!
//! [`subscribe`] ties a signal subscription to an element's attached
//! lifetime: every attach subscribes afresh, every detach unsubscribes, and
//! every emission reaches the callbacks on the element's context. A delivery
//! still queued when the element detaches runs as a no-op.

use crate::context::{run_on_context, UiContext};
use crate::element::{AttachEvent, UiElement};
use crate::error::{Emission, SignalError};
use crate::signal::Signal;
use crate::storage::{Registration, Unsubscribe};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct Handlers<T> {
    on_value: Box<dyn Fn(T) + Send + Sync>,
    on_error: Box<dyn Fn(SignalError) + Send + Sync>,
}

impl<T> Handlers<T> {
    fn dispatch(&self, emission: Emission<T>) {
        match emission {
            Ok(value) => (self.on_value)(value),
            Err(error) => (self.on_error)(error),
        }
    }
}

/// Delivery state for one attach/detach cycle.
struct Delivery {
    context: Arc<dyn UiContext>,
    live: AtomicBool,
    /// Deliveries handed to the context that have not run yet.
    queued: AtomicUsize,
}

impl Delivery {
    fn new(context: Arc<dyn UiContext>) -> Self {
        Self {
            context,
            live: AtomicBool::new(true),
            queued: AtomicUsize::new(0),
        }
    }

    fn deliver<T: Send + 'static>(
        self: &Arc<Self>,
        emission: Emission<T>,
        handlers: &Arc<Handlers<T>>,
    ) {
        if !self.live.load(Ordering::SeqCst) {
            tracing::trace!("emission after detach dropped");
            return;
        }

        let delivery = self.clone();
        let handlers = handlers.clone();
        let block = move || {
            delivery.queued.fetch_sub(1, Ordering::SeqCst);
            if delivery.live.load(Ordering::SeqCst) {
                handlers.dispatch(emission);
            } else {
                tracing::trace!("queued emission reached a detached element; skipped");
            }
        };

        // While earlier deliveries are still queued, queue behind them even if
        // this thread holds the lock, so inline runs never overtake them.
        if self.queued.fetch_add(1, Ordering::SeqCst) == 0 {
            run_on_context(&*self.context, block);
        } else {
            self.context.schedule(Box::new(block));
        }
    }
}

/// The live half of a binding: one signal subscription for one attach cycle.
struct ActiveSubscription {
    unsubscribe: Unsubscribe,
    delivery: Arc<Delivery>,
}

impl ActiveSubscription {
    fn cancel(mut self) {
        self.delivery.live.store(false, Ordering::SeqCst);
        self.unsubscribe.remove();
    }
}

type ActiveCell = Arc<Mutex<Option<ActiveSubscription>>>;

/// Subscribe `element` to `signal` for as long as the element is attached.
///
/// With `initial_call`, `on_value` runs once right away with the signal's
/// current value, on the calling thread. Afterwards each attach subscribes to
/// the signal and each detach unsubscribes. Values go to `on_value` and
/// failures to `on_error`, always on the context the element is attached to.
pub fn subscribe<E, S, T>(
    element: &E,
    signal: &S,
    initial_call: bool,
    on_value: impl Fn(T) + Send + Sync + 'static,
    on_error: impl Fn(SignalError) + Send + Sync + 'static,
) -> Binding
where
    E: UiElement + ?Sized,
    S: Signal<T> + Clone + 'static,
    T: Clone + Send + 'static,
{
    let handlers = Arc::new(Handlers {
        on_value: Box::new(on_value),
        on_error: Box::new(on_error),
    });
    if initial_call {
        (handlers.on_value)(signal.value());
    }

    let active: ActiveCell = Arc::new(Mutex::new(None));

    let on_attach = {
        let active = active.clone();
        let signal = signal.clone();
        element.on_attach(Box::new(move |event: &AttachEvent| {
            let delivery = Arc::new(Delivery::new(event.context().clone()));
            let unsubscribe = signal.subscribe({
                let delivery = delivery.clone();
                let handlers = handlers.clone();
                move |emission: &Emission<T>| delivery.deliver(emission.clone(), &handlers)
            });
            let replaced = active.lock().replace(ActiveSubscription {
                unsubscribe,
                delivery,
            });
            if let Some(replaced) = replaced {
                tracing::warn!("attach without detach; replacing subscription");
                replaced.cancel();
            }
            tracing::trace!("subscribed on attach");
        }))
    };

    let on_detach = {
        let active = active.clone();
        element.on_detach(Box::new(move || {
            let taken = active.lock().take();
            if let Some(subscription) = taken {
                subscription.cancel();
                tracing::trace!("unsubscribed on detach");
            }
        }))
    };

    Binding {
        on_attach,
        on_detach,
        active,
    }
}

/// [`subscribe`] with failures swallowed.
pub fn subscribe_values<E, S, T>(
    element: &E,
    signal: &S,
    initial_call: bool,
    on_value: impl Fn(T) + Send + Sync + 'static,
) -> Binding
where
    E: UiElement + ?Sized,
    S: Signal<T> + Clone + 'static,
    T: Clone + Send + 'static,
{
    subscribe(element, signal, initial_call, on_value, |error| {
        tracing::debug!(%error, "signal failure ignored");
    })
}

/// The registrations that keep a signal bound to an element.
///
/// Dropping a `Binding` leaves it in force for the element's lifetime; call
/// [`unbind`](Self::unbind) to end it early.
#[must_use = "dropping a Binding keeps it in force; keep it to unbind"]
pub struct Binding {
    on_attach: Registration,
    on_detach: Registration,
    active: ActiveCell,
}

impl Binding {
    /// Whether a signal subscription is live right now.
    pub fn is_subscribed(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Stop reacting to attach/detach and drop any live subscription.
    pub fn unbind(&mut self) {
        self.on_attach.remove();
        self.on_detach.remove();
        let taken = self.active.lock().take();
        if let Some(subscription) = taken {
            subscription.cancel();
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("bound", &self.on_attach.is_active())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
