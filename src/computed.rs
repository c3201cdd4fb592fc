//! Derived signals (memos) built from other signals.

use crate::error::{Emission, SignalError};
use crate::signal::Signal;
use crate::storage::{Listeners, Unsubscribe};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::fmt;
use std::sync::Arc;

struct MemoInner<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<T>,
    listeners: Listeners<Emission<T>>,
    emitting: ReentrantMutex<()>,
    sources: Mutex<Vec<Unsubscribe>>,
}

impl<T: Clone + Send + Sync + 'static> MemoInner<T> {
    fn recompute(&self) {
        let _emitting = self.emitting.lock();
        let value = (self.compute)();
        *self.value.write() = value.clone();
        self.listeners.notify(&Ok(value));
    }

    fn forward(&self, error: SignalError) {
        let _emitting = self.emitting.lock();
        self.listeners.notify(&Err(error));
    }
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        for mut unsubscribe in self.sources.get_mut().drain(..) {
            unsubscribe.remove();
        }
    }
}

/// A signal whose value is computed from other signals.
///
/// The memo recomputes from its sources' current values whenever any of them
/// emits, then emits the result. A failure from a source is forwarded as-is.
/// When the last handle is dropped the memo unsubscribes from its sources.
///
/// Built with [`map`], [`combine2`] or [`combine3`].
pub struct Memo<T> {
    inner: Arc<MemoInner<T>>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for Memo<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Memo<T> {}

impl<T: Clone + Send + Sync + 'static> Memo<T> {
    /// Create a memo, computing its first value immediately.
    pub(crate) fn new(compute: impl Fn() -> T + Send + Sync + 'static) -> Self {
        let value = compute();
        Self {
            inner: Arc::new(MemoInner {
                compute: Box::new(compute),
                value: RwLock::new(value),
                listeners: Listeners::new(),
                emitting: ReentrantMutex::new(()),
                sources: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Recompute whenever `source` emits.
    pub(crate) fn track<S, X>(&self, source: &X)
    where
        S: 'static,
        X: Signal<S>,
    {
        let memo = Arc::downgrade(&self.inner);
        let unsubscribe = source.subscribe(move |emission: &Emission<S>| {
            let Some(memo) = memo.upgrade() else {
                return;
            };
            match emission {
                Ok(_) => memo.recompute(),
                Err(error) => memo.forward(error.clone()),
            }
        });
        self.inner.sources.lock().push(unsubscribe);
    }

    /// Get the current computed value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read the computed value with a closure.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> for Memo<T> {
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

impl<T: Clone + Send + Sync + fmt::Debug + 'static> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo").field("value", &self.get()).finish()
    }
}

/// Derive a signal by applying `f` to every value of `source`.
pub fn map<S, U, X>(source: &X, f: impl Fn(S) -> U + Send + Sync + 'static) -> Memo<U>
where
    X: Signal<S> + Clone + 'static,
    S: 'static,
    U: Clone + Send + Sync + 'static,
{
    let reader = source.clone();
    let memo = Memo::new(move || f(reader.value()));
    memo.track(source);
    memo
}

/// Combine two signals into a signal of their current values.
pub fn combine2<A, B, SA, SB>(a: &SA, b: &SB) -> Memo<(A, B)>
where
    SA: Signal<A> + Clone + 'static,
    SB: Signal<B> + Clone + 'static,
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let (read_a, read_b) = (a.clone(), b.clone());
    let memo = Memo::new(move || (read_a.value(), read_b.value()));
    memo.track(a);
    memo.track(b);
    memo
}

/// Combine three signals into a signal of their current values.
pub fn combine3<A, B, C, SA, SB, SC>(a: &SA, b: &SB, c: &SC) -> Memo<(A, B, C)>
where
    SA: Signal<A> + Clone + 'static,
    SB: Signal<B> + Clone + 'static,
    SC: Signal<C> + Clone + 'static,
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    let (read_a, read_b, read_c) = (a.clone(), b.clone(), c.clone());
    let memo = Memo::new(move || (read_a.value(), read_b.value(), read_c.value()));
    memo.track(a);
    memo.track(b);
    memo.track(c);
    memo
}
