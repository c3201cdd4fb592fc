//! UI execution contexts and the dispatcher that marshals work onto them.
//!
//! A [`UiContext`] is the serialized execution domain of one live UI tree.
//! [`run_on_context`] runs a block inline when the caller already holds the
//! context's lock and queues it otherwise.
//!
//! [`SessionContext`] is a concrete context: work is queued on an unbounded
//! channel and pumped by a [`SessionDriver`], either synchronously with
//! [`SessionDriver::run_pending`] or as a future with [`SessionDriver::run`].

use futures::channel::mpsc;
use futures::StreamExt;
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A unit of work queued on a context.
pub type Task = Box<dyn FnOnce() + Send>;

/// The serialized execution context owning a UI tree.
pub trait UiContext: Send + Sync {
    /// Whether the calling thread currently holds this context's lock.
    fn has_lock(&self) -> bool;

    /// Queue `task` to run later under the lock, in submission order.
    ///
    /// Must not run `task` before returning. A detached context drops it.
    fn schedule(&self, task: Task);

    /// Whether the context still belongs to a live UI.
    fn is_attached(&self) -> bool {
        true
    }
}

/// Run `block` with exclusive access to the UI behind `context`.
///
/// Inline if the calling thread holds the lock, otherwise queued without
/// waiting. Work for a detached context is dropped silently.
pub fn run_on_context<C>(context: &C, block: impl FnOnce() + Send + 'static)
where
    C: UiContext + ?Sized,
{
    if context.has_lock() {
        block();
    } else if context.is_attached() {
        context.schedule(Box::new(block));
    } else {
        tracing::trace!("context detached; dropping work");
    }
}

/// A serialized execution context for one UI session.
pub struct SessionContext {
    name: String,
    lock: ReentrantMutex<()>,
    queue: Mutex<Option<mpsc::UnboundedSender<Task>>>,
    attached: AtomicBool,
}

impl SessionContext {
    /// Create a session and the driver that runs its queued work.
    pub fn new(name: impl Into<String>) -> (Arc<Self>, SessionDriver) {
        let (tx, rx) = mpsc::unbounded::<Task>();
        let session = Arc::new(Self {
            name: name.into(),
            lock: ReentrantMutex::new(()),
            queue: Mutex::new(Some(tx)),
            attached: AtomicBool::new(true),
        });
        tracing::debug!(session = %session.name, "session created");
        let driver = SessionDriver {
            session: session.clone(),
            tasks: rx,
        };
        (session, driver)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `f` holding the session lock.
    ///
    /// Re-entrant: when the calling thread already holds the lock, `f` runs
    /// inline.
    pub fn access<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock.lock();
        f()
    }

    /// Detach the session. Queued and future work is dropped.
    pub fn dispose(&self) {
        if self.attached.swap(false, Ordering::SeqCst) {
            self.queue.lock().take();
            tracing::debug!(session = %self.name, "session disposed");
        }
    }
}

impl UiContext for SessionContext {
    fn has_lock(&self) -> bool {
        self.lock.is_owned_by_current_thread()
    }

    fn schedule(&self, task: Task) {
        match &*self.queue.lock() {
            Some(tx) => {
                if tx.unbounded_send(task).is_err() {
                    tracing::trace!(session = %self.name, "driver gone; dropping task");
                }
            }
            None => tracing::trace!(session = %self.name, "session disposed; dropping task"),
        }
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("name", &self.name)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Runs the work queued on a [`SessionContext`], one task at a time, each
/// under the session lock.
pub struct SessionDriver {
    session: Arc<SessionContext>,
    tasks: mpsc::UnboundedReceiver<Task>,
}

impl SessionDriver {
    /// Run every task queued so far. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(Some(task)) = self.tasks.try_next() {
            if self.run_task(task) {
                ran += 1;
            }
        }
        ran
    }

    /// Run queued tasks as they arrive until the session is disposed.
    pub async fn run(mut self) {
        while let Some(task) = self.tasks.next().await {
            self.run_task(task);
        }
        tracing::debug!(session = %self.session.name, "driver stopped");
    }

    fn run_task(&self, task: Task) -> bool {
        if !self.session.is_attached() {
            tracing::trace!(session = %self.session.name, "session disposed; skipping task");
            return false;
        }
        self.session.access(task);
        true
    }
}
