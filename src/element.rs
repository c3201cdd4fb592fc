//! Elements with an attach/detach lifecycle.

use crate::context::{run_on_context, UiContext};
use crate::error::{BindError, Result};
use crate::storage::{Listeners, Registration};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Delivered to attach listeners when an element joins a live UI tree.
#[derive(Clone)]
pub struct AttachEvent {
    context: Arc<dyn UiContext>,
}

impl AttachEvent {
    pub fn new(context: Arc<dyn UiContext>) -> Self {
        Self { context }
    }

    /// The context owning the tree the element was attached to.
    pub fn context(&self) -> &Arc<dyn UiContext> {
        &self.context
    }
}

impl fmt::Debug for AttachEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachEvent").finish_non_exhaustive()
    }
}

pub type AttachListener = Box<dyn Fn(&AttachEvent) + Send + Sync>;
pub type DetachListener = Box<dyn Fn() + Send + Sync>;

/// A UI element that can be attached to and detached from a live UI tree,
/// possibly many times.
///
/// Attach and detach listeners are expected to run under the owning
/// context's lock.
pub trait UiElement: Send + Sync {
    fn on_attach(&self, listener: AttachListener) -> Registration;

    fn on_detach(&self, listener: DetachListener) -> Registration;

    /// The context of the tree the element is currently attached to.
    fn context(&self) -> Result<Arc<dyn UiContext>>;
}

/// Run `block` on the context currently owning `element`.
///
/// Fails with [`BindError::NotAttached`] when the element has no context.
pub fn run_on_element<E>(element: &E, block: impl FnOnce() + Send + 'static) -> Result<()>
where
    E: UiElement + ?Sized,
{
    let context = element.context()?;
    run_on_context(&*context, block);
    Ok(())
}

struct ComponentInner {
    id: String,
    context: RwLock<Option<Arc<dyn UiContext>>>,
    attach: Listeners<AttachEvent>,
    detach: Listeners<()>,
}

impl Drop for ComponentInner {
    fn drop(&mut self) {
        if self.context.get_mut().take().is_some() {
            tracing::trace!(element = %self.id, "dropped while attached; detaching");
            self.detach.notify(&());
        }
    }
}

/// The lifecycle core of a widget.
///
/// Widgets embed a `Component` and expose it through [`HasComponent`] to
/// become [`UiElement`]s.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

impl Component {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ComponentInner {
                id: id.into(),
                context: RwLock::new(None),
                attach: Listeners::new(),
                detach: Listeners::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn is_attached(&self) -> bool {
        self.inner.context.read().is_some()
    }

    /// Attach to the tree owned by `context` and fire attach listeners.
    ///
    /// Ignored if the component is already attached.
    pub fn attach(&self, context: Arc<dyn UiContext>) {
        {
            let mut current = self.inner.context.write();
            if current.is_some() {
                tracing::warn!(element = %self.inner.id, "attach ignored; already attached");
                return;
            }
            *current = Some(context.clone());
        }
        tracing::trace!(element = %self.inner.id, "attached");
        self.inner.attach.notify(&AttachEvent::new(context));
    }

    /// Leave the tree and fire detach listeners. No-op when detached.
    pub fn detach(&self) {
        if self.inner.context.write().take().is_none() {
            return;
        }
        tracing::trace!(element = %self.inner.id, "detached");
        self.inner.detach.notify(&());
    }
}

/// A handle to a [`Component`] that does not keep it alive.
#[derive(Clone)]
pub struct WeakComponent {
    inner: Weak<ComponentInner>,
}

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.inner.upgrade().map(|inner| Component { inner })
    }
}

impl fmt::Debug for WeakComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakComponent")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Elements that their own bindings can hold without keeping them alive.
///
/// A binding lives in the element's listeners, so a strong handle captured
/// there would form a cycle. Widgets hold their [`Component`] through a
/// [`WeakComponent`] in `Weak` and may keep their other state strongly.
pub trait Downgrade: Sized {
    type Weak: Send + Sync + 'static;

    fn downgrade(&self) -> Self::Weak;

    fn upgrade(weak: &Self::Weak) -> Option<Self>;
}

impl Downgrade for Component {
    type Weak = WeakComponent;

    fn downgrade(&self) -> WeakComponent {
        WeakComponent {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn upgrade(weak: &WeakComponent) -> Option<Self> {
        weak.upgrade()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Widgets built around a [`Component`].
pub trait HasComponent {
    fn component(&self) -> &Component;
}

impl HasComponent for Component {
    fn component(&self) -> &Component {
        self
    }
}

impl<W: HasComponent + Send + Sync> UiElement for W {
    fn on_attach(&self, listener: AttachListener) -> Registration {
        self.component().inner.attach.insert(listener)
    }

    fn on_detach(&self, listener: DetachListener) -> Registration {
        self.component().inner.detach.insert(move |_| listener())
    }

    fn context(&self) -> Result<Arc<dyn UiContext>> {
        let component = self.component();
        component
            .inner
            .context
            .read()
            .clone()
            .ok_or_else(|| BindError::NotAttached {
                element: component.id().to_string(),
            })
    }
}
