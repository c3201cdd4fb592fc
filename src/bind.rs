//! Property bindings built on [`subscribe`].
//!
//! One-property bindings, multi-signal effects and two-way value bindings are
//! thin layers over the lifecycle-aware subscriber; none of them adds
//! lifecycle logic of its own.

use crate::computed::{combine2, combine3};
use crate::element::{Downgrade, UiElement};
use crate::signal::{MutableSignal, Signal};
use crate::storage::Registration;
use crate::subscriber::{subscribe_values, Binding};
use std::fmt;

/// Fluent bindings for any [`UiElement`].
///
/// The element reaches `apply` through a weak handle, so a binding never
/// keeps its own element alive.
pub trait BindExt: UiElement + Downgrade {
    /// Apply every value of `signal` to this element, starting with the
    /// current one.
    fn bind<T, S>(&self, signal: &S, apply: impl Fn(&Self, T) + Send + Sync + 'static) -> Binding
    where
        Self: 'static,
        S: Signal<T> + Clone + 'static,
        T: Clone + Send + 'static,
    {
        let element = self.downgrade();
        subscribe_values(self, signal, true, move |value| match Self::upgrade(&element) {
            Some(element) => apply(&element, value),
            None => tracing::trace!("bound element dropped; value skipped"),
        })
    }

    /// Builder form of [`bind`](Self::bind): binds for the element's
    /// lifetime and returns the element.
    fn bound<T, S>(self, signal: &S, apply: impl Fn(&Self, T) + Send + Sync + 'static) -> Self
    where
        Self: 'static,
        S: Signal<T> + Clone + 'static,
        T: Clone + Send + 'static,
    {
        let _binding = self.bind(signal, apply);
        self
    }
}

impl<E: UiElement + Downgrade> BindExt for E {}

/// Run `f` with the values of both signals whenever either changes while
/// `element` is attached, and once immediately.
pub fn effect2<E, A, B, SA, SB>(
    element: &E,
    a: &SA,
    b: &SB,
    f: impl Fn(A, B) + Send + Sync + 'static,
) -> Binding
where
    E: UiElement + ?Sized,
    SA: Signal<A> + Clone + 'static,
    SB: Signal<B> + Clone + 'static,
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    subscribe_values(element, &combine2(a, b), true, move |(a, b)| f(a, b))
}

/// Three-signal form of [`effect2`].
pub fn effect3<E, A, B, C, SA, SB, SC>(
    element: &E,
    a: &SA,
    b: &SB,
    c: &SC,
    f: impl Fn(A, B, C) + Send + Sync + 'static,
) -> Binding
where
    E: UiElement + ?Sized,
    SA: Signal<A> + Clone + 'static,
    SB: Signal<B> + Clone + 'static,
    SC: Signal<C> + Clone + 'static,
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    subscribe_values(element, &combine3(a, b, c), true, move |(a, b, c)| f(a, b, c))
}

/// A value change reported by a [`HasValue`] widget.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange<V> {
    pub value: V,
    /// True when the change came from the end user rather than `set_value`.
    pub from_user: bool,
}

pub type ValueChangeListener<V> = Box<dyn Fn(&ValueChange<V>) + Send + Sync>;

/// A widget holding a user-editable value.
pub trait HasValue: UiElement {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn value(&self) -> Self::Value;

    fn set_value(&self, value: Self::Value);

    fn on_value_change(&self, listener: ValueChangeListener<Self::Value>) -> Registration;
}

/// Keep a widget's value and a signal in sync in both directions.
///
/// User edits are written into the signal from the widget's change callback,
/// which already runs under the context lock. Signal changes are applied to
/// the widget through the lifecycle-aware subscriber. Equal values are never
/// written back, so neither side echoes the other.
pub fn bind_two_way<W, S>(widget: &W, signal: &S) -> TwoWayBinding
where
    W: HasValue + Downgrade + 'static,
    S: MutableSignal<W::Value> + Clone + 'static,
{
    let to_widget = {
        let weak = widget.downgrade();
        subscribe_values(widget, signal, true, move |value: W::Value| {
            let Some(widget) = W::upgrade(&weak) else {
                return;
            };
            if widget.value() != value {
                widget.set_value(value);
            }
        })
    };

    let from_widget = {
        let signal = signal.clone();
        widget.on_value_change(Box::new(move |change: &ValueChange<W::Value>| {
            if change.from_user && signal.value() != change.value {
                signal.set(change.value.clone());
            }
        }))
    };

    TwoWayBinding {
        to_widget,
        from_widget,
    }
}

/// Both halves of a [`bind_two_way`] binding.
#[must_use = "dropping a TwoWayBinding keeps it in force; keep it to unbind"]
pub struct TwoWayBinding {
    to_widget: Binding,
    from_widget: Registration,
}

impl TwoWayBinding {
    pub fn unbind(&mut self) {
        self.to_widget.unbind();
        self.from_widget.remove();
    }
}

impl fmt::Debug for TwoWayBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoWayBinding")
            .field("to_widget", &self.to_widget)
            .field("from_widget", &self.from_widget)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionContext;
    use crate::element::{Component, HasComponent, WeakComponent};
    use crate::storage::Listeners;
    use crate::ValueSignal;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone)]
    struct Label {
        component: Component,
        text: Arc<Mutex<String>>,
    }

    impl Label {
        fn new() -> Self {
            Self {
                component: Component::new("label"),
                text: Arc::new(Mutex::new(String::new())),
            }
        }

        fn set_text(&self, text: impl Into<String>) {
            *self.text.lock() = text.into();
        }

        fn text(&self) -> String {
            self.text.lock().clone()
        }
    }

    impl HasComponent for Label {
        fn component(&self) -> &Component {
            &self.component
        }
    }

    impl Downgrade for Label {
        type Weak = (WeakComponent, Arc<Mutex<String>>);

        fn downgrade(&self) -> Self::Weak {
            (self.component.downgrade(), self.text.clone())
        }

        fn upgrade((component, text): &Self::Weak) -> Option<Self> {
            Some(Self {
                component: component.upgrade()?,
                text: text.clone(),
            })
        }
    }

    #[derive(Clone)]
    struct TextField {
        component: Component,
        value: Arc<Mutex<String>>,
        changes: Arc<Listeners<ValueChange<String>>>,
        programmatic_sets: Arc<Mutex<usize>>,
    }

    impl TextField {
        fn new() -> Self {
            Self {
                component: Component::new("text-field"),
                value: Arc::new(Mutex::new(String::new())),
                changes: Arc::new(Listeners::new()),
                programmatic_sets: Arc::new(Mutex::new(0)),
            }
        }

        /// Simulate the end user editing the field.
        fn type_text(&self, text: &str) {
            *self.value.lock() = text.to_string();
            self.changes.notify(&ValueChange {
                value: text.to_string(),
                from_user: true,
            });
        }
    }

    impl HasComponent for TextField {
        fn component(&self) -> &Component {
            &self.component
        }
    }

    impl Downgrade for TextField {
        type Weak = (
            WeakComponent,
            Arc<Mutex<String>>,
            Arc<Listeners<ValueChange<String>>>,
            Arc<Mutex<usize>>,
        );

        fn downgrade(&self) -> Self::Weak {
            (
                self.component.downgrade(),
                self.value.clone(),
                self.changes.clone(),
                self.programmatic_sets.clone(),
            )
        }

        fn upgrade((component, value, changes, sets): &Self::Weak) -> Option<Self> {
            Some(Self {
                component: component.upgrade()?,
                value: value.clone(),
                changes: changes.clone(),
                programmatic_sets: sets.clone(),
            })
        }
    }

    impl HasValue for TextField {
        type Value = String;

        fn value(&self) -> String {
            self.value.lock().clone()
        }

        fn set_value(&self, value: String) {
            *self.value.lock() = value.clone();
            *self.programmatic_sets.lock() += 1;
            self.changes.notify(&ValueChange {
                value,
                from_user: false,
            });
        }

        fn on_value_change(&self, listener: ValueChangeListener<String>) -> Registration {
            self.changes.insert(listener)
        }
    }

    #[test]
    fn test_bind_applies_initial_and_later_values() {
        let (session, _driver) = SessionContext::new("test");
        let name = ValueSignal::new("ada".to_string());
        let label = Label::new().bound(&name, |label, name: String| label.set_text(name));
        assert_eq!(label.text(), "ada");

        label.component.attach(session.clone());
        session.access(|| name.set("grace".to_string()));
        assert_eq!(label.text(), "grace");

        label.component.detach();
        name.set("linus".to_string());
        assert_eq!(label.text(), "grace");
    }

    #[test]
    fn test_bound_component_is_freed_on_drop() {
        let signal = ValueSignal::new(0);
        let component = Component::new("label").bound(&signal, |_, _: i32| {});
        let weak = component.downgrade();

        drop(component);
        assert!(weak.upgrade().is_none());
        signal.set(1);
    }

    #[test]
    fn test_dropping_attached_label_unsubscribes() {
        let (session, _driver) = SessionContext::new("test");
        let name = ValueSignal::new("ada".to_string());
        let label = Label::new().bound(&name, |label, name: String| label.set_text(name));
        let text = label.text.clone();
        label.component.attach(session.clone());
        assert_eq!(name.subscriber_count(), 1);

        let weak = label.component.downgrade();
        drop(label);
        assert!(weak.upgrade().is_none());
        assert_eq!(name.subscriber_count(), 0);

        session.access(|| name.set("grace".to_string()));
        assert_eq!(*text.lock(), "ada");
    }

    #[test]
    fn test_two_way_widget_is_freed_on_drop() {
        let signal = ValueSignal::new(String::new());
        let field = TextField::new();
        let _binding = bind_two_way(&field, &signal);
        let weak = field.component.downgrade();

        drop(field);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_effect2_combines_signals() {
        let (session, mut driver) = SessionContext::new("test");
        let first = ValueSignal::new("Ada".to_string());
        let last = ValueSignal::new("Lovelace".to_string());
        let label = Label::new();

        let target = label.clone();
        let _binding = effect2(&label, &first, &last, move |first, last| {
            target.set_text(format!("{first} {last}"))
        });
        assert_eq!(label.text(), "Ada Lovelace");

        label.component.attach(session);
        last.set("Byron".to_string());
        driver.run_pending();
        assert_eq!(label.text(), "Ada Byron");
    }

    #[test]
    fn test_effect3_combines_signals() {
        let (session, _driver) = SessionContext::new("test");
        let a = ValueSignal::new(1);
        let b = ValueSignal::new(2);
        let c = ValueSignal::new(3);
        let label = Label::new();

        let target = label.clone();
        let _binding = effect3(&label, &a, &b, &c, move |a, b, c| {
            target.set_text((a + b + c).to_string())
        });
        label.component.attach(session.clone());
        session.access(|| c.set(10));

        assert_eq!(label.text(), "13");
    }

    #[test]
    fn test_two_way_user_edit_updates_signal() {
        let (session, _driver) = SessionContext::new("test");
        let signal = ValueSignal::new("start".to_string());
        let field = TextField::new();
        let _binding = bind_two_way(&field, &signal);
        assert_eq!(field.value(), "start");

        field.component.attach(session.clone());
        session.access(|| field.type_text("typed"));

        assert_eq!(signal.get(), "typed");
        assert_eq!(*field.programmatic_sets.lock(), 1);
    }

    #[test]
    fn test_two_way_signal_updates_widget() {
        let (session, mut driver) = SessionContext::new("test");
        let signal = ValueSignal::new(String::new());
        let field = TextField::new();
        let _binding = bind_two_way(&field, &signal);

        field.component.attach(session);
        signal.set("remote".to_string());
        driver.run_pending();

        assert_eq!(field.value(), "remote");
        assert_eq!(signal.get(), "remote");
    }

    #[test]
    fn test_two_way_unbind() {
        let (session, _driver) = SessionContext::new("test");
        let signal = ValueSignal::new("a".to_string());
        let field = TextField::new();
        let mut binding = bind_two_way(&field, &signal);
        field.component.attach(session.clone());

        binding.unbind();
        session.access(|| {
            field.type_text("b");
            signal.set("c".to_string());
        });

        assert_eq!(signal.get(), "c");
        assert_eq!(field.value(), "b");
    }
}
