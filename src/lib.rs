//! # Attach Signals
//!
//! Binds reactive signals to UI elements for exactly as long as the elements
//! are attached to a live UI.
//!
//! ## Features
//!
//! - **Lifecycle-aware**: one signal subscription per attach, torn down on detach
//! - **Context-correct**: every update runs under the owning UI context's lock,
//!   inline when the caller already holds it, queued otherwise
//! - **Ordered**: values reach a binding in the order the signal produced them
//! - **Explicit context passing**: no thread-local "current UI"
//!
//! ## Example
//!
//! ```rust,no_run
//! use attach_signals::prelude::*;
//!
//! let (session, mut driver) = SessionContext::new("main");
//! let label = Component::new("label");
//! let count = ValueSignal::new(0);
//!
//! let _binding = subscribe_values(&label, &count, true, |n: i32| println!("count = {n}"));
//! label.attach(session);
//!
//! count.set(1);
//! driver.run_pending();
//! ```

mod bind;
mod computed;
mod context;
mod element;
mod error;
mod signal;
mod storage;
mod subscriber;

pub use bind::{
    bind_two_way, effect2, effect3, BindExt, HasValue, TwoWayBinding, ValueChange,
    ValueChangeListener,
};
pub use computed::{combine2, combine3, map, Memo};
pub use context::{run_on_context, SessionContext, SessionDriver, Task, UiContext};
pub use element::{
    run_on_element, AttachEvent, AttachListener, Component, DetachListener, Downgrade,
    HasComponent, UiElement, WeakComponent,
};
pub use error::{BindError, Emission, Result, SignalError};
pub use signal::{MutableSignal, ReadOnlySignal, Signal, ValueSignal};
pub use storage::{Registration, Unsubscribe};
pub use subscriber::{subscribe, subscribe_values, Binding};

// Re-export the prelude
pub mod prelude {
    pub use crate::{
        bind_two_way, combine2, combine3, effect2, effect3, map, run_on_context, run_on_element,
        subscribe, subscribe_values, BindExt, Binding, Component, Downgrade, HasComponent, HasValue,
        Memo, MutableSignal, ReadOnlySignal, SessionContext, Signal, UiContext, UiElement,
        ValueSignal, WeakComponent,
    };
}
