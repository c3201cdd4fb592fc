//! Clock example demonstrating attach_signals.
//!
//! This example shows:
//! - A signal written from a background thread
//! - A session driver pumping the UI queue on its own thread
//! - Bindings that stop updating while the label is detached
//! - Combining signals into one effect
//!
//! Run with `RUST_LOG=attach_signals=trace` to see the lifecycle events.

use attach_signals::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct Label {
    component: Component,
    text: Arc<Mutex<String>>,
}

impl Label {
    fn new(id: &str) -> Self {
        Self {
            component: Component::new(id),
            text: Arc::new(Mutex::new(String::new())),
        }
    }

    fn set_text(&self, text: String) {
        println!("[{}] {}", self.component.id(), text);
        *self.text.lock() = text;
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

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (session, driver) = SessionContext::new("clock");
    let ui = thread::spawn(move || futures::executor::block_on(driver.run()));

    let seconds = ValueSignal::new(0u32);
    let paused = ValueSignal::new(false);

    let clock = Label::new("clock").bound(&seconds, |label, s: u32| {
        label.set_text(format!("{:02}:{:02}", s / 60, s % 60))
    });
    let status = Label::new("status");
    let target = status.clone();
    let _status = effect2(&status, &seconds, &paused, move |s: u32, paused: bool| {
        target.set_text(format!("{} after {s}s", if paused { "paused" } else { "running" }))
    });

    session.access(|| {
        clock.component.attach(session.clone());
        status.component.attach(session.clone());
    });

    let ticker = {
        let seconds = seconds.clone();
        thread::spawn(move || {
            for _ in 0..6 {
                thread::sleep(Duration::from_millis(100));
                seconds.update(|s| *s += 1);
            }
        })
    };

    thread::sleep(Duration::from_millis(250));
    session.access(|| clock.component.detach());
    paused.set(true);
    thread::sleep(Duration::from_millis(200));
    session.access(|| clock.component.attach(session.clone()));

    ticker.join().expect("ticker thread panicked");
    thread::sleep(Duration::from_millis(50));
    session.dispose();
    ui.join().expect("ui thread panicked");
}
