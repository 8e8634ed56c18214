#![forbid(unsafe_code)]

//! Event targets and listeners.
//!
//! [`EventTarget`] is the registration surface a binding sees; [`Element`]
//! is a concrete, single-threaded implementation that keeps listeners per
//! event name and delivers [`Event`]s to them.
//!
//! # Invariants
//!
//! - Listeners for one event name are invoked in registration order.
//! - Registering the same listener twice for the same name is a no-op.
//! - Delivery iterates a snapshot: listeners added or removed while an event
//!   is being delivered take effect for the next event.
//!
//! # Failure Modes
//!
//! - A listener error does not stop delivery to later listeners. The first
//!   error is returned to the caller of [`Element::dispatch_event`]; later
//!   ones are logged.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use serde_json::json;

use crate::value::Value;

/// Global counter for event serials.
static EVENT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Error surfaced by a listener while handling an event.
pub type ListenerError = Box<dyn Error + 'static>;

/// A single event occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    detail: Value,
    serial: u64,
}

impl Event {
    /// Create an event with no detail payload.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_detail(kind, Value::Null)
    }

    /// Create an event carrying `detail`.
    #[must_use]
    pub fn with_detail(kind: impl Into<String>, detail: Value) -> Self {
        Self {
            kind: kind.into(),
            detail,
            serial: EVENT_SERIAL.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Event type name (e.g. `"click"`).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Detail payload.
    #[must_use]
    pub fn detail(&self) -> &Value {
        &self.detail
    }

    /// Process-unique serial number.
    #[inline]
    #[must_use]
    pub const fn serial(&self) -> u64 {
        self.serial
    }

    /// Expression-facing form: `{"type", "detail", "serial"}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "type": self.kind,
            "detail": self.detail,
            "serial": self.serial,
        })
    }
}

/// Receives events from an [`EventTarget`].
pub trait EventListener {
    /// Handle one occurrence of an event this listener registered for.
    ///
    /// # Errors
    ///
    /// Implementations return an error for failures that must reach the
    /// code that fired the event.
    fn handle_event(&self, event: &Event) -> Result<(), ListenerError>;
}

/// Something listeners can be attached to.
pub trait EventTarget {
    /// Register `listener` for events named `name`.
    fn add_event_listener(&self, name: &str, listener: Rc<dyn EventListener>);

    /// Remove a previously registered listener. Unknown listeners are ignored.
    fn remove_event_listener(&self, name: &str, listener: &Rc<dyn EventListener>);

    /// Human-readable label used in diagnostics.
    fn describe(&self) -> String;
}

fn same_listener(a: &Rc<dyn EventListener>, b: &Rc<dyn EventListener>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Concrete event target with a label and per-name listener lists.
pub struct Element {
    label: String,
    listeners: RefCell<AHashMap<String, Vec<Rc<dyn EventListener>>>>,
}

impl Element {
    /// Create an element labelled `label` (e.g. `"button#save"`).
    #[must_use]
    pub fn new(label: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            label: label.into(),
            listeners: RefCell::new(AHashMap::new()),
        })
    }

    /// The element's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of listeners registered for `name`.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.borrow().get(name).map_or(0, Vec::len)
    }

    /// Deliver `event` to every listener registered for its kind.
    ///
    /// Returns the number of listeners invoked.
    ///
    /// # Errors
    ///
    /// Returns the first listener error after all listeners have run.
    pub fn dispatch_event(&self, event: &Event) -> Result<usize, ListenerError> {
        let snapshot: Vec<Rc<dyn EventListener>> = self
            .listeners
            .borrow()
            .get(event.kind())
            .cloned()
            .unwrap_or_default();

        let mut first_error = None;
        for listener in &snapshot {
            if let Err(err) = listener.handle_event(event) {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    tracing::warn!(
                        target: "statelink::event",
                        element = %self.label,
                        event = event.kind(),
                        error = %err,
                        "additional listener error"
                    );
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(snapshot.len()),
        }
    }
}

impl EventTarget for Element {
    fn add_event_listener(&self, name: &str, listener: Rc<dyn EventListener>) {
        let mut listeners = self.listeners.borrow_mut();
        let entry = listeners.entry(name.to_owned()).or_default();
        if !entry.iter().any(|l| same_listener(l, &listener)) {
            entry.push(listener);
        }
    }

    fn remove_event_listener(&self, name: &str, listener: &Rc<dyn EventListener>) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(entry) = listeners.get_mut(name) {
            entry.retain(|l| !same_listener(l, listener));
            if entry.is_empty() {
                listeners.remove(name);
            }
        }
    }

    fn describe(&self) -> String {
        format!("<{}>", self.label)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut names: Vec<_> = listeners.keys().collect();
        names.sort();
        f.debug_struct("Element")
            .field("label", &self.label)
            .field("events", &names)
            .finish()
    }
}
