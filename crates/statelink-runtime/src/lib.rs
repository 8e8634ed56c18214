#![forbid(unsafe_code)]

//! State-dispatch bindings for statelink.
//!
//! A [`StateDispatchBinding`] wires an element event to a store:
//!
//! - on each event occurrence it evaluates the bound expression with the
//!   event visible as `$event`, decodes the result into an
//!   [`ActionDescriptor`] and dispatches it without waiting;
//! - on each store commit it writes the new state into the scope it derived
//!   at bind time, so readers holding that scope see the update.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use statelink_core::{Element, Event, ObjectRef, Scope};
//! use statelink_expr::{AstEvaluator, Expr};
//! use statelink_harness::MemoryStore;
//! use statelink_runtime::StateDispatchBinding;
//!
//! let button = Element::new("button#inc");
//! let store = MemoryStore::new(json!({"count": 0}));
//! let expr = Expr::object([
//!     ("type", Expr::lit("inc")),
//!     ("params", Expr::array([Expr::ident("$event").member("detail")])),
//! ]);
//! let binding = StateDispatchBinding::new(AstEvaluator, expr, button.clone(), "click", store.clone());
//!
//! binding.bind(&Scope::new(ObjectRef::new())).unwrap();
//! button.dispatch_event(&Event::with_detail("click", json!(2))).unwrap();
//!
//! let sent = store.dispatched();
//! assert_eq!(sent[0].action, "inc");
//! assert_eq!(sent[0].params, vec![json!(2)]);
//! ```

pub mod action;
pub mod binding;
pub mod config;
pub mod error;
pub mod limit;
pub mod state_scope;

pub use action::{ActionDescriptor, DispatchResult};
pub use binding::{DispatchBindingBuilder, StateDispatchBinding};
pub use config::{BindingOptions, DEFAULT_EVENT_KEY};
pub use error::{BindingError, ConfigError};
pub use limit::{Clock, DEFAULT_THROTTLE, Throttle, ThrottleBehavior};
pub use state_scope::create_state_binding_scope;
