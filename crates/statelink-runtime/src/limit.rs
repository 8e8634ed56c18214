#![forbid(unsafe_code)]

//! Rate limiting for a binding's event entry point.
//!
//! A [`ThrottleBehavior`] registered as a binding behavior (e.g. under the
//! name `"throttle"`) installs a [`Throttle`] on its host when the owning
//! expression is bound and removes it when unbound. While installed, event
//! occurrences arriving within the interval of the last admitted one are
//! dropped before the expression is evaluated.
//!
//! The interval defaults to [`DEFAULT_THROTTLE`]; the behavior's first
//! argument overrides it in milliseconds.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use statelink_core::{BindingBehavior, CallLimiter, EvalError, EvaluationHost, Scope, Value};
use web_time::Instant;

/// Time source.
pub type Clock = Rc<dyn Fn() -> Instant>;

/// Interval used when the behavior has no argument.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(200);

fn system_clock() -> Clock {
    Rc::new(Instant::now)
}

/// Admits at most one call per interval.
pub struct Throttle {
    interval: Duration,
    last: Cell<Option<Instant>>,
    clock: Clock,
}

impl Throttle {
    /// Throttle on the system clock.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, system_clock())
    }

    /// Throttle on a caller-supplied clock.
    #[must_use]
    pub fn with_clock(interval: Duration, clock: Clock) -> Self {
        Self {
            interval,
            last: Cell::new(None),
            clock,
        }
    }

    /// Configured interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl CallLimiter for Throttle {
    fn admit(&self) -> bool {
        let now = (self.clock)();
        match self.last.get() {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last.set(Some(now));
                true
            }
        }
    }
}

impl fmt::Debug for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .field("last", &self.last.get())
            .finish()
    }
}

/// Binding behavior that throttles the host's event entry point.
#[derive(Clone)]
pub struct ThrottleBehavior {
    clock: Clock,
}

impl ThrottleBehavior {
    /// Behavior using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Behavior whose throttles read `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }
}

impl Default for ThrottleBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ThrottleBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleBehavior").finish_non_exhaustive()
    }
}

impl BindingBehavior for ThrottleBehavior {
    fn bind(
        &self,
        _scope: &Scope,
        host: &dyn EvaluationHost,
        args: &[Value],
    ) -> Result<(), EvalError> {
        let interval = args
            .first()
            .and_then(Value::as_u64)
            .map_or(DEFAULT_THROTTLE, Duration::from_millis);
        host.limit(Rc::new(Throttle::with_clock(interval, Rc::clone(&self.clock))))
    }

    fn unbind(&self, _scope: &Scope, host: &dyn EvaluationHost) -> Result<(), EvalError> {
        host.unlimit();
        Ok(())
    }
}
