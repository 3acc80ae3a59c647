//! Hooks invoked by the scheduler around admission and completion.
//!
//! Middlewares run synchronously on the scheduler's driving loop, so they see
//! admissions and completions in exactly the order they happen. Each method
//! receives the in-flight count at the moment it fires: before the request is
//! attached for `before_admit`, and after the finished request was removed for
//! `after_complete`.

use crate::response::ResultRecord;

/// A hook pair around the lifecycle of every request in a run.
///
/// Both methods default to no-ops, so implementors only override what they
/// need.
pub trait Middleware: Send {
    /// Name used in log output.
    fn name(&self) -> &str {
        "middleware"
    }

    /// Called once per request, right before it is attached to the multiplexer.
    fn before_admit(&mut self, _url: &str, _in_flight: usize) {}

    /// Called once per request, right after its result was parsed.
    fn after_complete(&mut self, _record: &ResultRecord, _in_flight: usize) {}
}

/// Adapts a closure into a `before_admit` middleware.
pub struct BeforeAdmitFn<F>(pub F);

impl<F> Middleware for BeforeAdmitFn<F>
where
    F: FnMut(usize) + Send,
{
    fn name(&self) -> &str {
        "before_admit_fn"
    }

    fn before_admit(&mut self, _url: &str, in_flight: usize) {
        (self.0)(in_flight)
    }
}

/// Adapts a closure into an `after_complete` middleware.
pub struct AfterCompleteFn<F>(pub F);

impl<F> Middleware for AfterCompleteFn<F>
where
    F: FnMut(usize, &ResultRecord) + Send,
{
    fn name(&self) -> &str {
        "after_complete_fn"
    }

    fn after_complete(&mut self, record: &ResultRecord, in_flight: usize) {
        (self.0)(in_flight, record)
    }
}
