//! Middleware Manager for ordered hook dispatch.
//!
//! Stores registered middlewares in a vector and runs them in registration
//! order before admission and in reverse order after completion. The closure
//! hooks set through `Client::before_middleware` / `Client::after_middleware`
//! live in dedicated slots so that setting them again replaces the previous
//! closure instead of stacking another one.

use crate::middleware::Middleware;
use crate::response::ResultRecord;
use tracing::trace;

type Slot = Option<Box<dyn Middleware>>;

/// Dispatches hooks to every registered middleware.
#[derive(Default)]
pub struct MiddlewareManager {
    middlewares: Vec<Box<dyn Middleware>>,
    before_slot: Slot,
    after_slot: Slot,
}

impl MiddlewareManager {
    pub fn new(middlewares: Vec<Box<dyn Middleware>>) -> Self {
        Self {
            middlewares,
            before_slot: None,
            after_slot: None,
        }
    }

    pub fn push(&mut self, middleware: Box<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn set_before(&mut self, middleware: Box<dyn Middleware>) {
        self.before_slot = Some(middleware);
    }

    pub fn set_after(&mut self, middleware: Box<dyn Middleware>) {
        self.after_slot = Some(middleware);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
            + usize::from(self.before_slot.is_some())
            + usize::from(self.after_slot.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every `before_admit` hook for a request about to be attached.
    pub fn process_admit(&mut self, url: &str, in_flight: usize) {
        let chain = self
            .before_slot
            .iter_mut()
            .chain(self.middlewares.iter_mut());
        for middleware in chain {
            trace!("Running before_admit of {} for {}", middleware.name(), url);
            middleware.before_admit(url, in_flight);
        }
    }

    /// Runs every `after_complete` hook in reverse order to match the admission chain.
    pub fn process_completion(&mut self, record: &ResultRecord, in_flight: usize) {
        let chain = self
            .middlewares
            .iter_mut()
            .rev()
            .chain(self.after_slot.iter_mut());
        for middleware in chain {
            trace!(
                "Running after_complete of {} for {}",
                middleware.name(),
                record.url
            );
            middleware.after_complete(record, in_flight);
        }
    }
}
