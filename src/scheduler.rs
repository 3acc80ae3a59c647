//! # Scheduler Module
//!
//! Implements the admission loop that drains the pending URL queue through
//! the multiplexer under a concurrency bound.
//!
//! ## Overview
//!
//! The `Scheduler` owns the FIFO queue of URLs waiting to be fetched. A call to
//! [`Scheduler::run`] repeatedly:
//!
//! 1. admits URLs from the front of the queue while fewer than
//!    `max_concurrency` requests are in flight, firing `before_admit` hooks,
//! 2. steps the multiplexer (the only point where the run suspends, for at
//!    most the poll interval),
//! 3. drains every finished transfer, parses it into a [`ResultRecord`] and
//!    fires `after_complete` hooks,
//!
//! and returns once the queue is empty and nothing is in flight.
//!
//! ## Guarantees
//!
//! - The in-flight count never exceeds `max_concurrency`, which is at least 1.
//! - Every admitted URL is drained exactly once; hooks fire exactly once per
//!   admission and once per completion, in the order they happen.
//! - Completion order follows transfer readiness, not admission order.
//! - Transfer failures are recorded on their result and never stop the run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_multi::{Scheduler, Multiplexer, MiddlewareManager, StatCollector};
//!
//! let mut scheduler = Scheduler::new(4);
//! scheduler.enqueue(vec!["https://example.com/a".to_string()]);
//!
//! let mut mux = Multiplexer::new(transport, config);
//! let outcome = scheduler
//!     .run(&mut mux, &mut MiddlewareManager::default(), &StatCollector::new())
//!     .await;
//! assert!(scheduler.is_empty());
//! ```

use crate::engine::response_parser::parse_completion;
use crate::engine::{MiddlewareManager, Multiplexer};
use crate::response::{Handle, ResultRecord};
use crate::stats::StatCollector;
use crate::transport::Transport;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, trace, warn};

/// Summary of one call to [`Scheduler::run`].
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub admitted: usize,
    pub completed: usize,
    pub failed: usize,
    /// The most recently drained result.
    pub last: Option<ResultRecord>,
}

/// Owns the pending queue and enforces the concurrency bound.
#[derive(Debug)]
pub struct Scheduler {
    pending: VecDeque<String>,
    max_concurrency: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Scheduler {
    /// Creates a scheduler. A bound of zero is treated as one.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            max_concurrency: coerce_bound(max_concurrency),
        }
    }

    pub fn set_max_concurrency(&mut self, max_concurrency: usize) {
        self.max_concurrency = coerce_bound(max_concurrency);
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Appends URLs to the back of the queue.
    pub fn enqueue<I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.pending.len();
        self.pending.extend(urls);
        let added = self.pending.len() - before;
        trace!("Enqueued {} URLs, {} pending", added, self.pending.len());
        added
    }

    /// Drops every queued URL past the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.pending.truncate(len);
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains the queue through `mux`, returning once every admitted request
    /// has completed and the queue is empty.
    pub async fn run<T: Transport>(
        &mut self,
        mux: &mut Multiplexer<T>,
        middlewares: &mut MiddlewareManager,
        stats: &StatCollector,
    ) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        stats.reset_request_times();
        if self.pending.is_empty() {
            debug!("Scheduler run requested with an empty queue");
            return outcome;
        }

        info!(
            "Scheduler run started with {} pending URLs and max concurrency {}",
            self.pending.len(),
            self.max_concurrency
        );

        let mut in_flight: HashMap<Handle, String> = HashMap::new();
        loop {
            self.admit(mux, middlewares, stats, &mut in_flight, &mut outcome);
            if in_flight.is_empty() {
                break;
            }

            mux.step().await;

            for completion in mux.drain_completed() {
                if in_flight.remove(&completion.handle).is_none() {
                    warn!(
                        "Ignoring completion for unknown transfer {} ({})",
                        completion.handle, completion.url
                    );
                    continue;
                }

                let record = parse_completion(completion);
                record_completion(stats, &record);
                match &record.error {
                    Some(error) => {
                        outcome.failed += 1;
                        debug!("Transfer for {} failed: {}", record.url, error);
                    }
                    None => debug!(
                        "Transfer for {} completed with status {} ({} body bytes)",
                        record.url,
                        record.info.http_status,
                        record.body.len()
                    ),
                }
                outcome.completed += 1;

                middlewares.process_completion(&record, in_flight.len());
                outcome.last = Some(record);
            }
        }

        stats.increment_runs_completed();
        info!(
            "Scheduler run finished. admitted={}, completed={}, failed={}",
            outcome.admitted, outcome.completed, outcome.failed
        );
        outcome
    }

    fn admit<T: Transport>(
        &mut self,
        mux: &mut Multiplexer<T>,
        middlewares: &mut MiddlewareManager,
        stats: &StatCollector,
        in_flight: &mut HashMap<Handle, String>,
        outcome: &mut RunOutcome,
    ) {
        while in_flight.len() < self.max_concurrency {
            let Some(url) = self.pending.pop_front() else {
                break;
            };

            middlewares.process_admit(&url, in_flight.len());
            let handle = mux.attach(url.clone());
            trace!("Admitted {} as transfer {}", url, handle);
            in_flight.insert(handle, url);

            outcome.admitted += 1;
            stats.increment_requests_admitted();
            stats.record_in_flight(in_flight.len());
        }
    }
}

fn coerce_bound(max_concurrency: usize) -> usize {
    if max_concurrency == 0 {
        warn!("max_concurrency of 0 would stall the queue, using 1");
        1
    } else {
        max_concurrency
    }
}

fn record_completion(stats: &StatCollector, record: &ResultRecord) {
    if let Some(handle) = record.handle {
        stats.record_request_time(handle, &record.url, record.info.total_time);
    }
    if record.is_success() {
        stats.increment_requests_succeeded();
        stats.increment_responses_received();
        stats.record_response_status(record.info.http_status);
        stats.add_bytes_downloaded(record.body.len());
    } else {
        stats.increment_requests_failed();
    }
}
