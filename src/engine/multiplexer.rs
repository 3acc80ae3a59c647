//! Contains the multiplexed transfer driver.
//!
//! The `Multiplexer` owns every transfer currently attached to a run. Each
//! transfer runs as a task in a `JoinSet`, so many sockets make progress on the
//! runtime's event loop while the scheduler keeps a single thread of control.
//! It exposes three operations:
//!
//! - `attach`: starts a transfer and returns its [`Handle`]
//! - `step`: waits (for at most the poll interval) until at least one transfer
//!   finishes, then collects every other transfer that is already done
//! - `drain_completed`: hands back everything collected since the last drain
//!
//! Dropping the multiplexer aborts every transfer still in flight.

use crate::config::RequestConfig;
use crate::error::TransportError;
use crate::response::{Completion, Handle, TransferInfo};
use crate::transport::Transport;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{error, trace, warn};

/// Upper bound on a single `step` wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Attached {
    handle: Handle,
    url: String,
    started: Instant,
}

/// Drives all attached transfers of a run.
pub struct Multiplexer<T: Transport> {
    transport: Arc<T>,
    config: Arc<RequestConfig>,
    tasks: JoinSet<Completion>,
    attached: HashMap<task::Id, Attached>,
    completed: Vec<Completion>,
    next_handle: u64,
    poll_interval: Duration,
}

impl<T: Transport> Multiplexer<T> {
    pub fn new(transport: Arc<T>, config: Arc<RequestConfig>) -> Self {
        Self {
            transport,
            config,
            tasks: JoinSet::new(),
            attached: HashMap::new(),
            completed: Vec::new(),
            next_handle: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the bounded wait used by `step`. A zero interval is raised to one millisecond.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Starts a transfer for `url` using the run's configuration.
    pub fn attach(&mut self, url: String) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;

        let transport = Arc::clone(&self.transport);
        let config = Arc::clone(&self.config);
        let task_url = url.clone();
        let abort_handle = self.tasks.spawn(async move {
            let started = Instant::now();
            match transport.perform(&task_url, &config).await {
                Ok(transfer) => Completion {
                    handle,
                    url: task_url,
                    raw: transfer.raw,
                    error: None,
                    info: transfer.info,
                },
                Err(e) => {
                    let mut info = TransferInfo::for_url(&task_url);
                    info.total_time = started.elapsed();
                    Completion {
                        handle,
                        url: task_url,
                        raw: Vec::new(),
                        error: Some(e.to_string()),
                        info,
                    }
                }
            }
        });

        trace!("Attached transfer {} for {}", handle, url);
        self.attached.insert(
            abort_handle.id(),
            Attached {
                handle,
                url,
                started: Instant::now(),
            },
        );
        handle
    }

    /// Advances I/O until at least one transfer finishes or the poll interval
    /// elapses, then collects every transfer that is already done.
    ///
    /// Returns `true` while transfers remain active.
    pub async fn step(&mut self) -> bool {
        if self.tasks.is_empty() {
            return false;
        }

        match tokio::time::timeout(self.poll_interval, self.tasks.join_next_with_id()).await {
            Ok(Some(result)) => self.collect(result),
            Ok(None) => {}
            Err(_) => trace!(
                "Poll interval of {:?} elapsed with {} transfers active",
                self.poll_interval,
                self.tasks.len()
            ),
        }
        while let Some(result) = self.tasks.try_join_next_with_id() {
            self.collect(result);
        }

        !self.tasks.is_empty()
    }

    fn collect(&mut self, result: Result<(task::Id, Completion), JoinError>) {
        match result {
            Ok((id, completion)) => {
                if self.attached.remove(&id).is_none() {
                    warn!("Transfer {} finished without being tracked", completion.handle);
                }
                self.completed.push(completion);
            }
            Err(err) => {
                let Some(attached) = self.attached.remove(&err.id()) else {
                    error!("Untracked transfer task failed: {}", err);
                    return;
                };
                error!("Transfer {} for {} failed: {}", attached.handle, attached.url, err);
                let mut info = TransferInfo::for_url(&attached.url);
                info.total_time = attached.started.elapsed();
                self.completed.push(Completion {
                    handle: attached.handle,
                    error: Some(TransportError::Aborted(err.to_string()).to_string()),
                    url: attached.url,
                    raw: Vec::new(),
                    info,
                });
            }
        }
    }

    /// Removes and returns every transfer collected since the last drain.
    pub fn drain_completed(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completed)
    }

    /// Number of transfers still running.
    pub fn active(&self) -> usize {
        self.tasks.len()
    }
}
