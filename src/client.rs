//! The client facade.
//!
//! A [`Client`] accumulates URLs and request options through chained setters
//! (see `builder.rs`) and runs the whole batch the first time one of its result
//! accessors is awaited. It keeps only the most recently completed result;
//! callers that need every result register an `after_middleware` hook, which
//! receives each [`ResultRecord`] as it is drained.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_multi::Client;
//! use std::time::Duration;
//!
//! let mut client = Client::new(["https://example.com/a", "https://example.com/b"])
//!     .max_concurrency(2)
//!     .timeout(Duration::from_secs(5))
//!     .after_middleware(|in_flight, record| {
//!         println!("{} -> {} ({} still in flight)", record.url, record.http_status(), in_flight);
//!     });
//!
//! let status = client.http_status().await?;
//! ```

use crate::config::RequestConfig;
use crate::engine::{MiddlewareManager, Multiplexer, DEFAULT_POLL_INTERVAL};
use crate::error::HttpError;
use crate::response::{CookieMap, ResultRecord, TransferInfo};
use crate::scheduler::Scheduler;
use crate::state::RunState;
use crate::stats::StatCollector;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[cfg(feature = "reqwest-transport")]
use crate::transport::ReqwestTransport;

/// Builds the transport for a run from the finalized configuration.
pub(crate) type Connector<T> = Box<dyn Fn(&RequestConfig) -> T + Send + Sync>;

/// One or many URLs.
pub trait IntoUrls {
    fn into_urls(self) -> Vec<String>;
}

impl IntoUrls for &str {
    fn into_urls(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoUrls for String {
    fn into_urls(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoUrls for Vec<String> {
    fn into_urls(self) -> Vec<String> {
        self
    }
}

impl IntoUrls for Vec<&str> {
    fn into_urls(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoUrls for &[&str] {
    fn into_urls(self) -> Vec<String> {
        self.iter().map(|url| url.to_string()).collect()
    }
}

impl<const N: usize> IntoUrls for [&str; N] {
    fn into_urls(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl<const N: usize> IntoUrls for [String; N] {
    fn into_urls(self) -> Vec<String> {
        self.into_iter().collect()
    }
}

/// Bounded-concurrency batch client with lazily evaluated accessors.
pub struct Client<T: Transport> {
    pub(crate) scheduler: Scheduler,
    pub(crate) config: RequestConfig,
    pub(crate) middlewares: MiddlewareManager,
    pub(crate) connector: Connector<T>,
    pub(crate) poll_interval: Duration,
    state: RunState,
    record: ResultRecord,
    stats: Arc<StatCollector>,
}

#[cfg(feature = "reqwest-transport")]
impl Client<ReqwestTransport> {
    /// Creates a client backed by `reqwest`.
    pub fn new(urls: impl IntoUrls) -> Self {
        Self::with_transport(urls, ReqwestTransport::from_config)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client whose transport is built by `connector` at the start of every run.
    pub fn with_transport<F>(urls: impl IntoUrls, connector: F) -> Self
    where
        F: Fn(&RequestConfig) -> T + Send + Sync + 'static,
    {
        let stats = Arc::new(StatCollector::new());
        let mut scheduler = Scheduler::default();
        stats.add_requests_enqueued(scheduler.enqueue(urls.into_urls()));

        Client {
            scheduler,
            config: RequestConfig::default(),
            middlewares: MiddlewareManager::default(),
            connector: Box::new(connector),
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: RunState::NotRun,
            record: ResultRecord::default(),
            stats,
        }
    }

    pub(crate) fn enqueue(&mut self, urls: impl IntoUrls) {
        let added = self.scheduler.enqueue(urls.into_urls());
        self.stats.add_requests_enqueued(added);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<StatCollector> {
        Arc::clone(&self.stats)
    }

    /// Number of URLs still queued. Does not trigger a run.
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }

    /// Drops every queued URL past the first `len`.
    pub fn truncate_pending(&mut self, len: usize) {
        self.scheduler.truncate(len);
    }

    /// Fetches every queued URL and returns how many transfers completed.
    ///
    /// May be called again after URLs were added to a finished client. If the
    /// future is dropped before it resolves, in-flight transfers are aborted
    /// and the client stays in [`RunState::Running`]; every later call then
    /// fails with [`HttpError::RunInProgress`].
    pub async fn run(&mut self) -> Result<usize, HttpError> {
        if self.state.is_running() {
            warn!("Refusing to start a run while another one is in progress");
            return Err(HttpError::RunInProgress);
        }
        self.state = RunState::Running;

        let config = Arc::new(self.config.clone());
        let transport = Arc::new((self.connector)(config.as_ref()));
        let mut mux = Multiplexer::new(transport, config).with_poll_interval(self.poll_interval);

        let outcome = self
            .scheduler
            .run(&mut mux, &mut self.middlewares, &self.stats)
            .await;
        if let Some(record) = outcome.last {
            self.record = record;
        }

        self.state = RunState::Done;
        debug!("Client run finished, {} transfers completed", outcome.completed);
        Ok(outcome.completed)
    }

    async fn ensure_run(&mut self) -> Result<(), HttpError> {
        match self.state {
            RunState::NotRun => self.run().await.map(|_| ()),
            RunState::Running => Err(HttpError::RunInProgress),
            RunState::Done => Ok(()),
        }
    }

    /// The most recently completed result.
    pub async fn record(&mut self) -> Result<&ResultRecord, HttpError> {
        self.ensure_run().await?;
        Ok(&self.record)
    }

    pub async fn body(&mut self) -> Result<&[u8], HttpError> {
        self.ensure_run().await?;
        Ok(&self.record.body)
    }

    pub async fn header(&mut self) -> Result<&[u8], HttpError> {
        self.ensure_run().await?;
        Ok(&self.record.header)
    }

    pub async fn redirect_url(&mut self) -> Result<Option<&str>, HttpError> {
        self.ensure_run().await?;
        Ok(self.record.redirect_url())
    }

    pub async fn info(&mut self) -> Result<&TransferInfo, HttpError> {
        self.ensure_run().await?;
        Ok(&self.record.info)
    }

    pub async fn last_error(&mut self) -> Result<Option<&str>, HttpError> {
        self.ensure_run().await?;
        Ok(self.record.error.as_deref())
    }

    pub async fn http_status(&mut self) -> Result<u16, HttpError> {
        self.ensure_run().await?;
        Ok(self.record.http_status())
    }

    pub async fn cookies(&mut self) -> Result<CookieMap, HttpError> {
        self.ensure_run().await?;
        Ok(self.record.cookies())
    }
}
