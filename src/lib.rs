//! # spider-multi
//!
//! Bounded-concurrency batch HTTP client.
//!
//! Queue any number of URLs, cap how many are in flight at once, and read the
//! outcome through accessors that run the whole batch on first use. Raw
//! responses are split into header and body, unfollowed redirect targets are
//! surfaced, and every `Set-Cookie` line is folded into a single cookie map.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_multi::{Client, HttpError};
//! use std::time::Duration;
//!
//! async fn fetch_all(urls: Vec<String>) -> Result<(), HttpError> {
//!     let mut client = Client::new(urls)
//!         .max_concurrency(4)
//!         .timeout(Duration::from_secs(5))
//!         .after_middleware(|in_flight, record| {
//!             println!("{} finished with {}, {} in flight", record.url, record.http_status(), in_flight);
//!         });
//!
//!     let cookies = client.cookies().await?;
//!     println!("last response set {} cookies", cookies.len());
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod prelude;
pub mod response;
pub mod scheduler;
pub mod state;
pub mod stats;
pub mod transport;

pub use client::{Client, IntoUrls};
pub use config::{Method, RedirectPolicy, RequestBody, RequestConfig};
pub use engine::{MiddlewareManager, Multiplexer};
pub use error::{HttpError, TransportError};
pub use middleware::{AfterCompleteFn, BeforeAdmitFn, Middleware};
pub use response::{
    Completion, CookieMap, CookieValue, Handle, RawTransfer, ResultRecord, TransferInfo,
};
pub use scheduler::{RunOutcome, Scheduler};
pub use state::RunState;
pub use stats::StatCollector;
pub use transport::Transport;

#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;

pub use async_trait::async_trait;
pub use tokio;
