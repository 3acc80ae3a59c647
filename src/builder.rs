//! # Builder Module
//!
//! The fluent configuration API of [`Client`].
//!
//! ## Overview
//!
//! Every setter consumes the client and returns it, so a whole batch can be
//! described in one expression. Setters are last-writer-wins: calling
//! `cookie` twice keeps the second value, and headers are keyed by name so
//! setting one again replaces it. The options are frozen into the run's
//! [`RequestConfig`] when the run starts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_multi::Client;
//! use std::time::Duration;
//!
//! let client = Client::new("https://example.com/login")
//!     .add_url(vec!["https://example.com/a", "https://example.com/b"])
//!     .max_concurrency(8)
//!     .follow_redirects()
//!     .timeout(Duration::from_millis(2500))
//!     .raw_headers("Accept: text/html\nAccept-Language: en")
//!     .cookie_pairs([("session", "abc123")])
//!     .user_agent("spider-multi/0.1")
//!     .post(vec![("user", "me"), ("pass", "secret")]);
//! ```

use crate::client::{Client, IntoUrls};
use crate::config::{Method, RedirectPolicy, RequestBody, RequestConfig, DEFAULT_MAX_REDIRECTS};
use crate::middleware::{AfterCompleteFn, BeforeAdmitFn, Middleware};
use crate::response::ResultRecord;
use crate::transport::Transport;
use std::time::Duration;

impl<T: Transport> Client<T> {
    /// Appends one or many URLs to the queue.
    pub fn add_url(mut self, urls: impl IntoUrls) -> Self {
        self.enqueue(urls);
        self
    }

    /// Sets the maximum number of requests in flight. Zero is treated as one.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.scheduler.set_max_concurrency(limit);
        self
    }

    /// Sets the hook fired before each admission with the current in-flight count.
    pub fn before_middleware<F>(mut self, hook: F) -> Self
    where
        F: FnMut(usize) + Send + 'static,
    {
        self.middlewares.set_before(Box::new(BeforeAdmitFn(hook)));
        self
    }

    /// Sets the hook fired after each completion with the current in-flight
    /// count and the parsed result.
    pub fn after_middleware<F>(mut self, hook: F) -> Self
    where
        F: FnMut(usize, &ResultRecord) + Send + 'static,
    {
        self.middlewares.set_after(Box::new(AfterCompleteFn(hook)));
        self
    }

    /// Adds a middleware to the chain.
    pub fn add_middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// Replaces every request option at once.
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    /// Routes every request through an HTTP proxy given as `host:port`.
    pub fn proxy(mut self, proxy: &str) -> Self {
        self.config.set_proxy(proxy);
        self
    }

    /// Sets the redirect limit: `0` disables following, `-1` follows without limit.
    pub fn redirects(mut self, limit: i64) -> Self {
        self.config.set_redirects(RedirectPolicy::from_limit(limit));
        self
    }

    /// Follows up to 20 redirects.
    pub fn follow_redirects(mut self) -> Self {
        self.config
            .set_redirects(RedirectPolicy::Limited(DEFAULT_MAX_REDIRECTS));
        self
    }

    /// Sets the per-request timeout. `Duration::ZERO` removes the limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.set_timeout(timeout);
        self
    }

    pub fn cookie(mut self, cookie: &str) -> Self {
        self.config.set_cookie(cookie);
        self
    }

    /// Sets the cookie from name/value pairs, joined as `k1=v1; k2=v2`.
    pub fn cookie_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.config.set_cookie_pairs(pairs);
        self
    }

    /// Toggles TCP tuning (disables Nagle's algorithm).
    pub fn tcp_options(mut self, enabled: bool) -> Self {
        self.config.set_tcp_nodelay(enabled);
        self
    }

    /// Adds headers from `Name: value` lines.
    pub fn raw_headers(mut self, text: &str) -> Self {
        self.config.set_raw_headers(text);
        self
    }

    pub fn set_header(mut self, name: &str, value: &str) -> Self {
        self.config.set_header(name, value);
        self
    }

    pub fn headers<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in pairs {
            self.config.set_header(name.as_ref(), value.as_ref());
        }
        self
    }

    pub fn referer(mut self, referer: &str) -> Self {
        self.config.set_referer(referer);
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.config.set_user_agent(user_agent);
        self
    }

    /// Toggles TLS certificate verification.
    pub fn verify_tls(mut self, enabled: bool) -> Self {
        self.config.set_verify_tls(enabled);
        self
    }

    /// Sets the upper bound on each wait for transfer progress.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn post(self, body: impl Into<RequestBody>) -> Self {
        self.with_body(Method::Post, body.into())
    }

    pub fn put(self, body: impl Into<RequestBody>) -> Self {
        self.with_body(Method::Put, body.into())
    }

    pub fn delete(self, body: impl Into<RequestBody>) -> Self {
        self.with_body(Method::Delete, body.into())
    }

    pub fn patch(self, body: impl Into<RequestBody>) -> Self {
        self.with_body(Method::Patch, body.into())
    }

    pub fn options(self, body: impl Into<RequestBody>) -> Self {
        self.with_body(Method::Options, body.into())
    }

    fn with_body(mut self, method: Method, body: RequestBody) -> Self {
        self.config.set_body(method, body);
        self
    }
}
