//! Request configuration shared by every transfer of a run.
//!
//! A `RequestConfig` is a plain bag of options. Each setter is last-writer-wins:
//! setting the cookie twice keeps only the second value, and headers are keyed
//! by name (case-insensitively) so re-setting a header replaces it in place.
//! The scheduler receives the finalized config behind an `Arc` and never
//! mutates it while a run is executing.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Redirect limit used by [`Client::follow_redirects`](crate::Client::follow_redirects).
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Transfer timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP verb used for every request of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the transport treats 3xx responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Redirects are reported through `redirect_url` but not followed.
    #[default]
    Off,
    Limited(usize),
    Unlimited,
}

impl RedirectPolicy {
    /// Maps a numeric limit: `0` disables following, any negative value
    /// follows without limit.
    pub fn from_limit(limit: i64) -> Self {
        match limit {
            0 => RedirectPolicy::Off,
            n if n < 0 => RedirectPolicy::Unlimited,
            n => RedirectPolicy::Limited(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    pub fn follows(&self) -> bool {
        !matches!(self, RedirectPolicy::Off)
    }
}

/// Payload sent with a non-GET verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Sent verbatim.
    Raw(String),
    /// Url-encoded as `k1=v1&k2=v2`.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    pub fn encode(&self) -> String {
        match self {
            RequestBody::Raw(text) => text.clone(),
            RequestBody::Form(pairs) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish(),
        }
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Raw(text.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Raw(text)
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for RequestBody {
    fn from(pairs: Vec<(K, V)>) -> Self {
        RequestBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<HashMap<String, String>> for RequestBody {
    fn from(map: HashMap<String, String>) -> Self {
        RequestBody::Form(map.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for RequestBody {
    fn from(map: BTreeMap<String, String>) -> Self {
        RequestBody::Form(map.into_iter().collect())
    }
}

/// Transport options applied identically to every request of a run.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    headers: Vec<(String, String)>,
    cookie: Option<String>,
    proxy: Option<String>,
    timeout: Option<Duration>,
    redirects: RedirectPolicy,
    method: Method,
    body: Option<RequestBody>,
    referer: Option<String>,
    user_agent: Option<String>,
    tcp_nodelay: bool,
    verify_tls: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig {
            headers: Vec::new(),
            cookie: None,
            proxy: None,
            timeout: Some(DEFAULT_TIMEOUT),
            redirects: RedirectPolicy::Off,
            method: Method::Get,
            body: None,
            referer: None,
            user_agent: None,
            tcp_nodelay: false,
            verify_tls: true,
        }
    }
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one header, replacing any previous header with the same name.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        let name = name.trim();
        if name.is_empty() {
            warn!("Ignoring header with empty name (value: {:?})", value);
            return self;
        }
        let value = value.trim().to_string();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
        self
    }

    /// Parses `Name: value` lines. Lines without a colon are skipped.
    pub fn set_raw_headers(&mut self, text: &str) -> &mut Self {
        for line in text.lines() {
            match line.split_once(':') {
                Some((name, value)) => {
                    self.set_header(name, value);
                }
                None if line.trim().is_empty() => {}
                None => warn!("Ignoring malformed header line: {:?}", line),
            }
        }
        self
    }

    pub fn set_cookie(&mut self, cookie: &str) -> &mut Self {
        self.cookie = Some(cookie.to_string());
        self
    }

    /// Joins the pairs as `k1=v1; k2=v2` and stores the result as the cookie.
    pub fn set_cookie_pairs<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let joined = pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
            .collect::<Vec<_>>()
            .join("; ");
        self.cookie = Some(joined);
        self
    }

    /// Proxy as `host:port` or a full URL.
    pub fn set_proxy(&mut self, proxy: &str) -> &mut Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    /// A zero duration disables the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }

    pub fn set_redirects(&mut self, policy: RedirectPolicy) -> &mut Self {
        self.redirects = policy;
        self
    }

    pub fn set_body(&mut self, method: Method, body: RequestBody) -> &mut Self {
        self.method = method;
        self.body = Some(body);
        self
    }

    pub fn set_referer(&mut self, referer: &str) -> &mut Self {
        self.referer = Some(referer.to_string());
        self
    }

    pub fn set_user_agent(&mut self, user_agent: &str) -> &mut Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn set_tcp_nodelay(&mut self, enabled: bool) -> &mut Self {
        self.tcp_nodelay = enabled;
        self
    }

    pub fn set_verify_tls(&mut self, enabled: bool) -> &mut Self {
        self.verify_tls = enabled;
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn redirects(&self) -> RedirectPolicy {
        self.redirects
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn tcp_nodelay(&self) -> bool {
        self.tcp_nodelay
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_overwrites_case_insensitively() {
        let mut config = RequestConfig::new();
        config.set_header("Accept", "text/html");
        config.set_header("accept", "application/json");

        assert_eq!(config.headers().len(), 1);
        assert_eq!(config.header("ACCEPT"), Some("application/json"));
    }

    #[test]
    fn test_raw_headers_skip_lines_without_colon() {
        let mut config = RequestConfig::new();
        config.set_raw_headers("X-One: 1\r\nbogus line\nX-Two: a:b\n\n");

        assert_eq!(config.headers().len(), 2);
        assert_eq!(config.header("x-one"), Some("1"));
        assert_eq!(config.header("x-two"), Some("a:b"));
    }

    #[test]
    fn test_cookie_last_writer_wins() {
        let mut config = RequestConfig::new();
        config.set_cookie("first=1");
        config.set_cookie_pairs([("sid", "abc"), ("lang", "en")]);

        assert_eq!(config.cookie(), Some("sid=abc; lang=en"));
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let mut config = RequestConfig::new();
        assert_eq!(config.timeout(), Some(DEFAULT_TIMEOUT));

        config.set_timeout(Duration::ZERO);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_redirect_limits() {
        assert_eq!(RedirectPolicy::from_limit(0), RedirectPolicy::Off);
        assert_eq!(RedirectPolicy::from_limit(-1), RedirectPolicy::Unlimited);
        assert_eq!(RedirectPolicy::from_limit(5), RedirectPolicy::Limited(5));
        assert!(!RedirectPolicy::from_limit(0).follows());
    }

    #[test]
    fn test_form_body_is_url_encoded() {
        let body = RequestBody::from(vec![("q", "a b"), ("page", "2")]);
        assert_eq!(body.encode(), "q=a+b&page=2");

        let raw = RequestBody::from("{\"k\":1}");
        assert_eq!(raw.encode(), "{\"k\":1}");
    }
}
