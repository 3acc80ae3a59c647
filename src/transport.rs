//! # Transport Module
//!
//! The network boundary of the crate. A [`Transport`] performs one complete
//! transfer and hands back the raw payload (header block followed by body)
//! together with its [`TransferInfo`]. Everything above it (admission,
//! multiplexing, parsing) is transport-agnostic.
//!
//! The default [`ReqwestTransport`] (feature `reqwest-transport`) builds one
//! `reqwest::Client` per run from the finalized [`RequestConfig`], so proxy,
//! timeout, redirect and TLS settings are shared by every transfer of the run
//! while connections are pooled between them.

use crate::config::RequestConfig;
use crate::error::TransportError;
use crate::response::RawTransfer;
use async_trait::async_trait;

/// Performs a single transfer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Fetches `url` with the run's configuration.
    ///
    /// On success the returned payload must start with a header block whose
    /// byte length is reported in `info.header_size` (zero when no header was
    /// captured).
    async fn perform(&self, url: &str, config: &RequestConfig) -> Result<RawTransfer, TransportError>;
}

#[cfg(feature = "reqwest-transport")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest-transport")]
mod reqwest_transport {
    use super::*;
    use crate::config::{Method, RedirectPolicy};
    use crate::response::TransferInfo;
    use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, REFERER};
    use reqwest::redirect::Policy;
    use tokio::time::Instant;
    use tracing::{error, trace};

    const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

    /// `reqwest`-backed transport.
    ///
    /// A configuration the client builder rejects (for example an unparsable
    /// proxy) does not abort the run: every transfer completes with the build
    /// error instead.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: Result<reqwest::Client, TransportError>,
    }

    impl ReqwestTransport {
        pub fn from_config(config: &RequestConfig) -> Self {
            let client = build_client(config).inspect_err(|e| {
                error!("Failed to build HTTP client from request configuration: {}", e);
            });
            Self { client }
        }
    }

    fn build_client(config: &RequestConfig) -> Result<reqwest::Client, TransportError> {
        let policy = match config.redirects() {
            RedirectPolicy::Off => Policy::none(),
            RedirectPolicy::Limited(max) => Policy::limited(max),
            RedirectPolicy::Unlimited => Policy::limited(usize::MAX),
        };

        let mut builder = reqwest::Client::builder()
            .redirect(policy)
            .tcp_nodelay(config.tcp_nodelay())
            .danger_accept_invalid_certs(!config.verify_tls());

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = config.user_agent() {
            builder = builder.user_agent(user_agent);
        }
        if let Some(proxy) = config.proxy() {
            let proxy_url = if proxy.contains("://") {
                proxy.to_string()
            } else {
                format!("http://{}", proxy)
            };
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }

        Ok(builder.build()?)
    }

    fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn perform(&self, url: &str, config: &RequestConfig) -> Result<RawTransfer, TransportError> {
            let client = self.client.as_ref().map_err(Clone::clone)?;
            let started = Instant::now();

            let mut request = client.request(to_reqwest_method(config.method()), url);
            for (name, value) in config.headers() {
                request = request.header(name.as_str(), value.as_str());
            }
            if let Some(cookie) = config.cookie() {
                request = request.header(COOKIE, cookie);
            }
            if let Some(referer) = config.referer() {
                request = request.header(REFERER, referer);
            }
            if let Some(body) = config.body() {
                if config.header(CONTENT_TYPE.as_str()).is_none() {
                    request = request.header(CONTENT_TYPE, FORM_CONTENT_TYPE);
                }
                request = request.body(body.encode());
            }

            trace!("Sending {} {}", config.method(), url);
            let response = request.send().await?;
            let start_transfer_time = started.elapsed();

            let status = response.status();
            let mut header = format!("{:?} {}\r\n", response.version(), status);
            for (name, value) in response.headers() {
                header.push_str(name.as_str());
                header.push_str(": ");
                header.push_str(&String::from_utf8_lossy(value.as_bytes()));
                header.push_str("\r\n");
            }
            header.push_str("\r\n");

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let redirect_url = if status.is_redirection() {
                response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|location| response.url().join(location).ok())
                    .map(|target| target.to_string())
            } else {
                None
            };
            let effective_url = response.url().to_string();
            let remote_addr = response.remote_addr();

            let body = response.bytes().await?;
            let header_size = header.len();
            let mut raw = header.into_bytes();
            raw.extend_from_slice(&body);

            Ok(RawTransfer {
                raw,
                info: TransferInfo {
                    url: url.to_string(),
                    effective_url,
                    http_status: status.as_u16(),
                    header_size,
                    redirect_url,
                    content_type,
                    size_download: body.len(),
                    total_time: started.elapsed(),
                    start_transfer_time,
                    remote_addr,
                },
            })
        }
    }
}
