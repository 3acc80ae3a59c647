use spider_multi::{
    async_trait, Client, CookieValue, HttpError, Method, Middleware, RawTransfer, RequestConfig,
    ResultRecord, RunState, TransferInfo, Transport, TransportError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the scripted transport saw for one request.
#[derive(Debug, Clone)]
struct SeenRequest {
    url: String,
    method: Method,
    cookie: Option<String>,
    body: Option<String>,
    header: Option<String>,
}

#[derive(Clone, Default)]
struct Script {
    delays: HashMap<String, Duration>,
    failures: HashMap<String, TransportError>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl Script {
    fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    fn fail(mut self, url: &str, error: TransportError) -> Self {
        self.failures.insert(url.to_string(), error);
        self
    }

    fn client(&self, urls: Vec<&str>) -> Client<ScriptedTransport> {
        let script = self.clone();
        Client::with_transport(urls, move |_config: &RequestConfig| ScriptedTransport(script.clone()))
    }
}

struct ScriptedTransport(Script);

#[async_trait]
impl Transport for ScriptedTransport {
    async fn perform(&self, url: &str, config: &RequestConfig) -> Result<RawTransfer, TransportError> {
        let script = &self.0;
        script.calls.fetch_add(1, Ordering::SeqCst);
        script.seen.lock().unwrap().push(SeenRequest {
            url: url.to_string(),
            method: config.method(),
            cookie: config.cookie().map(str::to_string),
            body: config.body().map(|b| b.encode()),
            header: config.header("x-test").map(str::to_string),
        });

        let delay = script
            .delays
            .get(url)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;

        if let Some(error) = script.failures.get(url) {
            return Err(error.clone());
        }

        let name = url.rsplit('/').next().unwrap_or_default();
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nSet-Cookie: last={}; Path=/; HttpOnly\r\n\r\n",
            name
        );
        let body = format!("body of {}", name);
        let header_size = header.len();

        Ok(RawTransfer {
            raw: [header.into_bytes(), body.into_bytes()].concat(),
            info: TransferInfo {
                http_status: 200,
                header_size,
                content_type: Some("text/plain".to_string()),
                ..TransferInfo::for_url(url)
            },
        })
    }
}

/// Records admissions and completions in the order the scheduler reports them.
struct EventLog(Arc<Mutex<Vec<String>>>);

impl Middleware for EventLog {
    fn name(&self) -> &str {
        "event_log"
    }

    fn before_admit(&mut self, url: &str, in_flight: usize) {
        self.0.lock().unwrap().push(format!("admit {} ({})", url, in_flight));
    }

    fn after_complete(&mut self, record: &ResultRecord, in_flight: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("complete {} ({})", record.url, in_flight));
    }
}

#[tokio::test]
async fn test_three_urls_with_bound_two() {
    let script = Script::default()
        .delay("http://test/1", Duration::from_millis(20))
        .delay("http://test/2", Duration::from_millis(200))
        .delay("http://test/3", Duration::from_millis(20));
    let events = Arc::new(Mutex::new(Vec::new()));

    let mut client = script
        .client(vec!["http://test/1", "http://test/2", "http://test/3"])
        .max_concurrency(2)
        .add_middleware(EventLog(Arc::clone(&events)));

    assert_eq!(client.pending_count(), 3);
    let completed = client.run().await.unwrap();

    assert_eq!(completed, 3);
    assert_eq!(client.pending_count(), 0);
    assert_eq!(client.state(), RunState::Done);
    assert_eq!(client.stats().peak_in_flight(), 2);

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 6);
    assert_eq!(events[0], "admit http://test/1 (0)");
    assert_eq!(events[1], "admit http://test/2 (1)");
    assert_eq!(events[2], "complete http://test/1 (1)");
    assert_eq!(events[3], "admit http://test/3 (1)");
    assert_eq!(events[5], "complete http://test/2 (0)");
}

#[tokio::test]
async fn test_zero_concurrency_behaves_like_one() {
    let script = Script::default();
    let mut client = script
        .client(vec!["http://test/a", "http://test/b", "http://test/c"])
        .max_concurrency(0);

    assert_eq!(client.run().await.unwrap(), 3);
    assert_eq!(client.stats().peak_in_flight(), 1);
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_hooks_fire_once_per_request() {
    let script = Script::default()
        .fail("http://test/2", TransportError::Connect("refused".to_string()))
        .fail("http://test/4", TransportError::Timeout("10s".to_string()));
    let before = Arc::new(AtomicUsize::new(0));
    let after = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let urls = vec![
        "http://test/1",
        "http://test/2",
        "http://test/3",
        "http://test/4",
        "http://test/5",
    ];
    let mut client = script
        .client(urls)
        .max_concurrency(3)
        .before_middleware({
            let before = Arc::clone(&before);
            move |in_flight| {
                assert!(in_flight < 3);
                before.fetch_add(1, Ordering::SeqCst);
            }
        })
        .after_middleware({
            let after = Arc::clone(&after);
            let failed = Arc::clone(&failed);
            move |in_flight, record| {
                assert!(in_flight < 3);
                after.fetch_add(1, Ordering::SeqCst);
                if !record.is_success() {
                    failed.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

    assert_eq!(client.run().await.unwrap(), 5);
    assert_eq!(before.load(Ordering::SeqCst), 5);
    assert_eq!(after.load(Ordering::SeqCst), 5);
    assert_eq!(failed.load(Ordering::SeqCst), 2);
    assert_eq!(script.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_setting_a_hook_again_replaces_it() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let mut client = Script::default()
        .client(vec!["http://test/a", "http://test/b"])
        .before_middleware({
            let first = Arc::clone(&first);
            move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            }
        })
        .before_middleware({
            let second = Arc::clone(&second);
            move |_| {
                second.fetch_add(1, Ordering::SeqCst);
            }
        });

    client.run().await.unwrap();
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_accessors_run_lazily_and_only_once() {
    let script = Script::default();
    let mut client = script.client(vec!["http://test/a", "http://test/b"]);
    assert_eq!(client.state(), RunState::NotRun);
    assert_eq!(script.calls.load(Ordering::SeqCst), 0);

    assert_eq!(client.http_status().await.unwrap(), 200);
    assert!(!client.body().await.unwrap().is_empty());
    assert!(client.header().await.unwrap().starts_with(b"HTTP/1.1 200 OK"));
    assert!(client.last_error().await.unwrap().is_none());
    client.cookies().await.unwrap();

    assert_eq!(client.state(), RunState::Done);
    assert_eq!(script.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_last_completed_record_is_exposed() {
    let mut client = Script::default()
        .client(vec!["http://test/first", "http://test/second"])
        .max_concurrency(1);

    assert_eq!(client.body().await.unwrap(), b"body of second");
    let info = client.info().await.unwrap();
    assert_eq!(info.url, "http://test/second");
    assert_eq!(info.content_type.as_deref(), Some("text/plain"));

    let cookies = client.cookies().await.unwrap();
    assert_eq!(cookies.get("last"), Some(&CookieValue::from("second")));
    assert_eq!(cookies.get("Path"), Some(&CookieValue::from("/")));
    assert_eq!(cookies.get("HttpOnly"), Some(&CookieValue::Flag));
}

#[tokio::test]
async fn test_transport_error_is_reported_not_propagated() {
    let mut client = Script::default()
        .fail("http://test/down", TransportError::Connect("refused".to_string()))
        .client(vec!["http://test/down"]);

    assert_eq!(client.http_status().await.unwrap(), 0);
    assert_eq!(
        client.last_error().await.unwrap(),
        Some("failed to connect: refused")
    );
    assert!(client.body().await.unwrap().is_empty());
    assert!(client.cookies().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_queue_yields_defaults() {
    let script = Script::default();
    let mut client = script.client(Vec::new());

    assert!(client.body().await.unwrap().is_empty());
    assert!(client.header().await.unwrap().is_empty());
    assert_eq!(client.http_status().await.unwrap(), 0);
    assert_eq!(client.redirect_url().await.unwrap(), None);
    assert_eq!(client.last_error().await.unwrap(), None);
    assert!(client.cookies().await.unwrap().is_empty());
    assert_eq!(client.state(), RunState::Done);
    assert_eq!(script.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dropped_run_is_reported_as_in_progress() {
    let script = Script::default().delay("http://test/slow", Duration::from_secs(30));
    let mut client = script.client(vec!["http://test/slow"]);

    let attempt = tokio::time::timeout(Duration::from_millis(50), client.run()).await;
    assert!(attempt.is_err());
    assert_eq!(client.state(), RunState::Running);

    assert!(matches!(client.body().await, Err(HttpError::RunInProgress)));
    assert!(matches!(client.run().await, Err(HttpError::RunInProgress)));
}

#[tokio::test]
async fn test_explicit_run_picks_up_added_urls() {
    let script = Script::default();
    let mut client = script.client(vec!["http://test/a"]);
    assert_eq!(client.body().await.unwrap(), b"body of a");

    let mut client = client.add_url("http://test/b");
    assert_eq!(client.pending_count(), 1);
    // Already run, so accessors keep returning the previous result.
    assert_eq!(client.body().await.unwrap(), b"body of a");

    assert_eq!(client.run().await.unwrap(), 1);
    assert_eq!(client.body().await.unwrap(), b"body of b");
    assert_eq!(script.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_truncate_pending_drops_queued_urls() {
    let script = Script::default();
    let mut client = script.client(vec!["http://test/a", "http://test/b", "http://test/c"]);
    client.truncate_pending(1);
    assert_eq!(client.pending_count(), 1);

    assert_eq!(client.run().await.unwrap(), 1);
    assert_eq!(script.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_config_is_shared_by_every_request() {
    let script = Script::default();
    let mut client = script
        .client(vec!["http://test/a", "http://test/b"])
        .cookie_pairs([("session", "abc"), ("lang", "en")])
        .raw_headers("X-Test: from-raw\nAccept: */*")
        .set_header("x-test", "yes")
        .post(vec![("user", "me"), ("note", "a b")]);

    client.run().await.unwrap();

    let seen = script.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    for request in seen {
        assert!(request.url.starts_with("http://test/"));
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.cookie.as_deref(), Some("session=abc; lang=en"));
        assert_eq!(request.body.as_deref(), Some("user=me&note=a+b"));
        assert_eq!(request.header.as_deref(), Some("yes"));
    }
}

#[tokio::test]
async fn test_header_and_cookie_setters_coexist_with_accessors() {
    let mut client = Script::default()
        .client(vec!["http://test/only"])
        .set_header("X-Test", "one")
        .cookie_pairs([("a", "1")]);

    let header = client.header().await.unwrap().to_vec();
    assert!(header.starts_with(b"HTTP/1.1 200 OK"));
    let cookies = client.cookies().await.unwrap();
    assert_eq!(cookies.get("last"), Some(&CookieValue::from("only")));
    assert_eq!(client.config().header("x-test"), Some("one"));
    assert_eq!(client.config().cookie(), Some("a=1"));
}

#[tokio::test]
async fn test_stats_track_outcomes() {
    let mut client = Script::default()
        .fail("http://test/bad", TransportError::Request("boom".to_string()))
        .client(vec!["http://test/ok", "http://test/bad"])
        .max_concurrency(2);

    client.run().await.unwrap();
    let stats = client.stats();
    assert_eq!(stats.requests_enqueued.load(Ordering::SeqCst), 2);
    assert_eq!(stats.requests_admitted.load(Ordering::SeqCst), 2);
    assert_eq!(stats.requests_succeeded.load(Ordering::SeqCst), 1);
    assert_eq!(stats.requests_failed.load(Ordering::SeqCst), 1);
    assert_eq!(stats.responses_received(), 1);
    assert!(stats.to_json_string().unwrap().contains("\"requests_failed\":1"));
}
