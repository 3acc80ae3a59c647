//! # Statistics Module
//!
//! Collects metrics about the client's runs.
//!
//! ## Overview
//!
//! The `StatCollector` is shared between the client and its scheduler through
//! an `Arc`, so callers can keep a reference and inspect progress from a
//! middleware while a run is executing, or read totals once it has finished.
//! Counters accumulate across runs of a reused client; per-transfer timings
//! only cover the latest run.
//!
//! ## Key Metrics Tracked
//!
//! - **Request Metrics**: Enqueued, admitted, succeeded and failed requests
//! - **Response Metrics**: Received responses, status code distribution, bytes
//! - **Concurrency**: Highest in-flight count observed
//! - **Timing Metrics**: Elapsed time and per-transfer times of the latest run
//!
//! ## Example
//!
//! ```rust,ignore
//! let stats = client.stats();
//! client.run().await?;
//!
//! println!("{}", stats);
//! println!("{}", stats.to_json_string_pretty()?);
//! ```

use crate::error::HttpError;
use crate::response::Handle;
use dashmap::DashMap;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

// Point-in-time copy used by the text exports.
struct StatsSnapshot {
    requests_enqueued: usize,
    requests_admitted: usize,
    requests_succeeded: usize,
    requests_failed: usize,
    responses_received: usize,
    total_bytes_downloaded: usize,
    peak_in_flight: usize,
    runs_completed: usize,
    response_status_counts: BTreeMap<u16, usize>,
    elapsed_duration: Duration,
}

impl StatsSnapshot {
    fn formatted_duration(&self) -> String {
        format!("{:?}", self.elapsed_duration)
    }

    fn requests_per_second(&self) -> f64 {
        let total_seconds = self.elapsed_duration.as_secs_f64();
        if total_seconds > 0.0 {
            self.responses_received as f64 / total_seconds
        } else {
            0.0
        }
    }

    fn formatted_bytes(&self) -> String {
        const KB: usize = 1024;
        const MB: usize = 1024 * KB;
        const GB: usize = 1024 * MB;

        if self.total_bytes_downloaded >= GB {
            format!("{:.2} GB", self.total_bytes_downloaded as f64 / GB as f64)
        } else if self.total_bytes_downloaded >= MB {
            format!("{:.2} MB", self.total_bytes_downloaded as f64 / MB as f64)
        } else if self.total_bytes_downloaded >= KB {
            format!("{:.2} KB", self.total_bytes_downloaded as f64 / KB as f64)
        } else {
            format!("{} B", self.total_bytes_downloaded)
        }
    }

    fn status_summary(&self) -> String {
        self.response_status_counts
            .iter()
            .map(|(code, count)| format!("{}: {}", code, count))
            .collect::<Vec<String>>()
            .join(", ")
    }
}

/// Counters describing the client's runs.
#[derive(Debug, serde::Serialize)]
pub struct StatCollector {
    #[serde(skip)]
    pub start_time: Instant,

    pub requests_enqueued: AtomicUsize,
    pub requests_admitted: AtomicUsize,
    pub requests_succeeded: AtomicUsize,
    pub requests_failed: AtomicUsize,

    pub responses_received: AtomicUsize,
    pub response_status_counts: Arc<DashMap<u16, usize>>,
    pub total_bytes_downloaded: AtomicUsize,

    pub peak_in_flight: AtomicUsize,
    pub runs_completed: AtomicUsize,

    /// URL and total transfer time of every transfer in the latest run.
    pub request_times: Arc<DashMap<Handle, (String, Duration)>>,
}

impl StatCollector {
    pub fn new() -> Self {
        StatCollector {
            start_time: Instant::now(),
            requests_enqueued: AtomicUsize::new(0),
            requests_admitted: AtomicUsize::new(0),
            requests_succeeded: AtomicUsize::new(0),
            requests_failed: AtomicUsize::new(0),
            responses_received: AtomicUsize::new(0),
            response_status_counts: Arc::new(DashMap::new()),
            total_bytes_downloaded: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            runs_completed: AtomicUsize::new(0),
            request_times: Arc::new(DashMap::new()),
        }
    }

    fn snapshot(&self) -> StatsSnapshot {
        let response_status_counts = self
            .response_status_counts
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();

        StatsSnapshot {
            requests_enqueued: self.requests_enqueued.load(Ordering::SeqCst),
            requests_admitted: self.requests_admitted.load(Ordering::SeqCst),
            requests_succeeded: self.requests_succeeded.load(Ordering::SeqCst),
            requests_failed: self.requests_failed.load(Ordering::SeqCst),
            responses_received: self.responses_received.load(Ordering::SeqCst),
            total_bytes_downloaded: self.total_bytes_downloaded.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
            runs_completed: self.runs_completed.load(Ordering::SeqCst),
            response_status_counts,
            elapsed_duration: self.start_time.elapsed(),
        }
    }

    pub(crate) fn add_requests_enqueued(&self, count: usize) {
        self.requests_enqueued.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_admitted(&self) {
        self.requests_admitted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_responses_received(&self) {
        self.responses_received.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_runs_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_response_status(&self, status_code: u16) {
        *self.response_status_counts.entry(status_code).or_insert(0) += 1;
    }

    pub(crate) fn add_bytes_downloaded(&self, bytes: usize) {
        self.total_bytes_downloaded.fetch_add(bytes, Ordering::SeqCst);
    }

    pub(crate) fn record_in_flight(&self, in_flight: usize) {
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);
    }

    pub(crate) fn reset_request_times(&self) {
        self.request_times.clear();
    }

    pub(crate) fn record_request_time(&self, handle: Handle, url: &str, duration: Duration) {
        self.request_times.insert(handle, (url.to_string(), duration));
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn responses_received(&self) -> usize {
        self.responses_received.load(Ordering::SeqCst)
    }

    pub fn to_json_string(&self) -> Result<String, HttpError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, HttpError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Exports the current statistics as a Markdown report.
    pub fn to_markdown_string(&self) -> String {
        let snapshot = self.snapshot();

        let status_codes_list: String = snapshot
            .response_status_counts
            .iter()
            .map(|(code, count)| format!("- **{}**: {}", code, count))
            .collect::<Vec<String>>()
            .join("\n");
        let status_codes_output = if status_codes_list.is_empty() {
            "N/A".to_string()
        } else {
            status_codes_list
        };

        format!(
            r#"# Fetch Statistics Report

- **Duration**: {}
- **Runs**: {}
- **Average Speed**: {:.2} resp/s
- **Peak In Flight**: {}

## Requests
| Metric     | Count |
|------------|-------|
| Enqueued   | {}     |
| Admitted   | {}     |
| Succeeded  | {}     |
| Failed     | {}     |

## Responses
| Metric     | Count |
|------------|-------|
| Received   | {}     |
| Downloaded | {}     |

## Status Codes
{}
"#,
            snapshot.formatted_duration(),
            snapshot.runs_completed,
            snapshot.requests_per_second(),
            snapshot.peak_in_flight,
            snapshot.requests_enqueued,
            snapshot.requests_admitted,
            snapshot.requests_succeeded,
            snapshot.requests_failed,
            snapshot.responses_received,
            snapshot.formatted_bytes(),
            status_codes_output
        )
    }
}

impl Default for StatCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StatCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();

        writeln!(f, "\nFetch Statistics")?;
        writeln!(f, "----------------")?;
        writeln!(
            f,
            "  duration : {} ({} runs)",
            snapshot.formatted_duration(),
            snapshot.runs_completed
        )?;
        writeln!(f, "  speed    : resp/s: {:.2}", snapshot.requests_per_second())?;
        writeln!(
            f,
            "  requests : enqueued: {}, admitted: {}, ok: {}, fail: {}, peak in flight: {}",
            snapshot.requests_enqueued,
            snapshot.requests_admitted,
            snapshot.requests_succeeded,
            snapshot.requests_failed,
            snapshot.peak_in_flight
        )?;
        writeln!(
            f,
            "  response : received: {}, downloaded: {}",
            snapshot.responses_received,
            snapshot.formatted_bytes()
        )?;

        let status_string = if snapshot.response_status_counts.is_empty() {
            "none".to_string()
        } else {
            snapshot.status_summary()
        };

        writeln!(f, "  status   : {}\n", status_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_in_flight_keeps_maximum() {
        let stats = StatCollector::new();
        stats.record_in_flight(2);
        stats.record_in_flight(5);
        stats.record_in_flight(1);
        assert_eq!(stats.peak_in_flight(), 5);
    }

    #[test]
    fn test_exports_include_status_counts() {
        let stats = StatCollector::new();
        stats.record_response_status(200);
        stats.record_response_status(200);
        stats.record_response_status(404);
        stats.add_bytes_downloaded(2048);

        let markdown = stats.to_markdown_string();
        assert!(markdown.contains("- **200**: 2"));
        assert!(markdown.contains("2.00 KB"));

        let display = stats.to_string();
        assert!(display.contains("200: 2, 404: 1"));

        let json: serde_json::Value = serde_json::from_str(&stats.to_json_string().unwrap()).unwrap();
        assert_eq!(json["total_bytes_downloaded"], 2048);
        assert_eq!(json["response_status_counts"]["404"], 1);
    }
}
