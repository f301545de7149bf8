// src/links/probe.rs
// =============================================================================
// Health-checks URLs with a process-lifetime result cache.
//
// Key behaviors:
// - HEAD first (cheap, no body), one GET retry if the host answers 405
// - Realistic browser headers: many hosts reject unidentified clients
// - Every outcome is cached, including failures, so the same URL appearing
//   in fifty descriptions costs exactly one network call per run
// - Safe under concurrency: two simultaneous probes of a never-seen URL
//   share one in-flight request instead of racing
//
// Rust concepts:
// - tokio::sync::OnceCell: "initialize exactly once" even across tasks
// - Arc: Shared ownership of a cache cell between concurrent probes
// - buffer_unordered: Bounded-concurrency stream of probe futures
// - Trait seam: the retry policy runs against ProbeTransport, so tests can
//   script responses without a network
// =============================================================================

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use tokio::sync::OnceCell;

// Per-request timeout. Seconds-scale so one stalled host cannot hang a
// whole-channel audit.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

// Plenty of hosts return 403 to clients without a browser-looking UA.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// The outcome of probing a single URL.
///
/// `status_code` below 400 means healthy. `None` means the request never got
/// an HTTP answer at all (DNS failure, refused connection, timeout).
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status_code, Some(code) if code < 400)
    }

    /// Display form for report rows: the numeric code, or "Unreachable" when
    /// the probe never got an HTTP response.
    pub fn status_display(&self) -> String {
        match self.status_code {
            Some(code) => code.to_string(),
            None => "Unreachable".to_string(),
        }
    }
}

// Write-once-per-key cache mapping a URL to its probe result.
//
// The map hands out one Arc<OnceCell> per URL; get_or_init on the cell is
// what serializes concurrent first-probes, so the Mutex is only held for the
// map lookup and never across an await point.
pub(crate) struct ProbeCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<ProbeResult>>>>,
}

impl ProbeCache {
    fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    // Returns the cached result for `url`, running `probe` to produce it if
    // this is the first time the URL has been seen. Concurrent callers for
    // the same URL all wait on the same in-flight probe.
    pub(crate) async fn get_or_probe<F, Fut>(&self, url: &str, probe: F) -> ProbeResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProbeResult>,
    {
        let cell = {
            let mut cells = self.cells.lock().expect("probe cache poisoned");
            cells
                .entry(url.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(probe).await.clone()
    }
}

// How the prober talks HTTP. The two methods mirror the two request verbs
// the policy uses; errors arrive as already-categorized human messages.
#[allow(async_fn_in_trait)]
pub(crate) trait ProbeTransport {
    async fn head(&self, url: &str) -> Result<u16, String>;
    async fn get(&self, url: &str) -> Result<u16, String>;
}

// The real transport: reqwest with browser-looking headers.
struct HttpTransport {
    client: Client,
}

impl ProbeTransport for HttpTransport {
    async fn head(&self, url: &str) -> Result<u16, String> {
        self.client
            .head(url)
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|e| describe_failure(&e))
    }

    async fn get(&self, url: &str) -> Result<u16, String> {
        self.client
            .get(url)
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|e| describe_failure(&e))
    }
}

// The dual-method policy: HEAD first (cheap, no body), then exactly one GET
// retry, and only when the host answered 405 to the HEAD.
async fn run_probe<T: ProbeTransport>(transport: &T, url: String) -> ProbeResult {
    match transport.head(&url).await {
        Ok(status) if status == StatusCode::METHOD_NOT_ALLOWED.as_u16() => {
            // Host rejects HEAD specifically; ask properly with GET.
            match transport.get(&url).await {
                Ok(status) => status_result(url, status),
                Err(message) => failure_result(url, message),
            }
        }
        Ok(status) => status_result(url, status),
        Err(message) => failure_result(url, message),
    }
}

/// Concurrent-safe URL prober. Construct one per run; the cache lives and
/// dies with it (no process-wide singletons, no expiry to reason about).
pub struct LinkChecker {
    transport: HttpTransport,
    cache: ProbeCache,
}

impl LinkChecker {
    pub fn new() -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .expect("failed to build probe HTTP client");

        Self {
            transport: HttpTransport { client },
            cache: ProbeCache::new(),
        }
    }

    /// Probes one URL, answering from the cache when possible. The cache is
    /// authoritative for the process lifetime: repeat calls return the first
    /// result with no network activity.
    pub async fn probe(&self, url: &str) -> ProbeResult {
        self.cache
            .get_or_probe(url, || run_probe(&self.transport, url.to_string()))
            .await
    }

    /// Probes many URLs with at most `concurrency` requests in flight,
    /// invoking `progress(done, total)` as each one completes.
    pub async fn probe_all(
        &self,
        urls: Vec<String>,
        concurrency: usize,
        progress: &(dyn Fn(usize, usize) + Sync),
    ) -> Vec<ProbeResult> {
        let total = urls.len();
        let futures = urls.into_iter().map(|url| async move { self.probe(&url).await });

        let mut stream = stream::iter(futures).buffer_unordered(concurrency.max(1));
        let mut results = Vec::with_capacity(total);
        while let Some(result) = stream.next().await {
            results.push(result);
            progress(results.len(), total);
        }
        results
    }
}

impl Default for LinkChecker {
    fn default() -> Self {
        Self::new()
    }
}

// Turns an HTTP status into a result: healthy codes carry no error, failing
// ones carry the code plus reason phrase.
fn status_result(url: String, status: u16) -> ProbeResult {
    let error = if status >= 400 {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        Some(format!("HTTP {} {}", status, reason))
    } else {
        None
    };

    ProbeResult {
        url,
        status_code: Some(status),
        error,
    }
}

// A probe that never got an HTTP answer at all.
fn failure_result(url: String, message: String) -> ProbeResult {
    ProbeResult {
        url,
        status_code: None,
        error: Some(message),
    }
}

// Categorizes transport-level failures the way a human would describe them.
fn describe_failure(error: &reqwest::Error) -> String {
    let error_string = error.to_string();

    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else if error.is_connect() {
        if error_string.contains("dns") {
            "Could not resolve hostname".to_string()
        } else {
            "Connection failed".to_string()
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error_string
    }
}
