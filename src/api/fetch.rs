//! Single-flight, cancellable GET with host failover
//!
//! Every call cancels the previous still-pending call issued by the same
//! client, then walks the host registry: network-level failures rotate to
//! the next host, anything else stops immediately.

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::hosts::HostRegistry;
use crate::models::{Host, Notice};

/// Fetch failure taxonomy
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure on a single host
    #[error("Network error on {host}: {message}")]
    Network { host: String, message: String },

    /// Every host failed at the network level; carries the last failure
    #[error("All {attempts} hosts unreachable (last: {host}: {message})")]
    HostsExhausted {
        attempts: usize,
        host: String,
        message: String,
    },

    /// Non-200 response, never retried
    #[error("{url}: {status}, \"{body}\"")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Superseded by a newer call on the same client
    #[error("Request cancelled")]
    Cancelled,

    /// 200 response whose body is not the expected JSON
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Discriminant of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    HostsExhausted,
    HttpStatus,
    Cancelled,
    Decode,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network { .. } => FetchErrorKind::Network,
            FetchError::HostsExhausted { .. } => FetchErrorKind::HostsExhausted,
            FetchError::HttpStatus { .. } => FetchErrorKind::HttpStatus,
            FetchError::Cancelled => FetchErrorKind::Cancelled,
            FetchError::Decode(_) => FetchErrorKind::Decode,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::HostsExhausted => "hosts_exhausted",
            FetchErrorKind::HttpStatus => "http_status",
            FetchErrorKind::Cancelled => "cancelled",
            FetchErrorKind::Decode => "decode",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one attempt against one host
enum AttemptError {
    Network(String),
    Fatal(FetchError),
}

#[derive(Default)]
struct InFlight {
    token: Option<CancellationToken>,
    generation: u64,
}

/// Capacity of the notice channel; slow subscribers just miss notices
const NOTICE_CAPACITY: usize = 32;

/// Fetch surface owned by one screen.
///
/// At most one request is logically in flight: issuing a new one cancels
/// the previous one, whose caller then only ever sees `Cancelled`.
pub struct FetchClient {
    registry: Arc<HostRegistry>,
    client: reqwest::Client,
    in_flight: Mutex<InFlight>,
    notices: broadcast::Sender<Notice>,
}

impl FetchClient {
    pub fn new(registry: Arc<HostRegistry>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self::with_notices(registry, notices)
    }

    /// Client publishing host-failure notices on a shared channel
    pub fn with_notices(registry: Arc<HostRegistry>, notices: broadcast::Sender<Notice>) -> Self {
        Self {
            registry,
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            in_flight: Mutex::new(InFlight::default()),
            notices,
        }
    }

    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }

    pub fn current_host(&self) -> Host {
        self.registry.current()
    }

    /// Observe non-fatal notices (host failures)
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Cancel whatever this client has in flight
    pub fn abort(&self) {
        let mut in_flight = lock(&self.in_flight);
        if let Some(token) = in_flight.token.take() {
            info!("Aborting previous fetch call");
            token.cancel();
        }
    }

    /// GET `path` with the given query parameters and decode the JSON body
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let query = query_string(query);
        let (token, generation) = self.begin();

        let result = self.attempt_hosts(path, &query, &token).await;

        self.finish(generation);
        if token.is_cancelled() {
            debug!(path, "Dropping result of superseded request");
            return Err(FetchError::Cancelled);
        }
        result
    }

    /// Like [`get`](Self::get), deserializing into `T`
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let value = self.get(path, query).await?;
        serde_json::from_value(value)
            .map_err(|e| FetchError::Decode(format!("JSON shape mismatch: {}", e)))
    }

    fn begin(&self) -> (CancellationToken, u64) {
        let mut in_flight = lock(&self.in_flight);
        if let Some(previous) = in_flight.token.take() {
            info!("Aborting previous fetch call");
            previous.cancel();
        }
        in_flight.generation += 1;
        let token = CancellationToken::new();
        in_flight.token = Some(token.clone());
        (token, in_flight.generation)
    }

    fn finish(&self, generation: u64) {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.generation == generation {
            in_flight.token = None;
        }
    }

    async fn attempt_hosts(
        &self,
        path: &str,
        query: &str,
        token: &CancellationToken,
    ) -> Result<Value, FetchError> {
        let attempts = self.registry.len();
        let mut last_failure: Option<(Host, String)> = None;

        for attempt in 1..=attempts {
            if token.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let host = self.registry.current();
            let url = build_url(&host, path, query);
            info!(%url, attempt, "Fetching");

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(FetchError::Cancelled),
                outcome = self.fetch_once(&url) => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Network(message)) => {
                    warn!(host = %host, attempt, "Network error: {}", message);
                    if token.is_cancelled() {
                        return Err(FetchError::Cancelled);
                    }
                    self.registry.advance();
                    let _ = self.notices.send(Notice::HostFailed {
                        host: host.address.clone(),
                        attempt,
                    });
                    last_failure = Some((host, message));
                }
            }
        }

        match last_failure {
            Some((host, message)) => Err(FetchError::HostsExhausted {
                attempts,
                host: host.address,
                message,
            }),
            None => Err(FetchError::Cancelled),
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Value, AttemptError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AttemptError::Network(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Fatal(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Network(e.to_string()))?;

        serde_json::from_str(&body)
            .map_err(|e| AttemptError::Fatal(FetchError::Decode(format!("JSON parse error: {}", e))))
    }
}

impl Drop for FetchClient {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.in_flight).token.take() {
            token.cancel();
        }
    }
}

/// Percent-encode each pair and join with `&`
pub fn query_string(query: &[(&str, &str)]) -> String {
    query
        .iter()
        .map(|(key, value)| {
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// `http://{host}/{path}[?{query}]`
pub fn build_url(host: &Host, path: &str, query: &str) -> String {
    if query.is_empty() {
        format!("{}/{}", host.base_url(), path)
    } else {
        format!("{}/{}?{}", host.base_url(), path, query)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_encodes_pairs() {
        assert_eq!(query_string(&[]), "");
        assert_eq!(query_string(&[("load_more", "true")]), "load_more=true");
        assert_eq!(
            query_string(&[("q", "Tom & Jerry"), ("page", "1")]),
            "q=Tom%20%26%20Jerry&page=1"
        );
    }

    #[test]
    fn test_build_url() {
        let host = Host::new("localhost:3000");
        assert_eq!(build_url(&host, "home", ""), "http://localhost:3000/home");
        assert_eq!(
            build_url(&host, "episodes/a/b", "load_more=false"),
            "http://localhost:3000/episodes/a/b?load_more=false"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(FetchError::Cancelled.kind(), FetchErrorKind::Cancelled);
        let status = FetchError::HttpStatus {
            url: "http://h/x".into(),
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(status.kind(), FetchErrorKind::HttpStatus);
        assert_eq!(status.to_string(), "http://h/x: 500, \"boom\"");
        assert_eq!(FetchErrorKind::HostsExhausted.to_string(), "hosts_exhausted");
    }

    #[tokio::test]
    async fn test_abort_without_in_flight_is_noop() {
        let registry = Arc::new(HostRegistry::in_memory(vec![Host::new("127.0.0.1:9")]).unwrap());
        let client = FetchClient::new(registry);
        client.abort();
        client.abort();
    }
}
