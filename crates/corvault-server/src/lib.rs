//! Prometheus scrape endpoint for a Seagate Corvault array.
//!
//! Every `GET /metrics` opens one SSH session to the array, runs the
//! controller and disk statistics commands, and renders the resulting
//! snapshot. Scrapes are serialised so the array never sees two concurrent
//! collection sessions from this exporter.

pub mod render;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;
use tokio::sync::Mutex;

use corvault_core::{CollectError, Pipeline, Snapshot, Stage};

pub use render::Exposition;
pub use session::{CommandSource, SshConfig, SshSource};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("metrics encoding error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("exposition is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a scrape answers when the collection cycle fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Answer 503 with the error text.
    #[default]
    Fail,
    /// Serve the last successful snapshot, or 503 if there is none yet.
    Stale,
}

/// Run one collection cycle: fetch both commands, then frame, parse, project
/// and assemble.
pub async fn collect_once<S: CommandSource>(
    source: &S,
    pipeline: &Pipeline,
) -> Result<Snapshot, CollectError> {
    let commands = pipeline.commands();
    log::debug!("{}: {} -> {}", pipeline.host(), Stage::Idle, Stage::Fetching);
    let outputs = source.fetch(&commands).await?;
    let [controller, disk] = <[_; 2]>::try_from(outputs).map_err(|outputs: Vec<_>| {
        CollectError::transport(
            commands.join("; "),
            format!("expected 2 command outputs, got {}", outputs.len()),
        )
    })?;
    pipeline.collect(&controller, &disk)
}

/// Per-server cycle bookkeeping. Locked only briefly, never across a fetch.
struct CycleState {
    exposition: Exposition,
    last_snapshot: Option<Snapshot>,
    successes: u64,
    failures: u64,
    last_error: Option<String>,
    last_success_unix: Option<u64>,
    last_duration_ms: Option<u64>,
}

impl CycleState {
    fn new() -> Result<Self, ServerError> {
        Ok(Self {
            exposition: Exposition::new()?,
            last_snapshot: None,
            successes: 0,
            failures: 0,
            last_error: None,
            last_success_unix: None,
            last_duration_ms: None,
        })
    }
}

/// Shared server state.
struct AppState<S> {
    source: S,
    pipeline: Pipeline,
    policy: ErrorPolicy,
    /// Held for a whole collection cycle so the array sees one session at a time.
    collecting: Mutex<()>,
    cycle: Mutex<CycleState>,
}

impl<S: CommandSource> AppState<S> {
    fn new(source: S, pipeline: Pipeline, policy: ErrorPolicy) -> Result<Self, ServerError> {
        Ok(Self {
            source,
            pipeline,
            policy,
            collecting: Mutex::new(()),
            cycle: Mutex::new(CycleState::new()?),
        })
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    host: String,
    successes: u64,
    failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_success_unix: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_duration_ms: Option<u64>,
    last_observations: usize,
}

async fn handle_metrics<S: CommandSource>(State(state): State<Arc<AppState<S>>>) -> Response {
    let (status, body) = scrape(&state).await;
    let mut response = (status, body).into_response();
    if status == StatusCode::OK {
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static(prometheus::TEXT_FORMAT),
        );
    }
    response
}

async fn scrape<S: CommandSource>(state: &AppState<S>) -> (StatusCode, String) {
    let _collecting = state.collecting.lock().await;
    let started = Instant::now();
    let result = collect_once(&state.source, &state.pipeline).await;

    let mut cycle = state.cycle.lock().await;
    cycle.last_duration_ms = Some(started.elapsed().as_millis() as u64);

    let snapshot = match result {
        Ok(snapshot) => {
            cycle.successes += 1;
            cycle.last_error = None;
            cycle.last_success_unix = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|d| d.as_secs());
            log::info!(
                "collected {} observations from {} in {} ms",
                snapshot.observation_count(),
                state.pipeline.host(),
                started.elapsed().as_millis()
            );
            cycle.last_snapshot = Some(snapshot);
            cycle.last_snapshot.as_ref()
        }
        Err(e) => {
            cycle.failures += 1;
            cycle.last_error = Some(format!("{}: {e}", e.kind()));
            log::error!("collection from {} failed: {e}", state.pipeline.host());
            match state.policy {
                ErrorPolicy::Stale if cycle.last_snapshot.is_some() => {
                    log::warn!("serving last successful snapshot");
                    cycle.last_snapshot.as_ref()
                }
                _ => {
                    cycle.last_snapshot = None;
                    return (
                        StatusCode::SERVICE_UNAVAILABLE,
                        format!("collection failed: {e}\n"),
                    );
                }
            }
        }
    };

    let rendered = match snapshot {
        Some(snapshot) => cycle.exposition.render(snapshot),
        None => return (StatusCode::SERVICE_UNAVAILABLE, "no snapshot\n".to_string()),
    };
    match rendered {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            log::error!("failed to render metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n"))
        }
    }
}

async fn handle_health<S: CommandSource>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    let cycle = state.cycle.lock().await;
    let status = match (cycle.successes, &cycle.last_error) {
        (_, Some(_)) => "degraded",
        (0, None) => "pending",
        _ => "healthy",
    };
    Json(HealthResponse {
        status: status.to_string(),
        host: state.pipeline.host().to_string(),
        successes: cycle.successes,
        failures: cycle.failures,
        last_error: cycle.last_error.clone(),
        last_success_unix: cycle.last_success_unix,
        last_duration_ms: cycle.last_duration_ms,
        last_observations: cycle
            .last_snapshot
            .as_ref()
            .map_or(0, Snapshot::observation_count),
    })
}

async fn handle_index<S: CommandSource>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Corvault Exporter",
        "version": corvault_core::VERSION,
        "host": state.pipeline.host(),
        "header_lines": state.pipeline.header_lines(),
        "on_error": match state.policy {
            ErrorPolicy::Fail => "fail",
            ErrorPolicy::Stale => "stale",
        },
        "metrics": corvault_core::CATALOG.len(),
        "endpoints": {
            "/": "This API index",
            "/metrics": "Collect from the array and render Prometheus text format",
            "/health": "Outcome of recent collection cycles",
        },
    }))
}

/// Build the axum router.
fn build_router<S: CommandSource>(
    source: S,
    pipeline: Pipeline,
    policy: ErrorPolicy,
) -> Result<Router, ServerError> {
    let state = Arc::new(AppState::new(source, pipeline, policy)?);

    Ok(Router::new()
        .route("/", get(handle_index::<S>))
        .route("/metrics", get(handle_metrics::<S>))
        .route("/health", get(handle_health::<S>))
        .with_state(state))
}

/// Run the scrape server until interrupted.
pub async fn run_server<S: CommandSource>(
    source: S,
    pipeline: Pipeline,
    listen: SocketAddr,
    policy: ErrorPolicy,
) -> Result<(), ServerError> {
    let app = build_router(source, pipeline, policy)?;
    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("serving metrics on http://{listen}/metrics");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvault_core::CommandOutput;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONTROLLERS: &str = r#"{"controller-statistics":[{"durable-id":"A","cpu-load":"12","bytes-per-second-numeric":"100","iops":"5","number-of-reads":"1000","number-of-writes":"500","read-cache-hits":"9","read-cache-misses":"1","write-cache-hits":"8","write-cache-misses":"2","write-cache-used":"3"}]}"#;
    const DISKS: &str = r#"{"disk-statistics":[]}"#;

    /// Replays canned outputs; fails every call listed in `fail_on`.
    struct CannedSource {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    impl CannedSource {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl CommandSource for CannedSource {
        async fn fetch(
            &self,
            commands: &[&'static str],
        ) -> Result<Vec<CommandOutput>, CollectError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&call) {
                return Err(CollectError::transport(commands[0], "connection refused"));
            }
            Ok(commands
                .iter()
                .map(|c| {
                    if c.ends_with("controller-statistics") {
                        CommandOutput::from_stdout(CONTROLLERS)
                    } else {
                        CommandOutput::from_stdout(DISKS)
                    }
                })
                .collect())
        }
    }

    fn state(source: CannedSource, policy: ErrorPolicy) -> AppState<CannedSource> {
        AppState::new(source, Pipeline::new("cv1", 0), policy).unwrap()
    }

    /// Hangs inside `fetch` until released, like an array that stopped answering.
    struct StalledSource {
        release: tokio::sync::Notify,
    }

    impl CommandSource for StalledSource {
        async fn fetch(
            &self,
            commands: &[&'static str],
        ) -> Result<Vec<CommandOutput>, CollectError> {
            self.release.notified().await;
            Err(CollectError::transport(commands[0], "timed out"))
        }
    }

    #[tokio::test]
    async fn test_collect_once() {
        let snap = collect_once(&CannedSource::new(vec![]), &Pipeline::new("cv1", 0))
            .await
            .unwrap();
        assert_eq!(snap.observation_count(), 10);
    }

    #[tokio::test]
    async fn test_scrape_ok() {
        let state = state(CannedSource::new(vec![]), ErrorPolicy::Fail);
        let (status, body) = scrape(&state).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"seagate_corvault_controller_iops{host="cv1",id="A"} 5"#));
        assert_eq!(state.cycle.lock().await.successes, 1);
    }

    #[tokio::test]
    async fn test_scrape_failure_is_unavailable() {
        let state = state(CannedSource::new(vec![1]), ErrorPolicy::Fail);
        assert_eq!(scrape(&state).await.0, StatusCode::OK);
        let (status, body) = scrape(&state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("connection refused"));
        let cycle = state.cycle.lock().await;
        assert_eq!(cycle.failures, 1);
        assert!(cycle.last_snapshot.is_none());
        assert!(cycle.last_error.as_deref().unwrap().starts_with("transport"));
    }

    #[tokio::test]
    async fn test_scrape_stale_serves_last_snapshot() {
        let state = state(CannedSource::new(vec![1]), ErrorPolicy::Stale);
        let (_, first) = scrape(&state).await;
        let (status, second) = scrape(&state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_scrape_stale_without_history_fails() {
        let state = state(CannedSource::new(vec![0]), ErrorPolicy::Stale);
        assert_eq!(scrape(&state).await.0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_reports_last_error() {
        let state = Arc::new(state(CannedSource::new(vec![0]), ErrorPolicy::Fail));
        let Json(health) = handle_health(State(state.clone())).await;
        assert_eq!(health.status, "pending");
        scrape(&state).await;
        let Json(health) = handle_health(State(state)).await;
        assert_eq!(health.status, "degraded");
        assert_eq!(health.failures, 1);
        assert_eq!(health.last_observations, 0);
    }

    #[tokio::test]
    async fn test_health_answers_during_stalled_collection() {
        let state = Arc::new(
            AppState::new(
                StalledSource {
                    release: tokio::sync::Notify::new(),
                },
                Pipeline::new("cv1", 0),
                ErrorPolicy::Fail,
            )
            .unwrap(),
        );
        let scraping = tokio::spawn({
            let state = state.clone();
            async move { scrape(&state).await }
        });
        while state.collecting.try_lock().is_ok() {
            tokio::task::yield_now().await;
        }

        let health = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            handle_health(State(state.clone())),
        )
        .await
        .expect("health blocked behind an in-flight collection");
        assert_eq!(health.0.status, "pending");

        state.source.release.notify_one();
        let (status, _) = scraping.await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let Json(health) = handle_health(State(state)).await;
        assert_eq!(health.status, "degraded");
    }
}
