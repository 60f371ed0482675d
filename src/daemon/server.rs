use crate::daemon::history::HistoryTracker;
use crate::daemon::rate_limit::RateLimiter;
use crate::daemon::supervisor::EventStreamSupervisor;
use crate::util::threads::{ThreadHandle, ThreadRegistry};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const REJECTED: (StatusCode, &str) = (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests");

/// Shared state for the query API. The tracker lock and the limiter locks are
/// independent resources; no handler ever holds both at once.
#[derive(Clone)]
pub struct ApiState {
    tracker: Arc<HistoryTracker>,
    health_limiter: Arc<RateLimiter>,
    history_limiter: Arc<RateLimiter>,
}

impl ApiState {
    pub fn new(tracker: Arc<HistoryTracker>, max_requests_per_minute: usize) -> Self {
        Self {
            tracker,
            health_limiter: Arc::new(RateLimiter::new(max_requests_per_minute, RATE_LIMIT_WINDOW)),
            history_limiter: Arc::new(RateLimiter::new(
                max_requests_per_minute,
                RATE_LIMIT_WINDOW,
            )),
        }
    }
}

async fn health_handler(
    State(state): State<ApiState>,
) -> Result<&'static str, (StatusCode, &'static str)> {
    if !state.health_limiter.allow() {
        return Err(REJECTED);
    }
    Ok("OK")
}

async fn history_handler(
    State(state): State<ApiState>,
) -> Result<Json<Vec<u64>>, (StatusCode, &'static str)> {
    if !state.history_limiter.allow() {
        return Err(REJECTED);
    }
    Ok(Json(state.tracker.history()))
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/history", get(history_handler))
        .with_state(state)
}

/// Run the query API on a dedicated thread with its own current-thread
/// runtime. The call only returns once the listener is bound (or has failed
/// to bind). On Ctrl-C or SIGTERM the server drains, shuts the supervisor
/// down, and the thread exits.
pub fn spawn_http_server(
    port: u16,
    state: ApiState,
    supervisor: Arc<EventStreamSupervisor>,
    threads: &ThreadRegistry,
) -> Result<ThreadHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

    let handle = threads
        .spawn("query-api", move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("build runtime");
            rt.block_on(async move {
                let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        let _ = tx.send(Err(format!("bind 0.0.0.0:{port}: {e}")));
                        return;
                    }
                };
                let _ = tx.send(Ok(()));
                info!("query API listening on 0.0.0.0:{}", port);

                let serve = axum::serve(listener, router(state))
                    .with_graceful_shutdown(shutdown_signal());
                if let Err(e) = serve.await {
                    warn!("query API server error: {}", e);
                }
                supervisor.shutdown();
            });
        })
        .context("spawn query API thread")?;

    match rx.recv_timeout(Duration::from_millis(500)) {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(msg)) => {
            let _ = handle.join();
            Err(anyhow::anyhow!("query API failed to start: {msg}"))
        }
        Err(_) => Err(anyhow::anyhow!(
            "query API failed to signal readiness within 500ms"
        )),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(limit: usize) -> ApiState {
        ApiState::new(Arc::new(HistoryTracker::new()), limit)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn health_reports_ok() {
        let state = test_state(60);
        let body = health_handler(State(state)).await.expect("admitted");
        assert_eq!(body, "OK");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sixty_one_rapid_health_checks_shed_exactly_one() {
        let state = test_state(60);

        let mut ok = 0;
        let mut shed = 0;
        for _ in 0..61 {
            match health_handler(State(state.clone())).await {
                Ok("OK") => ok += 1,
                Ok(_) => unreachable!(),
                Err((status, body)) => {
                    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                    assert_eq!(body, "Too Many Requests");
                    shed += 1;
                }
            }
        }
        assert_eq!(ok, 60);
        assert_eq!(shed, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn history_returns_recency_ordering_most_recent_last() {
        let tracker = Arc::new(HistoryTracker::new());
        tracker.record_event("{\"WindowFocusChanged\":{\"id\":1}}");
        tracker.record_event("{\"WindowOpenedOrChanged\":{\"window\":{\"id\":2}}}");
        tracker.record_event("{\"WindowFocusChanged\":{\"id\":1}}");
        let state = ApiState::new(tracker, 60);

        let Json(history) = history_handler(State(state)).await.expect("admitted");
        assert_eq!(history, vec![2, 1]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn history_is_empty_before_any_events() {
        let state = test_state(60);
        let Json(history) = history_handler(State(state)).await.expect("admitted");
        assert!(history.is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn routes_are_limited_independently() {
        let state = test_state(1);
        assert!(health_handler(State(state.clone())).await.is_ok());
        assert!(health_handler(State(state.clone())).await.is_err());
        // The history route has its own limiter and is still open.
        assert!(history_handler(State(state)).await.is_ok());
    }
}
