//! `banditlb` — a retrying, learning load balancer fronting a pool of
//! deliberately flaky downstream servers, dispatching each request through
//! a pluggable multi-armed-bandit strategy.

mod config;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;

use banditlb_bandit::{Strategy, StrategyConfig};
use banditlb_core::{validate_request_id, AttemptSink};
use banditlb_dispatcher::{dispatch, DispatchOutcome, RequestContext, RunIdentity};
use banditlb_downstream::DownstreamClient;
use banditlb_journal::RunJournal;
use banditlb_metrics::{JsonFileSink, MetricsCollector, SnapshotSink};

use config::BanditConfig;

#[derive(Clone)]
struct AppState {
    strategy: Arc<Mutex<Strategy>>,
    downstream: Arc<DownstreamClient>,
    metrics: Arc<MetricsCollector>,
    journal: Arc<RunJournal>,
    metrics_sink: Arc<JsonFileSink>,
    identity: Arc<RunIdentity>,
    next_request_number: Arc<AtomicU64>,
}

#[derive(Deserialize)]
struct IngressRequest {
    id: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = BanditConfig::from_env().unwrap_or_else(|err| {
        tracing::error!(error = %err, "invalid configuration");
        std::process::exit(1);
    });

    let strategy_config = StrategyConfig {
        tier: config.config_target,
        cooldown: config.rate_limit_cooldown,
        sliding_window_size: config.sliding_window_size,
        block_duration: config.block_duration,
        seed: None,
    };
    let strategy = Strategy::new(&config.strategy_name, strategy_config).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to build bandit strategy");
        std::process::exit(1);
    });

    let journal = RunJournal::start(&config.runs_dir, &config.strategy_name, config.config_target)
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to start attempt journal");
            std::process::exit(1);
        });

    let identity = RunIdentity {
        run_id: journal.run_id().to_string(),
        session_id: config.session_id.clone(),
        strategy_name: config.strategy_name.clone(),
        config_target: config.config_target,
    };

    let state = AppState {
        strategy: Arc::new(Mutex::new(strategy)),
        downstream: Arc::new(DownstreamClient::new(config.downstream_timeout)),
        metrics: Arc::new(MetricsCollector::new()),
        journal: Arc::new(journal),
        metrics_sink: Arc::new(JsonFileSink::new(&config.metrics_path)),
        identity: Arc::new(identity),
        next_request_number: Arc::new(AtomicU64::new(1)),
    };

    let bind_addr = config.bind_addr;
    let listener = TcpListener::bind(bind_addr)
        .await
        .expect("failed to bind listener");

    tracing::info!(
        run_id = %state.identity.run_id,
        strategy = %state.identity.strategy_name,
        tier = %state.identity.config_target,
        addr = %bind_addr,
        "banditlb listening"
    );

    axum::serve(listener, app(state).into_make_service())
        .await
        .expect("server error");
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_request))
        .route("/health", get(health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn handle_request(
    State(state): State<AppState>,
    Json(payload): Json<IngressRequest>,
) -> impl IntoResponse {
    if let Err(err) = validate_request_id(&payload.id) {
        tracing::debug!(error = %err, "rejected malformed request id");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "status": "error", "detail": err.to_string() })),
        )
            .into_response();
    }

    let request_number = state.next_request_number.fetch_add(1, Ordering::Relaxed);
    let ctx = RequestContext::new(payload.id, request_number);

    let outcome = dispatch(
        &state.strategy,
        &state.downstream,
        &state.metrics,
        state.journal.as_ref() as &dyn AttemptSink,
        &state.identity,
        &ctx,
    )
    .await;

    if let Err(err) = state.metrics_sink.write(&state.metrics.snapshot()) {
        tracing::warn!(error = %err, "failed to write metrics snapshot");
    }

    match outcome {
        DispatchOutcome::Success => {
            Json(serde_json::json!({ "status": "ok" })).into_response()
        }
        DispatchOutcome::Exhausted => {
            Json(serde_json::json!({ "status": "error" })).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let strategy = Strategy::new("v1", StrategyConfig::new(banditlb_core::Tier::T1)).unwrap();
        let dir = std::env::temp_dir().join("banditlb-main-test-runs");
        let journal =
            RunJournal::start(&dir, "v1", banditlb_core::Tier::T1).expect("journal starts");
        let identity = RunIdentity {
            run_id: journal.run_id().to_string(),
            session_id: None,
            strategy_name: "v1".to_string(),
            config_target: banditlb_core::Tier::T1,
        };
        AppState {
            strategy: Arc::new(Mutex::new(strategy)),
            downstream: Arc::new(DownstreamClient::new(std::time::Duration::from_millis(50))),
            metrics: Arc::new(MetricsCollector::new()),
            journal: Arc::new(journal),
            metrics_sink: Arc::new(JsonFileSink::new(
                std::env::temp_dir().join("banditlb-main-test-metrics.json"),
            )),
            identity: Arc::new(identity),
            next_request_number: Arc::new(AtomicU64::new(1)),
        }
    }

    #[tokio::test]
    async fn health_endpoint_reports_healthy() {
        let app = app(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_request_id_is_rejected_with_422() {
        let app = app(test_state());
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"id":"too-short"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn well_formed_request_against_unreachable_servers_reports_error_status() {
        let app = app(test_state());
        let id = "c".repeat(24);
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"id":"{id}"}}"#)))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    /// End-to-end over a real socket, unlike the `oneshot` tests above —
    /// exercises the listener bind and axum's real HTTP parsing, not just
    /// the `Router`'s tower `Service` impl.
    #[tokio::test]
    async fn serves_real_http_requests_over_a_bound_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(test_state()).into_make_service())
                .await
                .unwrap();
        });

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }
}
