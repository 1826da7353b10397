use crate::infra::{build_orchestrator, AppState};
use crate::routes::ops_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use talent_match::config::AppConfig;
use talent_match::error::AppError;
use talent_match::telemetry;
use talent_match::workflows::matching::{
    pump_events, CorrelationId, EventBusError, MatchDispatcher, RedisEventSource,
};
use tracing::{error, info, warn};

/// Long-running mode: ops endpoints plus the event subscription.
pub(crate) async fn run() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = ops_router()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "ops endpoints listening");
    let ops_server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "ops server stopped");
        }
    });

    let orchestrator = Arc::new(build_orchestrator(&config)?);
    let dispatcher = MatchDispatcher::spawn(orchestrator, config.dispatch);

    let mut source = RedisEventSource::subscribe(&config.events).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        channel = %config.events.channel,
        max_concurrent_runs = config.dispatch.max_concurrent_runs,
        "talent match worker ready"
    );

    let outcome = tokio::select! {
        accepted = pump_events(&mut source, &dispatcher) => {
            warn!(accepted, "event subscription ended");
            Err(AppError::from(EventBusError::Closed))
        }
        signal = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            signal.map_err(AppError::from)
        }
    };

    readiness_flag.store(false, Ordering::Release);
    dispatcher.shutdown().await;
    ops_server.abort();
    info!("in-flight match runs drained");

    outcome
}

/// One synchronous run, for jobs whose event was missed.
pub(crate) async fn replay(correlation_id: String) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let orchestrator = build_orchestrator(&config)?;
    let summary = orchestrator
        .process_match(&CorrelationId(correlation_id))
        .await?;

    println!(
        "Correlation {}: {} candidates, {} reported, {} report failures, {} skipped",
        summary.correlation_id,
        summary.candidates,
        summary.reported.len(),
        summary.report_failures.len(),
        summary.skipped.len()
    );
    for score in &summary.reported {
        println!("  {} -> {}", score.candidate_id, score.score);
    }
    for skipped in &summary.skipped {
        println!("  {} skipped: {}", skipped.candidate_id, skipped.reason);
    }

    Ok(())
}
