use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_match::config::AppConfig;
use talent_match::error::AppError;
use talent_match::workflows::matching::{
    HttpDirectoryClient, MatchOrchestrator, OpenAiScoringOracle,
};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The directory client doubles as the result sink: both live behind `BASE_URL`.
pub(crate) type HttpOrchestrator =
    MatchOrchestrator<HttpDirectoryClient, HttpDirectoryClient, OpenAiScoringOracle>;

/// Build the long-lived upstream clients once and share them across every run.
pub(crate) fn build_orchestrator(config: &AppConfig) -> Result<HttpOrchestrator, AppError> {
    if config.directory.base_url.is_none() {
        warn!("BASE_URL is not set; every directory and result call will fail");
    }
    if config.oracle.api_key.is_none() {
        warn!("OPENAI_KEY is not set; every scoring call will fail");
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("talent-match-worker/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let directory = Arc::new(HttpDirectoryClient::new(
        http.clone(),
        config.directory.clone(),
    ));
    let oracle = Arc::new(OpenAiScoringOracle::new(http, config.oracle.clone()));

    Ok(MatchOrchestrator::new(directory.clone(), directory, oracle))
}
