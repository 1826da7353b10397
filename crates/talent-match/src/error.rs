use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::matching::{EventBusError, MatchRunError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    HttpClient(reqwest::Error),
    EventBus(EventBusError),
    Match(MatchRunError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::HttpClient(err) => write!(f, "http client error: {}", err),
            AppError::EventBus(err) => write!(f, "event bus error: {}", err),
            AppError::Match(err) => write!(f, "match run failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::HttpClient(err) => Some(err),
            AppError::EventBus(err) => Some(err),
            AppError::Match(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::HttpClient(value)
    }
}

impl From<EventBusError> for AppError {
    fn from(value: EventBusError) -> Self {
        Self::EventBus(value)
    }
}

impl From<MatchRunError> for AppError {
    fn from(value: MatchRunError) -> Self {
        Self::Match(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn wraps_component_errors_with_context() {
        let err = AppError::from(ConfigError::MissingEventBusUrl);
        assert!(err.to_string().starts_with("configuration error: "));
        assert!(err.source().is_some());

        let err = AppError::from(MatchRunError::EmptyCandidatePool);
        assert_eq!(err.to_string(), "match run failed: candidate pool is empty");
    }
}
