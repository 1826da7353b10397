use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_CHANNEL: &str = "ai-job-match";
const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
const DEFAULT_ORACLE_BASE_URL: &str = "https://api.openai.com/v1";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the worker, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub events: EventBusConfig,
    pub directory: DirectoryConfig,
    pub oracle: OracleConfig,
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw)?,
            Err(_) if environment == AppEnvironment::Production => LogFormat::Json,
            Err(_) => LogFormat::Compact,
        };

        let redis_url = non_empty_var("REDIS_URL").ok_or(ConfigError::MissingEventBusUrl)?;
        let channel = non_empty_var("MATCH_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string());

        let directory = DirectoryConfig {
            base_url: non_empty_var("BASE_URL"),
            auth_header: non_empty_var("AUTH_HEADER"),
        };

        let oracle = OracleConfig {
            api_key: non_empty_var("OPENAI_KEY"),
            model: non_empty_var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ORACLE_BASE_URL.to_string()),
        };

        let dispatch = DispatchConfig {
            max_concurrent_runs: positive_var("MATCH_MAX_CONCURRENT_RUNS", 4)?,
            queue_capacity: positive_var("MATCH_QUEUE_CAPACITY", 64)?,
            overflow: match env::var("MATCH_OVERFLOW_POLICY") {
                Ok(raw) => OverflowPolicy::parse(&raw)?,
                Err(_) => OverflowPolicy::Wait,
            },
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            events: EventBusConfig { redis_url, channel },
            directory,
            oracle,
            dispatch,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive_var(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    match non_empty_var(key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidNumber { key, value: raw }),
        },
    }
}

/// Settings controlling the operational HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat(raw.to_string())),
        }
    }
}

/// Redis pub/sub subscription carrying job-posted notifications.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    pub redis_url: String,
    pub channel: String,
}

/// Upstream directory and result API. Missing values fail individual calls.
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
    pub base_url: Option<String>,
    pub auth_header: Option<String>,
}

/// Chat-completions endpoint used as the relevance judge.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Admission control between the event listener and match runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub max_concurrent_runs: usize,
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 4,
            queue_capacity: 64,
            overflow: OverflowPolicy::Wait,
        }
    }
}

/// What the dispatcher does with an event when its queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Hold the listener until a slot frees up.
    Wait,
    /// Drop the event and count it.
    Reject,
}

impl OverflowPolicy {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wait" | "block" => Ok(Self::Wait),
            "reject" | "drop" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidOverflowPolicy(raw.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingEventBusUrl,
    InvalidNumber { key: &'static str, value: String },
    InvalidOverflowPolicy(String),
    InvalidLogFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingEventBusUrl => {
                write!(f, "REDIS_URL must be set to subscribe to match events")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer (got '{value}')")
            }
            ConfigError::InvalidOverflowPolicy(value) => write!(
                f,
                "MATCH_OVERFLOW_POLICY must be 'wait' or 'reject' (got '{value}')"
            ),
            ConfigError::InvalidLogFormat(value) => write!(
                f,
                "APP_LOG_FORMAT must be 'compact' or 'json' (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
