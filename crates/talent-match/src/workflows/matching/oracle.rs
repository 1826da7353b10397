use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::MAX_SCORE;
use crate::config::OracleConfig;

pub const SYSTEM_PROMPT: &str = "I need you to check if candidate is relevant for this job post. \
I will send you the candidate info in stringified json and the job post in stringified json as well. \
Return a json object -> {\"score\": score} -> where score is an integer between 0 and 100 (included) \
based on how relevant the candidate is for this job post.";

const CANDIDATE_PREFIX: &str = "Candidate: ";
const JOB_SEPARATOR: &str = "   ... and job post: ";

/// External relevance judge. Given two serialized views, returns a score in `0..=100`.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn score(&self, job_view: &str, candidate_view: &str) -> Result<u8, ScoringError>;
}

/// Any failed scoring attempt. Callers treat every variant the same way.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("oracle credential is not configured")]
    MissingCredential,
    #[error("oracle transport failed: {0}")]
    Transport(String),
    #[error("oracle returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("oracle response carried no choices")]
    MissingChoice,
    #[error("oracle response could not be parsed: {0}")]
    Parse(String),
    #[error("oracle score {0} is outside 0..=100")]
    OutOfRange(i64),
}

/// Builds the user turn: candidate first, then the job post.
pub fn user_prompt(job_view: &str, candidate_view: &str) -> String {
    format!("{CANDIDATE_PREFIX}{candidate_view}{JOB_SEPARATOR}{job_view}")
}

/// Decode the assistant content into a score, rejecting out-of-range values.
pub fn parse_score(content: &str) -> Result<u8, ScoringError> {
    let parsed: ScorePayload =
        serde_json::from_str(content.trim()).map_err(|err| ScoringError::Parse(err.to_string()))?;

    match u8::try_from(parsed.score) {
        Ok(score) if score <= MAX_SCORE => Ok(score),
        _ => Err(ScoringError::OutOfRange(parsed.score)),
    }
}

#[derive(Debug, Deserialize)]
struct ScorePayload {
    score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions backed judge. Stateless between calls.
#[derive(Debug, Clone)]
pub struct OpenAiScoringOracle {
    http: Client,
    config: OracleConfig,
}

impl OpenAiScoringOracle {
    pub fn new(http: Client, config: OracleConfig) -> Self {
        Self { http, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ScoringOracle for OpenAiScoringOracle {
    async fn score(&self, job_view: &str, candidate_view: &str) -> Result<u8, ScoringError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ScoringError::MissingCredential)?;

        let prompt = user_prompt(job_view, candidate_view);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| ScoringError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "oracle rejected scoring request");
            return Err(ScoringError::Status { status, body });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|err| ScoringError::Parse(err.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ScoringError::MissingChoice)?;

        debug!(
            model = %self.config.model,
            duration_ms = start.elapsed().as_millis() as u64,
            content = %content,
            "oracle responded"
        );

        parse_score(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_field_record() {
        assert_eq!(parse_score(r#"{"score": 77}"#).expect("valid"), 77);
        assert_eq!(parse_score(" {\"score\":0}\n").expect("valid"), 0);
        assert_eq!(parse_score(r#"{"score": 100}"#).expect("valid"), 100);
    }

    #[test]
    fn rejects_scores_outside_range() {
        assert!(matches!(
            parse_score(r#"{"score": 101}"#),
            Err(ScoringError::OutOfRange(101))
        ));
        assert!(matches!(
            parse_score(r#"{"score": -3}"#),
            Err(ScoringError::OutOfRange(-3))
        ));
    }

    #[test]
    fn rejects_malformed_content() {
        for content in [r#"{"relevance": 80}"#, r#"{"score": "high"}"#, "eighty", ""] {
            assert!(
                matches!(parse_score(content), Err(ScoringError::Parse(_))),
                "{content} should not parse"
            );
        }
    }

    #[test]
    fn user_prompt_puts_candidate_before_job() {
        let prompt = user_prompt(r#"{"name":"job"}"#, r#"{"description":"cand"}"#);
        assert_eq!(
            prompt,
            r#"Candidate: {"description":"cand"}   ... and job post: {"name":"job"}"#
        );
    }

    #[test]
    fn request_asks_for_json_object() {
        let request = ChatRequest {
            model: "gpt-4-turbo-preview",
            messages: vec![ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let value = serde_json::to_value(&request).expect("serializes");
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let oracle = OpenAiScoringOracle::new(
            Client::new(),
            OracleConfig {
                api_key: None,
                model: "gpt-4-turbo-preview".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
            },
        );
        assert!(matches!(
            oracle.score("{}", "{}").await,
            Err(ScoringError::MissingCredential)
        ));
    }
}
