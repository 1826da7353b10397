use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{CandidateId, CandidateProfile, CorrelationId, JobPosting, MatchScore};
use crate::config::DirectoryConfig;

/// Filter sent to the candidate search endpoint. Always empty today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateFilter {
    pub tags: Vec<String>,
}

/// Read access to jobs and the talent pool.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn get_job(&self, id: &CorrelationId) -> Result<JobPosting, DirectoryError>;
    async fn list_candidate_ids(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateId>, DirectoryError>;
    async fn get_candidate(&self, id: &CandidateId) -> Result<CandidateProfile, DirectoryError>;
}

/// Outbound hook into the system of record. Best effort, never retried.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn report_score(&self, score: &MatchScore) -> Result<(), ReportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("directory returned {status} for {path}")]
    Status { status: StatusCode, path: String },
    #[error("directory transport failed: {0}")]
    Transport(String),
    #[error("directory response could not be decoded: {0}")]
    Decode(String),
    #[error("directory is not configured: {0} is missing")]
    Unconfigured(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("result api returned {0}")]
    Status(StatusCode),
    #[error("result transport failed: {0}")]
    Transport(String),
    #[error("result payload could not be encoded: {0}")]
    Encode(String),
    #[error("result api is not configured: {0} is missing")]
    Unconfigured(&'static str),
}

#[derive(Debug, Deserialize)]
struct CandidateSearchResponse {
    #[serde(rename = "userIds", default)]
    user_ids: Option<Vec<String>>,
}

/// HTTP client for the private directory and result endpoints.
///
/// Shares one `reqwest::Client` with the rest of the process; holds no per-call state.
#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
    http: Client,
    config: DirectoryConfig,
}

impl HttpDirectoryClient {
    pub fn new(http: Client, config: DirectoryConfig) -> Self {
        Self { http, config }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, &'static str> {
        let base = self.config.base_url.as_deref().ok_or("BASE_URL")?;
        let url = format!("{}{}", base.trim_end_matches('/'), path);

        let mut builder = self
            .http
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = &self.config.auth_header {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        Ok(builder)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<T, DirectoryError> {
        let response = builder
            .send()
            .await
            .map_err(|err| DirectoryError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(DirectoryError::Status {
                status,
                path: path.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| DirectoryError::Transport(err.to_string()))?;
        debug!(path, bytes = body.len(), "directory response received");

        serde_json::from_slice(&body).map_err(|err| DirectoryError::Decode(err.to_string()))
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn get_job(&self, id: &CorrelationId) -> Result<JobPosting, DirectoryError> {
        let path = format!("/private/job/by-request/{}", id.as_str());
        let builder = self
            .request(Method::GET, &path)
            .map_err(DirectoryError::Unconfigured)?;
        self.fetch_json(builder, &path).await
    }

    async fn list_candidate_ids(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateId>, DirectoryError> {
        let path = "/private/user-profiles/search";
        let builder = self
            .request(Method::POST, path)
            .map_err(DirectoryError::Unconfigured)?
            .json(filter);
        let response: CandidateSearchResponse = self.fetch_json(builder, path).await?;

        Ok(response
            .user_ids
            .unwrap_or_default()
            .into_iter()
            .map(CandidateId)
            .collect())
    }

    async fn get_candidate(&self, id: &CandidateId) -> Result<CandidateProfile, DirectoryError> {
        let path = format!("/private/user-profile/{}", id.as_str());
        let builder = self
            .request(Method::GET, &path)
            .map_err(DirectoryError::Unconfigured)?;
        self.fetch_json(builder, &path).await
    }
}

#[async_trait]
impl ResultSink for HttpDirectoryClient {
    async fn report_score(&self, score: &MatchScore) -> Result<(), ReportError> {
        let body = serde_json::to_vec(score).map_err(|err| ReportError::Encode(err.to_string()))?;
        let response = self
            .request(Method::POST, "/private/ai/generate-user")
            .map_err(ReportError::Unconfigured)?
            .body(body)
            .send()
            .await
            .map_err(|err| ReportError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ReportError::Status(status))
        }
    }
}
