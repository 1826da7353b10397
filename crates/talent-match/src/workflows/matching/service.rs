use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use super::directory::{CandidateFilter, DirectoryClient, DirectoryError, ResultSink};
use super::domain::{CandidateId, CorrelationId, JobPosting, MatchScore};
use super::oracle::{ScoringError, ScoringOracle};
use super::projection::JobScoringView;

/// One initial call plus one retry.
pub const SCORING_ATTEMPTS: usize = 2;

/// Drives one match run: job, candidate pool, then score and report each candidate.
pub struct MatchOrchestrator<D, S, O> {
    directory: Arc<D>,
    sink: Arc<S>,
    oracle: Arc<O>,
}

impl<D, S, O> MatchOrchestrator<D, S, O>
where
    D: DirectoryClient + 'static,
    S: ResultSink + 'static,
    O: ScoringOracle + 'static,
{
    pub fn new(directory: Arc<D>, sink: Arc<S>, oracle: Arc<O>) -> Self {
        Self {
            directory,
            sink,
            oracle,
        }
    }

    /// Run the whole pool against the job behind `correlation_id`.
    ///
    /// Only a failed job or candidate-pool fetch aborts the run. Everything that goes
    /// wrong for a single candidate is logged, recorded in the summary, and skipped.
    pub async fn process_match(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<RunSummary, MatchRunError> {
        counter!("match_runs_total").increment(1);

        let job = self
            .directory
            .get_job(correlation_id)
            .await
            .map_err(|source| abort(correlation_id, MatchRunError::Job(source)))?;

        let candidate_ids = self
            .directory
            .list_candidate_ids(&CandidateFilter::default())
            .await
            .map_err(|source| abort(correlation_id, MatchRunError::CandidatePool(source)))?;

        if candidate_ids.is_empty() {
            return Err(abort(correlation_id, MatchRunError::EmptyCandidatePool));
        }

        info!(
            %correlation_id,
            candidates = candidate_ids.len(),
            "match run started"
        );

        let job_view = JobContext::new(&job).map_err(|error| abort(correlation_id, error))?;
        let mut summary = RunSummary::new(correlation_id.clone(), candidate_ids.len());

        for candidate_id in candidate_ids {
            match self
                .process_candidate(correlation_id, &job_view, &candidate_id)
                .await
            {
                Ok(CandidateOutcome::Reported(score)) => summary.reported.push(score),
                Ok(CandidateOutcome::ReportFailed(score)) => summary.report_failures.push(score),
                Err(reason) => {
                    counter!("match_candidates_skipped_total").increment(1);
                    warn!(
                        %correlation_id,
                        %candidate_id,
                        error = %reason,
                        "candidate skipped"
                    );
                    summary.skipped.push(SkippedCandidate {
                        candidate_id,
                        reason,
                    });
                }
            }
        }

        info!(
            %correlation_id,
            reported = summary.reported.len(),
            skipped = summary.skipped.len(),
            report_failures = summary.report_failures.len(),
            "match run finished"
        );

        Ok(summary)
    }

    async fn process_candidate(
        &self,
        correlation_id: &CorrelationId,
        job: &JobContext,
        candidate_id: &CandidateId,
    ) -> Result<CandidateOutcome, SkipReason> {
        let profile = self
            .directory
            .get_candidate(candidate_id)
            .await
            .map_err(SkipReason::Fetch)?;

        let candidate_json = serde_json::to_string(&profile.to_scoring_view())
            .map_err(|err| SkipReason::Projection(err.to_string()))?;

        let score = self
            .score_with_retry(correlation_id, candidate_id, &job.json, &candidate_json)
            .await
            .map_err(SkipReason::Scoring)?;

        let score = MatchScore {
            correlation_id: correlation_id.clone(),
            candidate_id: candidate_id.clone(),
            score,
        };

        match self.sink.report_score(&score).await {
            Ok(()) => {
                counter!("match_scores_reported_total").increment(1);
                debug!(%correlation_id, %candidate_id, score = score.score, "score reported");
                Ok(CandidateOutcome::Reported(score))
            }
            Err(err) => {
                counter!("match_reports_failed_total").increment(1);
                warn!(
                    %correlation_id,
                    %candidate_id,
                    score = score.score,
                    error = %err,
                    "score report failed"
                );
                Ok(CandidateOutcome::ReportFailed(score))
            }
        }
    }

    async fn score_with_retry(
        &self,
        correlation_id: &CorrelationId,
        candidate_id: &CandidateId,
        job_json: &str,
        candidate_json: &str,
    ) -> Result<u8, ScoringError> {
        let mut attempt = 1;
        loop {
            match self.oracle.score(job_json, candidate_json).await {
                Ok(score) => return Ok(score),
                Err(err) if attempt < SCORING_ATTEMPTS => {
                    debug!(
                        %correlation_id,
                        %candidate_id,
                        attempt,
                        error = %err,
                        "scoring attempt failed, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn abort(correlation_id: &CorrelationId, error: MatchRunError) -> MatchRunError {
    counter!("match_runs_aborted_total").increment(1);
    warn!(%correlation_id, error = %error, "match run aborted");
    error
}

/// Job projection serialized once per run and reused for every candidate.
struct JobContext {
    json: String,
}

impl JobContext {
    fn new(job: &JobPosting) -> Result<Self, MatchRunError> {
        let view: JobScoringView = job.to_scoring_view();
        let json = serde_json::to_string(&view)
            .map_err(|err| MatchRunError::Projection(err.to_string()))?;
        Ok(Self { json })
    }
}

enum CandidateOutcome {
    Reported(MatchScore),
    ReportFailed(MatchScore),
}

/// Why a run produced no candidate work at all.
#[derive(Debug, thiserror::Error)]
pub enum MatchRunError {
    #[error("job could not be fetched: {0}")]
    Job(#[source] DirectoryError),
    #[error("candidate pool could not be fetched: {0}")]
    CandidatePool(#[source] DirectoryError),
    #[error("candidate pool is empty")]
    EmptyCandidatePool,
    #[error("job could not be projected: {0}")]
    Projection(String),
}

/// Why a single candidate got no score report.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("profile fetch failed: {0}")]
    Fetch(#[source] DirectoryError),
    #[error("profile could not be projected: {0}")]
    Projection(String),
    #[error("scoring failed twice: {0}")]
    Scoring(#[source] ScoringError),
}

#[derive(Debug)]
pub struct SkippedCandidate {
    pub candidate_id: CandidateId,
    pub reason: SkipReason,
}

/// Outcome of a finished run, in candidate order within each list.
#[derive(Debug)]
pub struct RunSummary {
    pub correlation_id: CorrelationId,
    pub candidates: usize,
    pub reported: Vec<MatchScore>,
    pub report_failures: Vec<MatchScore>,
    pub skipped: Vec<SkippedCandidate>,
}

impl RunSummary {
    fn new(correlation_id: CorrelationId, candidates: usize) -> Self {
        Self {
            correlation_id,
            candidates,
            reported: Vec::new(),
            report_failures: Vec::new(),
            skipped: Vec::new(),
        }
    }
}
