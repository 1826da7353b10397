use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::workflows::matching::directory::{
    CandidateFilter, DirectoryClient, DirectoryError, ReportError, ResultSink,
};
use crate::workflows::matching::domain::{
    CandidateId, CandidateProfile, CorrelationId, JobPosting, LanguageProficiency, MatchScore, Tag,
    WorkHistoryEntry,
};
use crate::workflows::matching::oracle::{ScoringError, ScoringOracle};
use crate::workflows::matching::MatchOrchestrator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum DirectoryCall {
    GetJob(String),
    ListCandidates,
    GetCandidate(String),
}

pub(super) fn job(id: &str) -> JobPosting {
    JobPosting {
        id: id.to_string(),
        name: "Data engineer".to_string(),
        description: "Build the warehouse".to_string(),
        reason: "New product line".to_string(),
        collaboration_types: vec!["contract".to_string()],
        bond: "PJ".to_string(),
        remote: false,
        min_salary: 7000,
        max_salary: 9000,
        currency: "BRL".to_string(),
        tag_ids: vec!["tag-sql".to_string()],
        tags: vec![Tag {
            id: "tag-sql".to_string(),
            label: "SQL".to_string(),
            key: "sql".to_string(),
        }],
    }
}

pub(super) fn candidate(description: &str) -> CandidateProfile {
    CandidateProfile {
        name: format!("{description} name"),
        description: description.to_string(),
        skills: vec![Tag {
            id: "tag-sql".to_string(),
            label: "SQL".to_string(),
            key: "sql".to_string(),
        }],
        languages: vec![LanguageProficiency {
            language: "English".to_string(),
            level: "fluent".to_string(),
        }],
        work_history: vec![WorkHistoryEntry {
            title: "Analyst".to_string(),
            organization: "Acme".to_string(),
            url: "https://acme.example".to_string(),
            description: "Reports".to_string(),
            start_date: "2022-01-01".to_string(),
            end_date: None,
        }],
        ..CandidateProfile::default()
    }
}

/// Directory fake. Candidates missing from `profiles` fail with `NotFound`.
#[derive(Default)]
pub(super) struct FakeDirectory {
    job: Option<JobPosting>,
    job_status: Option<StatusCode>,
    candidate_ids: Option<Vec<String>>,
    profiles: HashMap<String, CandidateProfile>,
    calls: Mutex<Vec<DirectoryCall>>,
}

impl FakeDirectory {
    pub(super) fn with_job(job: JobPosting) -> Self {
        Self {
            job: Some(job),
            candidate_ids: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub(super) fn failing_job(status: StatusCode) -> Self {
        Self {
            job_status: Some(status),
            candidate_ids: Some(vec!["U1".to_string()]),
            ..Self::default()
        }
    }

    pub(super) fn candidates(mut self, ids: &[&str]) -> Self {
        self.candidate_ids = Some(ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub(super) fn unavailable_pool(mut self) -> Self {
        self.candidate_ids = None;
        self
    }

    pub(super) fn profile(mut self, id: &str, profile: CandidateProfile) -> Self {
        self.profiles.insert(id.to_string(), profile);
        self
    }

    pub(super) fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, call: DirectoryCall) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn get_job(&self, id: &CorrelationId) -> Result<JobPosting, DirectoryError> {
        self.record(DirectoryCall::GetJob(id.0.clone()));
        if let Some(status) = self.job_status {
            return Err(DirectoryError::Status {
                status,
                path: format!("/private/job/by-request/{}", id.0),
            });
        }
        self.job
            .clone()
            .ok_or_else(|| DirectoryError::NotFound(id.0.clone()))
    }

    async fn list_candidate_ids(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<CandidateId>, DirectoryError> {
        assert!(filter.tags.is_empty(), "candidate filter is always empty");
        self.record(DirectoryCall::ListCandidates);
        self.candidate_ids
            .clone()
            .map(|ids| ids.into_iter().map(CandidateId).collect())
            .ok_or_else(|| DirectoryError::Transport("connection reset".to_string()))
    }

    async fn get_candidate(&self, id: &CandidateId) -> Result<CandidateProfile, DirectoryError> {
        self.record(DirectoryCall::GetCandidate(id.0.clone()));
        self.profiles
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(id.0.clone()))
    }
}

#[derive(Default)]
pub(super) struct MemorySink {
    reports: Mutex<Vec<MatchScore>>,
    failing: HashSet<String>,
}

impl MemorySink {
    pub(super) fn failing_for(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(super) fn reports(&self) -> Vec<MatchScore> {
        self.reports.lock().expect("sink mutex poisoned").clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn report_score(&self, score: &MatchScore) -> Result<(), ReportError> {
        self.reports
            .lock()
            .expect("sink mutex poisoned")
            .push(score.clone());
        if self.failing.contains(&score.candidate_id.0) {
            return Err(ReportError::Status(StatusCode::BAD_GATEWAY));
        }
        Ok(())
    }
}

/// Oracle fake answering from a script, then with `fallback` once the script runs dry.
pub(super) struct ScriptedOracle {
    script: Mutex<VecDeque<Result<u8, ScoringError>>>,
    fallback: u8,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedOracle {
    pub(super) fn new(script: Vec<Result<u8, ScoringError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: 50,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn always(score: u8) -> Self {
        Self {
            fallback: score,
            ..Self::new(Vec::new())
        }
    }

    pub(super) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("oracle mutex poisoned").clone()
    }
}

#[async_trait]
impl ScoringOracle for ScriptedOracle {
    async fn score(&self, job_view: &str, candidate_view: &str) -> Result<u8, ScoringError> {
        self.calls
            .lock()
            .expect("oracle mutex poisoned")
            .push((job_view.to_string(), candidate_view.to_string()));
        self.script
            .lock()
            .expect("oracle mutex poisoned")
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }
}

pub(super) fn parse_failure() -> ScoringError {
    ScoringError::Parse("expected value at line 1 column 1".to_string())
}

pub(super) type TestOrchestrator = MatchOrchestrator<FakeDirectory, MemorySink, ScriptedOracle>;

pub(super) fn orchestrator(
    directory: FakeDirectory,
    sink: MemorySink,
    oracle: ScriptedOracle,
) -> (
    TestOrchestrator,
    Arc<FakeDirectory>,
    Arc<MemorySink>,
    Arc<ScriptedOracle>,
) {
    let directory = Arc::new(directory);
    let sink = Arc::new(sink);
    let oracle = Arc::new(oracle);
    let orchestrator = MatchOrchestrator::new(directory.clone(), sink.clone(), oracle.clone());
    (orchestrator, directory, sink, oracle)
}

pub(super) fn correlation(id: &str) -> CorrelationId {
    CorrelationId(id.to_string())
}
