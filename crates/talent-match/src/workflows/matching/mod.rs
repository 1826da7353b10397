//! Job-to-talent-pool matching: one run per job-posted event.
//!
//! A run fetches the job and the candidate pool from the directory, projects each
//! pair into scoring views, asks the relevance judge for a score (retrying once),
//! and reports every score back to the system of record.

pub mod directory;
pub mod dispatch;
pub mod domain;
pub mod events;
pub mod oracle;
pub mod projection;
pub mod service;

#[cfg(test)]
mod tests;

pub use directory::{
    CandidateFilter, DirectoryClient, DirectoryError, HttpDirectoryClient, ReportError, ResultSink,
};
pub use dispatch::{DispatchError, MatchDispatcher};
pub use domain::{
    CandidateId, CandidateProfile, CorrelationId, JobPosting, MatchEvent, MatchScore, Tag,
};
pub use events::{pump_events, EventBusError, MatchEventSource, RedisEventSource};
pub use oracle::{OpenAiScoringOracle, ScoringError, ScoringOracle};
pub use projection::{CandidateScoringView, JobScoringView};
pub use service::{
    MatchOrchestrator, MatchRunError, RunSummary, SkipReason, SkippedCandidate, SCORING_ATTEMPTS,
};
