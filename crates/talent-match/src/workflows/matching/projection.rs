//! Minimal views of jobs and candidates handed to the relevance judge.
//!
//! Only free text, labels and history lists leave the service. Upstream ids,
//! tag ids and compensation figures are never part of a view.

use serde::Serialize;

use super::domain::{
    CandidateProfile, Certification, JobPosting, LanguageProficiency, Tag, WorkHistoryEntry,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobScoringView {
    pub name: String,
    pub description: String,
    pub reason: String,
    pub collaboration_types: Vec<String>,
    pub bond: String,
    pub remote: bool,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateScoringView {
    pub description: String,
    pub skills: Vec<String>,
    pub languages: Vec<LanguageProficiency>,
    #[serde(rename = "WorkHistory")]
    pub work_history: Vec<WorkHistoryEntry>,
    pub certifications: Vec<Certification>,
}

impl JobPosting {
    pub fn to_scoring_view(&self) -> JobScoringView {
        JobScoringView {
            name: self.name.clone(),
            description: self.description.clone(),
            reason: self.reason.clone(),
            collaboration_types: self.collaboration_types.clone(),
            bond: self.bond.clone(),
            remote: self.remote,
            skills: labels(&self.tags),
        }
    }
}

impl CandidateProfile {
    pub fn to_scoring_view(&self) -> CandidateScoringView {
        CandidateScoringView {
            description: self.description.clone(),
            skills: labels(&self.skills),
            languages: self.languages.clone(),
            work_history: self.work_history.clone(),
            certifications: self.certifications.clone(),
        }
    }
}

fn labels(tags: &[Tag]) -> Vec<String> {
    tags.iter().map(|tag| tag.label.clone()).collect()
}
