use serde::{Deserialize, Deserializer, Serialize};

/// Job identifier carried by an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a profile in the talent pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One job-posted notification. All job data is fetched fresh from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent {
    pub correlation_id: CorrelationId,
}

impl MatchEvent {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId(correlation_id.into()),
        }
    }
}

/// Skill or category tag as stored upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
}

/// Job record as returned by `GET /private/job/by-request/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobPosting {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(deserialize_with = "null_as_default")]
    pub collaboration_types: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub bond: String,
    #[serde(deserialize_with = "null_as_default")]
    pub remote: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub min_salary: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_salary: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tag_ids: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,
}

/// Candidate profile as returned by `GET /private/user-profile/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    pub address: Option<Address>,
    #[serde(deserialize_with = "null_as_default")]
    pub skills: Vec<Tag>,
    #[serde(rename = "SocialSites", deserialize_with = "null_as_default")]
    pub social_sites: Vec<SocialSite>,
    #[serde(rename = "WorkHistory", deserialize_with = "null_as_default")]
    pub work_history: Vec<WorkHistoryEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub certifications: Vec<Certification>,
    #[serde(deserialize_with = "null_as_default")]
    pub languages: Vec<LanguageProficiency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialSite {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageProficiency {
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(deserialize_with = "null_as_default")]
    pub level: String,
}

/// Past position. The organization travels as `name` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkHistoryEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "name", deserialize_with = "null_as_default")]
    pub organization: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date: String,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Certification {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "name", deserialize_with = "null_as_default")]
    pub organization: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Relevance score for one candidate against one job, valid in `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    #[serde(rename = "requestId")]
    pub correlation_id: CorrelationId,
    #[serde(rename = "userId")]
    pub candidate_id: CandidateId,
    pub score: u8,
}

pub const MAX_SCORE: u8 = 100;

/// Upstream sends `null` for unset columns; those decode as the zero value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let opt = Option::<T>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}
