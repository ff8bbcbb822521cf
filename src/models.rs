use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    New,
    Reviewing,
    Applied,
    Rejected,
    Closed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::New,
        JobStatus::Reviewing,
        JobStatus::Applied,
        JobStatus::Rejected,
        JobStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::Reviewing => "reviewing",
            JobStatus::Applied => "applied",
            JobStatus::Rejected => "rejected",
            JobStatus::Closed => "closed",
        }
    }

    /// Rejected and closed postings drop out of rankings by default.
    pub fn is_active(&self) -> bool {
        !matches!(self, JobStatus::Rejected | JobStatus::Closed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow!(
                    "Unknown status '{}'. Expected one of: new, reviewing, applied, rejected, closed",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: String,
    pub external_id: Option<String>, // id at the listing source
    pub source: Option<String>,
    pub url: Option<String>,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// A posting that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: String,
    pub external_id: Option<String>,
    pub source: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSkillProfile {
    pub skills: Vec<String>,
    pub experience: String,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    pub score: u32,
    pub reasons: Vec<String>,
    pub matched_keywords: Vec<String>,
}
