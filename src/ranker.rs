use serde::Serialize;
use tracing::debug;

use crate::models::{JobMatch, JobPosting, UserSkillProfile};
use crate::scorer;

#[derive(Debug, Clone)]
pub struct RankOptions {
    pub min_score: u32,
    pub limit: usize,
    pub include_inactive: bool,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            min_score: 0,
            limit: 20,
            include_inactive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedJob {
    pub job: JobPosting,
    #[serde(rename = "match")]
    pub job_match: JobMatch,
}

/// Scores every posting against the profile and returns the best first.
pub fn rank(
    jobs: Vec<JobPosting>,
    profile: &UserSkillProfile,
    options: &RankOptions,
) -> Vec<RankedJob> {
    let total = jobs.len();

    let mut ranked: Vec<RankedJob> = jobs
        .into_iter()
        .filter(|job| options.include_inactive || job.status.is_active())
        .map(|job| {
            let job_match = scorer::score_profile(&job, profile);
            RankedJob { job, job_match }
        })
        .filter(|r| r.job_match.score >= options.min_score)
        .collect();

    ranked.sort_by(|a, b| {
        b.job_match
            .score
            .cmp(&a.job_match.score)
            .then(a.job.id.cmp(&b.job.id))
    });
    ranked.truncate(options.limit);

    debug!(
        total,
        kept = ranked.len(),
        min_score = options.min_score,
        "ranked job postings"
    );

    ranked
}
