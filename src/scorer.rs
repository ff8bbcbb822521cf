//! Job relevance scoring.
//!
//! Four independently capped components add up to a 0-100 match score:
//! skill overlap (40), experience overlap (30), title affinity (20) and a
//! remote bonus (10).

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::{JobMatch, JobPosting, UserSkillProfile};

pub const SKILL_WEIGHT: f64 = 40.0;
pub const EXPERIENCE_WEIGHT: f64 = 30.0;
pub const TITLE_BONUS: f64 = 20.0;
pub const REMOTE_BONUS: f64 = 10.0;

const MAX_KEYWORDS: usize = 5;
const SKILLS_NAMED_IN_REASON: usize = 3;
/// Common tokens needed for full experience credit.
const EXPERIENCE_SATURATION: f64 = 10.0;
const MIN_TOKEN_LEN: usize = 4;
const STOPWORDS: [&str; 4] = ["experience", "work", "responsibilities", "duties"];

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]+").expect("static regex"));

/// Un-rounded contribution of each component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub skills: f64,
    pub experience: f64,
    pub title: f64,
    pub location: f64,
    pub reasons: Vec<String>,
    pub matched_keywords: Vec<String>,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        let sum = self.skills + self.experience + self.title + self.location;
        sum.round().clamp(0.0, 100.0) as u32
    }

    pub fn into_match(self) -> JobMatch {
        JobMatch {
            score: self.total(),
            reasons: self.reasons,
            matched_keywords: self.matched_keywords,
        }
    }
}

/// Scores one posting against a user's skills, experience and current title.
pub fn score(
    job: &JobPosting,
    user_skills: &[String],
    user_experience: &str,
    job_title: Option<&str>,
) -> JobMatch {
    score_breakdown(job, user_skills, user_experience, job_title).into_match()
}

pub fn score_profile(job: &JobPosting, profile: &UserSkillProfile) -> JobMatch {
    score(
        job,
        &profile.skills,
        &profile.experience,
        profile.job_title.as_deref(),
    )
}

pub fn score_breakdown(
    job: &JobPosting,
    user_skills: &[String],
    user_experience: &str,
    job_title: Option<&str>,
) -> ScoreBreakdown {
    let job_text = job_text(job);
    let mut breakdown = ScoreBreakdown::default();

    // Skill overlap
    let matched: Vec<&String> = user_skills
        .iter()
        .filter(|skill| !skill.trim().is_empty() && job_text.contains(&skill.to_lowercase()))
        .collect();
    if !matched.is_empty() {
        let ratio = matched.len() as f64 / user_skills.len() as f64;
        breakdown.skills = (ratio * SKILL_WEIGHT).min(SKILL_WEIGHT);
        let named: Vec<&str> = matched
            .iter()
            .take(SKILLS_NAMED_IN_REASON)
            .map(|s| s.as_str())
            .collect();
        breakdown.reasons.push(format!(
            "Matches {} of your skills: {}",
            matched.len(),
            named.join(", ")
        ));
        breakdown.matched_keywords = matched
            .into_iter()
            .take(MAX_KEYWORDS)
            .cloned()
            .collect();
    }

    // Experience relevance
    let common = common_tokens(&job_text, &user_experience.to_lowercase());
    if common > 0 {
        breakdown.experience =
            (common as f64 / EXPERIENCE_SATURATION * EXPERIENCE_WEIGHT).min(EXPERIENCE_WEIGHT);
        breakdown
            .reasons
            .push("Your experience lines up with this role".to_string());
    }

    // Title affinity
    let first_word = job_title
        .and_then(|t| t.split_whitespace().next())
        .map(str::to_lowercase);
    if let Some(word) = first_word {
        if job.title.to_lowercase().contains(&word) {
            breakdown.title = TITLE_BONUS;
            breakdown
                .reasons
                .push("Job title matches your current role".to_string());
        }
    }

    // Remote bonus
    if job.location.to_lowercase().contains("remote") {
        breakdown.location = REMOTE_BONUS;
        breakdown.reasons.push("Remote-friendly position".to_string());
    }

    breakdown
}

/// Lower-cased title, description and requirements joined by spaces.
pub fn job_text(job: &JobPosting) -> String {
    format!(
        "{} {} {}",
        job.title,
        job.description,
        job.requirements.as_deref().unwrap_or("")
    )
    .to_lowercase()
}

fn tokens(text: &str) -> HashSet<&str> {
    NON_WORD
        .split(text)
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !STOPWORDS.contains(t))
        .collect()
}

fn common_tokens(job_text: &str, experience: &str) -> usize {
    let experience_tokens = tokens(experience);
    if experience_tokens.is_empty() {
        return 0;
    }
    tokens(job_text).intersection(&experience_tokens).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;

    fn make_job(title: &str, description: &str, location: &str) -> JobPosting {
        JobPosting {
            id: 1,
            title: title.to_string(),
            description: description.to_string(),
            requirements: None,
            location: location.to_string(),
            external_id: None,
            source: None,
            url: None,
            status: JobStatus::New,
            created_at: "2026-01-01 00:00:00".to_string(),
            updated_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    fn skills(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_react_developer_example() {
        let job = make_job(
            "Senior React Developer",
            "Looking for React and TypeScript experience",
            "Remote",
        );
        let result = score(
            &job,
            &skills(&["React", "TypeScript", "Node.js"]),
            "",
            Some("React Developer"),
        );
        assert_eq!(result.score, 57);
        assert_eq!(result.matched_keywords, vec!["React", "TypeScript"]);
        assert_eq!(result.reasons.len(), 3);
        assert!(result.reasons[0].contains("Matches 2 of your skills"));
    }

    #[test]
    fn test_empty_skills_contribute_nothing() {
        let job = make_job("Backend Engineer", "Rust services", "Remote");
        let breakdown = score_breakdown(&job, &[], "built rust services", Some("Backend Engineer"));
        assert_eq!(breakdown.skills, 0.0);
        assert!(breakdown.matched_keywords.is_empty());
        assert_eq!(breakdown.title, TITLE_BONUS);
        assert_eq!(breakdown.location, REMOTE_BONUS);
    }

    #[test]
    fn test_no_remote_no_location_bonus() {
        let job = make_job("Backend Engineer", "Rust services", "San Francisco, CA");
        let breakdown = score_breakdown(&job, &skills(&["Rust"]), "", None);
        assert_eq!(breakdown.location, 0.0);
        assert!(!breakdown.reasons.iter().any(|r| r.contains("Remote")));
    }

    #[test]
    fn test_remote_is_case_insensitive() {
        let job = make_job("Engineer", "Anything", "Fully REMOTE (US)");
        let breakdown = score_breakdown(&job, &[], "", None);
        assert_eq!(breakdown.location, REMOTE_BONUS);
    }

    #[test]
    fn test_empty_experience_contributes_nothing() {
        let job = make_job("Data Engineer", "Spark pipelines and warehouse modelling", "Berlin");
        let breakdown = score_breakdown(&job, &[], "", None);
        assert_eq!(breakdown.experience, 0.0);
    }

    #[test]
    fn test_experience_ignores_stopwords_and_short_tokens() {
        let job = make_job(
            "Engineer",
            "Experience with work duties and responsibilities, api, sql",
            "",
        );
        let breakdown = score_breakdown(
            &job,
            &[],
            "experience work duties responsibilities api sql",
            None,
        );
        assert_eq!(breakdown.experience, 0.0);
        assert!(breakdown.reasons.is_empty());
    }

    #[test]
    fn test_experience_scales_with_common_tokens() {
        let job = make_job(
            "Platform Engineer",
            "kubernetes terraform monitoring",
            "",
        );
        let breakdown = score_breakdown(
            &job,
            &[],
            "Ran Kubernetes clusters with Terraform; on-call monitoring.",
            None,
        );
        // kubernetes, terraform, monitoring
        assert!((breakdown.experience - 9.0).abs() < 1e-9);
        assert_eq!(
            breakdown.reasons,
            vec!["Your experience lines up with this role".to_string()]
        );
    }

    #[test]
    fn test_experience_capped_at_weight() {
        let words = "alpha bravo charlie delta echos foxtrot gamma hotel india juliet kilos lima mike";
        let job = make_job("Role", words, "");
        let breakdown = score_breakdown(&job, &[], words, None);
        assert_eq!(breakdown.experience, EXPERIENCE_WEIGHT);
    }

    #[test]
    fn test_matched_keywords_truncated_to_five() {
        let job = make_job(
            "Full Stack",
            "rust go python java kotlin swift",
            "",
        );
        let user = skills(&["Rust", "Go", "Python", "Java", "Kotlin", "Swift"]);
        let result = score(&job, &user, "", None);
        assert_eq!(result.matched_keywords.len(), 5);
        assert_eq!(result.matched_keywords[0], "Rust");
        assert!(result.reasons[0].starts_with("Matches 6 of your skills: Rust, Go, Python"));
    }

    #[test]
    fn test_requirements_are_searched() {
        let mut job = make_job("Engineer", "Build things", "");
        job.requirements = Some("Must know PostgreSQL".to_string());
        let result = score(&job, &skills(&["postgresql"]), "", None);
        assert_eq!(result.matched_keywords, vec!["postgresql"]);
        assert_eq!(result.score, 40);
    }

    #[test]
    fn test_blank_skill_never_matches() {
        let job = make_job("Engineer", "Build things", "");
        let result = score(&job, &skills(&["", "  "]), "", None);
        assert!(result.matched_keywords.is_empty());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_matched_keywords_appear_in_job_text() {
        let job = make_job("Frontend", "We use React.", "");
        let user = skills(&["React ", "React"]);
        let result = score(&job, &user, "", None);
        assert_eq!(result.matched_keywords, vec!["React"]);
        let text = job_text(&job);
        for keyword in &result.matched_keywords {
            assert!(text.contains(&keyword.to_lowercase()), "{keyword:?} not in {text:?}");
        }
    }

    #[test]
    fn test_blank_job_title_gets_no_affinity() {
        let job = make_job("Engineer", "Build things", "");
        assert_eq!(score_breakdown(&job, &[], "", Some("   ")).title, 0.0);
        assert_eq!(score_breakdown(&job, &[], "", None).title, 0.0);
    }

    #[test]
    fn test_title_uses_first_word_only() {
        let job = make_job("Senior Backend Engineer", "Build things", "");
        assert_eq!(
            score_breakdown(&job, &[], "", Some("Backend Developer")).title,
            TITLE_BONUS
        );
        assert_eq!(
            score_breakdown(&job, &[], "", Some("Frontend Engineer")).title,
            0.0
        );
    }

    #[test]
    fn test_degenerate_inputs_score_zero_without_reasons() {
        let job = make_job("", "", "");
        let result = score(&job, &[], "", None);
        assert_eq!(result.score, 0);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_maximum_score_is_clamped() {
        let words = "rust tokio axum serde alpha bravo charlie delta echos foxtrot gamma hotel";
        let job = make_job("Rust Engineer", words, "Remote");
        let result = score(&job, &skills(&["rust", "tokio"]), words, Some("Rust Engineer"));
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let job = make_job("Go Developer", "Microservices in Go and gRPC", "Remote, EU");
        let user = skills(&["Go", "gRPC", "Docker"]);
        let first = score(&job, &user, "microservices platform", Some("Go Developer"));
        let second = score(&job, &user, "microservices platform", Some("Go Developer"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_score_profile_matches_score() {
        let job = make_job("React Developer", "React", "Remote");
        let profile = UserSkillProfile {
            skills: skills(&["React"]),
            experience: String::new(),
            job_title: Some("React Engineer".to_string()),
        };
        assert_eq!(
            score_profile(&job, &profile),
            score(&job, &profile.skills, "", Some("React Engineer"))
        );
    }
}
