use anyhow::{bail, Context, Result};
use std::path::PathBuf;

pub const DB_ENV: &str = "JOBMATCH_DB";
pub const MIN_SCORE_ENV: &str = "JOBMATCH_MIN_SCORE";
pub const LIMIT_ENV: &str = "JOBMATCH_LIMIT";

/// Runtime settings taken from the environment. CLI flags win over these.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub min_score: u32,
    pub limit: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = match lookup(DB_ENV).filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_db_path(),
        };

        let min_score = lookup(MIN_SCORE_ENV)
            .map(|v| v.trim().parse::<u32>())
            .transpose()
            .with_context(|| format!("{MIN_SCORE_ENV} must be a whole number between 0 and 100"))?
            .unwrap_or(0)
            .min(100);

        let limit = lookup(LIMIT_ENV)
            .map(|v| v.trim().parse::<usize>())
            .transpose()
            .with_context(|| format!("{LIMIT_ENV} must be a positive whole number"))?
            .unwrap_or(20);
        if limit == 0 {
            bail!("{LIMIT_ENV} must be a positive whole number");
        }

        Ok(Config {
            db_path,
            min_score,
            limit,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn default_db_path() -> PathBuf {
    // XDG data directory, or the working directory as a last resort
    match directories::ProjectDirs::from("", "", "jobmatch") {
        Some(proj_dirs) => proj_dirs.data_dir().join("jobmatch.db"),
        None => PathBuf::from("jobmatch.db"),
    }
}
