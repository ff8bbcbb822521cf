use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Database, Upsert};
use crate::models::NewJob;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid job listing JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Posting #{index} is missing a non-empty '{field}'")]
    MissingField { index: usize, field: &'static str },
}

/// Shape of a record handed over by a job-listing source.
#[derive(Debug, Deserialize)]
struct RawPosting {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    requirements: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    external_id: Option<ExternalId>,
    #[serde(default)]
    id: Option<ExternalId>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Sources disagree on whether ids are strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExternalId {
    Text(String),
    Number(i64),
}

impl ExternalId {
    fn into_string(self) -> String {
        match self {
            ExternalId::Text(s) => s,
            ExternalId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub inserted: usize,
    pub updated: usize,
}

pub fn parse_postings(json: &str) -> Result<Vec<NewJob>, ImportError> {
    let raw: Vec<RawPosting> = serde_json::from_str(json)?;

    raw.into_iter()
        .enumerate()
        .map(|(index, posting)| {
            let title = posting.title.trim().to_string();
            if title.is_empty() {
                return Err(ImportError::MissingField {
                    index,
                    field: "title",
                });
            }
            if posting.description.trim().is_empty() {
                return Err(ImportError::MissingField {
                    index,
                    field: "description",
                });
            }
            Ok(NewJob {
                title,
                description: posting.description,
                requirements: posting.requirements.filter(|r| !r.trim().is_empty()),
                location: posting.location.unwrap_or_default().trim().to_string(),
                external_id: posting
                    .external_id
                    .or(posting.id)
                    .map(ExternalId::into_string)
                    .filter(|id| !id.is_empty()),
                source: posting.source,
                url: posting.url,
            })
        })
        .collect()
}

pub fn import_file(db: &Database, path: &Path) -> anyhow::Result<ImportStats> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job listing file: {}", path.display()))?;
    let postings = parse_postings(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if postings.is_empty() {
        warn!(path = %path.display(), "job listing file contains no postings");
    }

    let stats = db.in_transaction(|db| {
        let mut stats = ImportStats::default();
        for posting in &postings {
            match db.upsert_job(posting)? {
                Upsert::Inserted(_) => stats.inserted += 1,
                Upsert::Updated(_) => stats.updated += 1,
            }
        }
        Ok(stats)
    })?;

    info!(
        path = %path.display(),
        inserted = stats.inserted,
        updated = stats.updated,
        "imported job postings"
    );
    Ok(stats)
}
