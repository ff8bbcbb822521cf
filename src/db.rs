use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::{JobPosting, JobStatus, NewJob, UserSkillProfile};

const JOB_COLUMNS: &str = "id, title, description, requirements, location, external_id, source, url,
                           status, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted(i64),
    Updated(i64),
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        debug!(path = %path.display(), "opened database");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                requirements TEXT,
                location TEXT NOT NULL DEFAULT '',
                external_id TEXT UNIQUE,
                source TEXT,
                url TEXT,
                status TEXT NOT NULL DEFAULT 'new' CHECK (status IN ('new', 'reviewing', 'applied', 'rejected', 'closed')),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS profile (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                job_title TEXT,
                experience TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS skills (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT OR IGNORE INTO profile (id) VALUES (1);

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            "#,
        )?;
        info!(path = %self.path.display(), "database schema ready");
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='jobs'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'jobmatch init' first."
            ));
        }
        Ok(())
    }

    /// Runs `f` inside a transaction. Nothing is kept unless `f` succeeds.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(value)
    }

    // --- Job operations ---

    pub fn add_job(&self, job: &NewJob) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO jobs (title, description, requirements, location, external_id, source, url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    job.title,
                    job.description,
                    job.requirements,
                    job.location,
                    job.external_id,
                    job.source,
                    job.url
                ],
            )
            .with_context(|| format!("Failed to add job '{}'", job.title))?;
        let id = self.conn.last_insert_rowid();
        debug!(id, title = %job.title, "added job");
        Ok(id)
    }

    /// Inserts a posting, or refreshes the stored text of the posting with
    /// the same `external_id`. Triage status is left untouched on update.
    pub fn upsert_job(&self, job: &NewJob) -> Result<Upsert> {
        let existing = match &job.external_id {
            Some(ext) => self
                .conn
                .query_row(
                    "SELECT id FROM jobs WHERE external_id = ?1",
                    [ext],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?,
            None => None,
        };

        match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE jobs SET title = ?1, description = ?2, requirements = ?3, location = ?4,
                            source = ?5, url = ?6, updated_at = datetime('now')
                     WHERE id = ?7",
                    params![
                        job.title,
                        job.description,
                        job.requirements,
                        job.location,
                        job.source,
                        job.url,
                        id
                    ],
                )?;
                debug!(id, "updated job from import");
                Ok(Upsert::Updated(id))
            }
            None => Ok(Upsert::Inserted(self.add_job(job)?)),
        }
    }

    pub fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<JobPosting>> {
        let mut sql = format!("SELECT {JOB_COLUMNS} FROM jobs");
        if status.is_some() {
            sql.push_str(" WHERE status = ?1");
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(s) = status {
            stmt.query_map([s.as_str()], Self::row_to_job)?
        } else {
            stmt.query_map([], Self::row_to_job)?
        };

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list jobs")
    }

    pub fn get_job(&self, id: i64) -> Result<Option<JobPosting>> {
        self.conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                [id],
                Self::row_to_job,
            )
            .optional()
            .with_context(|| format!("Failed to load job #{}", id))
    }

    pub fn update_job_status(&self, id: i64, status: JobStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE jobs SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(anyhow!("Job #{} not found", id));
        }
        debug!(id, %status, "updated job status");
        Ok(())
    }

    pub fn delete_job(&self, id: i64) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<JobPosting> {
        let status: String = row.get(8)?;
        let status = status.parse::<JobStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                8,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;
        Ok(JobPosting {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            requirements: row.get(3)?,
            location: row.get(4)?,
            external_id: row.get(5)?,
            source: row.get(6)?,
            url: row.get(7)?,
            status,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    // --- Profile operations ---

    pub fn get_profile(&self) -> Result<UserSkillProfile> {
        let (job_title, experience) = self
            .conn
            .query_row(
                "SELECT job_title, experience FROM profile WHERE id = 1",
                [],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .unwrap_or_default();

        let mut stmt = self.conn.prepare("SELECT name FROM skills ORDER BY id")?;
        let skills = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load skills")?;

        Ok(UserSkillProfile {
            skills,
            experience,
            job_title,
        })
    }

    pub fn set_job_title(&self, title: Option<&str>) -> Result<()> {
        let title = title.map(str::trim).filter(|t| !t.is_empty());
        self.conn.execute(
            "UPDATE profile SET job_title = ?1, updated_at = datetime('now') WHERE id = 1",
            [title],
        )?;
        Ok(())
    }

    pub fn set_experience(&self, experience: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE profile SET experience = ?1, updated_at = datetime('now') WHERE id = 1",
            [experience],
        )?;
        Ok(())
    }

    /// Returns false when the skill is already present (case-insensitive).
    pub fn add_skill(&self, skill: &str) -> Result<bool> {
        let skill = skill.trim();
        if skill.is_empty() {
            return Err(anyhow!("Skill name cannot be empty"));
        }
        let inserted = self
            .conn
            .execute("INSERT OR IGNORE INTO skills (name) VALUES (?1)", [skill])?;
        Ok(inserted > 0)
    }

    pub fn remove_skill(&self, skill: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM skills WHERE name = ?1", [skill.trim()])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn new_job(title: &str, external_id: Option<&str>) -> NewJob {
        NewJob {
            title: title.to_string(),
            description: "Build Rust services".to_string(),
            location: "Remote".to_string(),
            external_id: external_id.map(str::to_string),
            ..NewJob::default()
        }
    }

    #[test]
    fn test_ensure_initialized_before_init_fails() {
        let db = Database::open_in_memory().unwrap();
        let err = db.ensure_initialized().unwrap_err();
        assert!(err.to_string().contains("jobmatch init"));
        db.init().unwrap();
        db.ensure_initialized().unwrap();
    }

    #[test]
    fn test_init_is_idempotent() {
        let db = test_db();
        db.set_experience("kept").unwrap();
        db.init().unwrap();
        assert_eq!(db.get_profile().unwrap().experience, "kept");
    }

    #[test]
    fn test_add_and_get_job() {
        let db = test_db();
        let id = db.add_job(&new_job("Rust Engineer", None)).unwrap();
        let job = db.get_job(id).unwrap().unwrap();
        assert_eq!(job.title, "Rust Engineer");
        assert_eq!(job.location, "Remote");
        assert_eq!(job.status, JobStatus::New);
        assert!(db.get_job(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_upsert_by_external_id() {
        let db = test_db();
        let first = db.upsert_job(&new_job("Rust Engineer", Some("ext-1"))).unwrap();
        let Upsert::Inserted(id) = first else {
            panic!("expected insert, got {:?}", first);
        };
        db.update_job_status(id, JobStatus::Applied).unwrap();

        let second = db
            .upsert_job(&new_job("Senior Rust Engineer", Some("ext-1")))
            .unwrap();
        assert_eq!(second, Upsert::Updated(id));

        let job = db.get_job(id).unwrap().unwrap();
        assert_eq!(job.title, "Senior Rust Engineer");
        assert_eq!(job.status, JobStatus::Applied);
        assert_eq!(db.list_jobs(None).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_transaction_keeps_nothing() {
        let db = test_db();
        let result: Result<()> = db.in_transaction(|db| {
            db.upsert_job(&new_job("A", Some("ext-a")))?;
            db.upsert_job(&new_job("B", Some("ext-b")))?;
            Err(anyhow!("write failed"))
        });
        assert!(result.is_err());
        assert!(db.list_jobs(None).unwrap().is_empty());

        let added = db
            .in_transaction(|db| db.add_job(&new_job("C", None)))
            .unwrap();
        assert!(db.get_job(added).unwrap().is_some());
    }

    #[test]
    fn test_upsert_without_external_id_always_inserts() {
        let db = test_db();
        db.upsert_job(&new_job("A", None)).unwrap();
        db.upsert_job(&new_job("A", None)).unwrap();
        assert_eq!(db.list_jobs(None).unwrap().len(), 2);
    }

    #[test]
    fn test_list_jobs_by_status() {
        let db = test_db();
        let a = db.add_job(&new_job("A", None)).unwrap();
        db.add_job(&new_job("B", None)).unwrap();
        db.update_job_status(a, JobStatus::Rejected).unwrap();

        let rejected = db.list_jobs(Some(JobStatus::Rejected)).unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].id, a);
        assert_eq!(db.list_jobs(Some(JobStatus::New)).unwrap().len(), 1);
    }

    #[test]
    fn test_update_status_missing_job() {
        let db = test_db();
        assert!(db.update_job_status(42, JobStatus::Closed).is_err());
    }

    #[test]
    fn test_delete_job() {
        let db = test_db();
        let id = db.add_job(&new_job("A", None)).unwrap();
        assert!(db.delete_job(id).unwrap());
        assert!(!db.delete_job(id).unwrap());
    }

    #[test]
    fn test_empty_profile() {
        let db = test_db();
        assert_eq!(db.get_profile().unwrap(), UserSkillProfile::default());
    }

    #[test]
    fn test_skills_keep_order_and_dedupe() {
        let db = test_db();
        assert!(db.add_skill("Rust").unwrap());
        assert!(db.add_skill("SQL").unwrap());
        assert!(!db.add_skill("rust").unwrap());
        assert!(db.add_skill(" ").is_err());
        assert_eq!(db.get_profile().unwrap().skills, vec!["Rust", "SQL"]);

        assert!(db.remove_skill("RUST").unwrap());
        assert!(!db.remove_skill("Go").unwrap());
        assert_eq!(db.get_profile().unwrap().skills, vec!["SQL"]);
    }

    #[test]
    fn test_profile_title_and_experience() {
        let db = test_db();
        db.set_job_title(Some("Backend Engineer")).unwrap();
        db.set_experience("Built payment systems").unwrap();
        let profile = db.get_profile().unwrap();
        assert_eq!(profile.job_title.as_deref(), Some("Backend Engineer"));
        assert_eq!(profile.experience, "Built payment systems");

        db.set_job_title(Some("  ")).unwrap();
        assert_eq!(db.get_profile().unwrap().job_title, None);
    }
}
