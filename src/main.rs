use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobmatch::config::Config;
use jobmatch::db::Database;
use jobmatch::import::import_file;
use jobmatch::models::{JobStatus, NewJob};
use jobmatch::ranker::{rank, RankOptions, RankedJob};
use jobmatch::scorer;
use jobmatch::tui;

#[derive(Parser)]
#[command(name = "jobmatch")]
#[command(about = "Rank job postings against your skills, experience and current role")]
struct Cli {
    /// Database file (defaults to $JOBMATCH_DB or the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Add a job posting by hand
    Add {
        /// Job title
        title: String,

        /// Job description
        #[arg(short, long)]
        description: String,

        /// Requirements section
        #[arg(short, long)]
        requirements: Option<String>,

        /// Location, e.g. "Remote" or "Berlin"
        #[arg(short, long, default_value = "")]
        location: String,

        /// Link to the posting
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Import postings from a JSON array file
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// List stored postings
    List {
        /// Filter by status (new, reviewing, applied, rejected, closed)
        #[arg(short, long)]
        status: Option<JobStatus>,
    },

    /// Show a posting and how it scores against your profile
    Show {
        /// Job ID
        id: i64,
    },

    /// Set the triage status of a posting
    Status {
        /// Job ID
        id: i64,

        /// New status (new, reviewing, applied, rejected, closed)
        status: JobStatus,
    },

    /// Delete a posting
    Remove {
        /// Job ID
        id: i64,
    },

    /// Manage your skill profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Rank postings against your profile
    Match {
        /// Number of postings to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Hide postings scoring below this
        #[arg(short, long)]
        min_score: Option<u32>,

        /// Include rejected and closed postings
        #[arg(long)]
        all: bool,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse ranked matches interactively
    Browse {
        /// Hide postings scoring below this
        #[arg(short, long)]
        min_score: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the stored profile
    Show,

    /// Set your current job title
    Title {
        /// e.g. "Backend Engineer"
        title: String,
    },

    /// Forget your current job title
    ClearTitle,

    /// Set your experience text
    Experience {
        /// File holding the experience text
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Experience text given inline
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Manage skills
    Skill {
        #[command(subcommand)]
        command: SkillCommands,
    },
}

#[derive(Subcommand)]
enum SkillCommands {
    /// Add one or more skills
    Add {
        #[arg(required = true)]
        skills: Vec<String>,
    },

    /// Remove one or more skills
    Remove {
        #[arg(required = true)]
        skills: Vec<String>,
    },
}

fn init_logging(config: &Config) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("jobmatch={}", config.rust_log))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_logging(&config);

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let db = Database::open(&db_path)?;
    debug!(path = %db.path().display(), "using database");

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Add {
            title,
            description,
            requirements,
            location,
            url,
        } => {
            db.ensure_initialized()?;
            if title.trim().is_empty() || description.trim().is_empty() {
                return Err(anyhow!("Title and description must not be empty"));
            }
            let job_id = db.add_job(&NewJob {
                title,
                description,
                requirements,
                location,
                url,
                source: Some("manual".to_string()),
                ..NewJob::default()
            })?;
            println!("Added job #{}", job_id);
        }

        Commands::Import { file } => {
            db.ensure_initialized()?;
            let stats = import_file(&db, &file)?;
            println!("Imported {} new, updated {} existing.", stats.inserted, stats.updated);
        }

        Commands::List { status } => {
            db.ensure_initialized()?;
            let jobs = db.list_jobs(status)?;
            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!("{:<6} {:<12} {:<34} {:<20}", "ID", "STATUS", "TITLE", "LOCATION");
                println!("{}", "-".repeat(74));
                for job in jobs {
                    println!(
                        "{:<6} {:<12} {:<34} {:<20}",
                        job.id,
                        job.status,
                        truncate(&job.title, 32),
                        truncate(&job.location, 18)
                    );
                }
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            let job = db.get_job(id)?.ok_or_else(|| anyhow!("Job #{} not found", id))?;
            let profile = db.get_profile()?;
            let breakdown = scorer::score_breakdown(
                &job,
                &profile.skills,
                &profile.experience,
                profile.job_title.as_deref(),
            );

            println!("Job #{}", job.id);
            println!("Title: {}", job.title);
            if !job.location.is_empty() {
                println!("Location: {}", job.location);
            }
            println!("Status: {}", job.status);
            if let Some(url) = &job.url {
                println!("URL: {}", url);
            }
            if let Some(source) = &job.source {
                println!("Source: {}", source);
            }
            match added_ago(&job.created_at, chrono::Utc::now().naive_utc()) {
                Some(age) => println!("Added: {} ({})", job.created_at, age),
                None => println!("Added: {}", job.created_at),
            }

            println!("\n--- Match: {}/100 ---", breakdown.total());
            println!("  Skills:     {:>5.1} / {}", breakdown.skills, scorer::SKILL_WEIGHT);
            println!("  Experience: {:>5.1} / {}", breakdown.experience, scorer::EXPERIENCE_WEIGHT);
            println!("  Title:      {:>5.1} / {}", breakdown.title, scorer::TITLE_BONUS);
            println!("  Remote:     {:>5.1} / {}", breakdown.location, scorer::REMOTE_BONUS);
            for reason in &breakdown.reasons {
                println!("  - {}", reason);
            }
            if !breakdown.matched_keywords.is_empty() {
                println!("  Keywords: {}", breakdown.matched_keywords.join(", "));
            }

            println!("\n--- Description ---\n{}", textwrap::fill(&job.description, 80));
            if let Some(requirements) = &job.requirements {
                println!("\n--- Requirements ---\n{}", textwrap::fill(requirements, 80));
            }
        }

        Commands::Status { id, status } => {
            db.ensure_initialized()?;
            db.update_job_status(id, status)?;
            println!("Marked job #{} as {}.", id, status);
        }

        Commands::Remove { id } => {
            db.ensure_initialized()?;
            if db.delete_job(id)? {
                println!("Removed job #{}.", id);
            } else {
                println!("Job #{} not found.", id);
            }
        }

        Commands::Profile { command } => {
            db.ensure_initialized()?;
            run_profile_command(&db, command)?;
        }

        Commands::Match {
            limit,
            min_score,
            all,
            json,
        } => {
            db.ensure_initialized()?;
            let options = RankOptions {
                min_score: min_score.unwrap_or(config.min_score),
                limit: limit.unwrap_or(config.limit),
                include_inactive: all,
            };
            let matches = ranked_matches(&db, &options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No matching jobs.");
            } else {
                print_matches(&matches);
            }
        }

        Commands::Browse { min_score } => {
            db.ensure_initialized()?;
            let options = RankOptions {
                min_score: min_score.unwrap_or(config.min_score),
                limit: usize::MAX,
                include_inactive: false,
            };
            let matches = ranked_matches(&db, &options)?;
            tui::run_browse(&db, matches)?;
        }
    }

    Ok(())
}

fn ranked_matches(db: &Database, options: &RankOptions) -> Result<Vec<RankedJob>> {
    let profile = db.get_profile()?;
    if profile.skills.is_empty() && profile.experience.trim().is_empty() {
        eprintln!("Your profile is empty. Add skills with: jobmatch profile skill add <skill>");
    }
    let jobs = db.list_jobs(None)?;
    Ok(rank(jobs, &profile, options))
}

fn print_matches(matches: &[RankedJob]) {
    println!(
        "{:<5} {:<6} {:>5}  {:<30} {:<16} {:<24}",
        "RANK", "ID", "SCORE", "TITLE", "LOCATION", "KEYWORDS"
    );
    println!("{}", "-".repeat(92));
    for (i, entry) in matches.iter().enumerate() {
        println!(
            "{:<5} {:<6} {:>5}  {:<30} {:<16} {:<24}",
            i + 1,
            entry.job.id,
            entry.job_match.score,
            truncate(&entry.job.title, 28),
            truncate(&entry.job.location, 14),
            truncate(&entry.job_match.matched_keywords.join(", "), 24)
        );
    }
}

fn run_profile_command(db: &Database, command: ProfileCommands) -> Result<()> {
    match command {
        ProfileCommands::Show => {
            let profile = db.get_profile()?;
            println!(
                "Job title: {}",
                profile.job_title.as_deref().unwrap_or("(not set)")
            );
            if profile.skills.is_empty() {
                println!("Skills: (none)");
            } else {
                println!("Skills: {}", profile.skills.join(", "));
            }
            if profile.experience.trim().is_empty() {
                println!("Experience: (not set)");
            } else {
                println!("\n--- Experience ---\n{}", textwrap::fill(&profile.experience, 80));
            }
        }

        ProfileCommands::Title { title } => {
            db.set_job_title(Some(&title))?;
            println!("Job title set to '{}'.", title.trim());
        }

        ProfileCommands::ClearTitle => {
            db.set_job_title(None)?;
            println!("Job title cleared.");
        }

        ProfileCommands::Experience { file, text } => {
            let experience = match (file, text) {
                (Some(path), _) => std::fs::read_to_string(&path).with_context(|| {
                    format!("Failed to read experience file: {}", path.display())
                })?,
                (None, Some(text)) => text,
                (None, None) => return Err(anyhow!("Provide --file or --text")),
            };
            db.set_experience(&experience)?;
            println!("Experience updated ({} words).", experience.split_whitespace().count());
        }

        ProfileCommands::Skill { command } => match command {
            SkillCommands::Add { skills } => {
                for skill in skills {
                    if db.add_skill(&skill)? {
                        println!("Added skill '{}'.", skill.trim());
                    } else {
                        println!("Skill '{}' already in profile.", skill.trim());
                    }
                }
            }
            SkillCommands::Remove { skills } => {
                for skill in skills {
                    if db.remove_skill(&skill)? {
                        println!("Removed skill '{}'.", skill.trim());
                    } else {
                        println!("Skill '{}' not found.", skill.trim());
                    }
                }
            }
        },
    }
    Ok(())
}

/// Age of a SQLite `datetime('now')` stamp, which is UTC.
fn added_ago(created_at: &str, now: chrono::NaiveDateTime) -> Option<String> {
    let created = chrono::NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S").ok()?;
    let elapsed = now.signed_duration_since(created);
    let text = match elapsed.num_days() {
        d if d < 0 => return None,
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        d => format!("{} days ago", d),
    };
    Some(text)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
