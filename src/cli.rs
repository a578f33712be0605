// src/cli.rs
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::core::{Database, ListingFilter};
use crate::environment::{EnvironmentConfig, DEFAULT_CONFIG_PATH};
use crate::error::PipelineError;
use crate::jobs::filters::parse_list;
use crate::jobs::{DatePosted, ExperienceLevel, JobListing, JobType, SearchProfile};
use crate::orchestrator::{EnrichOutcome, ImportOutcome, SearchOrchestrator};
use crate::scraper::LinkedInBoard;
use crate::web::start_web_server;

#[derive(Parser)]
#[command(name = "job-scout")]
#[command(about = "Scrape, deduplicate and enrich job listings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file with `local` and `production` sections
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API
    Serve,
    /// Search, dedupe and enrich jobs for one query and/or stored profiles
    Search(SearchArgs),
    /// Fetch full details for a stored job
    Enrich { job_id: String },
    /// Store a job from its URL
    ImportUrl { url: String },
    /// Browse stored jobs, newest first
    Listings {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 25)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Show recent searches
    History {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Manage saved search profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Args)]
pub struct SearchArgs {
    #[arg(long, short)]
    pub keyword: Option<String>,
    #[arg(long, short)]
    pub location: Option<String>,
    #[arg(long = "job-type", value_enum)]
    pub job_types: Vec<JobType>,
    #[arg(long = "experience", value_enum)]
    pub experience_levels: Vec<ExperienceLevel>,
    #[arg(long, value_enum, default_value_t = DatePosted::AnyTime)]
    pub date_posted: DatePosted,
    /// Stored profile ids to search as well
    #[arg(long = "profile")]
    pub profile_ids: Vec<i64>,
    #[arg(long, default_value_t = 25)]
    pub limit: usize,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Save a new search profile
    Add {
        keyword: String,
        location: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "job-type", value_enum)]
        job_types: Vec<JobType>,
        #[arg(long = "experience", value_enum)]
        experience_levels: Vec<ExperienceLevel>,
    },
    /// List saved profiles
    List,
    /// Delete a profile by id
    Remove { id: i64 },
    /// Import profiles from a CSV file
    /// (name,keyword,location,job_types,experience_levels; lists separated by `;`)
    Import { csv_file: PathBuf },
}

/// One row of a profile CSV file.
#[derive(Debug, Deserialize)]
struct ProfileCsvRow {
    name: Option<String>,
    keyword: String,
    location: String,
    #[serde(default)]
    job_types: String,
    #[serde(default)]
    experience_levels: String,
}

impl TryFrom<ProfileCsvRow> for SearchProfile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileCsvRow) -> Result<Self> {
        let keyword = row.keyword.trim();
        let location = row.location.trim();
        if keyword.is_empty() || location.is_empty() {
            anyhow::bail!("keyword and location are required");
        }

        Ok(SearchProfile {
            name: row
                .name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            keyword: keyword.to_string(),
            location: location.to_string(),
            job_types: parse_list(&row.job_types)?,
            experience_levels: parse_list(&row.experience_levels)?,
        })
    }
}

/// Parse a profile CSV with a header row. Bad rows are reported, not fatal.
fn read_profiles_csv(content: &str) -> Vec<Result<SearchProfile>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    reader
        .deserialize::<ProfileCsvRow>()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(anyhow::Error::from)
                .and_then(SearchProfile::try_from)
                .with_context(|| format!("row {}", index + 2))
        })
        .collect()
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = EnvironmentConfig::load(&cli.config)?;

    if let Command::Serve = cli.command {
        return start_web_server(config).await;
    }

    config.ensure_directories().await?;
    let db = Database::new(&config.database_path).await?;

    match cli.command {
        Command::Serve => unreachable!("handled above"),
        Command::Search(args) => {
            let board = LinkedInBoard::new(config.scraper.clone())?;
            search(&db, &board, &config, args).await?;
        }
        Command::Enrich { job_id } => {
            let board = LinkedInBoard::new(config.scraper.clone())?;
            let orchestrator = SearchOrchestrator::new(&board, &db, &config.scraper);
            match orchestrator.enrich(&job_id).await.map_err(fetch_context)? {
                EnrichOutcome::Enriched(job) => {
                    info!("✅ Enriched job {}", job.job_id);
                    log_job(&job);
                }
                EnrichOutcome::AlreadyEnriched(job) => {
                    info!("Job {} was already enriched", job.job_id);
                    log_job(&job);
                }
                EnrichOutcome::NotFound => {
                    info!("❌ Job {} not found. Search for it first.", job_id)
                }
                EnrichOutcome::DetailUnavailable => {
                    info!("❌ Could not extract details for job {}", job_id)
                }
            }
        }
        Command::ImportUrl { url } => {
            let board = LinkedInBoard::new(config.scraper.clone())?;
            let orchestrator = SearchOrchestrator::new(&board, &db, &config.scraper);
            match orchestrator.import_from_url(&url).await.map_err(fetch_context)? {
                ImportOutcome::Imported(job) => {
                    info!("✅ Imported job {}", job.job_id);
                    log_job(&job);
                }
                ImportOutcome::Existing(job) => {
                    info!("Job {} already exists", job.job_id);
                    log_job(&job);
                }
                ImportOutcome::InvalidUrl => info!("❌ No job id found in URL: {}", url),
                ImportOutcome::DetailUnavailable => {
                    info!("❌ Could not extract job details from {}", url)
                }
            }
        }
        Command::Listings {
            keyword,
            location,
            limit,
            offset,
        } => {
            let jobs = db
                .listings()
                .list(&ListingFilter {
                    keyword,
                    location,
                    limit,
                    offset,
                })
                .await?;
            log_listing_table(&jobs);
        }
        Command::History { limit } => {
            let history = db.searches().history(limit).await?;
            if history.is_empty() {
                info!("No searches recorded yet.");
            }
            for search in history {
                info!(
                    "{:<5} {:<40} {:>4} found {:>4} kept  {}",
                    search.id,
                    search.to_string(),
                    search.total_results,
                    search.results_fetched,
                    search.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Profile(command) => handle_profile_command(&db, command).await?,
    }

    Ok(())
}

async fn search(
    db: &Database,
    board: &LinkedInBoard,
    config: &EnvironmentConfig,
    args: SearchArgs,
) -> Result<()> {
    let mut profiles = Vec::new();

    match (args.keyword, args.location) {
        (Some(keyword), Some(location)) => profiles.push(SearchProfile {
            name: None,
            keyword,
            location,
            job_types: args.job_types,
            experience_levels: args.experience_levels,
        }),
        (None, None) => {}
        _ => anyhow::bail!("--keyword and --location must be given together"),
    }

    let stored = db.profiles().get_many(&args.profile_ids).await?;
    for id in &args.profile_ids {
        if !stored.iter().any(|saved| saved.id == *id) {
            warn!("⚠️  Unknown search profile {}", id);
        }
    }
    profiles.extend(stored.into_iter().map(|saved| saved.profile));

    if profiles.is_empty() {
        anyhow::bail!("Nothing to search: give --keyword and --location or --profile <id>");
    }

    let orchestrator = SearchOrchestrator::new(board, db, &config.scraper);
    let outcome = orchestrator
        .run(&profiles, args.limit, args.date_posted)
        .await
        .map_err(fetch_context)?;

    log_listing_table(&outcome.jobs);
    info!("\nSearch completed:");
    info!("  ✅ Enriched: {}", outcome.enriched_count);
    info!("  ❌ Failed:   {}", outcome.failed_count);
    info!("  📦 Existing: {}", outcome.existing_count);
    Ok(())
}

fn fetch_context(e: PipelineError) -> anyhow::Error {
    match e {
        PipelineError::Fetch(e) => anyhow::Error::new(e).context("Fetch failed"),
        PipelineError::Store(e) => e.context("Storage failed"),
    }
}

async fn handle_profile_command(db: &Database, command: ProfileCommand) -> Result<()> {
    let profiles = db.profiles();

    match command {
        ProfileCommand::Add {
            keyword,
            location,
            name,
            job_types,
            experience_levels,
        } => {
            let saved = profiles
                .add(&SearchProfile {
                    name,
                    keyword,
                    location,
                    job_types,
                    experience_levels,
                })
                .await?;
            info!("✅ Search profile created:");
            info!("   ID: {}", saved.id);
            info!("   Profile: {}", saved.profile.label());
        }
        ProfileCommand::List => {
            let saved = profiles.list().await?;
            if saved.is_empty() {
                info!("No search profiles found.");
                return Ok(());
            }
            info!(
                "{:<5} {:<30} {:<25} {:<20} {:<25}",
                "ID", "Name", "Keyword", "Location", "Filters"
            );
            info!("{}", "-".repeat(105));
            for entry in saved {
                let filters: Vec<String> = entry
                    .profile
                    .job_types
                    .iter()
                    .map(ToString::to_string)
                    .chain(entry.profile.experience_levels.iter().map(ToString::to_string))
                    .collect();
                info!(
                    "{:<5} {:<30} {:<25} {:<20} {:<25}",
                    entry.id,
                    entry.profile.label(),
                    entry.profile.keyword,
                    entry.profile.location,
                    filters.join(",")
                );
            }
        }
        ProfileCommand::Remove { id } => {
            if profiles.remove(id).await? {
                info!("✅ Removed search profile {}", id);
            } else {
                info!("❌ No search profile with id {}", id);
            }
        }
        ProfileCommand::Import { csv_file } => import_profiles(db, &csv_file).await?,
    }

    Ok(())
}

async fn import_profiles(db: &Database, csv_file: &Path) -> Result<()> {
    if !csv_file.exists() {
        anyhow::bail!("CSV file not found: {}", csv_file.display());
    }

    let content = tokio::fs::read_to_string(csv_file)
        .await
        .with_context(|| format!("Failed to read {}", csv_file.display()))?;

    let mut success_count = 0;
    let mut error_count = 0;

    for parsed in read_profiles_csv(&content) {
        match parsed {
            Ok(profile) => match db.profiles().add(&profile).await {
                Ok(saved) => {
                    success_count += 1;
                    info!("✅ Added: {} ({})", saved.profile.label(), saved.id);
                }
                Err(e) => {
                    error_count += 1;
                    error!("❌ Failed to add {}: {:#}", profile.label(), e);
                }
            },
            Err(e) => {
                error_count += 1;
                warn!("⚠️  Skipping invalid record: {:#}", e);
            }
        }
    }

    info!("\nImport completed:");
    info!("  ✅ Success: {}", success_count);
    info!("  ❌ Errors:  {}", error_count);
    Ok(())
}

fn log_job(job: &JobListing) {
    info!("   {}", job);
    info!("   Location: {}", job.location);
    info!("   URL: {}", job.job_url);
    if let Some(kind) = &job.employment_type {
        info!("   Employment type: {}", kind);
    }
    if let Some(level) = &job.experience_level {
        info!("   Experience level: {}", level);
    }
    if let Some(count) = job.applicants_count {
        info!("   Applicants: {}", count);
    }
}

fn log_listing_table(jobs: &[JobListing]) {
    if jobs.is_empty() {
        info!("No jobs found.");
        return;
    }
    info!(
        "{:<12} {:<40} {:<25} {:<25} {:<8}",
        "Job ID", "Title", "Company", "Location", "Enriched"
    );
    info!("{}", "-".repeat(114));
    for job in jobs {
        info!(
            "{:<12} {:<40} {:<25} {:<25} {:<8}",
            job.job_id,
            truncate(&job.title, 40),
            truncate(&job.company_name, 25),
            truncate(&job.location, 25),
            if job.is_enriched { "yes" } else { "no" }
        );
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "job-scout",
            "search",
            "--keyword",
            "Data Scientist",
            "--location",
            "Vienna",
            "--job-type",
            "full_time",
            "--job-type",
            "contract",
            "--date-posted",
            "past_24_hours",
            "--profile",
            "3",
            "--limit",
            "10",
        ])
        .unwrap();

        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.keyword.as_deref(), Some("Data Scientist"));
        assert_eq!(args.job_types, vec![JobType::FullTime, JobType::Contract]);
        assert_eq!(args.date_posted, DatePosted::Past24Hours);
        assert_eq!(args.profile_ids, vec![3]);
        assert_eq!(args.limit, 10);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_cli_parses_profile_add() {
        let cli = Cli::try_parse_from([
            "job-scout",
            "--config",
            "other.yaml",
            "profile",
            "add",
            "rust",
            "Berlin",
            "--experience",
            "mid_senior_level",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("other.yaml"));
        match cli.command {
            Command::Profile(ProfileCommand::Add {
                keyword,
                experience_levels,
                ..
            }) => {
                assert_eq!(keyword, "rust");
                assert_eq!(experience_levels, vec![ExperienceLevel::MidSeniorLevel]);
            }
            _ => panic!("expected profile add"),
        }
    }

    #[test]
    fn test_read_profiles_csv() {
        let content = "\
name,keyword,location,job_types,experience_levels
Vienna data,Data Scientist,Vienna,full_time;contract,entry_level
,Rust,Berlin,,
broken,,Graz,,
typo,Go,Linz,full-time,
";
        let rows = read_profiles_csv(content);
        assert_eq!(rows.len(), 4);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.name.as_deref(), Some("Vienna data"));
        assert_eq!(first.job_types, vec![JobType::FullTime, JobType::Contract]);
        assert_eq!(first.experience_levels, vec![ExperienceLevel::EntryLevel]);

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.name, None);
        assert!(second.job_types.is_empty());

        assert!(rows[2].is_err());
        assert!(rows[3].is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
