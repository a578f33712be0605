// src/core/searches.rs
//! Append-only audit log of search calls

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::jobs::{DatePosted, ExperienceLevel, JobSearchRecord, JobType, NewJobSearch};

#[derive(sqlx::FromRow)]
struct SearchRow {
    id: i64,
    keyword: String,
    location: String,
    job_types: Json<Vec<JobType>>,
    experience_levels: Json<Vec<ExperienceLevel>>,
    date_posted: String,
    total_results: i64,
    results_fetched: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<SearchRow> for JobSearchRecord {
    type Error = anyhow::Error;

    fn try_from(row: SearchRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            keyword: row.keyword,
            location: row.location,
            job_types: row.job_types.0,
            experience_levels: row.experience_levels.0,
            date_posted: row.date_posted.parse::<DatePosted>()?,
            total_results: row.total_results,
            results_fetched: row.results_fetched,
            created_at: row.created_at,
        })
    }
}

pub struct JobSearchRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobSearchRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, search: &NewJobSearch) -> Result<JobSearchRecord> {
        let now = Utc::now();
        let query = &search.query;

        let result = sqlx::query(
            r#"
            INSERT INTO job_searches (keyword, location, job_types, experience_levels,
                                      date_posted, total_results, results_fetched, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&query.keyword)
        .bind(&query.location)
        .bind(Json(&query.job_types))
        .bind(Json(&query.experience_levels))
        .bind(query.date_posted.as_str())
        .bind(search.total_results)
        .bind(search.results_fetched)
        .bind(now)
        .execute(self.pool)
        .await
        .context("Failed to record search")?;

        Ok(JobSearchRecord {
            id: result.last_insert_rowid(),
            keyword: query.keyword.clone(),
            location: query.location.clone(),
            job_types: query.job_types.clone(),
            experience_levels: query.experience_levels.clone(),
            date_posted: query.date_posted,
            total_results: search.total_results,
            results_fetched: search.results_fetched,
            created_at: now,
        })
    }

    /// Most recent searches first
    pub async fn history(&self, limit: i64) -> Result<Vec<JobSearchRecord>> {
        let rows = sqlx::query_as::<_, SearchRow>(
            r#"
            SELECT id, keyword, location, job_types, experience_levels, date_posted,
                   total_results, results_fetched, created_at
            FROM job_searches
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(self.pool)
        .await
        .context("Failed to load search history")?;

        rows.into_iter().map(JobSearchRecord::try_from).collect()
    }
}
