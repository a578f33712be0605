// src/core/listings.rs
//! The listing table: one canonical row per external job id

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashSet;
use tracing::debug;

use crate::jobs::{JobListing, ListingUpdate};
use crate::merge::merge;

const LISTING_COLUMNS: &str = r#"job_id, job_url, title, company_name, location, description,
    employment_type, experience_level, posted_date, applicants_count, company_logo_url,
    search_keyword, search_location, is_enriched, created_at, updated_at"#;

/// Filters for browsing stored listings.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingFilter {
    /// Case-insensitive substring of the title
    pub keyword: Option<String>,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            keyword: None,
            location: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> i64 {
    25
}

pub struct JobListingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobListingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<JobListing>> {
        let listing = sqlx::query_as::<_, JobListing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM job_listings WHERE job_id = ?"
        ))
        .bind(job_id)
        .fetch_optional(self.pool)
        .await
        .with_context(|| format!("Failed to load job {}", job_id))?;

        Ok(listing)
    }

    /// The subset of `job_ids` already stored, in one query.
    pub async fn existing_ids(&self, job_ids: &[String]) -> Result<HashSet<String>> {
        if job_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT job_id FROM job_listings WHERE job_id IN (");
        let mut ids = query.separated(", ");
        for job_id in job_ids {
            ids.push_bind(job_id);
        }
        ids.push_unseparated(")");

        let found: Vec<String> = query
            .build_query_scalar()
            .fetch_all(self.pool)
            .await
            .context("Failed to check existing job ids")?;

        Ok(found.into_iter().collect())
    }

    /// Insert or merge `update` into the stored record and return what was
    /// written. Read, merge and write share one transaction.
    pub async fn upsert(&self, update: &ListingUpdate) -> Result<JobListing> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, JobListing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM job_listings WHERE job_id = ?"
        ))
        .bind(&update.job_id)
        .fetch_optional(&mut *tx)
        .await?;

        let merged = merge(existing.as_ref(), update, Utc::now());

        sqlx::query(&format!(
            r#"
            INSERT INTO job_listings ({LISTING_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                job_url = excluded.job_url,
                title = excluded.title,
                company_name = excluded.company_name,
                location = excluded.location,
                description = excluded.description,
                employment_type = excluded.employment_type,
                experience_level = excluded.experience_level,
                posted_date = excluded.posted_date,
                applicants_count = excluded.applicants_count,
                company_logo_url = excluded.company_logo_url,
                search_keyword = excluded.search_keyword,
                search_location = excluded.search_location,
                is_enriched = excluded.is_enriched,
                updated_at = excluded.updated_at
            "#
        ))
        .bind(&merged.job_id)
        .bind(&merged.job_url)
        .bind(&merged.title)
        .bind(&merged.company_name)
        .bind(&merged.location)
        .bind(&merged.description)
        .bind(&merged.employment_type)
        .bind(&merged.experience_level)
        .bind(merged.posted_date)
        .bind(merged.applicants_count)
        .bind(&merged.company_logo_url)
        .bind(&merged.search_keyword)
        .bind(&merged.search_location)
        .bind(merged.is_enriched)
        .bind(merged.created_at)
        .bind(merged.updated_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to store job {}", merged.job_id))?;

        tx.commit().await?;

        debug!(
            "{} job {} (enriched: {})",
            if existing.is_some() { "Updated" } else { "Created" },
            merged.job_id,
            merged.is_enriched
        );
        Ok(merged)
    }

    /// Stored records among `job_ids`, newest first. Unknown ids are ignored.
    pub async fn list_by_ids(&self, job_ids: &[String]) -> Result<Vec<JobListing>> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {LISTING_COLUMNS} FROM job_listings WHERE job_id IN ("
        ));
        let mut ids = query.separated(", ");
        for job_id in job_ids {
            ids.push_bind(job_id);
        }
        ids.push_unseparated(") ORDER BY created_at DESC, id DESC");

        let listings = query
            .build_query_as::<JobListing>()
            .fetch_all(self.pool)
            .await
            .context("Failed to load jobs")?;

        Ok(listings)
    }

    pub async fn list(&self, filter: &ListingFilter) -> Result<Vec<JobListing>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {LISTING_COLUMNS} FROM job_listings WHERE 1 = 1"
        ));

        if let Some(keyword) = filter.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            query
                .push(" AND LOWER(title) LIKE ")
                .push_bind(like_pattern(keyword))
                .push(r" ESCAPE '\'");
        }
        if let Some(location) = filter.location.as_deref().filter(|l| !l.trim().is_empty()) {
            query
                .push(" AND LOWER(location) LIKE ")
                .push_bind(like_pattern(location))
                .push(r" ESCAPE '\'");
        }

        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.limit.max(0))
            .push(" OFFSET ")
            .push_bind(filter.offset.max(0));

        let listings = query
            .build_query_as::<JobListing>()
            .fetch_all(self.pool)
            .await
            .context("Failed to list jobs")?;

        Ok(listings)
    }
}

/// Substring pattern with `%`, `_` and `\` in the term matched literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::from("%");
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
