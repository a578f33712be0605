// src/core/profiles.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::jobs::{ExperienceLevel, JobType, SavedSearchProfile, SearchProfile};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    name: Option<String>,
    keyword: String,
    location: String,
    job_types: Json<Vec<JobType>>,
    experience_levels: Json<Vec<ExperienceLevel>>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for SavedSearchProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            profile: SearchProfile {
                name: row.name,
                keyword: row.keyword,
                location: row.location,
                job_types: row.job_types.0,
                experience_levels: row.experience_levels.0,
            },
            created_at: row.created_at,
        }
    }
}

const PROFILE_COLUMNS: &str =
    "id, name, keyword, location, job_types, experience_levels, created_at";

pub struct SearchProfileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SearchProfileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, profile: &SearchProfile) -> Result<SavedSearchProfile> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO search_profiles (name, keyword, location, job_types, experience_levels, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.name)
        .bind(&profile.keyword)
        .bind(&profile.location)
        .bind(Json(&profile.job_types))
        .bind(Json(&profile.experience_levels))
        .bind(now)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to save search profile '{}'", profile.label()))?;

        info!("Saved search profile: {}", profile.label());

        Ok(SavedSearchProfile {
            id: result.last_insert_rowid(),
            profile: profile.clone(),
            created_at: now,
        })
    }

    /// All profiles, oldest first
    pub async fn list(&self) -> Result<Vec<SavedSearchProfile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM search_profiles ORDER BY id ASC"
        ))
        .fetch_all(self.pool)
        .await
        .context("Failed to list search profiles")?;

        Ok(rows.into_iter().map(SavedSearchProfile::from).collect())
    }

    /// Profiles for `ids`, in the order the ids were given. Unknown ids are skipped.
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<SavedSearchProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PROFILE_COLUMNS} FROM search_profiles WHERE id IN ("
        ));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = query
            .build_query_as::<ProfileRow>()
            .fetch_all(self.pool)
            .await
            .context("Failed to load search profiles")?;

        let mut found: Vec<SavedSearchProfile> = rows.into_iter().map(Into::into).collect();
        found.sort_by_key(|saved| ids.iter().position(|id| *id == saved.id));
        Ok(found)
    }

    pub async fn remove(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM search_profiles WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .with_context(|| format!("Failed to remove search profile {}", id))?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!("Removed search profile {}", id);
        }
        Ok(removed)
    }
}
