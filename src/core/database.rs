// src/core/database.rs
//! SQLite connection and schema

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use super::{JobListingRepository, JobSearchRepository, SearchProfileRepository};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations
    pub async fn new(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await.with_context(|| {
            format!("Failed to connect to database: {}", database_path.display())
        })?;

        info!(
            "Database connection established: {}",
            database_path.display()
        );

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn listings(&self) -> JobListingRepository<'_> {
        JobListingRepository::new(&self.pool)
    }

    pub fn searches(&self) -> JobSearchRepository<'_> {
        JobSearchRepository::new(&self.pool)
    }

    pub fn profiles(&self) -> SearchProfileRepository<'_> {
        SearchProfileRepository::new(&self.pool)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL UNIQUE,
                job_url TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                company_name TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                description TEXT,
                employment_type TEXT,
                experience_level TEXT,
                posted_date TEXT,
                applicants_count INTEGER,
                company_logo_url TEXT,
                search_keyword TEXT,
                search_location TEXT,
                is_enriched BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        for column in ["title", "company_name", "location", "created_at"] {
            let statement = format!(
                "CREATE INDEX IF NOT EXISTS idx_job_listings_{column} ON job_listings({column});"
            );
            sqlx::query(&statement).execute(&self.pool).await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_searches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                keyword TEXT NOT NULL,
                location TEXT NOT NULL,
                job_types TEXT NOT NULL DEFAULT '[]',
                experience_levels TEXT NOT NULL DEFAULT '[]',
                date_posted TEXT NOT NULL DEFAULT 'any_time',
                total_results INTEGER NOT NULL DEFAULT 0,
                results_fetched INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_job_searches_created_at ON job_searches(created_at);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                keyword TEXT NOT NULL,
                location TEXT NOT NULL,
                job_types TEXT NOT NULL DEFAULT '[]',
                experience_levels TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobs.db");

        let first = Database::new(&path).await.unwrap();
        first.health_check().await.unwrap();
        drop(first);

        let second = Database::new(&path).await.unwrap();
        second.health_check().await.unwrap();
        assert!(path.exists());
    }
}
