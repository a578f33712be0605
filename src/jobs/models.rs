// src/jobs/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filters::{DatePosted, ExperienceLevel, JobType};

/// Canonical job record as stored in the listing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobListing {
    pub job_id: String,
    pub job_url: String,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub description: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub applicants_count: Option<i64>,
    pub company_logo_url: Option<String>,
    pub search_keyword: Option<String>,
    pub search_location: Option<String>,
    pub is_enriched: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Display for JobListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.title, self.company_name)
    }
}

/// Freshly fetched data for one job, prior to merging with what is stored.
///
/// Every field except the id may be missing; `enriching` marks data that came
/// from a full detail page rather than a search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingUpdate {
    pub job_id: String,
    pub job_url: Option<String>,
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub applicants_count: Option<i64>,
    pub company_logo_url: Option<String>,
    pub search_keyword: Option<String>,
    pub search_location: Option<String>,
    pub enriching: bool,
}

impl ListingUpdate {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Default::default()
        }
    }

    /// Attach the search that surfaced this job.
    pub fn with_provenance(mut self, keyword: &str, location: &str) -> Self {
        self.search_keyword = Some(keyword.to_string());
        self.search_location = Some(location.to_string());
        self
    }
}

/// Minimal (id, url) pair produced by a search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStub {
    pub job_id: String,
    pub job_url: String,
}

/// Everything the detail page yielded for one job. A title is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    pub job_id: String,
    pub job_url: String,
    pub title: String,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub applicants_count: Option<i64>,
    pub company_logo_url: Option<String>,
}

impl JobDetails {
    pub fn into_update(self) -> ListingUpdate {
        ListingUpdate {
            job_id: self.job_id,
            job_url: Some(self.job_url),
            title: Some(self.title),
            company_name: self.company_name,
            location: self.location,
            description: self.description,
            employment_type: self.employment_type,
            experience_level: self.experience_level,
            posted_date: self.posted_date,
            applicants_count: self.applicants_count,
            company_logo_url: self.company_logo_url,
            search_keyword: None,
            search_location: None,
            enriching: true,
        }
    }
}

/// Parameters of one Search Fetcher call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    pub location: String,
    #[serde(default)]
    pub job_types: Vec<JobType>,
    #[serde(default)]
    pub experience_levels: Vec<ExperienceLevel>,
    #[serde(default)]
    pub date_posted: DatePosted,
}

/// A reusable, user-owned query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchProfile {
    #[serde(default)]
    pub name: Option<String>,
    pub keyword: String,
    pub location: String,
    #[serde(default)]
    pub job_types: Vec<JobType>,
    #[serde(default)]
    pub experience_levels: Vec<ExperienceLevel>,
}

impl SearchProfile {
    pub fn new(keyword: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn query(&self, date_posted: DatePosted) -> SearchQuery {
        SearchQuery {
            keyword: self.keyword.clone(),
            location: self.location.clone(),
            job_types: self.job_types.clone(),
            experience_levels: self.experience_levels.clone(),
            date_posted,
        }
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{} in {}", self.keyword, self.location),
        }
    }
}

/// A profile persisted in the profile table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearchProfile {
    pub id: i64,
    #[serde(flatten)]
    pub profile: SearchProfile,
    pub created_at: DateTime<Utc>,
}

/// Audit entry for one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSearchRecord {
    pub id: i64,
    pub keyword: String,
    pub location: String,
    pub job_types: Vec<JobType>,
    pub experience_levels: Vec<ExperienceLevel>,
    pub date_posted: DatePosted,
    pub total_results: i64,
    pub results_fetched: i64,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for JobSearchRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Search: {} in {}", self.keyword, self.location)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewJobSearch {
    pub query: SearchQuery,
    pub total_results: i64,
    pub results_fetched: i64,
}

/// Result of a search-and-enrich run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub jobs: Vec<JobListing>,
    pub enriched_count: usize,
    pub failed_count: usize,
    pub existing_count: usize,
}
