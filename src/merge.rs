// src/merge.rs
//! Reconciles freshly fetched job data with the stored record.
//!
//! A detail-page pass produces strictly better data than a search stub, so an
//! enriched record only ever gains fields it is missing. Unenriched records
//! take whatever non-empty values the fresh data brings. Applicant counts and
//! search provenance are time-varying and always refresh.

use chrono::{DateTime, Utc};

use crate::jobs::{JobListing, ListingUpdate};

/// How descriptive fields of an existing record react to fresh values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldPolicy {
    /// Fresh non-empty values win
    Replace,
    /// Stored values win; fresh values only fill gaps
    FillOnly,
}

impl FieldPolicy {
    fn for_existing(existing: &JobListing) -> Self {
        if existing.is_enriched {
            FieldPolicy::FillOnly
        } else {
            FieldPolicy::Replace
        }
    }

    fn text(self, stored: &str, fresh: Option<&String>) -> String {
        match (self, non_empty(fresh)) {
            (FieldPolicy::Replace, Some(value)) => value.to_string(),
            (FieldPolicy::FillOnly, Some(value)) if stored.trim().is_empty() => value.to_string(),
            _ => stored.to_string(),
        }
    }

    fn optional_text(self, stored: Option<&String>, fresh: Option<&String>) -> Option<String> {
        let stored = non_empty(stored);
        let fresh = non_empty(fresh);
        match self {
            FieldPolicy::Replace => fresh.or(stored),
            FieldPolicy::FillOnly => stored.or(fresh),
        }
        .map(str::to_string)
    }

    fn value<T: Copy>(self, stored: Option<T>, fresh: Option<T>) -> Option<T> {
        match self {
            FieldPolicy::Replace => fresh.or(stored),
            FieldPolicy::FillOnly => stored.or(fresh),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

fn owned(value: Option<&String>) -> Option<String> {
    non_empty(value).map(str::to_string)
}

/// Compute the record to persist for `fresh`, given what is stored today.
///
/// Pure: the caller supplies `now`, which becomes `updated_at` (and
/// `created_at` for new records).
pub fn merge(
    existing: Option<&JobListing>,
    fresh: &ListingUpdate,
    now: DateTime<Utc>,
) -> JobListing {
    let Some(existing) = existing else {
        return JobListing {
            job_id: fresh.job_id.clone(),
            job_url: owned(fresh.job_url.as_ref()).unwrap_or_default(),
            title: owned(fresh.title.as_ref()).unwrap_or_default(),
            company_name: owned(fresh.company_name.as_ref()).unwrap_or_default(),
            location: owned(fresh.location.as_ref()).unwrap_or_default(),
            description: owned(fresh.description.as_ref()),
            employment_type: owned(fresh.employment_type.as_ref()),
            experience_level: owned(fresh.experience_level.as_ref()),
            posted_date: fresh.posted_date,
            applicants_count: fresh.applicants_count,
            company_logo_url: owned(fresh.company_logo_url.as_ref()),
            search_keyword: owned(fresh.search_keyword.as_ref()),
            search_location: owned(fresh.search_location.as_ref()),
            is_enriched: fresh.enriching,
            created_at: now,
            updated_at: now,
        };
    };

    let policy = FieldPolicy::for_existing(existing);

    JobListing {
        job_id: existing.job_id.clone(),
        job_url: non_empty(fresh.job_url.as_ref())
            .map(str::to_string)
            .unwrap_or_else(|| existing.job_url.clone()),
        title: policy.text(&existing.title, fresh.title.as_ref()),
        company_name: policy.text(&existing.company_name, fresh.company_name.as_ref()),
        location: policy.text(&existing.location, fresh.location.as_ref()),
        description: policy
            .optional_text(existing.description.as_ref(), fresh.description.as_ref()),
        employment_type: policy.optional_text(
            existing.employment_type.as_ref(),
            fresh.employment_type.as_ref(),
        ),
        experience_level: policy.optional_text(
            existing.experience_level.as_ref(),
            fresh.experience_level.as_ref(),
        ),
        posted_date: policy.value(existing.posted_date, fresh.posted_date),
        applicants_count: fresh.applicants_count.or(existing.applicants_count),
        company_logo_url: policy.optional_text(
            existing.company_logo_url.as_ref(),
            fresh.company_logo_url.as_ref(),
        ),
        search_keyword: owned(fresh.search_keyword.as_ref())
            .or_else(|| existing.search_keyword.clone()),
        search_location: owned(fresh.search_location.as_ref())
            .or_else(|| existing.search_location.clone()),
        is_enriched: existing.is_enriched || fresh.enriching,
        created_at: existing.created_at,
        updated_at: now,
    }
}
