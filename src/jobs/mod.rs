// src/jobs/mod.rs
//! Job domain types shared by the scraper, the store and the orchestrator

pub mod filters;
pub mod models;

pub use filters::{DatePosted, ExperienceLevel, JobType};
pub use models::*;

use regex::Regex;
use std::sync::OnceLock;

fn view_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/jobs/view/(?:[\w-]+?-)?(\d+)/?$").expect("job view pattern is valid")
    })
}

/// Extract the numeric job id from a job view URL.
///
/// Accepts `/jobs/view/4309395824` and slugged forms such as
/// `/jobs/view/software-engineer-at-acme-4309395824`; query strings are ignored.
pub fn job_id_from_url(url: &str) -> Option<String> {
    let path = url.trim().split(['?', '#']).next()?;
    view_url_pattern()
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
