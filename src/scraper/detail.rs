// src/scraper/detail.rs
//! Fetches and parses a single job detail page.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use tracing::{debug, error, info};
use url::Url;

use super::extract::{
    class_matches, element_text, first_attr, first_text, first_with, multiline_text,
    parse_selector, select_first, Strategy,
};
use super::BoardClient;
use crate::error::FetchError;
use crate::jobs::JobDetails;

const TITLE: &[Strategy] = &[
    Strategy::css("top card layout title", "h1.top-card-layout__title"),
    Strategy::css("topcard title", "h1.topcard__title"),
];

const COMPANY: &[Strategy] = &[
    Strategy::css("organization link", "a.topcard__org-name-link"),
    Strategy::css("topcard flavor", "span.topcard__flavor"),
];

const LOCATION: &[Strategy] = &[
    Strategy::css("flavor bullet", "span.topcard__flavor--bullet"),
    Strategy::css("layout bullet", "span.topcard-layout__bullet"),
];

const DESCRIPTION: &[Strategy] = &[
    Strategy::css("show-more markup", "div.show-more-less-html__markup"),
    Strategy::css("description text", "div.description__text"),
];

const APPLICANTS: &[Strategy] = &[
    Strategy::css("applicants span", "span.num-applicants__caption"),
    Strategy::css("applicants figcaption", "figcaption.num-applicants__caption"),
];

const POSTED_AT: &[Strategy] = &[Strategy::css("time element", "time[datetime]")];

const LOGO: &[Strategy] = &[
    Strategy::css("entity image", "img.artdeco-entity-image"),
    Strategy::css("entity image container", "div.top-card-layout__entity-image img"),
    Strategy::custom("logo class", logo_by_class),
    Strategy::custom("top card entity image", logo_in_top_card),
    Strategy::custom("near company name", logo_near_company),
];

/// URL-bearing attributes of a logo image, direct source first.
const LOGO_ATTRIBUTES: &[&str] = &["src", "data-delayed-url", "data-src", "data-original-url"];

const CRITERIA_ITEM: &str = "li.description__job-criteria-item";
const CRITERIA_HEADER: &str = "h3.description__job-criteria-subheader";
const CRITERIA_VALUE: &str = "span.description__job-criteria-text";

pub struct DetailFetcher<'a> {
    client: &'a BoardClient,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(client: &'a BoardClient) -> Self {
        Self { client }
    }

    pub fn detail_url(&self, job_id: &str) -> Result<Url, FetchError> {
        build_detail_url(self.client.base_url(), job_id)
    }

    /// Fetch the detail page for `job_id`.
    ///
    /// `Ok(None)` means the page was fetched but carried no title.
    pub async fn fetch_details(&self, job_id: &str) -> Result<Option<JobDetails>, FetchError> {
        let url = self.detail_url(job_id)?;
        debug!("Fetching job details from: {}", url);

        let html = match self.client.get_html(&url).await {
            Ok(html) => html,
            Err(e) => {
                error!("Error fetching job details for {}: {}", job_id, e);
                return Err(e);
            }
        };

        let details = parse_job_details(&html, job_id, url.as_str(), Utc::now());
        match &details {
            Some(_) => info!("Successfully extracted details for job {}", job_id),
            None => info!("Detail page for job {} has no title", job_id),
        }
        Ok(details)
    }
}

pub fn build_detail_url(base_url: &Url, job_id: &str) -> Result<Url, FetchError> {
    let mut url = base_url.join("/jobs/view/")?;
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push(job_id);
    Ok(url)
}

/// Parse a detail page. Returns `None` when no title can be found.
///
/// `now` anchors relative dates such as "3 days ago".
pub fn parse_job_details(
    html: &str,
    job_id: &str,
    job_url: &str,
    now: DateTime<Utc>,
) -> Option<JobDetails> {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title", TITLE)?;
    let (employment_type, experience_level) = parse_criteria(&document);

    // an image without any URL attribute does not end the lookup
    let company_logo_url = first_with(&document, "company logo", LOGO, |img| {
        first_attr(img, LOGO_ATTRIBUTES)
    });
    if company_logo_url.is_none() {
        debug!("Could not find company logo for job {}", job_id);
    }

    Some(JobDetails {
        job_id: job_id.to_string(),
        job_url: job_url.to_string(),
        title,
        company_name: first_text(&document, "company", COMPANY),
        location: first_text(&document, "location", LOCATION),
        description: first_with(&document, "description", DESCRIPTION, |element| {
            Some(multiline_text(element)).filter(|text| !text.is_empty())
        }),
        employment_type,
        experience_level,
        posted_date: posted_date(&document, now),
        applicants_count: first_with(&document, "applicants", APPLICANTS, |element| {
            first_integer(&element_text(element))
        }),
        company_logo_url,
    })
}

/// Employment type and experience level from the criteria list. When a
/// header appears more than once the last value wins.
fn parse_criteria(document: &Html) -> (Option<String>, Option<String>) {
    let mut employment_type = None;
    let mut experience_level = None;

    let Some(items) = parse_selector(CRITERIA_ITEM) else {
        return (None, None);
    };

    for item in document.select(&items) {
        let (Some(header), Some(value)) = (
            select_first(item, CRITERIA_HEADER).map(element_text),
            select_first(item, CRITERIA_VALUE).map(element_text),
        ) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        if header.contains("Employment type") || header.contains("Job type") {
            employment_type = Some(normalize_criterion(&value));
        } else if header.contains("Seniority level") || header.contains("Experience") {
            experience_level = Some(normalize_criterion(&value));
        }
    }

    (employment_type, experience_level)
}

/// "Mid-Senior level" → "mid_senior_level"
pub fn normalize_criterion(value: &str) -> String {
    value.trim().to_lowercase().replace([' ', '-'], "_")
}

fn first_integer(text: &str) -> Option<i64> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS
        .get_or_init(|| Regex::new(r"\d+").expect("digit pattern is valid"))
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

fn relative_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s+(day|days|hour|hours|week|weeks|month|months)\s+ago")
            .expect("relative date pattern is valid")
    })
}

/// Structured timestamp first, then relative text. Never defaults to `now`.
fn posted_date(document: &Html, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    first_with(document, "posted date", POSTED_AT, |time| {
        time.value().attr("datetime").and_then(parse_timestamp)
    })
    .or_else(|| relative_posted_date(document, now))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

fn relative_posted_date(document: &Html, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let selector = parse_selector("span, div, p, time")?;
    let posted = document
        .select(&selector)
        .find_map(|element| parse_relative_date(&element_text(element), now));
    posted
}

/// "3 days ago" → `now - 3 days`. A month counts as 30 days.
pub fn parse_relative_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = relative_date_pattern().captures(text)?;
    let value: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();

    let delta = if unit.starts_with("hour") {
        TimeDelta::try_hours(value)
    } else if unit.starts_with("day") {
        TimeDelta::try_days(value)
    } else if unit.starts_with("week") {
        TimeDelta::try_weeks(value)
    } else {
        value.checked_mul(30).and_then(TimeDelta::try_days)
    }?;

    now.checked_sub_signed(delta)
}

fn logo_by_class(document: &Html) -> Option<ElementRef<'_>> {
    let images = parse_selector("img")?;
    let found = document
        .select(&images)
        .find(|img| class_matches(*img, |class| class.contains("logo")));
    found
}

fn logo_in_top_card(document: &Html) -> Option<ElementRef<'_>> {
    let top_card = parse_selector("div.top-card-layout")?;
    let images = parse_selector("img")?;
    let card = document.select(&top_card).next()?;
    let found = card.select(&images).find(|img| {
        class_matches(*img, |class| {
            class
                .find("entity")
                .is_some_and(|at| class[at..].contains("image"))
        })
    });
    found
}

fn logo_near_company(document: &Html) -> Option<ElementRef<'_>> {
    let link = parse_selector("a.topcard__org-name-link")?;
    let company = document.select(&link).next()?;
    let parent = company.parent().and_then(ElementRef::wrap)?;

    select_first(parent, "img").or_else(|| {
        parent
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find_map(|sibling| select_first(sibling, "img"))
    })
}
