// src/scraper/search.rs
//! Paginated search over the board's public job search page.

use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::extract::{element_text, parse_selector, select_first};
use super::{BoardClient, RequestPacer};
use crate::environment::ScraperConfig;
use crate::error::FetchError;
use crate::jobs::filters::joined_codes;
use crate::jobs::{job_id_from_url, ExperienceLevel, JobStub, JobType, SearchQuery};

const SEARCH_PATH: &str = "/jobs/search";

/// Card containers in priority order; the first one present on a page is used.
const CARD_SELECTORS: [&str; 2] = ["div.base-card", "div.job-search-card"];
const CARD_LINK: &str = "a.base-card__full-link";
const CARD_TITLE: &str = "h3.base-search-card__title";

/// What one result page yielded.
#[derive(Debug, Default, PartialEq)]
pub struct SearchPage {
    /// Number of card elements found, parseable or not
    pub card_count: usize,
    pub stubs: Vec<JobStub>,
}

pub struct SearchFetcher<'a> {
    client: &'a BoardClient,
    page_size: usize,
    page_delay: Duration,
}

impl<'a> SearchFetcher<'a> {
    pub fn new(client: &'a BoardClient, config: &ScraperConfig) -> Self {
        Self {
            client,
            page_size: config.page_size.max(1),
            page_delay: config.search_page_delay(),
        }
    }

    /// Build the search URL for the page starting at `start`.
    pub fn search_url(&self, query: &SearchQuery, start: usize) -> Result<Url, FetchError> {
        build_search_url(self.client.base_url(), query, start)
    }

    /// Collect up to `limit` unique job stubs for `query`.
    ///
    /// Stops when the limit is reached, when a page brings no new ids, or when a
    /// page has no result cards at all. Any transport failure aborts the search.
    pub async fn search(&self, query: &SearchQuery, limit: usize) -> Result<Vec<JobStub>, FetchError> {
        let mut stubs: Vec<JobStub> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut start = 0;
        let mut pacer = RequestPacer::new(self.page_delay);

        while stubs.len() < limit {
            pacer.ready().await;

            let url = self.search_url(query, start)?;
            info!("Fetching jobs from: {}", url);

            let html = match self.client.get_html(&url).await {
                Ok(html) => html,
                Err(e) => {
                    error!("Error fetching jobs for '{}': {}", query.keyword, e);
                    return Err(e);
                }
            };

            let page = parse_search_page(&html, self.client.base_url());
            if page.card_count == 0 {
                warn!("No job cards found on page starting at {}", start);
                break;
            }

            let mut new_on_page = 0;
            for stub in page.stubs {
                if stubs.len() >= limit {
                    break;
                }
                if seen.insert(stub.job_id.clone()) {
                    stubs.push(stub);
                    new_on_page += 1;
                } else {
                    debug!("Skipping duplicate job: {}", stub.job_id);
                }
            }

            if new_on_page == 0 || stubs.len() >= limit {
                info!(
                    "No new jobs on page or limit reached. Total unique jobs: {}",
                    stubs.len()
                );
                break;
            }

            start += self.page_size;
        }

        info!(
            "Fetched {} jobs for '{}' in '{}'",
            stubs.len(),
            query.keyword,
            query.location
        );
        Ok(stubs)
    }
}

pub fn build_search_url(base_url: &Url, query: &SearchQuery, start: usize) -> Result<Url, FetchError> {
    let mut url = base_url.join(SEARCH_PATH)?;
    {
        let mut params = url.query_pairs_mut();
        params
            .append_pair("keywords", &query.keyword)
            .append_pair("location", &query.location)
            .append_pair("start", &start.to_string());

        if let Some(codes) = joined_codes(&query.job_types, JobType::code) {
            params.append_pair("f_JT", &codes);
        }
        if let Some(codes) = joined_codes(&query.experience_levels, ExperienceLevel::code) {
            params.append_pair("f_E", &codes);
        }
        if let Some(code) = query.date_posted.code() {
            params.append_pair("f_TPR", code);
        }
    }
    Ok(url)
}

/// Parse a result page into stubs. Malformed cards are skipped, never fatal.
pub fn parse_search_page(html: &str, base_url: &Url) -> SearchPage {
    let document = Html::parse_document(html);

    let cards: Vec<ElementRef<'_>> = CARD_SELECTORS
        .iter()
        .filter_map(|css| parse_selector(css))
        .map(|selector| document.select(&selector).collect::<Vec<_>>())
        .find(|cards| !cards.is_empty())
        .unwrap_or_default();

    let mut page = SearchPage {
        card_count: cards.len(),
        stubs: Vec::with_capacity(cards.len()),
    };

    for card in cards {
        match parse_card(card, base_url) {
            Some(stub) => page.stubs.push(stub),
            None => warn!("Skipping job card without an id or title"),
        }
    }

    page
}

fn parse_card(card: ElementRef<'_>, base_url: &Url) -> Option<JobStub> {
    let link = select_first(card, CARD_LINK)
        .and_then(|a| a.value().attr("href"))
        .map(strip_query);

    let job_id = card_id_from_urn(card).or_else(|| link.as_deref().and_then(job_id_from_url))?;

    let has_title = select_first(card, CARD_TITLE)
        .map(|title| !element_text(title).is_empty())
        .unwrap_or(false);
    if !has_title {
        debug!("Card for job {} has no title", job_id);
        return None;
    }

    let job_url = link
        .and_then(|href| base_url.join(&href).ok())
        .or_else(|| base_url.join(&format!("/jobs/view/{}", job_id)).ok())
        .map(String::from)?;

    Some(JobStub { job_id, job_url })
}

/// `urn:li:jobPosting:3789456123` → `3789456123`
fn card_id_from_urn(card: ElementRef<'_>) -> Option<String> {
    card.value()
        .attr("data-entity-urn")
        .and_then(|urn| urn.rsplit(':').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn strip_query(href: &str) -> String {
    href.split('?').next().unwrap_or(href).to_string()
}
