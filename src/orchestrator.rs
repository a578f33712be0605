// src/orchestrator.rs
//! Multi-profile search, dedupe and rate-limited enrichment.

use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::Database;
use crate::environment::ScraperConfig;
use crate::error::PipelineResult;
use crate::jobs::{
    job_id_from_url, DatePosted, JobDetails, JobListing, JobStub, ListingUpdate, NewJobSearch,
    SearchOutcome, SearchProfile,
};
use crate::scraper::{JobBoard, RequestPacer};

/// Result of enriching one stored job on demand.
#[derive(Debug)]
pub enum EnrichOutcome {
    /// The id is unknown to the store
    NotFound,
    /// Already enriched; returned without contacting the board
    AlreadyEnriched(JobListing),
    Enriched(JobListing),
    /// The detail page was fetched but had no title
    DetailUnavailable,
}

/// Result of importing a job from a pasted URL.
#[derive(Debug)]
pub enum ImportOutcome {
    /// No job id could be extracted from the URL
    InvalidUrl,
    Existing(JobListing),
    Imported(JobListing),
    DetailUnavailable,
}

/// Split `limit` across `profiles` as evenly as possible. The first
/// `limit % profiles` shares get one extra.
pub fn split_limit(limit: usize, profiles: usize) -> Vec<usize> {
    if profiles == 0 {
        return Vec::new();
    }
    let base = limit / profiles;
    let remainder = limit % profiles;
    (0..profiles)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

pub struct SearchOrchestrator<'a> {
    board: &'a dyn JobBoard,
    db: &'a Database,
    enrichment_delay: Duration,
}

impl<'a> SearchOrchestrator<'a> {
    pub fn new(board: &'a dyn JobBoard, db: &'a Database, config: &ScraperConfig) -> Self {
        Self {
            board,
            db,
            enrichment_delay: config.enrichment_delay(),
        }
    }

    /// Search every profile, dedupe by job id, enrich what the store lacks.
    /// Jobs already stored are merged again with the stub URL and the
    /// provenance of the profile that found them, without a detail fetch.
    ///
    /// A transport failure during a search aborts the run. Enrichment failures
    /// are counted and skipped; every successful enrichment is persisted
    /// before the next one starts.
    pub async fn run(
        &self,
        profiles: &[SearchProfile],
        limit: usize,
        date_posted: DatePosted,
    ) -> PipelineResult<SearchOutcome> {
        if profiles.is_empty() || limit == 0 {
            return Ok(SearchOutcome::default());
        }

        let shares = split_limit(limit, profiles.len());
        let mut unique: Vec<(JobStub, &SearchProfile)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (profile, share) in profiles.iter().zip(shares) {
            if unique.len() >= limit {
                info!("Limit of {} reached, skipping remaining profiles", limit);
                break;
            }
            if share == 0 {
                continue;
            }

            let query = profile.query(date_posted);
            info!("Searching profile '{}' for up to {} jobs", profile.label(), share);
            let stubs = self.board.search(&query, share).await?;

            let total_results = stubs.len();
            let mut kept = 0;
            for stub in stubs {
                if unique.len() >= limit {
                    break;
                }
                if seen.insert(stub.job_id.clone()) {
                    unique.push((stub, profile));
                    kept += 1;
                }
            }

            self.db
                .searches()
                .record(&NewJobSearch {
                    query,
                    total_results: total_results as i64,
                    results_fetched: kept as i64,
                })
                .await?;
        }

        let ids: Vec<String> = unique.iter().map(|(stub, _)| stub.job_id.clone()).collect();
        let listings = self.db.listings();
        let existing = listings.existing_ids(&ids).await?;

        // seen again: refresh url and provenance through the merge, no detail fetch
        for (stub, profile) in unique.iter().filter(|(stub, _)| existing.contains(&stub.job_id)) {
            let sighting = ListingUpdate {
                job_url: Some(stub.job_url.clone()),
                ..ListingUpdate::new(stub.job_id.as_str())
            }
            .with_provenance(&profile.keyword, &profile.location);
            listings.upsert(&sighting).await?;
        }

        let pending: Vec<&(JobStub, &SearchProfile)> = unique
            .iter()
            .filter(|(stub, _)| !existing.contains(&stub.job_id))
            .collect();
        info!(
            "{} unique jobs, {} already stored, {} to enrich",
            ids.len(),
            existing.len(),
            pending.len()
        );

        let mut enriched_count = 0;
        let mut failed_count = 0;

        let mut pacer = RequestPacer::new(self.enrichment_delay);
        for (stub, profile) in pending {
            pacer.ready().await;

            match self.board.job_details(&stub.job_id).await {
                Ok(Some(details)) if has_title(&details) => {
                    let update = details
                        .into_update()
                        .with_provenance(&profile.keyword, &profile.location);
                    listings.upsert(&update).await?;
                    enriched_count += 1;
                }
                Ok(_) => {
                    warn!("No usable details for job {}", stub.job_id);
                    failed_count += 1;
                }
                Err(e) => {
                    warn!("Enrichment failed for job {}: {}", stub.job_id, e);
                    failed_count += 1;
                }
            }
        }

        let jobs = listings.list_by_ids(&ids).await?;

        info!(
            "Search finished: {} jobs ({} enriched, {} failed, {} existing)",
            jobs.len(),
            enriched_count,
            failed_count,
            existing.len()
        );

        Ok(SearchOutcome {
            jobs,
            enriched_count,
            failed_count,
            existing_count: existing.len(),
        })
    }

    /// Fetch the detail page for `job_id` and store it as enriched data.
    /// `None` when the page yields no title; nothing is written then.
    pub async fn fetch_detail_for(&self, job_id: &str) -> PipelineResult<Option<JobListing>> {
        let details = match self.board.job_details(job_id).await? {
            Some(details) if has_title(&details) => details,
            _ => {
                warn!("No usable details for job {}", job_id);
                return Ok(None);
            }
        };

        let listing = self.db.listings().upsert(&details.into_update()).await?;
        info!("Enriched job {}: {}", listing.job_id, listing);
        Ok(Some(listing))
    }

    /// Enrich a job already in the store. Enriched records are returned as is.
    pub async fn enrich(&self, job_id: &str) -> PipelineResult<EnrichOutcome> {
        let Some(existing) = self.db.listings().get(job_id).await? else {
            return Ok(EnrichOutcome::NotFound);
        };
        if existing.is_enriched {
            return Ok(EnrichOutcome::AlreadyEnriched(existing));
        }

        Ok(match self.fetch_detail_for(job_id).await? {
            Some(listing) => EnrichOutcome::Enriched(listing),
            None => EnrichOutcome::DetailUnavailable,
        })
    }

    /// Store the job behind a pasted job URL, fetching it only when unknown.
    pub async fn import_from_url(&self, url: &str) -> PipelineResult<ImportOutcome> {
        let Some(job_id) = job_id_from_url(url) else {
            warn!("No job id in URL: {}", url);
            return Ok(ImportOutcome::InvalidUrl);
        };

        if let Some(existing) = self.db.listings().get(&job_id).await? {
            info!("Job {} already stored", job_id);
            return Ok(ImportOutcome::Existing(existing));
        }

        Ok(match self.fetch_detail_for(&job_id).await? {
            Some(listing) => ImportOutcome::Imported(listing),
            None => ImportOutcome::DetailUnavailable,
        })
    }
}

fn has_title(details: &JobDetails) -> bool {
    !details.title.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, PipelineError};
    use crate::jobs::SearchQuery;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Detail {
        Page(&'static str),
        NoTitle,
        Unreachable,
    }

    #[derive(Default)]
    struct FakeBoard {
        results: HashMap<String, Vec<&'static str>>,
        details: HashMap<String, Detail>,
        failing_search: bool,
        searched: Mutex<Vec<(String, usize)>>,
        fetched: Mutex<Vec<String>>,
        fetched_at: Mutex<Vec<std::time::Instant>>,
    }

    impl FakeBoard {
        fn with_results(mut self, keyword: &str, ids: &[&'static str]) -> Self {
            self.results.insert(keyword.to_string(), ids.to_vec());
            self
        }

        fn with_detail(mut self, job_id: &str, detail: Detail) -> Self {
            self.details.insert(job_id.to_string(), detail);
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobBoard for FakeBoard {
        async fn search(
            &self,
            query: &SearchQuery,
            limit: usize,
        ) -> Result<Vec<JobStub>, FetchError> {
            self.searched
                .lock()
                .unwrap()
                .push((query.keyword.clone(), limit));
            if self.failing_search {
                return Err(FetchError::Status {
                    url: "https://board.test/jobs/search".to_string(),
                    status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                });
            }
            Ok(self
                .results
                .get(&query.keyword)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .take(limit)
                .map(|id| JobStub {
                    job_id: id.to_string(),
                    job_url: format!("https://board.test/jobs/view/{}", id),
                })
                .collect())
        }

        async fn job_details(&self, job_id: &str) -> Result<Option<JobDetails>, FetchError> {
            self.fetched.lock().unwrap().push(job_id.to_string());
            self.fetched_at.lock().unwrap().push(std::time::Instant::now());
            match self.details.get(job_id).cloned().unwrap_or(Detail::NoTitle) {
                Detail::Page(title) => Ok(Some(JobDetails {
                    job_id: job_id.to_string(),
                    job_url: format!("https://board.test/jobs/view/{}", job_id),
                    title: title.to_string(),
                    company_name: Some("Acme".to_string()),
                    location: Some("Vienna".to_string()),
                    description: Some(format!("About {}", title)),
                    employment_type: Some("full_time".to_string()),
                    experience_level: None,
                    posted_date: None,
                    applicants_count: Some(3),
                    company_logo_url: None,
                })),
                Detail::NoTitle => Ok(None),
                Detail::Unreachable => Err(FetchError::Status {
                    url: format!("https://board.test/jobs/view/{}", job_id),
                    status: reqwest::StatusCode::BAD_GATEWAY,
                }),
            }
        }
    }

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("jobs.db")).await.unwrap();
        (dir, db)
    }

    fn no_delays() -> ScraperConfig {
        ScraperConfig::default().without_delays()
    }

    #[test]
    fn test_split_limit_scenario() {
        assert_eq!(split_limit(10, 3), vec![4, 3, 3]);
        assert_eq!(split_limit(2, 3), vec![1, 1, 0]);
        assert!(split_limit(5, 0).is_empty());
    }

    #[test]
    fn test_split_limit_is_even_and_exact() {
        for limit in 0..60 {
            for profiles in 1..8 {
                let shares = split_limit(limit, profiles);
                assert_eq!(shares.len(), profiles);
                assert_eq!(shares.iter().sum::<usize>(), limit);
                let max = shares.iter().max().unwrap();
                let min = shares.iter().min().unwrap();
                assert!(max - min <= 1, "{} over {}: {:?}", limit, profiles, shares);
            }
        }
    }

    #[tokio::test]
    async fn test_duplicate_ids_across_profiles_stored_once() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default()
            .with_results("data", &["123", "200"])
            .with_results("ml", &["123", "300"])
            .with_detail("123", Detail::Page("Data Scientist"))
            .with_detail("200", Detail::Page("Analyst"))
            .with_detail("300", Detail::Page("ML Engineer"));
        let profiles = [
            SearchProfile::new("data", "Vienna"),
            SearchProfile::new("ml", "Vienna"),
        ];

        let orchestrator = SearchOrchestrator::new(&board, &db, &no_delays());
        let outcome = orchestrator
            .run(&profiles, 4, DatePosted::AnyTime)
            .await
            .unwrap();

        let mut ids: Vec<String> = outcome.jobs.iter().map(|j| j.job_id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["123", "200", "300"]);
        assert_eq!(outcome.enriched_count, 3);
        assert_eq!(outcome.failed_count, 0);
        assert_eq!(outcome.existing_count, 0);
        assert_eq!(board.fetched().iter().filter(|id| *id == "123").count(), 1);

        // provenance comes from the profile that found the job first
        let first = db.listings().get("123").await.unwrap().unwrap();
        assert_eq!(first.search_keyword.as_deref(), Some("data"));

        let history = db.searches().history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].keyword, "ml");
        assert_eq!(history[0].total_results, 2);
        assert_eq!(history[0].results_fetched, 1);
    }

    #[tokio::test]
    async fn test_shares_passed_to_each_profile() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default();
        let profiles = [
            SearchProfile::new("a", "x"),
            SearchProfile::new("b", "x"),
            SearchProfile::new("c", "x"),
        ];

        SearchOrchestrator::new(&board, &db, &no_delays())
            .run(&profiles, 10, DatePosted::PastWeek)
            .await
            .unwrap();

        let searched = board.searched.lock().unwrap().clone();
        assert_eq!(
            searched,
            vec![("a".to_string(), 4), ("b".to_string(), 3), ("c".to_string(), 3)]
        );
    }

    #[tokio::test]
    async fn test_unique_count_never_exceeds_limit() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default()
            .with_results("a", &["1", "2", "3"])
            .with_results("b", &["4", "5", "6"]);
        let profiles = [SearchProfile::new("a", "x"), SearchProfile::new("b", "x")];

        let outcome = SearchOrchestrator::new(&board, &db, &no_delays())
            .run(&profiles, 3, DatePosted::AnyTime)
            .await
            .unwrap();

        // details default to pages without a title, so nothing is stored
        assert_eq!(outcome.failed_count, 3);
        assert!(outcome.jobs.is_empty());
        assert_eq!(board.fetched(), vec!["1", "2", "4"]);
    }

    #[tokio::test]
    async fn test_existing_jobs_are_not_refetched() {
        let (_dir, db) = open().await;
        db.listings()
            .upsert(&ListingUpdate {
                title: Some("Stored".to_string()),
                ..ListingUpdate::new("1")
            })
            .await
            .unwrap();

        let board = FakeBoard::default()
            .with_results("a", &["1", "2"])
            .with_detail("2", Detail::Page("Fresh"));
        let outcome = SearchOrchestrator::new(&board, &db, &no_delays())
            .run(&[SearchProfile::new("a", "x")], 5, DatePosted::AnyTime)
            .await
            .unwrap();

        assert_eq!(board.fetched(), vec!["2"]);
        assert_eq!(outcome.existing_count, 1);
        assert_eq!(outcome.enriched_count, 1);
        assert_eq!(outcome.jobs.len(), 2);
        assert_eq!(outcome.jobs[0].job_id, "2", "newest first");
    }

    #[tokio::test]
    async fn test_resighting_refreshes_provenance_only() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default()
            .with_results("data", &["123"])
            .with_results("ml", &["123"])
            .with_detail("123", Detail::Page("Data Scientist"));
        let orchestrator = SearchOrchestrator::new(&board, &db, &no_delays());

        orchestrator
            .run(&[SearchProfile::new("data", "Vienna")], 5, DatePosted::AnyTime)
            .await
            .unwrap();
        let first = db.listings().get("123").await.unwrap().unwrap();

        let outcome = orchestrator
            .run(&[SearchProfile::new("ml", "Berlin")], 5, DatePosted::AnyTime)
            .await
            .unwrap();

        assert_eq!(outcome.existing_count, 1);
        assert_eq!(outcome.enriched_count, 0);
        assert_eq!(board.fetched(), vec!["123"]);

        let second = &outcome.jobs[0];
        assert_eq!(second.search_keyword.as_deref(), Some("ml"));
        assert_eq!(second.search_location.as_deref(), Some("Berlin"));
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.is_enriched);
        assert_eq!(second.title, "Data Scientist");
        assert_eq!(second.description, first.description);
    }

    #[tokio::test]
    async fn test_enrichment_calls_are_spaced_by_delay() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default().with_results("a", &["1", "2", "3"]);
        let delay = Duration::from_millis(200);
        let config = ScraperConfig {
            enrichment_delay_ms: 200,
            ..no_delays()
        };

        let started = std::time::Instant::now();
        let outcome = SearchOrchestrator::new(&board, &db, &config)
            .run(&[SearchProfile::new("a", "x")], 3, DatePosted::AnyTime)
            .await
            .unwrap();

        assert_eq!(outcome.failed_count, 3);
        let calls = board.fetched_at.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert!(calls[0] - started < delay, "first enrichment starts at once");
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
    }

    #[tokio::test]
    async fn test_partial_failures_do_not_stop_the_batch() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default()
            .with_results("a", &["1", "2", "3", "4"])
            .with_detail("1", Detail::Page("First"))
            .with_detail("2", Detail::NoTitle)
            .with_detail("3", Detail::Unreachable)
            .with_detail("4", Detail::Page("Fourth"));

        let outcome = SearchOrchestrator::new(&board, &db, &no_delays())
            .run(&[SearchProfile::new("a", "x")], 4, DatePosted::AnyTime)
            .await
            .unwrap();

        assert_eq!(outcome.enriched_count, 2);
        assert_eq!(outcome.failed_count, 2);
        assert!(db.listings().get("1").await.unwrap().unwrap().is_enriched);
        assert!(db.listings().get("2").await.unwrap().is_none());
        assert!(db.listings().get("3").await.unwrap().is_none());
        assert!(db.listings().get("4").await.unwrap().unwrap().is_enriched);
    }

    #[tokio::test]
    async fn test_search_transport_failure_propagates() {
        let (_dir, db) = open().await;
        let board = FakeBoard {
            failing_search: true,
            ..Default::default()
        };

        let result = SearchOrchestrator::new(&board, &db, &no_delays())
            .run(&[SearchProfile::new("a", "x")], 5, DatePosted::AnyTime)
            .await;

        assert!(matches!(result, Err(PipelineError::Fetch(_))));
        assert!(db.searches().history(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enrich_paths() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default().with_detail("5", Detail::Page("Engineer"));
        let orchestrator = SearchOrchestrator::new(&board, &db, &no_delays());

        assert!(matches!(
            orchestrator.enrich("5").await.unwrap(),
            EnrichOutcome::NotFound
        ));

        db.listings().upsert(&ListingUpdate::new("5")).await.unwrap();
        match orchestrator.enrich("5").await.unwrap() {
            EnrichOutcome::Enriched(job) => {
                assert!(job.is_enriched);
                assert_eq!(job.title, "Engineer");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert!(matches!(
            orchestrator.enrich("5").await.unwrap(),
            EnrichOutcome::AlreadyEnriched(_)
        ));
        assert_eq!(board.fetched(), vec!["5"]);
    }

    #[tokio::test]
    async fn test_fetch_detail_without_title_writes_nothing() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default().with_detail("9", Detail::NoTitle);
        let orchestrator = SearchOrchestrator::new(&board, &db, &no_delays());

        assert!(orchestrator.fetch_detail_for("9").await.unwrap().is_none());
        assert!(db.listings().get("9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_import_from_url() {
        let (_dir, db) = open().await;
        let board = FakeBoard::default().with_detail("4309395824", Detail::Page("Engineer"));
        let orchestrator = SearchOrchestrator::new(&board, &db, &no_delays());

        assert!(matches!(
            orchestrator
                .import_from_url("https://www.linkedin.com/company/acme")
                .await
                .unwrap(),
            ImportOutcome::InvalidUrl
        ));

        let url = "https://www.linkedin.com/jobs/view/engineer-at-acme-4309395824?trk=abc";
        assert!(matches!(
            orchestrator.import_from_url(url).await.unwrap(),
            ImportOutcome::Imported(_)
        ));
        assert!(matches!(
            orchestrator.import_from_url(url).await.unwrap(),
            ImportOutcome::Existing(_)
        ));
        assert_eq!(board.fetched(), vec!["4309395824"]);
    }
}
