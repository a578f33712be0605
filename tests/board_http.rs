// Job board client against a mock HTTP server.

use job_scout::core::Database;
use job_scout::environment::ScraperConfig;
use job_scout::error::FetchError;
use job_scout::jobs::{SearchProfile, SearchQuery};
use job_scout::orchestrator::SearchOrchestrator;
use job_scout::scraper::{JobBoard, LinkedInBoard};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn board_for(server: &MockServer, page_size: usize) -> LinkedInBoard {
    let config = ScraperConfig {
        base_url: server.uri(),
        request_timeout_secs: 5,
        page_size,
        ..Default::default()
    }
    .without_delays();
    LinkedInBoard::new(config).unwrap()
}

fn card(job_id: &str, title: &str) -> String {
    format!(
        r#"<div class="base-card" data-entity-urn="urn:li:jobPosting:{job_id}">
             <a class="base-card__full-link" href="/jobs/view/engineer-{job_id}?refId=abc&trk=guest"></a>
             <h3 class="base-search-card__title">{title}</h3>
           </div>"#
    )
}

fn results_page(cards: &[(&str, &str)]) -> String {
    let body: String = cards.iter().map(|(id, title)| card(id, title)).collect();
    format!("<html><body><ul>{}</ul></body></html>", body)
}

fn detail_page(title: &str) -> String {
    format!(
        r#"<html><body>
             <h1 class="topcard__title">{title}</h1>
             <a class="topcard__org-name-link">Acme</a>
             <span class="topcard__flavor--bullet">Vienna, Austria</span>
             <span class="num-applicants__caption">47 applicants</span>
             <div class="description__text">Build data pipelines.</div>
             <li class="description__job-criteria-item">
               <h3 class="description__job-criteria-subheader">Employment type</h3>
               <span class="description__job-criteria-text">Contract</span>
             </li>
           </body></html>"#
    )
}

async fn mount_search_page(server: &MockServer, start: &str, body: String, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/jobs/search"))
        .and(query_param("start", start))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(calls)
        .mount(server)
        .await;
}

fn query() -> SearchQuery {
    SearchQuery {
        keyword: "data engineer".to_string(),
        location: "Vienna".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_search_paginates_until_no_cards() {
    let server = MockServer::start().await;
    mount_search_page(&server, "0", results_page(&[("1", "A"), ("2", "B")]), 1).await;
    mount_search_page(&server, "2", results_page(&[("2", "B"), ("3", "C")]), 1).await;
    mount_search_page(&server, "4", "<html><body></body></html>".to_string(), 1).await;

    let board = board_for(&server, 2);
    let stubs = board.search(&query(), 10).await.unwrap();

    let ids: Vec<&str> = stubs.iter().map(|s| s.job_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(
        stubs[0].job_url,
        format!("{}/jobs/view/engineer-1", server.uri())
    );
}

#[tokio::test]
async fn test_search_pages_are_spaced_by_delay() {
    let server = MockServer::start().await;
    mount_search_page(&server, "0", results_page(&[("1", "A"), ("2", "B")]), 1).await;
    mount_search_page(&server, "2", results_page(&[("3", "C"), ("4", "D")]), 1).await;
    mount_search_page(&server, "4", results_page(&[("5", "E"), ("6", "F")]), 1).await;

    let delay = Duration::from_millis(150);
    let config = ScraperConfig {
        base_url: server.uri(),
        request_timeout_secs: 5,
        page_size: 2,
        search_page_delay_ms: 150,
        ..Default::default()
    };
    let board = LinkedInBoard::new(config).unwrap();

    let started = Instant::now();
    let stubs = board.search(&query(), 6).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(stubs.len(), 6);
    assert!(elapsed >= delay * 2, "two waits between three pages: {elapsed:?}");
    assert!(elapsed < delay * 3, "no wait before the first page: {elapsed:?}");
}

#[tokio::test]
async fn test_search_stops_at_limit() {
    let server = MockServer::start().await;
    mount_search_page(&server, "0", results_page(&[("1", "A"), ("2", "B")]), 1).await;
    mount_search_page(&server, "2", results_page(&[("3", "C")]), 0).await;

    let board = board_for(&server, 2);
    let stubs = board.search(&query(), 1).await.unwrap();

    assert_eq!(stubs.len(), 1);
    assert_eq!(stubs[0].job_id, "1");
}

#[tokio::test]
async fn test_search_stops_when_page_repeats() {
    let server = MockServer::start().await;
    mount_search_page(&server, "0", results_page(&[("1", "A")]), 1).await;
    mount_search_page(&server, "1", results_page(&[("1", "A")]), 1).await;

    let board = board_for(&server, 1);
    let stubs = board.search(&query(), 5).await.unwrap();

    assert_eq!(stubs.len(), 1);
}

#[tokio::test]
async fn test_search_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/search"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let board = board_for(&server, 25);
    let err = board.search(&query(), 10).await.unwrap_err();

    match err {
        FetchError::Status { status, .. } => assert_eq!(status.as_u16(), 429),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_job_details_parsed_from_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/view/4309395824"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Data Engineer")))
        .mount(&server)
        .await;

    let board = board_for(&server, 25);
    let details = board.job_details("4309395824").await.unwrap().unwrap();

    assert_eq!(details.job_id, "4309395824");
    assert_eq!(details.job_url, format!("{}/jobs/view/4309395824", server.uri()));
    assert_eq!(details.title, "Data Engineer");
    assert_eq!(details.company_name.as_deref(), Some("Acme"));
    assert_eq!(details.employment_type.as_deref(), Some("contract"));
    assert_eq!(details.applicants_count, Some(47));
    assert_eq!(details.posted_date, None);
}

#[tokio::test]
async fn test_job_details_without_title_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/view/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Sign in</body></html>"))
        .mount(&server)
        .await;

    let board = board_for(&server, 25);
    assert!(board.job_details("1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_job_details_missing_page_is_an_error() {
    let server = MockServer::start().await;

    let board = board_for(&server, 25);
    let err = board.job_details("1").await.unwrap_err();

    assert!(matches!(err, FetchError::Status { .. }));
}

#[tokio::test]
async fn test_orchestrated_search_over_http() {
    let server = MockServer::start().await;
    mount_search_page(&server, "0", results_page(&[("11", "A"), ("12", "B")]), 1).await;
    mount_search_page(&server, "2", String::new(), 1).await;
    Mock::given(method("GET"))
        .and(path("/jobs/view/11"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Data Engineer")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/view/12"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(&dir.path().join("jobs.db")).await.unwrap();
    let board = board_for(&server, 2);
    let config = ScraperConfig::default().without_delays();

    let orchestrator = SearchOrchestrator::new(&board, &db, &config);
    let outcome = orchestrator
        .run(
            &[SearchProfile::new("data engineer", "Vienna")],
            10,
            Default::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.enriched_count, 1);
    assert_eq!(outcome.failed_count, 1);
    assert_eq!(outcome.existing_count, 0);
    assert_eq!(outcome.jobs.len(), 1);

    let stored = &outcome.jobs[0];
    assert_eq!(stored.job_id, "11");
    assert!(stored.is_enriched);
    assert_eq!(stored.search_keyword.as_deref(), Some("data engineer"));
    assert_eq!(stored.search_location.as_deref(), Some("Vienna"));

    let history = db.searches().history(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_results, 2);
}
