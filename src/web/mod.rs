// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use types::*;

use anyhow::{Context, Result};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::{Database, ListingFilter};
use crate::environment::EnvironmentConfig;
use crate::jobs::{JobListing, JobSearchRecord, SavedSearchProfile, SearchOutcome};
use crate::scraper::{JobBoard, LinkedInBoard};

pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[post("/jobs/search", data = "<request>")]
pub async fn search_jobs(
    request: Json<StandardRequest<SearchRequest>>,
    db: &State<Database>,
    state: &State<ServerState>,
) -> ApiResult<SearchOutcome> {
    handlers::search_jobs_handler(request, db, state).await
}

#[post("/jobs/search/profiles", data = "<request>")]
pub async fn search_profiles(
    request: Json<StandardRequest<ProfileSearchRequest>>,
    db: &State<Database>,
    state: &State<ServerState>,
) -> ApiResult<SearchOutcome> {
    handlers::search_profiles_handler(request, db, state).await
}

#[get("/jobs/listings?<keyword>&<location>&<limit>&<offset>")]
pub async fn list_jobs(
    keyword: Option<String>,
    location: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    db: &State<Database>,
) -> ApiResult<Vec<JobListing>> {
    let defaults = ListingFilter::default();
    let filter = ListingFilter {
        keyword,
        location,
        limit: limit.unwrap_or(defaults.limit),
        offset: offset.unwrap_or(defaults.offset),
    };
    handlers::list_jobs_handler(filter, db).await
}

#[get("/jobs/listings/<job_id>")]
pub async fn get_job(job_id: &str, db: &State<Database>) -> ApiResult<JobListing> {
    handlers::get_job_handler(job_id, db).await
}

#[post("/jobs/enrich/<job_id>")]
pub async fn enrich_job(
    job_id: &str,
    db: &State<Database>,
    state: &State<ServerState>,
) -> ApiResult<JobListing> {
    handlers::enrich_job_handler(job_id, db, state).await
}

#[post("/jobs/create-from-url", data = "<request>")]
pub async fn create_from_url(
    request: Json<StandardRequest<CreateFromUrlRequest>>,
    db: &State<Database>,
    state: &State<ServerState>,
) -> ApiResult<JobListing> {
    handlers::create_from_url_handler(request, db, state).await
}

#[get("/jobs/search-history?<limit>")]
pub async fn search_history(
    limit: Option<i64>,
    db: &State<Database>,
) -> ApiResult<Vec<JobSearchRecord>> {
    handlers::search_history_handler(limit, db).await
}

#[get("/jobs/profiles")]
pub async fn list_profiles(db: &State<Database>) -> ApiResult<Vec<SavedSearchProfile>> {
    handlers::list_profiles_handler(db).await
}

#[get("/health")]
pub async fn health(db: &State<Database>) -> Json<DataResponse<HealthData>> {
    handlers::health_handler(db).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "INVALID_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
        None,
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path".to_string()],
        None,
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body does not match the expected shape".to_string(),
        "INVALID_REQUEST".to_string(),
        vec![
            "Check field names and types".to_string(),
            "Filter values use snake_case, e.g. full_time or past_week".to_string(),
        ],
        None,
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
        None,
    ))
}

/// Assemble the application around an open database and a job board.
pub fn build_rocket(
    db: Database,
    board: Arc<dyn JobBoard>,
    config: &EnvironmentConfig,
) -> Rocket<Build> {
    let figment = rocket::Config::figment().merge(("port", config.server.port));

    rocket::custom(figment)
        .attach(Cors)
        .manage(db)
        .manage(ServerState {
            board,
            scraper: config.scraper.clone(),
        })
        .register(
            "/api",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                search_jobs,
                search_profiles,
                list_jobs,
                get_job,
                enrich_job,
                create_from_url,
                search_history,
                list_profiles,
                health,
                options,
            ],
        )
}

pub async fn start_web_server(config: EnvironmentConfig) -> Result<()> {
    config.ensure_directories().await?;

    let db = Database::new(&config.database_path).await?;
    let board = LinkedInBoard::new(config.scraper.clone())
        .context("Failed to create job board client")?;

    info!("Starting job search API server on port {}", config.server.port);
    info!("Database: {}", config.database_path.display());
    info!("Job board: {}", config.scraper.base_url);

    if let Err(e) = build_rocket(db, Arc::new(board), &config).launch().await {
        error!("Rocket server failed: {}", e);
        anyhow::bail!("Rocket server failed to launch");
    }

    Ok(())
}
