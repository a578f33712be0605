// src/web/handlers/job_handlers.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

use crate::core::{Database, ListingFilter};
use crate::error::PipelineError;
use crate::jobs::{JobListing, JobSearchRecord, SavedSearchProfile, SearchOutcome};
use crate::orchestrator::{EnrichOutcome, ImportOutcome, SearchOrchestrator};
use crate::web::types::{
    api_error, ApiError, ApiResult, CreateFromUrlRequest, DataResponse, ProfileSearchRequest,
    SearchRequest, ServerState, StandardRequest, WithConversationId,
};

fn pipeline_error(e: PipelineError, conversation_id: Option<String>) -> ApiError {
    match e {
        PipelineError::Fetch(e) => {
            error!("Fetch failed: {}", e);
            let suggestion = if e.is_timeout() {
                "The job board timed out, try again later"
            } else {
                "The job board may be rate limiting requests, try again later"
            };
            api_error(
                Status::BadGateway,
                format!("Failed to fetch jobs: {}", e),
                "FETCH_FAILED",
                &[suggestion],
                conversation_id,
            )
        }
        PipelineError::Store(e) => database_error(e, conversation_id),
    }
}

fn database_error(e: anyhow::Error, conversation_id: Option<String>) -> ApiError {
    error!("Database error: {:#}", e);
    api_error(
        Status::InternalServerError,
        "Database operation failed",
        "DATABASE_ERROR",
        &["Try again in a few moments"],
        conversation_id,
    )
}

fn job_not_found(job_id: &str, conversation_id: Option<String>) -> ApiError {
    api_error(
        Status::NotFound,
        format!("Job with ID {} not found", job_id),
        "JOB_NOT_FOUND",
        &["Search for jobs first", "Import the job from its URL"],
        conversation_id,
    )
}

fn detail_unavailable(conversation_id: Option<String>) -> ApiError {
    api_error(
        Status::BadGateway,
        "Could not extract job details from the job page",
        "FETCH_FAILED",
        &["The posting may have been removed", "Try again later"],
        conversation_id,
    )
}

fn invalid_request(error: impl Into<String>, conversation_id: Option<String>) -> ApiError {
    api_error(
        Status::BadRequest,
        error,
        "INVALID_REQUEST",
        &["Check the request fields"],
        conversation_id,
    )
}

fn search_message(outcome: &SearchOutcome) -> String {
    format!(
        "Found {} jobs ({} enriched, {} failed, {} already stored)",
        outcome.jobs.len(),
        outcome.enriched_count,
        outcome.failed_count,
        outcome.existing_count
    )
}

pub async fn search_jobs_handler(
    request: Json<StandardRequest<SearchRequest>>,
    db: &State<Database>,
    state: &State<ServerState>,
) -> ApiResult<SearchOutcome> {
    let conversation_id = request.conversation_id();
    let search = &request.data;

    if search.keyword.trim().is_empty() || search.location.trim().is_empty() {
        return Err(invalid_request(
            "Both keyword and location are required",
            conversation_id,
        ));
    }

    info!(
        "Searching jobs: keyword='{}', location='{}', date_posted='{}'",
        search.keyword, search.location, search.date_posted
    );

    let orchestrator = SearchOrchestrator::new(state.board.as_ref(), db, &state.scraper);
    let outcome = orchestrator
        .run(&[search.profile()], search.limit, search.date_posted)
        .await
        .map_err(|e| pipeline_error(e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        search_message(&outcome),
        outcome,
        conversation_id,
    )))
}

pub async fn search_profiles_handler(
    request: Json<StandardRequest<ProfileSearchRequest>>,
    db: &State<Database>,
    state: &State<ServerState>,
) -> ApiResult<SearchOutcome> {
    let conversation_id = request.conversation_id();
    let search = &request.data;

    let stored = db
        .profiles()
        .get_many(&search.profile_ids)
        .await
        .map_err(|e| database_error(e, conversation_id.clone()))?;

    let missing: Vec<String> = search
        .profile_ids
        .iter()
        .filter(|id| !stored.iter().any(|saved| saved.id == **id))
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(invalid_request(
            format!("Unknown search profiles: {}", missing.join(", ")),
            conversation_id,
        ));
    }

    let mut profiles = search.profiles.clone();
    profiles.extend(stored.into_iter().map(|saved| saved.profile));

    if profiles.is_empty() {
        return Err(invalid_request(
            "At least one search profile is required",
            conversation_id,
        ));
    }

    info!(
        "Searching {} profiles for up to {} jobs",
        profiles.len(),
        search.limit
    );

    let orchestrator = SearchOrchestrator::new(state.board.as_ref(), db, &state.scraper);
    let outcome = orchestrator
        .run(&profiles, search.limit, search.date_posted)
        .await
        .map_err(|e| pipeline_error(e, conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        search_message(&outcome),
        outcome,
        conversation_id,
    )))
}

pub async fn list_jobs_handler(
    filter: ListingFilter,
    db: &State<Database>,
) -> ApiResult<Vec<JobListing>> {
    let jobs = db
        .listings()
        .list(&filter)
        .await
        .map_err(|e| database_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} jobs", jobs.len()),
        jobs,
        None,
    )))
}

pub async fn get_job_handler(job_id: &str, db: &State<Database>) -> ApiResult<JobListing> {
    match db.listings().get(job_id).await {
        Ok(Some(job)) => Ok(Json(DataResponse::success(job.to_string(), job, None))),
        Ok(None) => Err(job_not_found(job_id, None)),
        Err(e) => Err(database_error(e, None)),
    }
}

pub async fn enrich_job_handler(
    job_id: &str,
    db: &State<Database>,
    state: &State<ServerState>,
) -> ApiResult<JobListing> {
    let orchestrator = SearchOrchestrator::new(state.board.as_ref(), db, &state.scraper);

    match orchestrator.enrich(job_id).await {
        Ok(EnrichOutcome::Enriched(job)) => Ok(Json(DataResponse::success(
            format!("Enriched {}", job),
            job,
            None,
        ))),
        Ok(EnrichOutcome::AlreadyEnriched(job)) => Ok(Json(DataResponse::success(
            format!("Job {} was already enriched", job.job_id),
            job,
            None,
        ))),
        Ok(EnrichOutcome::NotFound) => Err(job_not_found(job_id, None)),
        Ok(EnrichOutcome::DetailUnavailable) => Err(detail_unavailable(None)),
        Err(e) => Err(pipeline_error(e, None)),
    }
}

pub async fn create_from_url_handler(
    request: Json<StandardRequest<CreateFromUrlRequest>>,
    db: &State<Database>,
    state: &State<ServerState>,
) -> ApiResult<JobListing> {
    let conversation_id = request.conversation_id();
    let orchestrator = SearchOrchestrator::new(state.board.as_ref(), db, &state.scraper);

    match orchestrator.import_from_url(&request.data.url).await {
        Ok(ImportOutcome::Imported(job)) => Ok(Json(DataResponse::success(
            format!("Imported {}", job),
            job,
            conversation_id,
        ))),
        Ok(ImportOutcome::Existing(job)) => Ok(Json(DataResponse::success(
            format!("Job {} already exists", job.job_id),
            job,
            conversation_id,
        ))),
        Ok(ImportOutcome::InvalidUrl) => Err(api_error(
            Status::BadRequest,
            "Could not extract a job id from the URL",
            "INVALID_URL",
            &["Use a job URL such as https://www.linkedin.com/jobs/view/4309395824"],
            conversation_id,
        )),
        Ok(ImportOutcome::DetailUnavailable) => Err(detail_unavailable(conversation_id)),
        Err(e) => Err(pipeline_error(e, conversation_id)),
    }
}

pub async fn search_history_handler(
    limit: Option<i64>,
    db: &State<Database>,
) -> ApiResult<Vec<JobSearchRecord>> {
    let history = db
        .searches()
        .history(limit.unwrap_or(10))
        .await
        .map_err(|e| database_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} searches", history.len()),
        history,
        None,
    )))
}

pub async fn list_profiles_handler(db: &State<Database>) -> ApiResult<Vec<SavedSearchProfile>> {
    let profiles = db
        .profiles()
        .list()
        .await
        .map_err(|e| database_error(e, None))?;

    Ok(Json(DataResponse::success(
        format!("{} search profiles", profiles.len()),
        profiles,
        None,
    )))
}
