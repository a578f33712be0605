// src/web/types.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::environment::ScraperConfig;
use crate::jobs::{DatePosted, ExperienceLevel, JobType, SearchProfile};
use crate::scraper::JobBoard;

/// Shared state for every route besides the database.
pub struct ServerState {
    pub board: Arc<dyn JobBoard>,
    pub scraper: ScraperConfig,
}

// ===== Response envelopes =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Data,
    Error,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Error half of every route result: HTTP status plus the error envelope.
pub type ApiError = (Status, Json<StandardErrorResponse>);
pub type ApiResult<T> = Result<Json<DataResponse<T>>, ApiError>;

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            conversation_id,
        }
    }
}

pub fn api_error(
    status: Status,
    error: impl Into<String>,
    error_code: &str,
    suggestions: &[&str],
    conversation_id: Option<String>,
) -> ApiError {
    (
        status,
        Json(StandardErrorResponse::new(
            error.into(),
            error_code.to_string(),
            suggestions.iter().map(|s| s.to_string()).collect(),
            conversation_id,
        )),
    )
}

// ===== Requests =====

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

pub trait WithConversationId {
    fn conversation_id(&self) -> Option<String>;
}

impl<T> WithConversationId for StandardRequest<T> {
    fn conversation_id(&self) -> Option<String> {
        self.conversation_id.clone()
    }
}

fn default_limit() -> usize {
    25
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SearchRequest {
    pub keyword: String,
    pub location: String,
    #[serde(default)]
    pub job_types: Vec<JobType>,
    #[serde(default)]
    pub experience_levels: Vec<ExperienceLevel>,
    #[serde(default)]
    pub date_posted: DatePosted,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl SearchRequest {
    pub fn profile(&self) -> SearchProfile {
        SearchProfile {
            name: None,
            keyword: self.keyword.clone(),
            location: self.location.clone(),
            job_types: self.job_types.clone(),
            experience_levels: self.experience_levels.clone(),
        }
    }
}

/// Multi-profile search. Inline profiles run first, then stored ones.
#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ProfileSearchRequest {
    #[serde(default)]
    pub profiles: Vec<SearchProfile>,
    #[serde(default)]
    pub profile_ids: Vec<i64>,
    #[serde(default)]
    pub date_posted: DatePosted,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CreateFromUrlRequest {
    pub url: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthData {
    pub status: &'static str,
    pub database: bool,
}
