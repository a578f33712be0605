pub mod cli;
pub mod core;
pub mod environment;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod merge;
pub mod orchestrator;
pub mod scraper;
pub mod web;

pub use environment::EnvironmentConfig;
pub use error::{FetchError, PipelineError, PipelineResult};
pub use orchestrator::SearchOrchestrator;
pub use web::{build_rocket, start_web_server};
