// src/core/mod.rs
//! Persistence: the SQLite database and one repository per table

pub mod database;
pub mod listings;
pub mod profiles;
pub mod searches;

pub use database::Database;
pub use listings::{JobListingRepository, ListingFilter};
pub use profiles::SearchProfileRepository;
pub use searches::JobSearchRepository;
