// src/jobs/filters.rs
//! Search filter vocabularies and the board's query codes for them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Temporary,
        JobType::Internship,
    ];

    /// Value of the `f_JT` query parameter
    pub fn code(self) -> &'static str {
        match self {
            JobType::FullTime => "F",
            JobType::PartTime => "P",
            JobType::Contract => "C",
            JobType::Temporary => "T",
            JobType::Internship => "I",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Contract => "contract",
            JobType::Temporary => "temporary",
            JobType::Internship => "internship",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Internship,
    EntryLevel,
    Associate,
    MidSeniorLevel,
    Director,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 5] = [
        ExperienceLevel::Internship,
        ExperienceLevel::EntryLevel,
        ExperienceLevel::Associate,
        ExperienceLevel::MidSeniorLevel,
        ExperienceLevel::Director,
    ];

    /// Value of the `f_E` query parameter
    pub fn code(self) -> &'static str {
        match self {
            ExperienceLevel::Internship => "1",
            ExperienceLevel::EntryLevel => "2",
            ExperienceLevel::Associate => "3",
            ExperienceLevel::MidSeniorLevel => "4",
            ExperienceLevel::Director => "5",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceLevel::Internship => "internship",
            ExperienceLevel::EntryLevel => "entry_level",
            ExperienceLevel::Associate => "associate",
            ExperienceLevel::MidSeniorLevel => "mid_senior_level",
            ExperienceLevel::Director => "director",
        }
    }
}

/// Posting-recency bucket.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DatePosted {
    #[default]
    AnyTime,
    #[serde(rename = "past_24_hours")]
    #[value(name = "past_24_hours")]
    Past24Hours,
    PastWeek,
    PastMonth,
}

impl DatePosted {
    pub const ALL: [DatePosted; 4] = [
        DatePosted::AnyTime,
        DatePosted::Past24Hours,
        DatePosted::PastWeek,
        DatePosted::PastMonth,
    ];

    /// Value of the `f_TPR` query parameter, `None` when no filter applies
    pub fn code(self) -> Option<&'static str> {
        match self {
            DatePosted::AnyTime => None,
            DatePosted::Past24Hours => Some("r86400"),
            DatePosted::PastWeek => Some("r604800"),
            DatePosted::PastMonth => Some("r2592000"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DatePosted::AnyTime => "any_time",
            DatePosted::Past24Hours => "past_24_hours",
            DatePosted::PastWeek => "past_week",
            DatePosted::PastMonth => "past_month",
        }
    }
}

macro_rules! impl_vocabulary {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $ty::ALL
                    .into_iter()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| anyhow::anyhow!("Unknown {}: {}", $what, s))
            }
        }
    };
}

impl_vocabulary!(JobType, "job type");
impl_vocabulary!(ExperienceLevel, "experience level");
impl_vocabulary!(DatePosted, "date posted filter");

/// Join the codes of a filter list, `None` when nothing is selected.
pub fn joined_codes<T, F>(values: &[T], code: F) -> Option<String>
where
    T: Copy,
    F: Fn(T) -> &'static str,
{
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|v| code(*v)).collect::<Vec<_>>().join(","))
}

/// Parse a `;`-separated list (the CSV import format).
pub fn parse_list<T>(raw: &str) -> anyhow::Result<Vec<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(T::from_str)
        .collect()
}
