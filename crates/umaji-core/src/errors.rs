//! Row-level identity errors.
//!
//! File- and store-level errors (`WorkbookError`, `DatabaseError`,
//! `ConfigError`) live in their own crates. The binary converges them through
//! `anyhow`.

use thiserror::Error;

/// Why a single row could not be keyed. Rows failing this way are excluded
/// from their batch and counted; the rest of the file proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("horse name is missing or empty after normalization")]
    MissingHorseName,

    #[error("venue could not be determined")]
    MissingVenue,

    #[error("unknown venue '{0}'")]
    UnknownVenue(String),

    #[error("race number could not be determined")]
    MissingRaceNumber,

    #[error("race number '{0}' is outside 1..=12")]
    InvalidRaceNumber(String),

    #[error("source date could not be determined from row or file name")]
    MissingSourceDate,

    #[error("source date '{0}' fails the date-domain check")]
    InvalidSourceDate(String),
}
