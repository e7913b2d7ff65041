//! Shared error handling utilities.

use thiserror::Error;

/// Errors surfaced by the gateway client and the operations built on it.
///
/// Nothing here is fatal to the process: callers convert failures into
/// user-visible notifications and leave their local state untouched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to decode gateway response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no active session")]
    NoSession,

    #[error("no company resolved for this account")]
    NoCompany,

    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),
}

impl Error {
    /// True for errors produced before any request was issued.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::EmptyField(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
