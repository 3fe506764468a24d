pub mod comorbidities;
pub mod entity_service;
pub mod local;
pub mod medications;
pub mod merge;
pub mod orchestrator;
pub mod patterns;
pub mod sanitize;

pub use entity_service::*;
pub use local::extract_local;
pub use merge::merge_profiles;
pub use orchestrator::*;
pub use sanitize::*;

use thiserror::Error;

use crate::models::PatientProfile;

/// Longest note accepted, in characters.
pub const MAX_INPUT_CHARS: usize = 100_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Clinical note is empty")]
    Empty,

    #[error("Clinical note is too long ({len} characters, maximum {max})")]
    TooLong { len: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum EntityServiceError {
    #[error("Entity service is not configured")]
    NotConfigured,

    #[error("Entity service is unreachable at {0}")]
    Connection(String),

    #[error("Entity service timed out after {0}s")]
    Timeout(u64),

    #[error("Entity service returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Check and normalize raw note text.
pub fn validate_input(raw_text: &str) -> Result<String, InputError> {
    let len = raw_text.chars().count();
    if len > MAX_INPUT_CHARS {
        return Err(InputError::TooLong {
            len,
            max: MAX_INPUT_CHARS,
        });
    }
    let text = sanitize_note(raw_text);
    if text.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(text)
}

/// Local-only extraction. Equivalent to a [`ProfileExtractor`] with no
/// collaborator configured.
pub fn extract(raw_text: &str) -> Result<PatientProfile, InputError> {
    ProfileExtractor::local_only().extract(raw_text)
}
