use chrono::{DateTime, Utc};
use thiserror::Error;

/// Everything that can stop a page sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("GitHub rejected the token (401 Unauthorized)")]
    Unauthorized,

    /// GitHub answers both quota exhaustion and some permission failures
    /// with 403. `exhausted` is only set for the former.
    #[error("{}", rate_limit_message(.reset))]
    RateLimited {
        reset: Option<DateTime<Utc>>,
        exhausted: bool,
    },

    /// The API answered with a status or content type we don't know how to read.
    #[error("unexpected response: status {status}, content type {}", .content_type.as_deref().unwrap_or("<none>"))]
    UnexpectedResponse {
        status: u16,
        content_type: Option<String>,
    },

    #[error("GraphQL query failed: {0}")]
    GraphQl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GitHub token not provided or found in environment (GITHUB_TOKEN)")]
    MissingToken,

    #[error("at least one search qualifier is required")]
    NoQualifiers,

    #[error("invalid API URL: {0}")]
    InvalidApiUrl(String),
}

impl SyncError {
    /// When a spent quota comes back. `None` for every other error.
    pub fn retry_at(&self) -> Option<DateTime<Utc>> {
        match self {
            SyncError::RateLimited {
                reset,
                exhausted: true,
            } => *reset,
            _ => None,
        }
    }
}

fn rate_limit_message(reset: &Option<DateTime<Utc>>) -> String {
    match reset {
        Some(at) => format!("rate limit exceeded, resets at {}", at.to_rfc3339()),
        None => "rate limit exceeded".to_string(),
    }
}
