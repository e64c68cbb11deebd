use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the Logis API.
///
/// The session controller never lets these reach the transcript; they end up
/// in logs and the conversation gets the fallback turn instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {detail}")]
    Status {
        url: String,
        status: StatusCode,
        detail: String,
    },

    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport { source, .. } | ApiError::Decode { source, .. } => {
                source.status()
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ApiError::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
