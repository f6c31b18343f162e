//! GitHub client error types.

/// Errors from the GitHub repository client.
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] constellation_core::Error),

    /// Non-success response, including the router's offline 503.
    #[error("GitHub API error: {status} {status_text}. Message: {message}")]
    Http { status: u16, status_text: String, message: String },

    /// Response body was not the expected JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// Repository name contains characters GitHub does not allow.
    #[error("invalid repository name: {0}")]
    InvalidName(String),

    /// Configured base URL or username does not form a valid URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl From<serde_json::Error> for GithubError {
    fn from(err: serde_json::Error) -> Self {
        GithubError::Parse(err.to_string())
    }
}
