use reqwest::StatusCode;

/// Why a refresh exchange did not produce a new credential.
///
/// Every variant ends the session the same way; they are kept apart so logs
/// and callers can tell a dead network from a revoked refresh token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    /// The refresh request never got an HTTP response.
    #[error("network error: {0}")]
    Network(String),
    /// The refresh endpoint answered with a non-success status, or with an
    /// envelope whose `status` flag was false.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The refresh endpoint answered 2xx but the body was not a credential.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The task driving the cycle was dropped before the exchange resolved.
    #[error("refresh cycle abandoned")]
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    /// 401 on a whitelisted endpoint or on the refresh endpoint itself.
    #[error("authentication rejected on {path}: {status} {body}")]
    TerminalAuthFailure {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("credential refresh failed: {0}")]
    RefreshRejected(#[source] RefreshFailure),
    #[error("no refresh token available; session ended")]
    SessionAbsent,
    #[error("http status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("api call unsuccessful: {message}")]
    Api { message: String },
}

impl Error {
    /// True for the failures that end the session.
    pub fn is_session_ending(&self) -> bool {
        matches!(self, Error::RefreshRejected(_) | Error::SessionAbsent)
    }
}
