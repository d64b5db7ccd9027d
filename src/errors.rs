use slack_morphism::errors::SlackClientError;
use thiserror::Error;

/// Error messages that will never succeed on retry, as produced by the
/// code host when it gives no structured status.
const PERMANENT_ERROR_MARKERS: &[&str] = &[
    "not found",
    "insufficient permissions",
    "already merged",
    "already closed",
    "invalid_auth",
    "Bad credentials",
];

#[derive(Debug, Error)]
#[error("invalid message pattern {pattern:?}: {source}")]
pub struct InvalidPatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

#[derive(Debug, Error)]
#[error("configuration error [{field}]: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Failed to access Slack API: {0}")]
    ApiError(String),

    #[error("Slack HTTP connector unavailable: {0}")]
    ConnectorError(String),
}

impl From<SlackClientError> for SlackError {
    fn from(error: SlackClientError) -> Self {
        SlackError::ApiError(error.to_string())
    }
}

/// Coarse classification of a failed code-host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    NotFound,
    Forbidden,
    Unauthorized,
    /// The target exists but rejects the action (merged, closed, own PR).
    Unprocessable,
    RateLimited,
    Server,
    Transport,
    Decode,
    /// No structured status was available; only the message is known.
    Other,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GitHubError {
    pub kind: GitHubErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl GitHubError {
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether retrying the same call can never succeed.
    ///
    /// Structured kinds decide on their own. `Other` carries nothing but a
    /// human-readable message, so it falls back to [`is_permanent_message`].
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self.kind {
            GitHubErrorKind::NotFound
            | GitHubErrorKind::Forbidden
            | GitHubErrorKind::Unauthorized
            | GitHubErrorKind::Unprocessable => true,
            GitHubErrorKind::RateLimited
            | GitHubErrorKind::Server
            | GitHubErrorKind::Transport
            | GitHubErrorKind::Decode => false,
            GitHubErrorKind::Other => is_permanent_message(&self.message),
        }
    }
}

impl From<reqwest::Error> for GitHubError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_decode() {
            GitHubErrorKind::Decode
        } else {
            GitHubErrorKind::Transport
        };
        let status = error.status().map(|s| s.as_u16());
        Self {
            kind,
            status,
            message: error.to_string(),
        }
    }
}

/// Legacy classifier: case-sensitive substring match on the error text.
#[must_use]
pub fn is_permanent_message(message: &str) -> bool {
    PERMANENT_ERROR_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Why a pull request cannot be approved, decided before any approval attempt.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("PR #{number} not found in {owner}/{repo}")]
    NotFound {
        owner: String,
        repo: String,
        number: u64,
    },

    #[error("insufficient permissions to access PR #{number} in {owner}/{repo}")]
    PermissionDenied {
        owner: String,
        repo: String,
        number: u64,
    },

    #[error("PR #{number} is {state} and cannot be approved")]
    InvalidState { number: u64, state: String },

    #[error("failed to get PR #{number}: {source}")]
    Unavailable {
        number: u64,
        #[source]
        source: GitHubError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("approval cancelled by shutdown")]
    Cancelled,
}

/// Top-level error surfaced by startup and the binary.
#[derive(Debug, Error)]
pub enum LgtmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidPattern(#[from] InvalidPatternError),

    #[error(transparent)]
    Slack(#[from] SlackError),

    #[error("GitHub authentication failed: {0}")]
    GitHub(#[from] GitHubError),
}
