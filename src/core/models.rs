use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as delivered by the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

/// A pointer to a pull request found in message text.
///
/// `owner` and `repository` are absent for bare references like `#42`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestReference {
    pub owner: Option<String>,
    pub repository: Option<String>,
    pub number: u64,
    pub url: Option<String>,
}

impl PullRequestReference {
    #[must_use]
    pub fn bare(number: u64) -> Self {
        Self {
            owner: None,
            repository: None,
            number,
            url: None,
        }
    }

    /// Fill missing owner/repository from defaults. Returns `None` when
    /// either is still unknown afterwards.
    #[must_use]
    pub fn resolve(
        &self,
        default_owner: Option<&str>,
        default_repo: Option<&str>,
    ) -> Option<(String, String)> {
        let owner = self
            .owner
            .as_deref()
            .or(default_owner)
            .filter(|s| !s.is_empty())?;
        let repo = self
            .repository
            .as_deref()
            .or(default_repo)
            .filter(|s| !s.is_empty())?;
        Some((owner.to_string(), repo.to_string()))
    }
}

/// Produced only when the configured pattern matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub pattern: String,
    pub matched_text: String,
    pub references: Vec<PullRequestReference>,
    pub source_message: Option<InboundMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub owner: String,
    pub repository: String,
    pub pr_number: u64,
    pub source_channel: String,
    pub source_user: String,
    pub source_message: InboundMessage,
    pub requested_at: DateTime<Utc>,
}

impl ApprovalRequest {
    #[must_use]
    pub fn new(owner: String, repository: String, pr_number: u64, message: &InboundMessage) -> Self {
        Self {
            owner,
            repository,
            pr_number,
            source_channel: message.channel_id.clone(),
            source_user: message.user_id.clone(),
            source_message: message.clone(),
            requested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalStatus {
    Approved { review_id: Option<u64> },
    Failed { error: String },
}

/// Terminal result of processing one [`ApprovalRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub request: ApprovalRequest,
    pub status: ApprovalStatus,
    pub processed_at: DateTime<Utc>,
    pub retry_attempts: u32,
}

impl ApprovalOutcome {
    #[must_use]
    pub fn approved(
        request: ApprovalRequest,
        review_id: Option<u64>,
        retry_attempts: u32,
    ) -> Self {
        Self {
            request,
            status: ApprovalStatus::Approved { review_id },
            processed_at: Utc::now(),
            retry_attempts,
        }
    }

    #[must_use]
    pub fn failed(request: ApprovalRequest, error: impl Into<String>, retry_attempts: u32) -> Self {
        Self {
            request,
            status: ApprovalStatus::Failed {
                error: error.into(),
            },
            processed_at: Utc::now(),
            retry_attempts,
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, ApprovalStatus::Approved { .. })
    }

    #[must_use]
    pub const fn review_id(&self) -> Option<u64> {
        match self.status {
            ApprovalStatus::Approved { review_id } => review_id,
            ApprovalStatus::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            ApprovalStatus::Approved { .. } => None,
            ApprovalStatus::Failed { error } => Some(error),
        }
    }
}
