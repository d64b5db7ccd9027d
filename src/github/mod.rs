//! Code-host side: the capability the approval engine calls into, its
//! GitHub REST implementation, and the approval engine itself.

pub mod approval;
pub mod client;

use async_trait::async_trait;

use crate::errors::GitHubError;

pub use approval::ApprovalEngine;
pub use client::GitHubClient;

/// The parts of a pull request that decide whether it can be approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestState {
    pub state: String,
    pub merged: bool,
}

impl PullRequestState {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

/// Remote actions against pull requests.
#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestState, GitHubError>;

    /// Submit an approving review and return its id. `None` means the review
    /// was accepted but its id could not be read back.
    async fn create_approval_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Option<u64>, GitHubError>;
}
