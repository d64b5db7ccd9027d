//! Approval engine: validate the target, then approve with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::CodeHost;
use crate::core::models::{ApprovalOutcome, ApprovalRequest};
use crate::errors::{ApprovalError, GitHubError, GitHubErrorKind, ValidationError};

pub const MAX_APPROVAL_ATTEMPTS: u32 = 3;

pub struct ApprovalEngine {
    code_host: Arc<dyn CodeHost>,
    max_attempts: u32,
    base_delay: Duration,
}

impl ApprovalEngine {
    #[must_use]
    pub fn new(code_host: Arc<dyn CodeHost>, base_delay: Duration) -> Self {
        Self {
            code_host,
            max_attempts: MAX_APPROVAL_ATTEMPTS,
            base_delay,
        }
    }

    /// Check that the pull request exists, is visible, and is open and unmerged.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` describing why the target can never be approved,
    /// or `Unavailable` if its state could not be fetched.
    pub async fn validate_target(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<(), ValidationError> {
        debug!(owner, repo, pr_number = number, "Validating PR");

        let pr = self
            .code_host
            .get_pull_request(owner, repo, number)
            .await
            .map_err(|e| validation_error(owner, repo, number, e))?;

        if !pr.is_open() {
            return Err(ValidationError::InvalidState {
                number,
                state: pr.state,
            });
        }
        if pr.merged {
            return Err(ValidationError::InvalidState {
                number,
                state: "already merged".to_string(),
            });
        }

        debug!(owner, repo, pr_number = number, state = %pr.state, "PR validation successful");
        Ok(())
    }

    /// Submit an approval, retrying transient failures with exponential backoff.
    ///
    /// Permanent failures return at once. After `MAX_APPROVAL_ATTEMPTS`
    /// transient failures the last one is returned with `retry_attempts`
    /// equal to the attempt count.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Cancelled` if `cancel` fires while waiting on
    /// backoff or on the remote call.
    pub async fn approve_with_retry(
        &self,
        request: ApprovalRequest,
        cancel: &CancellationToken,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let mut delays = backoff(self.base_delay);
        let mut last_error: Option<GitHubError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = delays.next().unwrap_or(self.base_delay);
                debug!(
                    attempt = attempt + 1,
                    max_attempts = self.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    pr_number = request.pr_number,
                    "Retrying PR approval"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(ApprovalError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ApprovalError::Cancelled),
                result = self.code_host.create_approval_review(
                    &request.owner,
                    &request.repository,
                    request.pr_number,
                ) => result,
            };

            match result {
                Ok(review_id) => {
                    debug!(
                        owner = %request.owner,
                        repo = %request.repository,
                        pr_number = request.pr_number,
                        review_id = ?review_id,
                        "PR approved"
                    );
                    return Ok(ApprovalOutcome::approved(request, review_id, attempt));
                }
                Err(e) if e.is_permanent() => {
                    debug!(
                        pr_number = request.pr_number,
                        error = %e,
                        "PR approval failed permanently"
                    );
                    return Ok(ApprovalOutcome::failed(request, e.to_string(), attempt));
                }
                Err(e) => {
                    debug!(
                        attempt = attempt + 1,
                        pr_number = request.pr_number,
                        error = %e,
                        "PR approval attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.map_or_else(
            || "approval was never attempted".to_string(),
            |e| e.to_string(),
        );
        warn!(
            owner = %request.owner,
            repo = %request.repository,
            pr_number = request.pr_number,
            final_error = %error,
            "PR approval retries exhausted"
        );
        Ok(ApprovalOutcome::failed(request, error, self.max_attempts))
    }

    /// Validate then approve. A validation failure becomes a failed outcome
    /// without any approval attempt.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Cancelled` on shutdown.
    pub async fn process(
        &self,
        request: ApprovalRequest,
        cancel: &CancellationToken,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        info!(
            owner = %request.owner,
            repo = %request.repository,
            pr_number = request.pr_number,
            "PR approval started"
        );

        let validation = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApprovalError::Cancelled),
            result = self.validate_target(&request.owner, &request.repository, request.pr_number) => result,
        };

        if let Err(e) = validation {
            warn!(pr_number = request.pr_number, error = %e, "PR validation failed");
            return Ok(ApprovalOutcome::failed(request, e.to_string(), 0));
        }

        self.approve_with_retry(request, cancel).await
    }
}

/// Delays before attempts 2, 3, ...: `base * 2^(k-1)` for attempt `k`.
fn backoff(base: Duration) -> ExponentialBackoff {
    let unit_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    ExponentialBackoff::from_millis(2).factor(unit_ms)
}

fn validation_error(owner: &str, repo: &str, number: u64, error: GitHubError) -> ValidationError {
    match error.kind {
        GitHubErrorKind::NotFound => ValidationError::NotFound {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        },
        GitHubErrorKind::Forbidden | GitHubErrorKind::Unauthorized => {
            ValidationError::PermissionDenied {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number,
            }
        }
        _ => ValidationError::Unavailable {
            number,
            source: error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_from_two_units() {
        let delays: Vec<Duration> = backoff(Duration::from_secs(1)).take(3).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[test]
    fn test_validation_errors_follow_error_kind() {
        let not_found = validation_error(
            "acme",
            "widget",
            4,
            GitHubError::new(GitHubErrorKind::NotFound, "missing"),
        );
        assert!(matches!(not_found, ValidationError::NotFound { number: 4, .. }));

        let denied = validation_error(
            "acme",
            "widget",
            4,
            GitHubError::new(GitHubErrorKind::Unauthorized, "Bad credentials"),
        );
        assert!(matches!(denied, ValidationError::PermissionDenied { .. }));

        let flaky = validation_error(
            "acme",
            "widget",
            4,
            GitHubError::new(GitHubErrorKind::Server, "502"),
        );
        assert!(matches!(flaky, ValidationError::Unavailable { .. }));
    }
}
