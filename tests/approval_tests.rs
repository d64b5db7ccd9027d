mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::{FakeCodeHost, message, open, transient};
use lgtm::core::models::ApprovalRequest;
use lgtm::errors::{ApprovalError, GitHubError, GitHubErrorKind, ValidationError};
use lgtm::github::{ApprovalEngine, CodeHost, PullRequestState};

const UNIT: Duration = Duration::from_secs(1);

fn request(number: u64) -> ApprovalRequest {
    ApprovalRequest::new("acme".into(), "widget".into(), number, &message("lgtm"))
}

fn engine(host: &Arc<FakeCodeHost>) -> ApprovalEngine {
    ApprovalEngine::new(host.clone(), UNIT)
}

#[tokio::test(start_paused = true)]
async fn test_approves_on_first_attempt() {
    let host = Arc::new(FakeCodeHost::default());
    let outcome = engine(&host)
        .approve_with_retry(request(42), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.review_id(), Some(1042));
    assert_eq!(outcome.retry_attempts, 0);
    assert_eq!(host.review_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_merged_target_never_reaches_approval() {
    let host = Arc::new(FakeCodeHost::default().with_state(
        7,
        Ok(PullRequestState {
            state: "open".into(),
            merged: true,
        }),
    ));

    let outcome = engine(&host)
        .process(request(7), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.success());
    assert!(outcome.error_message().unwrap().contains("already merged"));
    assert_eq!(outcome.retry_attempts, 0);
    assert_eq!(host.review_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_validation_reports_missing_and_closed_targets() {
    let host = Arc::new(
        FakeCodeHost::default()
            .with_state(
                1,
                Err(GitHubError::new(GitHubErrorKind::NotFound, "Not Found").with_status(404)),
            )
            .with_state(
                2,
                Ok(PullRequestState {
                    state: "closed".into(),
                    merged: false,
                }),
            )
            .with_state(
                3,
                Err(GitHubError::new(GitHubErrorKind::Forbidden, "Forbidden").with_status(403)),
            )
            .with_state(4, Err(transient("502 Bad Gateway"))),
    );
    let engine = engine(&host);

    assert!(matches!(
        engine.validate_target("acme", "widget", 1).await,
        Err(ValidationError::NotFound { number: 1, .. })
    ));
    assert!(matches!(
        engine.validate_target("acme", "widget", 2).await,
        Err(ValidationError::InvalidState { number: 2, ref state }) if state == "closed"
    ));
    assert!(matches!(
        engine.validate_target("acme", "widget", 3).await,
        Err(ValidationError::PermissionDenied { number: 3, .. })
    ));
    assert!(matches!(
        engine.validate_target("acme", "widget", 4).await,
        Err(ValidationError::Unavailable { number: 4, .. })
    ));
    assert!(engine.validate_target("acme", "widget", 5).await.is_ok());

    // Validation is never retried.
    assert_eq!(host.get_count(), 5);
    assert_eq!(host.review_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retries_transient_failures_with_backoff() {
    let host = Arc::new(FakeCodeHost::default().with_reviews(
        9,
        vec![Err(transient("502")), Err(transient("503")), Ok(55)],
    ));

    let outcome = engine(&host)
        .approve_with_retry(request(9), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.review_id(), Some(55));
    assert_eq!(outcome.retry_attempts, 2);

    let at = host.review_instants();
    assert_eq!(at.len(), 3);
    let first_gap = at[1] - at[0];
    let second_gap = at[2] - at[1];
    assert!(first_gap >= UNIT);
    assert!(second_gap >= UNIT * 2);
    assert!(second_gap > first_gap);
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_three_transient_failures() {
    let host = Arc::new(FakeCodeHost::default().with_reviews(
        9,
        vec![
            Err(transient("first")),
            Err(transient("second")),
            Err(transient("third")),
            Ok(1),
        ],
    ));

    let outcome = engine(&host)
        .approve_with_retry(request(9), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.success());
    assert_eq!(outcome.retry_attempts, 3);
    assert_eq!(outcome.error_message(), Some("third"));
    assert_eq!(host.review_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failure_stops_retrying() {
    let host = Arc::new(FakeCodeHost::default().with_reviews(
        9,
        vec![
            Err(transient("502")),
            Err(GitHubError::new(
                GitHubErrorKind::Unprocessable,
                "PR #9 cannot be approved (already merged or closed)",
            )
            .with_status(422)),
        ],
    ));

    let outcome = engine(&host)
        .approve_with_retry(request(9), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.success());
    assert_eq!(outcome.retry_attempts, 1);
    assert_eq!(host.review_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unstructured_bad_credentials_is_permanent() {
    let host = Arc::new(FakeCodeHost::default().with_reviews(
        9,
        vec![Err(GitHubError::new(
            GitHubErrorKind::Other,
            "failed to approve PR #9: Bad credentials",
        ))],
    ));

    let outcome = engine(&host)
        .approve_with_retry(request(9), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.success());
    assert_eq!(outcome.retry_attempts, 0);
    assert_eq!(host.review_count(), 1);
}

/// Cancels the shutdown token from inside the first approval attempt.
struct CancellingHost {
    token: CancellationToken,
    calls: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl CodeHost for CancellingHost {
    async fn get_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<PullRequestState, GitHubError> {
        Ok(open())
    }

    async fn create_approval_review(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Option<u64>, GitHubError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.token.cancel();
        Err(transient("502"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff_aborts() {
    let token = CancellationToken::new();
    let host = Arc::new(CancellingHost {
        token: token.clone(),
        calls: std::sync::atomic::AtomicUsize::new(0),
    });
    let engine = ApprovalEngine::new(host.clone(), UNIT);

    let result = engine.process(request(9), &token).await;

    assert_eq!(result.unwrap_err(), ApprovalError::Cancelled);
    assert_eq!(host.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_makes_no_calls() {
    let host = Arc::new(FakeCodeHost::default());
    let token = CancellationToken::new();
    token.cancel();

    let result = engine(&host).process(request(9), &token).await;

    assert_eq!(result.unwrap_err(), ApprovalError::Cancelled);
    assert_eq!(host.get_count(), 0);
    assert_eq!(host.review_count(), 0);
}
