/// LGTM - a Slack bot that approves GitHub pull requests when a message
/// matches a configured pattern.
///
/// Each message is tested against a regular expression. When it matches,
/// pull request references (full URLs or bare `#123` numbers) are pulled
/// from the text and every one is validated and approved on its own task,
/// with bounded exponential-backoff retries for transient failures. Progress
/// is reported back as emoji reactions on the original message.
///
/// # Architecture
///
/// The system uses:
/// - slack-morphism for Socket Mode events and reactions
/// - reqwest for the GitHub REST API
/// - Tokio (with `tokio-util` cancellation and task tracking) for concurrency
///
/// # Example
///
/// ```
/// use lgtm::matcher::PatternMatcher;
///
/// let matcher = PatternMatcher::new("(?i)lgtm").unwrap();
/// let result = matcher
///     .match_text("LGTM https://github.com/acme/widget/pull/42")
///     .unwrap();
///
/// assert_eq!(result.matched_text, "LGTM");
/// assert_eq!(result.references[0].owner.as_deref(), Some("acme"));
/// assert_eq!(result.references[0].number, 42);
/// ```
// Module declarations
pub mod bot;
pub mod core;
pub mod errors;
pub mod github;
pub mod matcher;
pub mod slack;
pub mod utils;

pub use bot::LgtmBot;
pub use errors::LgtmError;

/// Configure structured logging with the process-wide log level.
///
/// The level is fixed for the life of the process. Calling this again is a
/// no-op, so tests may call it freely.
///
/// # Example
///
/// ```
/// lgtm::setup_logging(tracing::Level::INFO);
/// ```
pub fn setup_logging(level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init();
}
