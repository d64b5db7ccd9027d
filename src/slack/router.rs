//! Routes inbound messages through matching, fan-out approval and feedback.
//!
//! Every message gets its own task, and every resolvable reference in it
//! gets another. Tasks share nothing mutable; the tracker is only used to
//! wait for them at shutdown.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::reactions::{FeedbackReactor, ReactionKind};
use crate::core::config::RouterSettings;
use crate::core::models::{ApprovalRequest, InboundMessage};
use crate::errors::ApprovalError;
use crate::github::ApprovalEngine;
use crate::matcher::PatternMatcher;

/// What the router decided to do with one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    OtherChannel,
    OwnMessage,
    NoMatch,
    NoReferences,
    /// Approvals were dispatched for this many references.
    Dispatched(usize),
}

pub struct MessageRouter {
    matcher: PatternMatcher,
    engine: Arc<ApprovalEngine>,
    reactor: Arc<FeedbackReactor>,
    settings: RouterSettings,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl MessageRouter {
    #[must_use]
    pub fn new(
        matcher: PatternMatcher,
        engine: Arc<ApprovalEngine>,
        reactor: Arc<FeedbackReactor>,
        settings: RouterSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            matcher,
            engine,
            reactor,
            settings,
            shutdown,
            tracker: TaskTracker::new(),
        }
    }

    /// Entry point for the event source. Returns immediately; processing
    /// happens on a spawned task.
    pub fn on_message(self: &Arc<Self>, message: InboundMessage) {
        let router = Arc::clone(self);
        let span = info_span!("message", correlation_id = %Uuid::new_v4());
        self.tracker.spawn(
            async move {
                router.process_message(message).await;
            }
            .instrument(span),
        );
    }

    /// Filter, match and dispatch one message. Approvals run on their own
    /// tasks and may still be in flight when this returns.
    pub async fn process_message(self: &Arc<Self>, message: InboundMessage) -> MessageDisposition {
        if let Some(channel) = self.settings.channel_filter.as_deref()
            && channel != message.channel_id
        {
            return MessageDisposition::OtherChannel;
        }

        if self
            .settings
            .bot_user_id
            .as_deref()
            .is_some_and(|bot| bot == message.user_id)
        {
            return MessageDisposition::OwnMessage;
        }

        info!(channel = %message.channel_id, "Message received");
        debug!(user = %message.user_id, text = ?message.text, "Message contents");

        let Some(matched) = self.matcher.match_message(&message) else {
            return MessageDisposition::NoMatch;
        };

        info!(
            channel = %message.channel_id,
            user = %message.user_id,
            pattern = ?matched.pattern,
            matched_text = ?matched.matched_text,
            "Pattern matched"
        );

        if matched.references.is_empty() {
            info!("Pattern matched but no PR references found in message");
            self.reactor
                .apply_reaction(&message.channel_id, &message.ts, ReactionKind::NoReferencesFound)
                .await;
            return MessageDisposition::NoReferences;
        }

        self.reactor
            .apply_reaction(&message.channel_id, &message.ts, ReactionKind::ProcessingStarted)
            .await;

        let mut dispatched = 0;
        for reference in &matched.references {
            let Some((owner, repo)) = reference.resolve(
                self.settings.default_owner.as_deref(),
                self.settings.default_repo.as_deref(),
            ) else {
                warn!(
                    pr_number = reference.number,
                    reason = "missing_owner_or_repo",
                    "Skipping PR reference"
                );
                continue;
            };

            let request = ApprovalRequest::new(owner, repo, reference.number, &message);
            let router = Arc::clone(self);
            self.tracker.spawn(
                async move {
                    router.run_approval(request).await;
                }
                .in_current_span(),
            );
            dispatched += 1;
        }

        MessageDisposition::Dispatched(dispatched)
    }

    async fn run_approval(&self, request: ApprovalRequest) {
        let channel = request.source_channel.clone();
        let ts = request.source_message.ts.clone();

        match self.engine.process(request, &self.shutdown).await {
            Ok(outcome) if outcome.success() => {
                info!(
                    owner = %outcome.request.owner,
                    repo = %outcome.request.repository,
                    pr_number = outcome.request.pr_number,
                    review_id = outcome.review_id(),
                    retries = outcome.retry_attempts,
                    "PR approval succeeded"
                );
                self.reactor
                    .apply_reaction(&channel, &ts, ReactionKind::ApprovalSucceeded)
                    .await;
            }
            Ok(outcome) => {
                error!(
                    owner = %outcome.request.owner,
                    repo = %outcome.request.repository,
                    pr_number = outcome.request.pr_number,
                    error = outcome.error_message().unwrap_or_default(),
                    retries = outcome.retry_attempts,
                    "PR approval failed"
                );
                self.reactor
                    .apply_reaction(&channel, &ts, ReactionKind::ApprovalFailed)
                    .await;
            }
            Err(ApprovalError::Cancelled) => {
                info!(channel = %channel, "PR approval cancelled by shutdown");
            }
        }
    }

    /// Wait for every in-flight message and approval task to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Cancel backoff waits and remote calls, then wait for tasks to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.drain().await;
    }
}
