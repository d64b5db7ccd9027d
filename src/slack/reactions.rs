//! Feedback reactions applied to the message that triggered processing.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::errors::SlackError;

/// Processing phases that are visible to the person who wrote the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    ProcessingStarted,
    ApprovalSucceeded,
    ApprovalFailed,
    NoReferencesFound,
}

impl ReactionKind {
    /// Emoji name sent to Slack. Consumers key off these exact names.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            ReactionKind::ProcessingStarted => "eyes",
            ReactionKind::ApprovalSucceeded => "white_check_mark",
            ReactionKind::ApprovalFailed => "x",
            ReactionKind::NoReferencesFound => "grey_question",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.emoji())
    }
}

/// Something that can put an emoji reaction on a message.
#[async_trait]
pub trait ReactionSink: Send + Sync {
    async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), SlackError>;
}

/// Best-effort reaction dispatcher: failures are logged and dropped.
pub struct FeedbackReactor {
    sink: Arc<dyn ReactionSink>,
    shutdown: CancellationToken,
}

impl FeedbackReactor {
    #[must_use]
    pub fn new(sink: Arc<dyn ReactionSink>, shutdown: CancellationToken) -> Self {
        Self { sink, shutdown }
    }

    pub async fn apply_reaction(&self, channel: &str, ts: &str, kind: ReactionKind) {
        let result = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => {
                debug!(channel, ts, reaction = %kind, "Skipping reaction during shutdown");
                return;
            }
            result = self.sink.add_reaction(channel, ts, kind.emoji()) => result,
        };

        match result {
            Ok(()) => debug!(channel, ts, reaction = %kind, "Added reaction"),
            Err(e) => error!(channel, ts, reaction = %kind, error = %e, "Failed to add reaction"),
        }
    }
}
